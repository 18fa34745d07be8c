//! Tracking a single activity bump over time.

use nalgebra::DMatrix;
use rayon::prelude::*;
use tracing::debug;

use crate::domain::{FitRecord, Pair2D};
use crate::error::{FitError, FitResult};
use crate::fit::{FitList, MLFitList, MLGaussianFitList, fit_gaussian_bump_tt, fit_maximum_lh_snapshot};
use crate::population::spikes::SlidingRateSource;

/// A population of neurons on a twisted torus that is assumed to carry at most
/// one activity bump.
#[derive(Debug, Clone)]
pub struct SingleBumpPopulation<S> {
    source: S,
    parallel: bool,
}

impl<S: SlidingRateSource> SingleBumpPopulation<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            parallel: false,
        }
    }

    /// Fit windows on the rayon pool. Results are still appended in time order.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn sheet_size(&self) -> Pair2D<usize> {
        self.source.sheet_size()
    }

    /// Fit a circular Gaussian to every sliding-window snapshot.
    ///
    /// With `full_err == false` only the sum of squared residuals is kept per
    /// window.
    pub fn bump_position(
        &self,
        tstart: f64,
        tend: f64,
        dt: f64,
        win_len: f64,
        full_err: bool,
    ) -> FitResult<MLGaussianFitList> {
        self.perform_fit(tstart, tend, dt, win_len, full_err, |sig| {
            fit_gaussian_bump_tt(sig).map(FitRecord::from)
        })
    }

    /// Fit the uniform (non-spatial) model to every sliding-window snapshot.
    pub fn uniform_fit(
        &self,
        tstart: f64,
        tend: f64,
        dt: f64,
        win_len: f64,
        full_err: bool,
    ) -> FitResult<MLFitList> {
        self.perform_fit(tstart, tend, dt, win_len, full_err, |sig| {
            fit_maximum_lh_snapshot(sig).map(FitRecord::from)
        })
    }

    fn perform_fit<L, F>(
        &self,
        tstart: f64,
        tend: f64,
        dt: f64,
        win_len: f64,
        full_err: bool,
        fit: F,
    ) -> FitResult<L>
    where
        L: FitList,
        F: Fn(&DMatrix<f64>) -> FitResult<FitRecord> + Sync,
    {
        let rates = self.source.sliding_firing_rate(tstart, tend, dt, win_len)?;
        if rates.snapshots.len() != rates.times.len() {
            return Err(FitError::InconsistentLengths {
                context: "SlidingRates",
                lengths: vec![rates.snapshots.len(), rates.times.len()],
            });
        }
        let total = rates.len();

        let fit_window = |idx: usize, sig: &DMatrix<f64>| -> FitResult<FitRecord> {
            debug!(window = idx + 1, total, time = rates.times[idx], "fitting window");
            let record = fit(sig)?;
            Ok(if full_err { record } else { record.collapse_err2() })
        };

        let records: Vec<FitResult<FitRecord>> = if self.parallel {
            rates
                .snapshots
                .par_iter()
                .enumerate()
                .map(|(idx, sig)| fit_window(idx, sig))
                .collect()
        } else {
            // Stop at the first failure; later windows are never fitted.
            let mut out = Vec::with_capacity(total);
            for (idx, sig) in rates.snapshots.iter().enumerate() {
                let record = fit_window(idx, sig);
                let failed = record.is_err();
                out.push(record);
                if failed {
                    break;
                }
            }
            out
        };

        let mut list = L::default();
        for (record, &t) in records.into_iter().zip(rates.times.iter()) {
            list.append(record?, t)?;
        }
        Ok(list)
    }
}
