//! Spike trains of a neural sheet and their sliding firing rate.

use nalgebra::DMatrix;
use tracing::debug;

use crate::domain::Pair2D;
use crate::error::{FitError, FitResult};

/// A sequence of firing rate snapshots with one timestamp each.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlidingRates {
    /// `Ny × Nx` matrices (rows are `y`).
    pub snapshots: Vec<DMatrix<f64>>,
    pub times: Vec<f64>,
}

impl SlidingRates {
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Anything that can produce sliding-window firing rate snapshots of a sheet.
pub trait SlidingRateSource {
    /// Sheet dimensions `(Nx, Ny)`.
    fn sheet_size(&self) -> Pair2D<usize>;

    /// Snapshots of windows of length `win_len`, starting every `dt` from
    /// `tstart`, for as long as a whole window fits before `tend`.
    fn sliding_firing_rate(&self, tstart: f64, tend: f64, dt: f64, win_len: f64) -> FitResult<SlidingRates>;
}

/// Spikes of neurons laid out row by row on an `Nx × Ny` sheet.
///
/// Neuron `i` sits at `(i mod Nx, i div Nx)`.
#[derive(Debug, Clone)]
pub struct TorusSpikes {
    sheet: Pair2D<usize>,
    // (time, sender), sorted by time.
    spikes: Vec<(f64, usize)>,
}

impl TorusSpikes {
    pub fn new(senders: Vec<usize>, times: Vec<f64>, sheet: Pair2D<usize>) -> FitResult<Self> {
        if senders.len() != times.len() {
            return Err(FitError::InconsistentLengths {
                context: "TorusSpikes",
                lengths: vec![senders.len(), times.len()],
            });
        }
        if sheet.area() == 0 {
            return Err(FitError::InvalidInput(format!(
                "sheet size must be non-zero, got {}x{}",
                sheet.x, sheet.y
            )));
        }
        let neurons = sheet.area();
        if let Some(&bad) = senders.iter().find(|&&s| s >= neurons) {
            return Err(FitError::InvalidInput(format!(
                "sender {bad} outside a sheet of {neurons} neurons"
            )));
        }
        if let Some(&bad) = times.iter().find(|t| !t.is_finite()) {
            return Err(FitError::InvalidInput(format!("spike time {bad} is not finite")));
        }

        let mut spikes: Vec<(f64, usize)> = times.into_iter().zip(senders).collect();
        spikes.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(Self { sheet, spikes })
    }

    pub fn len(&self) -> usize {
        self.spikes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spikes.is_empty()
    }

    /// Earliest and latest spike time.
    pub fn time_span(&self) -> Option<(f64, f64)> {
        let first = self.spikes.first()?.0;
        let last = self.spikes.last()?.0;
        Some((first, last))
    }

    /// Firing rate of every neuron in `[start, end)`.
    fn window_rate(&self, start: f64, end: f64, win_len: f64) -> DMatrix<f64> {
        let lo = self.spikes.partition_point(|s| s.0 < start);
        let hi = self.spikes.partition_point(|s| s.0 < end);

        let mut counts = DMatrix::<f64>::zeros(self.sheet.y, self.sheet.x);
        for &(_, sender) in &self.spikes[lo..hi] {
            counts[(sender / self.sheet.x, sender % self.sheet.x)] += 1.0;
        }
        counts / win_len
    }
}

fn validate_windows(tstart: f64, tend: f64, dt: f64, win_len: f64) -> FitResult<()> {
    if !(tstart.is_finite() && tend.is_finite() && dt.is_finite() && win_len.is_finite()) {
        return Err(FitError::InvalidInput("window parameters must be finite".into()));
    }
    if dt <= 0.0 {
        return Err(FitError::InvalidInput(format!("dt must be > 0, got {dt}")));
    }
    if win_len <= 0.0 {
        return Err(FitError::InvalidInput(format!("win_len must be > 0, got {win_len}")));
    }
    if tend <= tstart {
        return Err(FitError::InvalidInput(format!(
            "tend ({tend}) must be after tstart ({tstart})"
        )));
    }
    Ok(())
}

/// Start times of the windows that fit in `[tstart, tend]`.
pub fn window_starts(tstart: f64, tend: f64, dt: f64, win_len: f64) -> FitResult<Vec<f64>> {
    validate_windows(tstart, tend, dt, win_len)?;

    let tol = 1e-9 * dt;
    let mut starts = Vec::new();
    let mut k = 0usize;
    loop {
        let s = tstart + k as f64 * dt;
        if s + win_len > tend + tol {
            break;
        }
        starts.push(s);
        k += 1;
    }
    Ok(starts)
}

impl SlidingRateSource for TorusSpikes {
    fn sheet_size(&self) -> Pair2D<usize> {
        self.sheet
    }

    fn sliding_firing_rate(&self, tstart: f64, tend: f64, dt: f64, win_len: f64) -> FitResult<SlidingRates> {
        let starts = window_starts(tstart, tend, dt, win_len)?;
        debug!(windows = starts.len(), spikes = self.spikes.len(), "sliding firing rate");

        let mut rates = SlidingRates {
            snapshots: Vec::with_capacity(starts.len()),
            times: Vec::with_capacity(starts.len()),
        };
        for s in starts {
            let end = s + win_len;
            rates.snapshots.push(self.window_rate(s, end, win_len));
            rates.times.push(end);
        }
        Ok(rates)
    }
}
