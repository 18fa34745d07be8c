//! Uniform (non-spatial) maximum likelihood fit.
//!
//! Models every sample as `mu + noise` with i.i.d. Gaussian noise. The MLE is
//! closed form: sample mean and population variance (divisor `n`).

use std::f64::consts::PI;

use nalgebra::DMatrix;

use crate::domain::{Err2, MLFit};
use crate::error::{FitError, FitResult};

/// Number of free quantities charged against the likelihood (mean, variance).
const UNIFORM_AIC_CORRECTION: f64 = 2.0;

/// Fit a constant under Gaussian noise to `sig`.
///
/// If all samples are equal the variance is 0 and the log-likelihood is
/// `+∞` (a perfect, degenerate fit).
pub fn fit_maximum_lh(sig: &[f64]) -> FitResult<MLFit> {
    if sig.is_empty() {
        return Err(FitError::EmptyInput("no samples for the uniform fit"));
    }

    let n = sig.len() as f64;
    let mu = sig.iter().sum::<f64>() / n;
    let err2: Vec<f64> = sig.iter().map(|v| (v - mu) * (v - mu)).collect();
    let sum_err2: f64 = err2.iter().sum();
    let sigma2 = sum_err2 / n;

    let ln_lh = if sigma2 == 0.0 {
        f64::INFINITY
    } else {
        -0.5 / sigma2 * sum_err2 - 0.5 * n * sigma2.ln() - 0.5 * n * (2.0 * PI).ln() - UNIFORM_AIC_CORRECTION
    };

    Ok(MLFit {
        mu,
        sigma2,
        ln_lh,
        err2: Err2::PerCell(err2),
    })
}

/// [`fit_maximum_lh`] on a firing rate snapshot, flattened.
pub fn fit_maximum_lh_snapshot(sig: &DMatrix<f64>) -> FitResult<MLFit> {
    // The statistics do not depend on sample order, but keep row-major order
    // so `err2` lines up with the Gaussian fit's cells.
    fit_maximum_lh(&crate::models::flatten_row_major(sig))
}
