//! Circular Gaussian fit on the twisted torus.
//!
//! The bump model is fitted by nonlinear least squares. Under i.i.d. Gaussian
//! noise this is the maximum likelihood estimate; the noise precision and the
//! log-likelihood are derived from the residuals at the optimum:
//!
//! ```text
//! β      = 1 / mean(err²)
//! ln L   = -β/2 Σ err² + n/2 ln β - n/2 ln 2π - 5
//! ```
//!
//! The constant 5 accounts for the free quantities (A, μx, μy, σ and the noise
//! variance).

use std::f64::consts::PI;

use nalgebra::DMatrix;
use tracing::debug;

use crate::domain::{Err2, MLGaussianFit, SymmetricGaussianParams};
use crate::error::{FitError, FitResult};
use crate::math::{LmConfig, minimize, wrap};
use crate::models::{flatten_row_major, predict, snapshot_grid};

/// Number of free quantities charged against the likelihood.
const GAUSSIAN_AIC_CORRECTION: f64 = 5.0;

/// Fit a circular Gaussian to `sig_f` (rows = `y`, columns = `x`).
///
/// The torus dimensions are the snapshot's `(ncols, nrows)`. The `err2` field
/// of `init` is ignored.
pub fn fit_gaussian_tt(sig_f: &DMatrix<f64>, init: &SymmetricGaussianParams) -> FitResult<MLGaussianFit> {
    fit_gaussian_tt_with(sig_f, init, &LmConfig::default())
}

/// [`fit_gaussian_tt`] with explicit solver settings.
pub fn fit_gaussian_tt_with(
    sig_f: &DMatrix<f64>,
    init: &SymmetricGaussianParams,
    config: &LmConfig,
) -> FitResult<MLGaussianFit> {
    check_snapshot(sig_f)?;

    let observed = flatten_row_major(sig_f);
    let (sheet, points) = snapshot_grid(sig_f);
    let dim = sheet.as_f64();

    // x = [A, mu_x, mu_y, sigma]
    let residuals = |x: &[f64]| -> Vec<f64> {
        let params = SymmetricGaussianParams::new(x[0], x[1], x[2], x[3], None);
        predict(&params, &points, dim)
            .into_iter()
            .zip(observed.iter())
            .map(|(model, &obs)| model - obs)
            .collect()
    };

    let x0 = [init.amplitude, init.mu_x, init.mu_y, init.sigma];
    let report = minimize(residuals, &x0, config)?;
    debug!(
        termination = ?report.termination,
        evaluations = report.evaluations,
        iterations = report.iterations,
        cost = report.cost,
        "gaussian fit finished"
    );

    let err2: Vec<f64> = report.residuals.iter().map(|r| r * r).collect();
    let (ln_lh, lh_precision) = gaussian_log_likelihood(&err2);

    Ok(MLGaussianFit {
        amplitude: report.params[0],
        mu_x: wrap(report.params[1], dim.x),
        mu_y: wrap(report.params[2], dim.y),
        sigma: report.params[3],
        err2: Err2::PerCell(err2),
        ln_lh,
        lh_precision,
    })
}

/// Snapshots must have cells and every rate must be finite.
fn check_snapshot(sig: &DMatrix<f64>) -> FitResult<()> {
    if sig.is_empty() {
        return Err(FitError::EmptyInput("firing rate snapshot has no cells"));
    }
    if let Some(idx) = sig.iter().position(|v| !v.is_finite()) {
        let (row, col) = (idx % sig.nrows(), idx / sig.nrows());
        return Err(FitError::InvalidInput(format!(
            "non-finite firing rate {} at row {row}, column {col}",
            sig[(row, col)]
        )));
    }
    Ok(())
}

/// Log-likelihood and noise precision from per-cell squared residuals.
///
/// A perfect fit (all residuals zero) has infinite precision and infinite
/// likelihood.
fn gaussian_log_likelihood(err2: &[f64]) -> (f64, f64) {
    let n = err2.len() as f64;
    let sum: f64 = err2.iter().sum();
    let mean = sum / n;
    if mean == 0.0 {
        return (f64::INFINITY, f64::INFINITY);
    }

    let beta = 1.0 / mean;
    let ln_lh = -beta / 2.0 * sum + n / 2.0 * beta.ln() - n / 2.0 * (2.0 * PI).ln() - GAUSSIAN_AIC_CORRECTION;
    (ln_lh, beta)
}

/// Initial guess for a bump: the snapshot maximum (row-major scan, first
/// occurrence wins), its value, and a quarter of the larger sheet side as width.
pub fn bump_initial_guess(sig: &DMatrix<f64>) -> FitResult<SymmetricGaussianParams> {
    check_snapshot(sig)?;

    let (mut best_row, mut best_col) = (0, 0);
    let mut best = sig[(0, 0)];
    for row in 0..sig.nrows() {
        for col in 0..sig.ncols() {
            let v = sig[(row, col)];
            if v > best {
                best = v;
                best_row = row;
                best_col = col;
            }
        }
    }

    let sigma0 = sig.nrows().max(sig.ncols()) as f64 / 4.0;
    Ok(SymmetricGaussianParams::new(
        best,
        best_col as f64,
        best_row as f64,
        sigma0,
        None,
    ))
}

/// Fit a circular Gaussian to a (potential) firing rate bump, starting at the
/// maximum of `sig`.
pub fn fit_gaussian_bump_tt(sig: &DMatrix<f64>) -> FitResult<MLGaussianFit> {
    let init = bump_initial_guess(sig)?;
    fit_gaussian_tt(sig, &init)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Pair2D;
    use crate::math::twisted_torus_distance_point;
    use crate::models::render_bump;

    const SHEET: Pair2D<usize> = Pair2D::new(20, 16);

    #[test]
    fn recovers_perfect_bump() {
        let truth = SymmetricGaussianParams::new(10.0, 7.3, 5.6, 2.5, None);
        let sig = render_bump(&truth, SHEET);

        let fit = fit_gaussian_bump_tt(&sig).unwrap();
        assert!((fit.amplitude.abs() - 10.0).abs() < 1e-5, "{fit:?}");
        assert!((fit.mu_x - 7.3).abs() < 1e-5, "{fit:?}");
        assert!((fit.mu_y - 5.6).abs() < 1e-5, "{fit:?}");
        assert!((fit.sigma.abs() - 2.5).abs() < 1e-5, "{fit:?}");

        let cells = fit.err2.per_cell().unwrap();
        assert_eq!(cells.len(), SHEET.area());
        assert!(cells.iter().all(|e| *e < 1e-10));
        assert!(fit.lh_precision > 1e10);
    }

    #[test]
    fn centre_is_wrapped_into_sheet() {
        // True centre given outside the sheet; equivalent to (19.5, 15.6).
        let truth = SymmetricGaussianParams::new(4.0, -0.5, -0.4, 2.0, None);
        let sig = render_bump(&truth, SHEET);
        // Initial guess two sheets away; wraps to (19.2, 15.3).
        let init = SymmetricGaussianParams::new(3.0, 39.2, 31.3, 3.0, None);

        let fit = fit_gaussian_tt(&sig, &init).unwrap();
        assert!((0.0..20.0).contains(&fit.mu_x), "{fit:?}");
        assert!((0.0..16.0).contains(&fit.mu_y), "{fit:?}");

        let d = twisted_torus_distance_point(
            Pair2D::new(fit.mu_x, fit.mu_y),
            Pair2D::new(19.5, 15.6),
            SHEET.as_f64(),
        );
        assert!(d < 1e-4, "{fit:?}");
    }

    #[test]
    fn initial_guess_uses_first_row_major_maximum() {
        let sig = DMatrix::from_row_slice(
            3,
            4,
            &[
                0.0, 1.0, 2.0, 0.0, //
                0.0, 5.0, 0.0, 5.0, //
                5.0, 0.0, 0.0, 0.0,
            ],
        );
        let guess = bump_initial_guess(&sig).unwrap();
        assert_eq!(guess.mu_x, 1.0);
        assert_eq!(guess.mu_y, 1.0);
        assert_eq!(guess.amplitude, 5.0);
        assert_eq!(guess.sigma, 1.0);
        assert!(guess.err2.is_none());
    }

    #[test]
    fn flat_zero_snapshot_has_infinite_precision() {
        let sig = DMatrix::<f64>::zeros(6, 8);
        let fit = fit_gaussian_bump_tt(&sig).unwrap();
        assert_eq!(fit.lh_precision, f64::INFINITY);
        assert_eq!(fit.ln_lh, f64::INFINITY);
        assert_eq!(fit.err2.total(), 0.0);
    }

    #[test]
    fn log_likelihood_matches_closed_form() {
        let err2 = [0.5, 1.5, 1.0, 1.0];
        let (ln_lh, beta) = gaussian_log_likelihood(&err2);
        assert!((beta - 1.0).abs() < 1e-15);
        let expected = -0.5 * 4.0 + 0.0 - 2.0 * (2.0 * PI).ln() - 5.0;
        assert!((ln_lh - expected).abs() < 1e-12);
    }

    #[test]
    fn empty_snapshot_is_rejected() {
        let sig = DMatrix::<f64>::zeros(0, 0);
        assert_eq!(
            fit_gaussian_bump_tt(&sig).unwrap_err(),
            FitError::EmptyInput("firing rate snapshot has no cells")
        );
    }

    #[test]
    fn solver_budget_exhaustion_is_an_error() {
        let truth = SymmetricGaussianParams::new(10.0, 7.3, 5.6, 2.5, None);
        let sig = render_bump(&truth, SHEET);
        let init = SymmetricGaussianParams::new(1.0, 2.0, 2.0, 6.0, None);
        let config = LmConfig {
            max_evaluations: Some(6),
            ..LmConfig::default()
        };
        let err = fit_gaussian_tt_with(&sig, &init, &config).unwrap_err();
        assert!(matches!(err, FitError::SolverNonConvergence { .. }));
    }

    #[test]
    fn non_finite_snapshot_is_rejected() {
        let mut sig = render_bump(&SymmetricGaussianParams::new(3.0, 4.0, 4.0, 2.0, None), SHEET);
        sig[(2, 5)] = f64::NAN;

        let err = bump_initial_guess(&sig).unwrap_err();
        assert!(matches!(&err, FitError::InvalidInput(msg) if msg.contains("row 2, column 5")), "{err:?}");
        assert!(matches!(fit_gaussian_bump_tt(&sig), Err(FitError::InvalidInput(_))));

        sig[(2, 5)] = f64::INFINITY;
        let init = SymmetricGaussianParams::new(3.0, 4.0, 4.0, 2.0, None);
        assert!(matches!(fit_gaussian_tt(&sig, &init), Err(FitError::InvalidInput(_))));
    }
}
