//! Circular Gaussian bump on the twisted torus.
//!
//! ```text
//! f(X) = |A| exp(-d(X, μ)² / (2σ²))
//! ```
//!
//! where `d` is the twisted-torus distance. The fitter and the synthetic data
//! generator both evaluate the model through this module so they agree on the
//! geometry.

use nalgebra::DMatrix;

use crate::domain::{Pair2D, SymmetricGaussianParams};
use crate::math::{grid_points, twisted_torus_distance, twisted_torus_distance_point};

/// Value of the bump at distance `dist` from its centre.
pub fn gaussian_profile(amplitude: f64, sigma: f64, dist: f64) -> f64 {
    amplitude.abs() * (-(dist * dist) / 2.0 / (sigma * sigma)).exp()
}

/// Evaluate the bump at the given points (flattened order of `points`).
pub fn predict(params: &SymmetricGaussianParams, points: &[Pair2D<f64>], dim: Pair2D<f64>) -> Vec<f64> {
    let centre = Pair2D::new(params.mu_x, params.mu_y);
    twisted_torus_distance(centre, points, dim)
        .into_iter()
        .map(|d| gaussian_profile(params.amplitude, params.sigma, d))
        .collect()
}

/// Render the bump as an `Ny × Nx` snapshot (rows are `y`).
pub fn render_bump(params: &SymmetricGaussianParams, sheet: Pair2D<usize>) -> DMatrix<f64> {
    let dim = sheet.as_f64();
    let centre = Pair2D::new(params.mu_x, params.mu_y);
    DMatrix::from_fn(sheet.y, sheet.x, |row, col| {
        let d = twisted_torus_distance_point(centre, Pair2D::new(col as f64, row as f64), dim);
        gaussian_profile(params.amplitude, params.sigma, d)
    })
}

/// Flatten a snapshot row-major, matching [`grid_points`].
pub fn flatten_row_major(sig: &DMatrix<f64>) -> Vec<f64> {
    // nalgebra stores column-major; the transpose's storage is row-major.
    sig.transpose().as_slice().to_vec()
}

/// Grid coordinates of a snapshot, in the order of [`flatten_row_major`].
pub fn snapshot_grid(sig: &DMatrix<f64>) -> (Pair2D<usize>, Vec<Pair2D<f64>>) {
    let sheet = Pair2D::new(sig.ncols(), sig.nrows());
    (sheet, grid_points(sheet))
}
