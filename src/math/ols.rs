//! Dense linear least squares.
//!
//! Each Levenberg–Marquardt step solves a small, tall problem
//!
//! ```text
//! minimize ‖J δ + r‖² + λ ‖D δ‖²
//! ```
//!
//! which we write as one stacked system `[J; √λ D] δ = [-r; 0]` and hand to SVD.
//! The parameter dimension is tiny (4 columns for the circular Gaussian), so
//! SVD cost is negligible next to the residual evaluations, and it copes with
//! the rank-deficient Jacobians that appear when the bump is very flat.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve the damped step `[J; √λ D] δ = [-r; 0]`.
///
/// `scale` holds the diagonal of `D`.
pub fn solve_damped_step(
    jac: &DMatrix<f64>,
    residuals: &DVector<f64>,
    scale: &DVector<f64>,
    lambda: f64,
) -> Option<DVector<f64>> {
    let (m, p) = jac.shape();
    let mut a = DMatrix::<f64>::zeros(m + p, p);
    a.view_mut((0, 0), (m, p)).copy_from(jac);
    let sl = lambda.sqrt();
    for j in 0..p {
        a[(m + j, j)] = sl * scale[j];
    }

    let mut b = DVector::<f64>::zeros(m + p);
    for i in 0..m {
        b[i] = -residuals[i];
    }

    solve_least_squares(&a, &b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn zero_damping_is_gauss_newton_step() {
        // r = J x - y at x = 0, so the undamped step is the OLS solution.
        let jac = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let r = DVector::from_row_slice(&[-2.0, -5.0, -8.0]);
        let scale = DVector::from_element(2, 1.0);
        let step = solve_damped_step(&jac, &r, &scale, 0.0).unwrap();
        assert!((step[0] - 2.0).abs() < 1e-10);
        assert!((step[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn heavy_damping_shrinks_the_step() {
        let jac = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let r = DVector::from_row_slice(&[-2.0, -5.0, -8.0]);
        let scale = DVector::from_element(2, 1.0);
        let free = solve_damped_step(&jac, &r, &scale, 0.0).unwrap();
        let damped = solve_damped_step(&jac, &r, &scale, 1e6).unwrap();
        assert!(damped.norm() < 1e-3 * free.norm());
    }
}
