//! Levenberg–Marquardt nonlinear least squares.
//!
//! Minimizes `Σ r_i(x)²` for a residual function with no analytic Jacobian.
//! The Jacobian is approximated by forward differences, each step solves the
//! damped linear problem with [`solve_damped_step`], and the damping follows
//! Nielsen's gain-ratio update.
//!
//! Termination mirrors the classic MINPACK tests:
//! - relative cost reduction (actual and predicted) below `ftol`
//! - relative step length below `xtol`
//! - gradient infinity norm below `gtol`
//!
//! Running out of residual evaluations is reported as non-convergence.

use nalgebra::{DMatrix, DVector};

use crate::error::{FitError, FitResult};
use crate::math::solve_damped_step;

/// `sqrt(f64::EPSILON)`, the default tolerance and difference step.
const SQRT_EPS: f64 = 1.490_116_119_384_765_6e-8;

/// Consecutive failed linear solves before giving up.
const MAX_SOLVE_FAILURES: usize = 32;

/// Solver settings.
#[derive(Debug, Clone)]
pub struct LmConfig {
    /// Budget of residual evaluations. `None` means `200 * (n_params + 1)`.
    pub max_evaluations: Option<usize>,
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_evaluations: None,
            ftol: SQRT_EPS,
            xtol: SQRT_EPS,
            gtol: 0.0,
        }
    }
}

/// Why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Cost reduction fell below `ftol`.
    CostReduction,
    /// Step length fell below `xtol`.
    StepSize,
    /// Gradient fell below `gtol`.
    Gradient,
    /// Residuals are exactly zero.
    ExactFit,
}

/// Solver output.
#[derive(Debug, Clone)]
pub struct LmReport {
    pub params: Vec<f64>,
    /// Residuals at `params`.
    pub residuals: Vec<f64>,
    /// Sum of squared residuals at `params`.
    pub cost: f64,
    pub evaluations: usize,
    pub iterations: usize,
    pub termination: Termination,
}

struct Counter<F> {
    f: F,
    evaluations: usize,
}

impl<F> Counter<F>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    fn eval(&mut self, x: &DVector<f64>) -> DVector<f64> {
        self.evaluations += 1;
        DVector::from_vec((self.f)(x.as_slice()))
    }
}

/// Minimize the sum of squared residuals starting from `x0`.
pub fn minimize<F>(residual_fn: F, x0: &[f64], config: &LmConfig) -> FitResult<LmReport>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let p = x0.len();
    if p == 0 {
        return Err(FitError::InvalidInput("no parameters to optimize".into()));
    }
    let max_evaluations = config.max_evaluations.unwrap_or(200 * (p + 1));

    let mut f = Counter {
        f: residual_fn,
        evaluations: 0,
    };

    let mut x = DVector::from_column_slice(x0);
    let mut r = f.eval(&x);
    let m = r.len();
    if m < p {
        return Err(FitError::InvalidInput(format!(
            "{m} residuals cannot determine {p} parameters"
        )));
    }
    if !all_finite(&r) || !all_finite(&x) {
        return Err(FitError::SolverNonConvergence {
            reason: "non-finite residuals at the initial guess".into(),
            evaluations: f.evaluations,
        });
    }

    let mut cost = r.norm_squared();
    let mut scale = DVector::<f64>::zeros(p);
    let mut lambda: Option<f64> = None;
    let mut nu = 2.0;
    let mut iterations = 0;

    if cost == 0.0 {
        return finish(&x, &r, cost, f.evaluations, iterations, Termination::ExactFit);
    }

    loop {
        iterations += 1;
        let jac = forward_jacobian(&mut f, &x, &r);
        if jac.iter().any(|v| !v.is_finite()) {
            return Err(FitError::SolverNonConvergence {
                reason: "non-finite Jacobian".into(),
                evaluations: f.evaluations,
            });
        }

        let grad = jac.tr_mul(&r);
        if grad.amax() <= config.gtol {
            return finish(&x, &r, cost, f.evaluations, iterations, Termination::Gradient);
        }

        // Marquardt scaling: keep the largest column norm seen so far.
        for j in 0..p {
            let norm = jac.column(j).norm().max(1e-12);
            scale[j] = scale[j].max(norm);
        }
        let lam = lambda.get_or_insert_with(|| 1e-3 * scale.amax().powi(2));

        let mut solve_failures = 0;
        loop {
            if f.evaluations >= max_evaluations {
                return Err(FitError::SolverNonConvergence {
                    reason: format!("evaluation budget of {max_evaluations} exhausted"),
                    evaluations: f.evaluations,
                });
            }

            let Some(step) = solve_damped_step(&jac, &r, &scale, *lam) else {
                solve_failures += 1;
                if solve_failures > MAX_SOLVE_FAILURES {
                    return Err(FitError::SolverNonConvergence {
                        reason: "damped step could not be solved".into(),
                        evaluations: f.evaluations,
                    });
                }
                *lam *= nu;
                nu *= 2.0;
                continue;
            };

            let step_small = step.norm() <= config.xtol * (x.norm() + config.xtol);
            let x_new = &x + &step;
            let r_new = f.eval(&x_new);
            let cost_new = if all_finite(&r_new) {
                r_new.norm_squared()
            } else {
                f64::INFINITY
            };

            let predicted = cost - (&r + &jac * &step).norm_squared();
            let actual = cost - cost_new;
            let rho = if predicted > 0.0 { actual / predicted } else { -1.0 };

            if rho > 0.0 {
                let cost_old = cost;
                x = x_new;
                r = r_new;
                cost = cost_new;
                *lam *= (1.0_f64 / 3.0).max(1.0 - (2.0 * rho - 1.0).powi(3));
                nu = 2.0;

                if cost == 0.0 {
                    return finish(&x, &r, cost, f.evaluations, iterations, Termination::ExactFit);
                }
                if actual <= config.ftol * cost_old && predicted <= config.ftol * cost_old {
                    return finish(&x, &r, cost, f.evaluations, iterations, Termination::CostReduction);
                }
                if step_small {
                    return finish(&x, &r, cost, f.evaluations, iterations, Termination::StepSize);
                }
                break;
            }

            // Rejected: the current point already is as good as the linear model allows.
            if step_small {
                return finish(&x, &r, cost, f.evaluations, iterations, Termination::StepSize);
            }
            if predicted.abs() <= config.ftol * cost {
                return finish(&x, &r, cost, f.evaluations, iterations, Termination::CostReduction);
            }
            *lam *= nu;
            nu *= 2.0;
        }
    }
}

fn finish(
    x: &DVector<f64>,
    r: &DVector<f64>,
    cost: f64,
    evaluations: usize,
    iterations: usize,
    termination: Termination,
) -> FitResult<LmReport> {
    Ok(LmReport {
        params: x.iter().copied().collect(),
        residuals: r.iter().copied().collect(),
        cost,
        evaluations,
        iterations,
        termination,
    })
}

fn forward_jacobian<F>(f: &mut Counter<F>, x: &DVector<f64>, r: &DVector<f64>) -> DMatrix<f64>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let (m, p) = (r.len(), x.len());
    let mut jac = DMatrix::<f64>::zeros(m, p);
    let mut xh = x.clone();
    for j in 0..p {
        let h = if x[j] == 0.0 { SQRT_EPS } else { SQRT_EPS * x[j].abs() };
        xh[j] = x[j] + h;
        let rh = f.eval(&xh);
        // The realized step differs from `h` by rounding.
        let dh = xh[j] - x[j];
        for i in 0..m {
            jac[(i, j)] = (rh[i] - r[i]) / dh;
        }
        xh[j] = x[j];
    }
    jac
}

fn all_finite(v: &DVector<f64>) -> bool {
    v.iter().all(|x| x.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exp_decay(t: &[f64], y: &[f64]) -> impl Fn(&[f64]) -> Vec<f64> {
        let t = t.to_vec();
        let y = y.to_vec();
        move |p: &[f64]| {
            t.iter()
                .zip(y.iter())
                .map(|(&ti, &yi)| p[0] * (-p[1] * ti).exp() - yi)
                .collect()
        }
    }

    #[test]
    fn recovers_exponential_decay() {
        let t: Vec<f64> = (0..30).map(|i| i as f64 * 0.2).collect();
        let y: Vec<f64> = t.iter().map(|&ti| 3.0 * (-0.7 * ti).exp()).collect();

        let report = minimize(exp_decay(&t, &y), &[1.0, 0.1], &LmConfig::default()).unwrap();
        assert!((report.params[0] - 3.0).abs() < 1e-6, "{report:?}");
        assert!((report.params[1] - 0.7).abs() < 1e-6, "{report:?}");
        assert!(report.cost < 1e-12);
        assert_eq!(report.residuals.len(), t.len());
    }

    #[test]
    fn exact_start_terminates_immediately() {
        let t = [0.0f64, 1.0, 2.0];
        let y: Vec<f64> = t.iter().map(|&ti| 2.0 * (-0.5 * ti).exp()).collect();
        let report = minimize(exp_decay(&t, &y), &[2.0, 0.5], &LmConfig::default()).unwrap();
        assert_eq!(report.evaluations, 1);
        assert_eq!(report.termination, Termination::ExactFit);
    }

    #[test]
    fn tiny_budget_reports_non_convergence() {
        let t: Vec<f64> = (0..30).map(|i| i as f64 * 0.2).collect();
        let y: Vec<f64> = t.iter().map(|&ti| 3.0 * (-0.7 * ti).exp()).collect();
        let config = LmConfig {
            max_evaluations: Some(4),
            ..LmConfig::default()
        };
        let err = minimize(exp_decay(&t, &y), &[1.0, 0.1], &config).unwrap_err();
        assert!(matches!(err, FitError::SolverNonConvergence { .. }), "{err:?}");
    }

    #[test]
    fn non_finite_start_is_rejected() {
        let err = minimize(|p: &[f64]| vec![p[0].ln(), 1.0], &[-1.0], &LmConfig::default())
            .unwrap_err();
        assert!(matches!(err, FitError::SolverNonConvergence { .. }));
    }

    #[test]
    fn underdetermined_problem_is_invalid() {
        let err = minimize(|p: &[f64]| vec![p[0] + p[1]], &[0.0, 0.0], &LmConfig::default())
            .unwrap_err();
        assert!(matches!(err, FitError::InvalidInput(_)));
    }
}
