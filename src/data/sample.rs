//! Synthetic spike trains of a drifting activity bump.
//!
//! Every neuron is an inhomogeneous Poisson process with rate
//!
//! ```text
//! r(t) = background + peak * exp(-d(X, c(t))² / (2σ²))
//! c(t) = start + velocity * t      (wrapped on the twisted torus)
//! ```
//!
//! Spike counts are drawn per integration step of length `sim_dt`, and each
//! spike gets a uniform time inside its step.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Poisson;
use tracing::debug;

use crate::domain::{Pair2D, SampleConfig};
use crate::error::{FitError, FitResult};
use crate::math::{twisted_torus_distance_point, wrap};
use crate::models::gaussian_profile;
use crate::population::TorusSpikes;

/// Bump centre at time `t`, inside `[0, Nx) × [0, Ny)`.
pub fn bump_centre(config: &SampleConfig, t: f64) -> Pair2D<f64> {
    let dim = config.sheet.as_f64();
    Pair2D::new(
        wrap(config.start.x + config.velocity.x * t, dim.x),
        wrap(config.start.y + config.velocity.y * t, dim.y),
    )
}

fn validate(config: &SampleConfig) -> FitResult<()> {
    if config.sheet.area() == 0 {
        return Err(FitError::InvalidInput("sheet size must be non-zero".into()));
    }
    if !(config.duration.is_finite() && config.duration > 0.0) {
        return Err(FitError::InvalidInput("duration must be > 0".into()));
    }
    if !(config.sim_dt.is_finite() && config.sim_dt > 0.0 && config.sim_dt <= config.duration) {
        return Err(FitError::InvalidInput("sim_dt must be in (0, duration]".into()));
    }
    if !(config.sigma.is_finite() && config.sigma > 0.0) {
        return Err(FitError::InvalidInput("bump sigma must be > 0".into()));
    }
    let rates_ok = [config.peak_rate, config.background_rate]
        .iter()
        .all(|r| r.is_finite() && *r >= 0.0);
    if !rates_ok {
        return Err(FitError::InvalidInput("firing rates must be finite and >= 0".into()));
    }
    let motion_ok = [config.start.x, config.start.y, config.velocity.x, config.velocity.y]
        .iter()
        .all(|v| v.is_finite());
    if !motion_ok {
        return Err(FitError::InvalidInput("bump start and velocity must be finite".into()));
    }
    Ok(())
}

/// Draw spikes of a single drifting bump over `[0, duration)`.
pub fn generate_bump_spikes(config: &SampleConfig) -> FitResult<TorusSpikes> {
    validate(config)?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let dim = config.sheet.as_f64();
    let steps = (config.duration / config.sim_dt).floor() as usize;

    let mut senders = Vec::new();
    let mut times = Vec::new();

    for step in 0..steps {
        let t0 = step as f64 * config.sim_dt;
        let centre = bump_centre(config, t0 + 0.5 * config.sim_dt);

        for neuron in 0..config.sheet.area() {
            let pos = Pair2D::new(
                (neuron % config.sheet.x) as f64,
                (neuron / config.sheet.x) as f64,
            );
            let d = twisted_torus_distance_point(centre, pos, dim);
            let rate = config.background_rate + gaussian_profile(config.peak_rate, config.sigma, d);
            let lambda = rate * config.sim_dt;
            if lambda <= 0.0 {
                continue;
            }

            let poisson = Poisson::new(lambda)
                .map_err(|e| FitError::InvalidInput(format!("spike count distribution error: {e}")))?;
            let count = poisson.sample(&mut rng) as usize;
            for _ in 0..count {
                senders.push(neuron);
                times.push(t0 + rng.gen_range(0.0..config.sim_dt));
            }
        }
    }

    debug!(
        spikes = senders.len(),
        neurons = config.sheet.area(),
        steps,
        seed = config.seed,
        "generated synthetic bump spikes"
    );
    TorusSpikes::new(senders, times, config.sheet)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> SampleConfig {
        SampleConfig {
            sheet: Pair2D::new(12, 10),
            duration: 0.5,
            start: Pair2D::new(3.0, 4.0),
            velocity: Pair2D::new(10.0, 0.0),
            sigma: 1.5,
            peak_rate: 200.0,
            background_rate: 2.0,
            sim_dt: 0.005,
            seed: 7,
        }
    }

    #[test]
    fn centre_moves_and_wraps() {
        let cfg = small();
        assert_eq!(bump_centre(&cfg, 0.0), Pair2D::new(3.0, 4.0));
        let c = bump_centre(&cfg, 1.0);
        assert!((c.x - 1.0).abs() < 1e-12);
        assert_eq!(c.y, 4.0);
    }

    #[test]
    fn same_seed_same_spikes() {
        let a = generate_bump_spikes(&small()).unwrap();
        let b = generate_bump_spikes(&small()).unwrap();
        assert_eq!(a.len(), b.len());
        assert!(!a.is_empty());
        assert_eq!(a.time_span(), b.time_span());

        let (first, last) = a.time_span().unwrap();
        assert!(first >= 0.0 && last < 0.5);
    }

    #[test]
    fn silent_population_has_no_spikes() {
        let cfg = SampleConfig {
            peak_rate: 0.0,
            background_rate: 0.0,
            ..small()
        };
        assert!(generate_bump_spikes(&cfg).unwrap().is_empty());
    }

    #[test]
    fn invalid_settings_are_rejected() {
        for cfg in [
            SampleConfig { sim_dt: 0.0, ..small() },
            SampleConfig { sigma: -1.0, ..small() },
            SampleConfig { duration: f64::NAN, ..small() },
            SampleConfig { peak_rate: -5.0, ..small() },
            SampleConfig { sheet: Pair2D::new(0, 3), ..small() },
        ] {
            assert!(matches!(generate_bump_spikes(&cfg), Err(FitError::InvalidInput(_))));
        }
    }
}
