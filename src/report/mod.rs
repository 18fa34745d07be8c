//! Reporting utilities: track statistics and likelihood rankings.

pub mod format;

pub use format::*;

use crate::domain::{FitKind, Pair2D};
use crate::fit::FitTrack;
use crate::math::twisted_torus_distance_point;

/// Aggregate statistics of a tracking run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSummary {
    pub kind: FitKind,
    pub windows: usize,
    /// First and last window end time.
    pub time_range: Option<(f64, f64)>,
    /// Mean log-likelihood over windows with a finite value.
    pub mean_ln_lh: Option<f64>,
    /// Windows whose likelihood is infinite (perfect fits).
    pub perfect_fits: usize,
    /// Sum of twisted-torus distances between consecutive bump centres.
    pub path_length: Option<f64>,
    /// `path_length` divided by the elapsed time.
    pub mean_speed: Option<f64>,
}

/// Windows ordered by log-likelihood (top-N each side).
#[derive(Debug, Clone, PartialEq)]
pub struct LikelihoodRanking {
    /// Indices of the most likely windows, best first.
    pub best: Vec<usize>,
    /// Indices of the least likely windows, worst first.
    pub worst: Vec<usize>,
}

pub fn summarize(track: &FitTrack, sheet: Pair2D<usize>) -> TrackSummary {
    let times = track.times();
    let time_range = match (times.first(), times.last()) {
        (Some(&a), Some(&b)) => Some((a, b)),
        _ => None,
    };

    let finite: Vec<f64> = track.ln_lh().iter().copied().filter(|v| v.is_finite()).collect();
    let mean_ln_lh = if finite.is_empty() {
        None
    } else {
        Some(finite.iter().sum::<f64>() / finite.len() as f64)
    };
    let perfect_fits = track.ln_lh().iter().filter(|v| **v == f64::INFINITY).count();

    let path_length = match track {
        FitTrack::Gaussian(list) if list.len() >= 2 => {
            let dim = sheet.as_f64();
            let centres: Vec<Pair2D<f64>> = list
                .mu_x()
                .iter()
                .zip(list.mu_y())
                .map(|(&x, &y)| Pair2D::new(x, y))
                .collect();
            Some(
                centres
                    .windows(2)
                    .map(|w| twisted_torus_distance_point(w[0], w[1], dim))
                    .sum::<f64>(),
            )
        }
        _ => None,
    };
    let mean_speed = match (path_length, time_range) {
        (Some(len), Some((a, b))) if b > a => Some(len / (b - a)),
        _ => None,
    };

    TrackSummary {
        kind: track.kind(),
        windows: track.len(),
        time_range,
        mean_ln_lh,
        perfect_fits,
        path_length,
        mean_speed,
    }
}

/// Rank windows by log-likelihood. NaN values are never ranked.
pub fn rank_windows(track: &FitTrack, top_n: usize) -> LikelihoodRanking {
    let ln_lh = track.ln_lh();
    let mut order: Vec<usize> = (0..ln_lh.len()).filter(|&k| !ln_lh[k].is_nan()).collect();
    // Stable sort: ties keep time order.
    order.sort_by(|&a, &b| ln_lh[b].total_cmp(&ln_lh[a]));

    let best = order.iter().take(top_n).copied().collect();
    let worst = order.iter().rev().take(top_n).copied().collect();

    LikelihoodRanking { best, worst }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Err2, MLFit, MLGaussianFit};
    use crate::fit::{MLFitList, MLGaussianFitList};

    fn gaussian_track(centres: &[(f64, f64)], ln_lh: &[f64]) -> FitTrack {
        let mut list = MLGaussianFitList::new();
        for (k, (&(x, y), &lh)) in centres.iter().zip(ln_lh).enumerate() {
            list.push(
                MLGaussianFit {
                    amplitude: 5.0,
                    mu_x: x,
                    mu_y: y,
                    sigma: 2.0,
                    err2: Err2::Total(1.0),
                    ln_lh: lh,
                    lh_precision: 1.0,
                },
                1.0 + k as f64,
            );
        }
        FitTrack::Gaussian(list)
    }

    #[test]
    fn summary_of_a_wrapping_path() {
        // On a 10x10 sheet, 9.5 -> 0.5 is one cell across the x seam.
        let track = gaussian_track(&[(8.5, 3.0), (9.5, 3.0), (0.5, 3.0)], &[-10.0, f64::INFINITY, -20.0]);
        let s = summarize(&track, Pair2D::new(10, 10));

        assert_eq!(s.kind, FitKind::Gaussian);
        assert_eq!(s.windows, 3);
        assert_eq!(s.time_range, Some((1.0, 3.0)));
        assert_eq!(s.mean_ln_lh, Some(-15.0));
        assert_eq!(s.perfect_fits, 1);
        assert!((s.path_length.unwrap() - 2.0).abs() < 1e-12);
        assert!((s.mean_speed.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn uniform_track_has_no_path() {
        let mut list = MLFitList::new();
        list.push(
            MLFit {
                mu: 1.0,
                sigma2: 1.0,
                ln_lh: -4.0,
                err2: Err2::Total(3.0),
            },
            0.5,
        );
        let s = summarize(&FitTrack::Uniform(list), Pair2D::new(4, 4));
        assert_eq!(s.windows, 1);
        assert_eq!(s.path_length, None);
        assert_eq!(s.mean_speed, None);
    }

    #[test]
    fn ranking_orders_by_likelihood() {
        let track = gaussian_track(
            &[(1.0, 1.0), (2.0, 1.0), (3.0, 1.0), (4.0, 1.0)],
            &[-5.0, f64::NAN, -1.0, -9.0],
        );
        let r = rank_windows(&track, 2);
        assert_eq!(r.best, vec![2, 0]);
        assert_eq!(r.worst, vec![3, 0]);
    }
}
