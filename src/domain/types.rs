//! Shared domain types.
//!
//! Fit records are plain values: they are produced once per snapshot, copied
//! into result lists and never mutated afterwards (except for collapsing the
//! residual vector to its sum, which the orchestrator may do before storing).

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// An `(x, y)` pair: sheet dimensions, torus dimensions or a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pair2D<T> {
    pub x: T,
    pub y: T,
}

impl<T> Pair2D<T> {
    pub const fn new(x: T, y: T) -> Self {
        Self { x, y }
    }
}

impl Pair2D<usize> {
    /// Number of cells on a sheet of this size.
    pub fn area(self) -> usize {
        self.x * self.y
    }

    /// Real-valued copy, used as torus dimensions by the distance metric.
    pub fn as_f64(self) -> Pair2D<f64> {
        Pair2D::new(self.x as f64, self.y as f64)
    }
}

/// Squared residuals of a fit.
///
/// Long runs keep only the sum per window to bound memory growth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Err2 {
    /// One squared residual per grid cell (row-major) or per sample.
    PerCell(Vec<f64>),
    /// Sum of the squared residuals.
    Total(f64),
}

impl Err2 {
    /// Sum of squared residuals.
    pub fn total(&self) -> f64 {
        match self {
            Err2::PerCell(v) => v.iter().sum(),
            Err2::Total(s) => *s,
        }
    }

    /// Replace a per-cell vector by its sum.
    pub fn collapse(self) -> Self {
        match self {
            Err2::PerCell(v) => Err2::Total(v.iter().sum()),
            total => total,
        }
    }

    pub fn per_cell(&self) -> Option<&[f64]> {
        match self {
            Err2::PerCell(v) => Some(v),
            Err2::Total(_) => None,
        }
    }
}

/// Parameters of a circular Gaussian on the sheet.
///
/// When used as an initial guess, `err2` is ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetricGaussianParams {
    pub amplitude: f64,
    pub mu_x: f64,
    pub mu_y: f64,
    pub sigma: f64,
    pub err2: Option<Err2>,
}

impl SymmetricGaussianParams {
    pub fn new(amplitude: f64, mu_x: f64, mu_y: f64, sigma: f64, err2: Option<Err2>) -> Self {
        Self {
            amplitude,
            mu_x,
            mu_y,
            sigma,
            err2,
        }
    }
}

/// Circular Gaussian fitted with the maximum likelihood estimator.
///
/// `amplitude` is the signed solver output even though the model uses `|A|`.
/// `lh_precision` is the inverse variance of the *noise*, not of the bump.
#[derive(Debug, Clone, PartialEq)]
pub struct MLGaussianFit {
    pub amplitude: f64,
    pub mu_x: f64,
    pub mu_y: f64,
    pub sigma: f64,
    pub err2: Err2,
    pub ln_lh: f64,
    pub lh_precision: f64,
}

/// Maximum likelihood fit of a constant under Gaussian noise.
#[derive(Debug, Clone, PartialEq)]
pub struct MLFit {
    pub mu: f64,
    pub sigma2: f64,
    pub ln_lh: f64,
    pub err2: Err2,
}

/// A single-window fit result whose kind is only known at run time.
#[derive(Debug, Clone, PartialEq)]
pub enum FitRecord {
    Gaussian(MLGaussianFit),
    Uniform(MLFit),
}

impl FitRecord {
    pub fn kind_name(&self) -> &'static str {
        match self {
            FitRecord::Gaussian(_) => "MLGaussianFit",
            FitRecord::Uniform(_) => "MLFit",
        }
    }

    /// Collapse the stored residuals to their sum.
    pub fn collapse_err2(self) -> Self {
        match self {
            FitRecord::Gaussian(mut fit) => {
                fit.err2 = fit.err2.collapse();
                FitRecord::Gaussian(fit)
            }
            FitRecord::Uniform(mut fit) => {
                fit.err2 = fit.err2.collapse();
                FitRecord::Uniform(fit)
            }
        }
    }
}

impl From<MLGaussianFit> for FitRecord {
    fn from(value: MLGaussianFit) -> Self {
        FitRecord::Gaussian(value)
    }
}

impl From<MLFit> for FitRecord {
    fn from(value: MLFit) -> Self {
        FitRecord::Uniform(value)
    }
}

/// Which per-window estimator to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FitKind {
    /// Circular Gaussian on the twisted torus.
    Gaussian,
    /// Constant rate (non-spatial) under Gaussian noise.
    Uniform,
}

impl FitKind {
    pub fn display_name(self) -> &'static str {
        match self {
            FitKind::Gaussian => "circular Gaussian",
            FitKind::Uniform => "uniform",
        }
    }
}

/// Where the spikes of a run come from.
#[derive(Debug, Clone)]
pub enum SpikeSource {
    /// Generate a drifting bump with the given settings.
    Synthetic(SampleConfig),
    /// Load `sender,time` rows from a CSV file.
    Csv { path: PathBuf, sheet: Pair2D<usize> },
}

impl SpikeSource {
    pub fn sheet(&self) -> Pair2D<usize> {
        match self {
            SpikeSource::Synthetic(cfg) => cfg.sheet,
            SpikeSource::Csv { sheet, .. } => *sheet,
        }
    }

    /// One-line description for reports.
    pub fn describe(&self) -> String {
        match self {
            SpikeSource::Synthetic(cfg) => format!(
                "synthetic bump on {}x{} (seed={}, duration={:.3}, v=({:.2}, {:.2}))",
                cfg.sheet.x, cfg.sheet.y, cfg.seed, cfg.duration, cfg.velocity.x, cfg.velocity.y
            ),
            SpikeSource::Csv { path, sheet } => {
                format!("{} on {}x{}", path.display(), sheet.x, sheet.y)
            }
        }
    }
}

/// Settings of the synthetic moving-bump population.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleConfig {
    pub sheet: Pair2D<usize>,
    /// Simulated duration (same time unit as `TrackConfig`).
    pub duration: f64,
    /// Bump centre at `t = 0`.
    pub start: Pair2D<f64>,
    /// Bump drift per time unit.
    pub velocity: Pair2D<f64>,
    /// Bump width (cells).
    pub sigma: f64,
    /// Peak firing rate at the bump centre.
    pub peak_rate: f64,
    /// Firing rate far from the bump.
    pub background_rate: f64,
    /// Integration step used to draw spikes.
    pub sim_dt: f64,
    pub seed: u64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            sheet: Pair2D::new(34, 30),
            duration: 2.0,
            start: Pair2D::new(10.0, 10.0),
            velocity: Pair2D::new(4.0, 2.0),
            sigma: 3.0,
            peak_rate: 80.0,
            background_rate: 1.0,
            sim_dt: 0.001,
            seed: 42,
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct TrackConfig {
    pub fit_kind: FitKind,
    pub source: SpikeSource,

    pub tstart: f64,
    /// End of the analysed range; `None` means the end of the data.
    pub tend: Option<f64>,
    pub dt: f64,
    pub win_len: f64,

    /// Keep per-cell residuals (otherwise only their sum per window).
    pub full_err: bool,
    /// Fit windows in parallel (results are still appended in time order).
    pub parallel: bool,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    pub top_rows: usize,

    pub export_csv: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
}
