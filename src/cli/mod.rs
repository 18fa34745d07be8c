//! Command-line parsing for the bump tracker.
//!
//! Argument parsing and command dispatch stay separate from the fitting code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "bumps", version, about = "Activity bump tracking on a twisted torus")]
pub struct Cli {
    /// Log filter (overrides `RUST_LOG`), e.g. `debug` or `bump_tracker=debug`.
    #[arg(long, global = true, value_name = "FILTER")]
    pub log: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a circular Gaussian to every sliding window, print the track, and optionally plot/export.
    Track(TrackArgs),
    /// Fit the uniform (non-spatial) model to every sliding window.
    Uniform(TrackArgs),
    /// Plot a previously exported track JSON.
    Plot(PlotArgs),
}

/// Options shared by `track` and `uniform`.
#[derive(Debug, Args, Clone)]
pub struct TrackArgs {
    /// Spike CSV (`sender,time`). Without it, a synthetic drifting bump is generated.
    #[arg(long, value_name = "CSV")]
    pub spikes: Option<PathBuf>,

    /// Sheet width (neurons along x).
    #[arg(long, default_value_t = 34)]
    pub nx: usize,

    /// Sheet height (neurons along y).
    #[arg(long, default_value_t = 30)]
    pub ny: usize,

    /// Start of the analysed range.
    #[arg(long, default_value_t = 0.0)]
    pub tstart: f64,

    /// End of the analysed range (defaults to the end of the data).
    #[arg(long)]
    pub tend: Option<f64>,

    /// Step between window starts.
    #[arg(long, default_value_t = 0.05)]
    pub dt: f64,

    /// Window length.
    #[arg(long, default_value_t = 0.25)]
    pub win_len: f64,

    /// Keep per-cell squared residuals instead of their sum.
    #[arg(long)]
    pub full_err: bool,

    /// Fit windows in parallel.
    #[arg(long)]
    pub parallel: bool,

    #[command(flatten)]
    pub synthetic: SyntheticArgs,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 68)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 30)]
    pub height: usize,

    /// Number of windows to list in the tables.
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Export per-window results to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the track (settings + results) to JSON.
    #[arg(long = "export-track")]
    pub export_track: Option<PathBuf>,
}

/// Settings of the synthetic drifting bump (ignored with `--spikes`).
#[derive(Debug, Args, Clone)]
pub struct SyntheticArgs {
    /// Simulated duration.
    #[arg(long, default_value_t = 2.0)]
    pub duration: f64,

    /// Random seed for spike generation.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Bump centre x at t = 0.
    #[arg(long, default_value_t = 10.0)]
    pub start_x: f64,

    /// Bump centre y at t = 0.
    #[arg(long, default_value_t = 10.0)]
    pub start_y: f64,

    /// Bump drift along x (cells per time unit).
    #[arg(long, default_value_t = 4.0, allow_hyphen_values = true)]
    pub vx: f64,

    /// Bump drift along y (cells per time unit).
    #[arg(long, default_value_t = 2.0, allow_hyphen_values = true)]
    pub vy: f64,

    /// Bump width (cells).
    #[arg(long, default_value_t = 3.0)]
    pub bump_sigma: f64,

    /// Peak firing rate at the bump centre.
    #[arg(long, default_value_t = 80.0)]
    pub peak_rate: f64,

    /// Background firing rate.
    #[arg(long, default_value_t = 1.0)]
    pub background_rate: f64,

    /// Simulation step used to draw spikes.
    #[arg(long, default_value_t = 0.001)]
    pub sim_dt: f64,
}

/// Options for plotting a saved track.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Track JSON file produced by `bumps track --export-track`.
    #[arg(long, value_name = "JSON")]
    pub track: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 68)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 30)]
    pub height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_defaults() {
        let cli = Cli::parse_from(["bumps", "track"]);
        let Command::Track(args) = cli.command else {
            panic!("expected track");
        };
        assert!(args.spikes.is_none());
        assert_eq!((args.nx, args.ny), (34, 30));
        assert_eq!(args.tend, None);
        assert!(!args.full_err);
        assert_eq!(args.synthetic.seed, 42);
    }

    #[test]
    fn flags_and_global_log() {
        let cli = Cli::parse_from([
            "bumps", "uniform", "--spikes", "s.csv", "--nx", "8", "--ny", "6", "--tend", "3.5", "--full-err",
            "--parallel", "--vx", "-1.5", "--log", "debug",
        ]);
        assert_eq!(cli.log.as_deref(), Some("debug"));
        let Command::Uniform(args) = cli.command else {
            panic!("expected uniform");
        };
        assert_eq!(args.spikes, Some(PathBuf::from("s.csv")));
        assert_eq!(args.tend, Some(3.5));
        assert!(args.full_err && args.parallel);
        assert_eq!(args.synthetic.vx, -1.5);
    }
}
