//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and installs the log subscriber
//! - parses CLI arguments
//! - runs the tracking pipeline
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, PlotArgs, TrackArgs};
use crate::domain::{FitKind, Pair2D, SampleConfig, SpikeSource, TrackConfig};
use crate::error::AppError;
use crate::io::TrackFile;

pub mod pipeline;

/// Entry point for the `bumps` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    let cli = crate::cli::Cli::parse();
    init_logging(cli.log.as_deref())?;

    match cli.command {
        Command::Track(args) => handle_track(args, FitKind::Gaussian),
        Command::Uniform(args) => handle_track(args, FitKind::Uniform),
        Command::Plot(args) => handle_plot(args),
    }
}

/// Install the `tracing` subscriber on stderr. `--log` wins over `RUST_LOG`.
fn init_logging(filter: Option<&str>) -> Result<(), AppError> {
    let filter = match filter {
        Some(directives) => EnvFilter::try_new(directives)
            .map_err(|e| AppError::new(2, format!("Invalid --log filter '{directives}': {e}")))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| AppError::new(4, format!("Failed to install logger: {e}")))
}

fn handle_track(args: TrackArgs, kind: FitKind) -> Result<(), AppError> {
    let config = track_config_from_args(&args, kind);
    let run = pipeline::run_track(&config)?;

    println!(
        "{}",
        crate::report::format_run_summary(&run.summary, &config, &run.windows, run.spike_count)
    );
    if run.skipped_rows > 0 {
        println!("Skipped {} invalid CSV rows.\n", run.skipped_rows);
    }
    println!("{}", crate::report::format_window_table(&run.track, config.top_rows));
    println!("{}", crate::report::format_rankings(&run.ranking, &run.track));

    if config.plot {
        let plot = crate::plot::render_track_plot(&run.track, run.sheet, config.plot_width, config.plot_height);
        println!("{plot}");
    }

    // Optional exports.
    if let Some(path) = &config.export_csv {
        crate::io::write_track_csv(path, &run.track)?;
    }
    if let Some(path) = &config.export_json {
        let file = TrackFile::new(run.sheet, run.windows, run.track.clone());
        crate::io::write_track_json(path, &file)?;
    }

    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let file = crate::io::read_track_json(&args.track)?;
    let plot = crate::plot::render_track_plot(&file.track, file.sheet, args.width, args.height);

    println!("{plot}");
    Ok(())
}

pub fn track_config_from_args(args: &TrackArgs, fit_kind: FitKind) -> TrackConfig {
    let sheet = Pair2D::new(args.nx, args.ny);
    let source = match &args.spikes {
        Some(path) => SpikeSource::Csv {
            path: path.clone(),
            sheet,
        },
        None => {
            let s = &args.synthetic;
            SpikeSource::Synthetic(SampleConfig {
                sheet,
                duration: s.duration,
                start: Pair2D::new(s.start_x, s.start_y),
                velocity: Pair2D::new(s.vx, s.vy),
                sigma: s.bump_sigma,
                peak_rate: s.peak_rate,
                background_rate: s.background_rate,
                sim_dt: s.sim_dt,
                seed: s.seed,
            })
        }
    };

    TrackConfig {
        fit_kind,
        source,
        tstart: args.tstart,
        tend: args.tend,
        dt: args.dt,
        win_len: args.win_len,
        full_err: args.full_err,
        parallel: args.parallel,
        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        top_rows: args.top,
        export_csv: args.export.clone(),
        export_json: args.export_track.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;

    #[test]
    fn synthetic_config_from_default_args() {
        let cli = Cli::parse_from(["bumps", "track", "--no-plot", "--seed", "9"]);
        let Command::Track(args) = cli.command else {
            panic!("expected track");
        };
        let config = track_config_from_args(&args, FitKind::Gaussian);

        assert!(!config.plot);
        assert_eq!(config.tend, None);
        match config.source {
            SpikeSource::Synthetic(sample) => {
                assert_eq!(sample.seed, 9);
                assert_eq!(sample.sheet, Pair2D::new(34, 30));
                assert_eq!(
                    sample,
                    SampleConfig {
                        seed: 9,
                        ..SampleConfig::default()
                    }
                );
            }
            other => panic!("unexpected source {other:?}"),
        }
    }

    #[test]
    fn csv_source_uses_sheet_flags() {
        let cli = Cli::parse_from(["bumps", "uniform", "--spikes", "in.csv", "--nx", "5", "--ny", "4"]);
        let Command::Uniform(args) = cli.command else {
            panic!("expected uniform");
        };
        let config = track_config_from_args(&args, FitKind::Uniform);
        assert_eq!(config.fit_kind, FitKind::Uniform);
        assert_eq!(config.source.sheet(), Pair2D::new(5, 4));
    }
}
