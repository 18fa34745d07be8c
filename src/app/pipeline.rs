//! Shared "track pipeline" logic used by the `track` and `uniform` commands.
//!
//! spikes (synthetic or CSV) -> sliding windows -> per-window fits -> summary + ranking
//!
//! The command handlers then only deal with presentation (printing, plots, exports).

use tracing::info;

use crate::data::generate_bump_spikes;
use crate::domain::{FitKind, Pair2D, SpikeSource, TrackConfig};
use crate::error::AppError;
use crate::fit::FitTrack;
use crate::io::{WindowSettings, load_spikes_csv};
use crate::population::{SingleBumpPopulation, TorusSpikes};
use crate::report::{LikelihoodRanking, TrackSummary, rank_windows, summarize};

/// All computed outputs of a single tracking run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub sheet: Pair2D<usize>,
    pub windows: WindowSettings,
    pub spike_count: usize,
    /// CSV rows skipped during ingest (always 0 for synthetic data).
    pub skipped_rows: usize,
    pub track: FitTrack,
    pub summary: TrackSummary,
    pub ranking: LikelihoodRanking,
}

/// Load the spikes of `config.source` and run the full tracking pipeline.
pub fn run_track(config: &TrackConfig) -> Result<RunOutput, AppError> {
    let (spikes, default_tend, skipped_rows) = match &config.source {
        SpikeSource::Synthetic(sample) => {
            let spikes = generate_bump_spikes(sample)?;
            (spikes, sample.duration, 0)
        }
        SpikeSource::Csv { path, sheet } => {
            let ingested = load_spikes_csv(path, *sheet)?;
            let last = ingested.spikes.time_span().map_or(config.tstart, |(_, last)| last);
            (ingested.spikes, last, ingested.row_errors.len())
        }
    };

    let mut run = run_track_with_spikes(config, spikes, default_tend)?;
    run.skipped_rows = skipped_rows;
    Ok(run)
}

/// Run the tracking pipeline on an already loaded population.
///
/// `default_tend` is used when the configuration does not fix the end of the
/// analysed range.
pub fn run_track_with_spikes(
    config: &TrackConfig,
    spikes: TorusSpikes,
    default_tend: f64,
) -> Result<RunOutput, AppError> {
    let tend = config.tend.unwrap_or(default_tend);
    let windows = WindowSettings::resolve(config, tend);
    let spike_count = spikes.len();

    let population = SingleBumpPopulation::new(spikes).with_parallel(config.parallel);
    let sheet = population.sheet_size();
    info!(
        kind = config.fit_kind.display_name(),
        spikes = spike_count,
        tstart = windows.tstart,
        tend = windows.tend,
        dt = windows.dt,
        win_len = windows.win_len,
        parallel = config.parallel,
        "tracking run started"
    );

    let track: FitTrack = match config.fit_kind {
        FitKind::Gaussian => population
            .bump_position(windows.tstart, windows.tend, windows.dt, windows.win_len, windows.full_err)?
            .into(),
        FitKind::Uniform => population
            .uniform_fit(windows.tstart, windows.tend, windows.dt, windows.win_len, windows.full_err)?
            .into(),
    };

    let summary = summarize(&track, sheet);
    let ranking = rank_windows(&track, config.top_rows);
    info!(windows = track.len(), "tracking run finished");

    Ok(RunOutput {
        sheet,
        windows,
        spike_count,
        skipped_rows: 0,
        track,
        summary,
        ranking,
    })
}
