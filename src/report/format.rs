//! Formatted terminal output for tracking runs.

use crate::domain::TrackConfig;
use crate::fit::FitTrack;
use crate::io::WindowSettings;
use crate::report::{LikelihoodRanking, TrackSummary};

/// Format the run summary (input, window settings and track statistics).
pub fn format_run_summary(
    summary: &TrackSummary,
    config: &TrackConfig,
    windows: &WindowSettings,
    spike_count: usize,
) -> String {
    let mut out = String::new();

    out.push_str("=== bumps - twisted torus bump tracking ===\n");
    out.push_str(&format!("Fit: {}\n", config.fit_kind.display_name()));
    out.push_str(&format!("Source: {}\n", config.source.describe()));
    out.push_str(&format!("Spikes: n={spike_count}\n"));
    out.push_str(&format!(
        "Windows: t=[{:.3}, {:.3}] dt={:.3} win_len={:.3} | n={}\n",
        windows.tstart, windows.tend, windows.dt, windows.win_len, summary.windows
    ));

    if let Some((a, b)) = summary.time_range {
        out.push_str(&format!("Window ends: [{a:.3}, {b:.3}]\n"));
    }
    out.push_str(&format!(
        "Mean ln L: {} (perfect fits: {})\n",
        fmt_opt(summary.mean_ln_lh, 3),
        summary.perfect_fits
    ));
    if let Some(len) = summary.path_length {
        out.push_str(&format!(
            "Bump path: {len:.3} cells | mean speed {} cells/unit\n",
            fmt_opt(summary.mean_speed, 3)
        ));
    }
    out.push('\n');

    out
}

/// Format the first `max_rows` windows of a track as a table.
pub fn format_window_table(track: &FitTrack, max_rows: usize) -> String {
    let rows: Vec<usize> = (0..track.len().min(max_rows)).collect();
    let mut out = format_rows(track, &rows);
    if track.len() > max_rows {
        out.push_str(&format!("... {} more windows\n", track.len() - max_rows));
    }
    out
}

/// Format the most and least likely windows.
pub fn format_rankings(ranking: &LikelihoodRanking, track: &FitTrack) -> String {
    let mut out = String::new();

    out.push_str("Most likely windows:\n");
    out.push_str(&format_rows(track, &ranking.best));
    out.push('\n');

    out.push_str("Least likely windows:\n");
    out.push_str(&format_rows(track, &ranking.worst));

    out
}

fn format_rows(track: &FitTrack, rows: &[usize]) -> String {
    let mut out = String::new();
    match track {
        FitTrack::Gaussian(list) => {
            push_line(
                &mut out,
                format!(
                    "{:>6} {:>9} {:>10} {:>8} {:>8} {:>8} {:>12} {:>12}",
                    "window", "time", "amplitude", "mu_x", "mu_y", "sigma", "ln_lh", "err2_sum"
                ),
            );
            push_line(
                &mut out,
                format!(
                    "{:->6} {:->9} {:->10} {:->8} {:->8} {:->8} {:->12} {:->12}",
                    "", "", "", "", "", "", "", ""
                ),
            );
            for &k in rows {
                let Some((fit, t)) = list.get(k) else { continue };
                push_line(
                    &mut out,
                    format!(
                        "{:>6} {:>9.3} {:>10.3} {:>8.3} {:>8.3} {:>8.3} {:>12.3} {:>12.3}",
                        k,
                        t,
                        fit.amplitude,
                        fit.mu_x,
                        fit.mu_y,
                        fit.sigma,
                        fit.ln_lh,
                        fit.err2.total()
                    ),
                );
            }
        }
        FitTrack::Uniform(list) => {
            push_line(
                &mut out,
                format!(
                    "{:>6} {:>9} {:>10} {:>10} {:>12} {:>12}",
                    "window", "time", "mu", "sigma2", "ln_lh", "err2_sum"
                ),
            );
            push_line(
                &mut out,
                format!("{:->6} {:->9} {:->10} {:->10} {:->12} {:->12}", "", "", "", "", "", ""),
            );
            for &k in rows {
                let Some((fit, t)) = list.get(k) else { continue };
                push_line(
                    &mut out,
                    format!(
                        "{:>6} {:>9.3} {:>10.3} {:>10.3} {:>12.3} {:>12.3}",
                        k,
                        t,
                        fit.mu,
                        fit.sigma2,
                        fit.ln_lh,
                        fit.err2.total()
                    ),
                );
            }
        }
    }
    out
}

fn push_line(out: &mut String, line: String) {
    out.push_str(line.trim_end());
    out.push('\n');
}

fn fmt_opt(v: Option<f64>, precision: usize) -> String {
    match v {
        Some(v) => format!("{v:.precision$}"),
        None => "n/a".to_string(),
    }
}
