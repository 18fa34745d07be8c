//! ASCII plotting for terminal output.
//!
//! Fixed-size character grids with deterministic output.
//!
//! Trajectory plot (circular Gaussian tracks):
//! - bump centres: `o`, first `S`, last `E`
//! - path between consecutive centres: `.` (not drawn across a torus seam)
//!
//! Series plot (uniform tracks): fitted mean over time, `o` joined by `-`.

use crate::domain::Pair2D;
use crate::fit::{FitTrack, MLFitList, MLGaussianFitList};
use crate::math::twisted_torus_distance_point;

/// Render the plot that fits the kind of `track`.
pub fn render_track_plot(track: &FitTrack, sheet: Pair2D<usize>, width: usize, height: usize) -> String {
    match track {
        FitTrack::Gaussian(list) => render_trajectory(list, sheet, width, height),
        FitTrack::Uniform(list) => render_uniform_series(list, width, height),
    }
}

/// Plot bump centres on the sheet (`y` grows downwards, like the snapshots).
pub fn render_trajectory(list: &MLGaussianFitList, sheet: Pair2D<usize>, width: usize, height: usize) -> String {
    let width = width.max(2);
    let height = height.max(2);
    let dim = sheet.as_f64();
    let mut grid = vec![vec![' '; width]; height];

    let centres: Vec<Pair2D<f64>> = list
        .mu_x()
        .iter()
        .zip(list.mu_y())
        .map(|(&x, &y)| Pair2D::new(x, y))
        .collect();
    let cells: Vec<(usize, usize)> = centres
        .iter()
        .map(|c| (map_cell(c.x, dim.x, width), map_cell(c.y, dim.y, height)))
        .collect();

    // Path first, so the markers overlay it.
    for (k, w) in centres.windows(2).enumerate() {
        let straight = ((w[1].x - w[0].x).powi(2) + (w[1].y - w[0].y).powi(2)).sqrt();
        let on_torus = twisted_torus_distance_point(w[0], w[1], dim);
        if on_torus + 1e-9 < straight {
            continue;
        }
        let (x0, y0) = cells[k];
        let (x1, y1) = cells[k + 1];
        draw_line(&mut grid, x0, y0, x1, y1, '.');
    }
    for &(x, y) in &cells {
        grid[y][x] = 'o';
    }
    if let (Some(&(x, y)), Some(&(xe, ye))) = (cells.first(), cells.last()) {
        grid[y][x] = 'S';
        grid[ye][xe] = 'E';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Track: sheet={}x{} | windows={}{}\n",
        sheet.x,
        sheet.y,
        list.len(),
        fmt_time_range(list.times())
    ));
    push_grid(&mut out, grid);
    out
}

/// Plot the fitted mean rate of a uniform track over time.
pub fn render_uniform_series(list: &MLFitList, width: usize, height: usize) -> String {
    let points: Vec<(f64, f64)> = list
        .times()
        .iter()
        .zip(list.mu())
        .map(|(&t, &mu)| (t, mu))
        .filter(|(t, mu)| t.is_finite() && mu.is_finite())
        .collect();
    render_series(&points, "mu", width, height)
}

fn render_series(points: &[(f64, f64)], label: &str, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (t_min, t_max) = range(points.iter().map(|p| p.0)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = range(points.iter().map(|p| p.1)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    let mapped: Vec<(usize, usize)> = points
        .iter()
        .map(|&(t, y)| (map_x(t, t_min, t_max, width), map_y(y, y_min, y_max, height)))
        .collect();
    for w in mapped.windows(2) {
        draw_line(&mut grid, w[0].0, w[0].1, w[1].0, w[1].1, '-');
    }
    for &(x, y) in &mapped {
        grid[y][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: t=[{t_min:.3}, {t_max:.3}] | {label}=[{y_min:.2}, {y_max:.2}]\n"
    ));
    push_grid(&mut out, grid);
    out
}

fn push_grid(out: &mut String, grid: Vec<Vec<char>>) {
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
}

fn fmt_time_range(times: &[f64]) -> String {
    match (times.first(), times.last()) {
        (Some(a), Some(b)) => format!(" | t=[{a:.3}, {b:.3}]"),
        _ => String::new(),
    }
}

fn range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if min.is_finite() && max.is_finite() && max > min {
        Some((min, max))
    } else if min.is_finite() && max.is_finite() {
        // A single value: give it some room.
        Some((min - 0.5, max + 0.5))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

/// Sheet coordinate in `[0, period)` to a column/row of a grid with `cells` cells.
fn map_cell(v: f64, period: f64, cells: usize) -> usize {
    let u = (v / period).clamp(0.0, 1.0);
    ((u * cells as f64).floor() as usize).min(cells - 1)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y max is the top row.
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham-ish). Only fills empty cells.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
