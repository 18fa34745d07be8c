//! Distance metric on the twisted torus.
//!
//! The sheet wraps along both axes, and wrapping once along `y` shifts `x` by
//! half a sheet width. The distance between two points is the shortest
//! Euclidean distance over the wrap offsets:
//!
//! ```text
//! (dx, dy), (dx - X, dy), (dx + X/2, dy - Y), (dx - X/2, dy - Y), (dx - 3X/2, dy - Y)
//! ```
//!
//! where `dx = |a.x - b.x|`, `dy = |a.y - b.y|` and `a` has been wrapped into
//! the sheet first.

use crate::domain::Pair2D;

/// Wrap `v` into `[0, period)`.
///
/// `rem_euclid` can return `period` itself for tiny negative inputs due to
/// rounding, so that case is folded back to 0.
pub fn wrap(v: f64, period: f64) -> f64 {
    let r = v.rem_euclid(period);
    if r >= period { 0.0 } else { r }
}

/// Twisted-torus distance between a single pair of points.
pub fn twisted_torus_distance_point(a: Pair2D<f64>, b: Pair2D<f64>, dim: Pair2D<f64>) -> f64 {
    let ax = wrap(a.x, dim.x);
    let ay = wrap(a.y, dim.y);
    let dx = (ax - b.x).abs();
    let dy = (ay - b.y).abs();

    let half = dim.x / 2.0;
    let candidates = [
        (dx, dy),
        (dx - dim.x, dy),
        (dx + half, dy - dim.y),
        (dx - half, dy - dim.y),
        (dx - 3.0 * half, dy - dim.y),
    ];

    candidates
        .iter()
        .map(|&(u, v)| u * u + v * v)
        .fold(f64::INFINITY, f64::min)
        .sqrt()
}

/// Distances from `a` to every point in `others`.
pub fn twisted_torus_distance(a: Pair2D<f64>, others: &[Pair2D<f64>], dim: Pair2D<f64>) -> Vec<f64> {
    others
        .iter()
        .map(|&b| twisted_torus_distance_point(a, b, dim))
        .collect()
}

/// All cell coordinates of a `dim.x × dim.y` sheet in row-major order
/// (`y` outer, `x` inner), matching a flattened `Ny × Nx` snapshot.
pub fn grid_points(dim: Pair2D<usize>) -> Vec<Pair2D<f64>> {
    let mut out = Vec::with_capacity(dim.area());
    for y in 0..dim.y {
        for x in 0..dim.x {
            out.push(Pair2D::new(x as f64, y as f64));
        }
    }
    out
}
