//! Export per-window fit results to CSV.
//!
//! One row per window. Residuals are written as their sum so that both the
//! `full_err` and the collapsed form export the same columns.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::AppError;
use crate::fit::{FitTrack, MLFitList, MLGaussianFitList};

/// Write a tracking result to a CSV file.
pub fn write_track_csv(path: &Path, track: &FitTrack) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    let written = match track {
        FitTrack::Gaussian(list) => write_gaussian_rows(&mut file, list),
        FitTrack::Uniform(list) => write_uniform_rows(&mut file, list),
    };
    written.map_err(|e| AppError::new(2, format!("Failed to write export CSV: {e}")))
}

fn write_gaussian_rows(out: &mut impl Write, list: &MLGaussianFitList) -> std::io::Result<()> {
    writeln!(out, "window,time,amplitude,mu_x,mu_y,sigma,err2_sum,ln_lh,lh_precision")?;
    for (k, (fit, t)) in list.iter().enumerate() {
        writeln!(
            out,
            "{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}",
            k,
            t,
            fit.amplitude,
            fit.mu_x,
            fit.mu_y,
            fit.sigma,
            fit.err2.total(),
            fit.ln_lh,
            fit.lh_precision,
        )?;
    }
    Ok(())
}

fn write_uniform_rows(out: &mut impl Write, list: &MLFitList) -> std::io::Result<()> {
    writeln!(out, "window,time,mu,sigma2,err2_sum,ln_lh")?;
    for (k, (fit, t)) in list.iter().enumerate() {
        writeln!(
            out,
            "{},{:.6},{:.6},{:.6},{:.6},{:.6}",
            k,
            t,
            fit.mu,
            fit.sigma2,
            fit.err2.total(),
            fit.ln_lh,
        )?;
    }
    Ok(())
}
