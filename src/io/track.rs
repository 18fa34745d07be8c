//! Read/write track JSON files.
//!
//! A track file is the portable form of a tracking run: the window settings,
//! the sheet size and the full result list. Lists are re-validated on load.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Pair2D, TrackConfig};
use crate::error::AppError;
use crate::fit::FitTrack;

/// Sliding window settings of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowSettings {
    pub tstart: f64,
    pub tend: f64,
    pub dt: f64,
    pub win_len: f64,
    pub full_err: bool,
}

impl WindowSettings {
    /// Settings of `config` with the end of the range resolved to `tend`.
    pub fn resolve(config: &TrackConfig, tend: f64) -> Self {
        Self {
            tstart: config.tstart,
            tend,
            dt: config.dt,
            win_len: config.win_len,
            full_err: config.full_err,
        }
    }
}

/// A saved track file (JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub sheet: Pair2D<usize>,
    pub windows: WindowSettings,
    pub track: FitTrack,
}

impl TrackFile {
    pub fn new(sheet: Pair2D<usize>, windows: WindowSettings, track: FitTrack) -> Self {
        Self {
            tool: "bumps".to_string(),
            generated_at: Utc::now(),
            sheet,
            windows,
            track,
        }
    }
}

/// Write a track JSON file.
pub fn write_track_json(path: &Path, track: &TrackFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create track JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, track)
        .map_err(|e| AppError::new(2, format!("Failed to write track JSON: {e}")))?;

    Ok(())
}

/// Read a track JSON file.
pub fn read_track_json(path: &Path) -> Result<TrackFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open track JSON '{}': {e}", path.display())))?;
    let track: TrackFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Invalid track JSON: {e}")))?;
    Ok(track)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Err2, MLGaussianFit};
    use crate::fit::MLGaussianFitList;

    fn settings() -> WindowSettings {
        WindowSettings {
            tstart: 0.0,
            tend: 1.0,
            dt: 0.1,
            win_len: 0.25,
            full_err: false,
        }
    }

    #[test]
    fn round_trip_keeps_infinite_values() {
        let mut list = MLGaussianFitList::new();
        list.push(
            MLGaussianFit {
                amplitude: 3.0,
                mu_x: 1.25,
                mu_y: 4.5,
                sigma: 2.0,
                err2: Err2::Total(0.0),
                ln_lh: f64::INFINITY,
                lh_precision: f64::INFINITY,
            },
            0.25,
        );
        let file = TrackFile::new(Pair2D::new(10, 8), settings(), FitTrack::Gaussian(list));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track.json");
        write_track_json(&path, &file).unwrap();
        let back = read_track_json(&path).unwrap();

        assert_eq!(back, file);
        assert_eq!(back.track.ln_lh(), &[f64::INFINITY]);
    }

    #[test]
    fn inconsistent_lists_are_rejected_on_load() {
        let json = r#"{
            "tool": "bumps",
            "generated_at": "2024-05-01T12:00:00Z",
            "sheet": {"x": 4, "y": 4},
            "windows": {"tstart": 0.0, "tend": 1.0, "dt": 0.5, "win_len": 0.5, "full_err": false},
            "track": {"kind": "uniform", "fits": {
                "mu": [1.0, 2.0], "sigma2": [0.1], "ln_lh": [-1.0, -2.0],
                "err2": [0.5, 0.5], "times": [0.5, 1.0]
            }}
        }"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, json).unwrap();

        let err = read_track_json(&path).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("inconsistent lengths"), "{err}");
    }
}
