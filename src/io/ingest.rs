//! Spike CSV ingest.
//!
//! Expected schema: a header row with (at least) `sender` and `time` columns,
//! in any order and case. `sender` is the neuron index on the sheet (row by
//! row, `i = y * Nx + x`), `time` the spike time.
//!
//! Rows that fail to parse or point outside the sheet are skipped and reported;
//! missing columns or an empty result are hard errors.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use tracing::{info, warn};

use crate::domain::Pair2D;
use crate::error::AppError;
use crate::population::TorusSpikes;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the spike population plus what was skipped.
#[derive(Debug, Clone)]
pub struct IngestedSpikes {
    pub spikes: TorusSpikes,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Load `sender,time` rows for a sheet of size `sheet`.
pub fn load_spikes_csv(path: &Path, sheet: Pair2D<usize>) -> Result<IngestedSpikes, AppError> {
    if sheet.area() == 0 {
        return Err(AppError::new(2, "Sheet size must be non-zero."));
    }

    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open spike CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let sender_col = required_column(&header_map, "sender")?;
    let time_col = required_column(&header_map, "time")?;

    let mut senders = Vec::new();
    let mut times = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header, and lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let parsed = result
            .map_err(|e| format!("CSV parse error: {e}"))
            .and_then(|record| parse_row(&record, sender_col, time_col, sheet));
        match parsed {
            Ok((sender, time)) => {
                senders.push(sender);
                times.push(time);
            }
            Err(message) => {
                warn!(line, %message, "skipping spike row");
                row_errors.push(RowError { line, message });
            }
        }
    }

    let rows_used = senders.len();
    if rows_used == 0 {
        return Err(AppError::new(3, "No valid spike rows in the CSV."));
    }
    info!(rows_read, rows_used, skipped = row_errors.len(), "loaded spike CSV");

    let spikes = TorusSpikes::new(senders, times, sheet)?;
    Ok(IngestedSpikes {
        spikes,
        row_errors,
        rows_read,
        rows_used,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Strip a UTF-8 BOM on the first header.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn required_column(header_map: &HashMap<String, usize>, name: &str) -> Result<usize, AppError> {
    header_map
        .get(name)
        .copied()
        .ok_or_else(|| AppError::new(2, format!("Missing required column: `{name}`")))
}

fn parse_row(
    record: &StringRecord,
    sender_col: usize,
    time_col: usize,
    sheet: Pair2D<usize>,
) -> Result<(usize, f64), String> {
    let sender_raw = record.get(sender_col).ok_or("missing `sender` field")?;
    let time_raw = record.get(time_col).ok_or("missing `time` field")?;

    let sender: usize = sender_raw
        .parse()
        .map_err(|_| format!("invalid sender '{sender_raw}'"))?;
    if sender >= sheet.area() {
        return Err(format!(
            "sender {sender} outside the {}x{} sheet",
            sheet.x, sheet.y
        ));
    }

    let time: f64 = time_raw
        .parse()
        .map_err(|_| format!("invalid time '{time_raw}'"))?;
    if !time.is_finite() {
        return Err(format!("time '{time_raw}' is not finite"));
    }

    Ok((sender, time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_rows_and_skips_bad_ones() {
        let file = write_csv(
            "\u{feff}Time,Sender\n\
             0.10,3\n\
             0.20,abc\n\
             0.30,99\n\
             nan,1\n\
             0.05,0\n",
        );
        let ingested = load_spikes_csv(file.path(), Pair2D::new(4, 2)).unwrap();

        assert_eq!(ingested.rows_read, 5);
        assert_eq!(ingested.rows_used, 2);
        assert_eq!(ingested.spikes.len(), 2);
        assert_eq!(ingested.spikes.time_span(), Some((0.05, 0.10)));

        let lines: Vec<usize> = ingested.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 4, 5]);
    }

    #[test]
    fn missing_column_is_an_error() {
        let file = write_csv("neuron,time\n1,0.5\n");
        let err = load_spikes_csv(file.path(), Pair2D::new(4, 2)).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("sender"));
    }

    #[test]
    fn no_usable_rows_is_an_error() {
        let file = write_csv("sender,time\n100,0.5\n");
        let err = load_spikes_csv(file.path(), Pair2D::new(4, 2)).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
