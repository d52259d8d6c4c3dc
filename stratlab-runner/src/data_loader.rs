//! Historical bar loading from CSV.
//!
//! Expected columns: `timestamp,open,high,low,close,volume` with RFC 3339
//! timestamps. The series is validated on load: strictly increasing
//! timestamps and sane OHLC ranges, so downstream replay can assume both.

use std::path::Path;

use stratlab_core::domain::Bar;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("bad row {row}: {source}")]
    BadRow {
        row: usize,
        #[source]
        source: csv::Error,
    },
    #[error("bars out of order at row {row}")]
    OutOfOrder { row: usize },
    #[error("invalid OHLC range at row {row}")]
    InvalidBar { row: usize },
}

/// Load and validate a bar series.
pub fn load_bars(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| LoadError::Open {
        path: path.display().to_string(),
        source,
    })?;

    let mut bars: Vec<Bar> = Vec::new();
    for (i, row) in reader.deserialize::<Bar>().enumerate() {
        // Header is row 0 in the file; data rows are 1-based.
        let row_number = i + 1;
        let bar = row.map_err(|source| LoadError::BadRow {
            row: row_number,
            source,
        })?;
        if !bar.is_sane() {
            return Err(LoadError::InvalidBar { row: row_number });
        }
        if let Some(prev) = bars.last() {
            if bar.timestamp <= prev.timestamp {
                return Err(LoadError::OutOfOrder { row: row_number });
            }
        }
        bars.push(bar);
    }
    info!(path = %path.display(), bars = bars.len(), "loaded bar series");
    Ok(bars)
}
