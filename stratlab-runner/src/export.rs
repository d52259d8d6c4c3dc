//! Tabular export of run output — one CSV row per record.
//!
//! Callers export only after a run completes, so a failed run never leaves
//! a partial table behind. Writers are flushed before returning.

use std::path::Path;

use anyhow::{Context, Result};
use stratlab_core::domain::{NavRecord, Trade};

use crate::optimize::HistoryEntry;

/// NAV series, columns exactly the `NavRecord` fields.
pub fn write_nav_csv(path: &Path, records: &[NavRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating NAV export {}", path.display()))?;
    for record in records {
        writer
            .serialize(record)
            .context("serializing NAV record")?;
    }
    writer.flush().context("flushing NAV export")?;
    Ok(())
}

/// Trade log, columns exactly the `Trade` fields.
pub fn write_trades_csv(path: &Path, trades: &[Trade]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating trade export {}", path.display()))?;
    for trade in trades {
        writer.serialize(trade).context("serializing trade")?;
    }
    writer.flush().context("flushing trade export")?;
    Ok(())
}

/// Optimization history: the parameter vector as a JSON cell plus its score.
/// Parameter names vary per space, so the vector does not flatten into a
/// fixed column set.
pub fn write_history_csv(path: &Path, history: &[HistoryEntry]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating history export {}", path.display()))?;
    writer
        .write_record(["params", "score"])
        .context("writing history header")?;
    for entry in history {
        let params = serde_json::to_string(&entry.params).context("encoding parameter vector")?;
        writer
            .write_record([params, entry.score.to_string()])
            .context("writing history row")?;
    }
    writer.flush().context("flushing history export")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use stratlab_core::domain::{ParamValue, ParamVector};

    fn nav(nav: f64) -> NavRecord {
        NavRecord {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            nav,
            cash: nav,
            position_value: 0.0,
            position_size: 0.0,
        }
    }

    #[test]
    fn nav_csv_has_one_row_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nav.csv");
        write_nav_csv(&path, &[nav(100.0), nav(101.0)]).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<NavRecord> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].nav, 101.0);
    }

    #[test]
    fn trades_csv_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.csv");
        let trade = Trade {
            entry_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            exit_time: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            entry_price: 100.0,
            exit_price: 110.0,
            pnl: 0.0,
        };
        write_trades_csv(&path, &[trade.clone()]).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<Trade> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows, vec![trade]);
    }

    #[test]
    fn history_csv_encodes_params_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        let entry = HistoryEntry {
            params: ParamVector::new().with("lookback", ParamValue::Int(20)),
            score: -12.5,
        };
        write_history_csv(&path, &[entry]).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<(String, f64)> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1, -12.5);
        let decoded: ParamVector = serde_json::from_str(&rows[0].0).unwrap();
        assert_eq!(decoded.get_int("lookback").unwrap(), 20);
    }

    #[test]
    fn empty_series_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        write_history_csv(&path, &[]).unwrap();
        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.records().count(), 0);
    }
}
