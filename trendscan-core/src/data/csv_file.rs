//! CSV bar files, one per symbol.
//!
//! Expected layout: `<dir>/<SYMBOL>.csv` with a header row
//! `timestamp,open,high,low,close,volume`. Timestamps are RFC 3339 or plain
//! `YYYY-MM-DD` dates (taken as midnight UTC). Rows must already be sorted
//! oldest first; the series is validated on load.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::debug;

use super::provider::{tail, BarProvider, DataError};
use crate::domain::{validate_series, Bar};

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }

    /// Read every row for `symbol`.
    pub fn load(&self, symbol: &str) -> Result<Vec<Bar>, DataError> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        let file = std::fs::File::open(&path).map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let bars = read_bars(symbol, file)?;
        debug!(symbol, bars = bars.len(), path = %path.display(), "loaded CSV bars");
        Ok(bars)
    }
}

impl BarProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(&self, symbol: &str, lookback: usize) -> Result<Vec<Bar>, DataError> {
        self.load(symbol).map(|bars| tail(bars, lookback))
    }
}

/// Parse bars from any CSV reader.
pub fn read_bars<R: std::io::Read>(symbol: &str, reader: R) -> Result<Vec<Bar>, DataError> {
    let csv_err = |source| DataError::Csv {
        symbol: symbol.to_string(),
        source,
    };
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut bars = Vec::new();
    for row in rdr.deserialize::<CsvRow>() {
        let row = row.map_err(csv_err)?;
        let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| DataError::Malformed {
            symbol: symbol.to_string(),
            reason: format!("unparseable timestamp {:?}", row.timestamp),
        })?;
        if !(row.volume.is_finite() && row.volume >= 0.0) {
            return Err(DataError::Malformed {
                symbol: symbol.to_string(),
                reason: format!("bad volume {} at {}", row.volume, row.timestamp),
            });
        }
        bars.push(Bar {
            timestamp,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume as u64,
        });
    }

    validate_series(&bars).map_err(|source| DataError::InvalidSeries {
        symbol: symbol.to_string(),
        source,
    })?;
    Ok(bars)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE: &str = "\
timestamp,open,high,low,close,volume
2024-01-02,100.0,102.0,99.0,101.5,120000
2024-01-03,101.5,103.0,100.5,102.0,95000
2024-01-04T09:15:00+05:30,102.0,104.0,101.0,103.5,110000
";

    #[test]
    fn parses_dates_and_rfc3339() {
        let bars = read_bars("TEST", SAMPLE.as_bytes()).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(
            bars[0].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
        );
        assert_eq!(
            bars[2].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 4, 3, 45, 0).unwrap()
        );
        assert_eq!(bars[1].volume, 95_000);
    }

    #[test]
    fn rejects_bad_timestamp() {
        let data = "timestamp,open,high,low,close,volume\nyesterday,1,1,1,1,1\n";
        let err = read_bars("TEST", data.as_bytes()).unwrap_err();
        assert!(matches!(err, DataError::Malformed { .. }));
    }

    #[test]
    fn rejects_out_of_order_rows() {
        let data = "timestamp,open,high,low,close,volume\n\
                    2024-01-03,1,1,1,1,1\n\
                    2024-01-02,1,1,1,1,1\n";
        let err = read_bars("TEST", data.as_bytes()).unwrap_err();
        assert!(matches!(err, DataError::InvalidSeries { .. }));
    }

    #[test]
    fn provider_reads_directory_and_tails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("HDFCBANK.NS.csv"), SAMPLE).unwrap();
        let provider = CsvProvider::new(dir.path());

        let bars = provider.fetch("HDFCBANK.NS", 2).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].close, 103.5);

        let err = provider.fetch("MISSING.NS", 10).unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound { .. }));
    }
}
