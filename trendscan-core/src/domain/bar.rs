//! Bar: the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV bar for a single symbol at a single point in time.
///
/// Bars are immutable once produced. A series is ordered oldest → newest with
/// strictly increasing timestamps; see [`validate_series`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Returns true if any OHLC field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }

    /// High-low range of the bar.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// Structural problems with a bar series.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("duplicate timestamp {timestamp} at index {index}")]
    DuplicateTimestamp {
        index: usize,
        timestamp: DateTime<Utc>,
    },

    #[error("timestamp at index {index} ({timestamp}) is earlier than its predecessor ({previous})")]
    OutOfOrder {
        index: usize,
        timestamp: DateTime<Utc>,
        previous: DateTime<Utc>,
    },
}

/// Check the ordering invariant: timestamps strictly increase, no duplicates.
///
/// Values are not checked here. Non-finite prices are tolerated and surface as
/// undefined indicator values downstream.
pub fn validate_series(bars: &[Bar]) -> Result<(), BarError> {
    for (index, pair) in bars.windows(2).enumerate() {
        let (prev, curr) = (&pair[0], &pair[1]);
        if curr.timestamp == prev.timestamp {
            return Err(BarError::DuplicateTimestamp {
                index: index + 1,
                timestamp: curr.timestamp,
            });
        }
        if curr.timestamp < prev.timestamp {
            return Err(BarError::OutOfOrder {
                index: index + 1,
                timestamp: curr.timestamp,
                previous: prev.timestamp,
            });
        }
    }
    Ok(())
}
