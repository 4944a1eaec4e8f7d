//! Bar provider trait and structured error types.
//!
//! `BarProvider` abstracts over where bars come from (CSV files, a synthetic
//! generator, an in-memory map in tests) so the engine never knows which one
//! it is talking to.

use std::collections::HashMap;

use thiserror::Error;

use crate::domain::{Bar, BarError};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error for {symbol}: {source}")]
    Csv {
        symbol: String,
        #[source]
        source: csv::Error,
    },

    #[error("malformed data for {symbol}: {reason}")]
    Malformed { symbol: String, reason: String },

    #[error("invalid series for {symbol}: {source}")]
    InvalidSeries {
        symbol: String,
        #[source]
        source: BarError,
    },
}

/// Source of historical OHLCV bars.
pub trait BarProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// The most recent `lookback` bars for `symbol`, oldest first. Fewer bars
    /// than asked for is not an error; the engine decides what is enough.
    fn fetch(&self, symbol: &str, lookback: usize) -> Result<Vec<Bar>, DataError>;
}

/// Keep only the trailing `lookback` bars.
pub(crate) fn tail(mut bars: Vec<Bar>, lookback: usize) -> Vec<Bar> {
    if bars.len() > lookback {
        bars.drain(..bars.len() - lookback);
    }
    bars
}

/// Fixed bars held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    series: HashMap<String, Vec<Bar>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: impl Into<String>, bars: Vec<Bar>) {
        self.series.insert(symbol.into(), bars);
    }

    pub fn with(mut self, symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        self.insert(symbol, bars);
        self
    }
}

impl BarProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch(&self, symbol: &str, lookback: usize) -> Result<Vec<Bar>, DataError> {
        self.series
            .get(symbol)
            .map(|bars| tail(bars.clone(), lookback))
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn memory_provider_returns_tail() {
        let provider = MemoryProvider::new().with("ITC.NS", make_bars(&[1.0, 2.0, 3.0, 4.0]));
        let bars = provider.fetch("ITC.NS", 2).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 3.0);
        assert_eq!(bars[1].close, 4.0);

        // asking for more than exists returns everything
        assert_eq!(provider.fetch("ITC.NS", 100).unwrap().len(), 4);
    }

    #[test]
    fn memory_provider_unknown_symbol() {
        let err = MemoryProvider::new().fetch("NOPE", 10).unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound { .. }));
        assert_eq!(err.to_string(), "symbol not found: NOPE");
    }
}
