//! Symbol universes: the list of tickers a scan walks.
//!
//! Stored as TOML:
//!
//! ```toml
//! name = "nifty-large-caps"
//! suffix = ".NS"
//! symbols = ["RELIANCE", "TCS"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::ConfigError;

/// Fallback NSE top-100 list, used when no universe file is given.
const NSE_TOP_100: &[&str] = &[
    "RELIANCE", "HDFCBANK", "ICICIBANK", "INFY", "TCS", "AXISBANK", "SBIN", "KOTAKBANK", "LT",
    "BHARTIARTL", "ITC", "HINDUNILVR", "HCLTECH", "WIPRO", "ASIANPAINT", "SUNPHARMA",
    "ULTRACEMCO", "NESTLEIND", "BAJFINANCE", "BAJAJFINSV", "POWERGRID", "JSWSTEEL", "TITAN",
    "MARUTI", "TATASTEEL", "ADANIENT", "ADANIPORTS", "TECHM", "CIPLA", "DRREDDY", "DIVISLAB",
    "ONGC", "COALINDIA", "BPCL", "IOC", "GRASIM", "HEROMOTOCO", "BRITANNIA", "SHREECEM",
    "EICHERMOT", "APOLLOHOSP", "HDFCLIFE", "SBILIFE", "ICICIPRULI", "INDUSINDBK", "BAJAJ-AUTO",
    "M&M", "TATAMOTORS", "UPL", "VEDL", "NTPC", "HINDALCO", "LTIM", "LTTS", "DABUR",
    "PIDILITIND", "PEL", "JINDALSTEL", "SRF", "SIEMENS", "TORNTPHARM", "AMBUJACEM",
    "BANDHANBNK", "GAIL", "BOSCHLTD", "COLPAL", "GLAND", "HAL", "MAXHEALTH", "MPHASIS",
    "PAGEIND", "PIIND", "RECLTD", "SAIL", "TATACOMM", "TRENT", "UBL", "VOLTAS", "ZEEL", "ATUL",
    "DLF", "INDIGO", "IRCTC", "LICI", "MUTHOOTFIN", "NAVINFLUOR", "POLYCAB", "RAMCOCEM",
    "TVSMOTOR", "VBL", "CONCOR", "IDFCFIRSTB", "BANKBARODA",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Universe {
    pub name: String,
    /// Exchange suffix appended to bare tickers, e.g. `.NS`.
    #[serde(default)]
    pub suffix: String,
    pub symbols: Vec<String>,
}

impl Universe {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn nse_top_100() -> Self {
        Self {
            name: "nse-top-100".into(),
            suffix: ".NS".into(),
            symbols: NSE_TOP_100.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Exchange-qualified symbol. Already-suffixed tickers are left alone.
    pub fn qualify(&self, ticker: &str) -> String {
        if self.suffix.is_empty() || ticker.ends_with(&self.suffix) {
            ticker.to_string()
        } else {
            format!("{ticker}{}", self.suffix)
        }
    }

    /// Every symbol, qualified, with duplicates removed (first one wins).
    pub fn qualified_symbols(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.symbols
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(|t| self.qualify(t))
            .filter(|s| seen.insert(s.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
