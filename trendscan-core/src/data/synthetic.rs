//! Deterministic random-walk bars for demos and tests.
//!
//! Each symbol gets its own RNG seeded from a BLAKE3 hash of the symbol (and
//! an optional salt), so the same request always yields the same bars.
//! Weekends are skipped.

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{BarProvider, DataError};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    end: DateTime<Utc>,
    start_price: f64,
    /// Mean daily return added to the symmetric ±3% noise.
    drift: f64,
    salt: String,
}

impl SyntheticProvider {
    /// Bars ending on or before `end`.
    pub fn new(end: DateTime<Utc>) -> Self {
        Self {
            end,
            start_price: 100.0,
            drift: 0.0,
            salt: String::new(),
        }
    }

    pub fn with_drift(mut self, drift: f64) -> Self {
        self.drift = drift;
        self
    }

    pub fn with_start_price(mut self, price: f64) -> Self {
        self.start_price = price;
        self
    }

    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = salt.into();
        self
    }

    fn rng_for(&self, symbol: &str) -> StdRng {
        let mut hasher = blake3::Hasher::new();
        hasher.update(symbol.as_bytes());
        hasher.update(self.salt.as_bytes());
        StdRng::from_seed(*hasher.finalize().as_bytes())
    }

    /// Weekday timestamps, oldest first, `count` of them ending at `end`.
    fn trading_days(&self, count: usize) -> Vec<DateTime<Utc>> {
        let mut days = Vec::with_capacity(count);
        let mut current = self.end;
        while days.len() < count {
            if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
                days.push(current);
            }
            current -= Duration::days(1);
        }
        days.reverse();
        days
    }

    pub fn generate(&self, symbol: &str, count: usize) -> Vec<Bar> {
        let mut rng = self.rng_for(symbol);
        let mut price = self.start_price;

        self.trading_days(count)
            .into_iter()
            .map(|timestamp| {
                let daily_return: f64 = self.drift + rng.gen_range(-0.03..0.03);
                let open = price;
                let close = price * (1.0 + daily_return);
                let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
                let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
                let volume = rng.gen_range(500_000..5_000_000u64);
                price = close;
                Bar {
                    timestamp,
                    open,
                    high,
                    low,
                    close,
                    volume,
                }
            })
            .collect()
    }
}

impl BarProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(&self, symbol: &str, lookback: usize) -> Result<Vec<Bar>, DataError> {
        Ok(self.generate(symbol, lookback))
    }
}
