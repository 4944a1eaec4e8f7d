//! Indicator implementations.
//!
//! Indicators are pure functions: bar history in, numeric series out. The
//! output series has the same length as the input and holds `f64::NAN` during
//! warmup. No value at bar `t` may depend on bars after `t`.
//!
//! The named series helpers (`ema_of_series`, `sma_of_series`, `true_range`,
//! `wilder_smooth`) are the building blocks; the structs wrap them with a
//! period and a name.

pub mod adx;
pub mod atr;
pub mod ema;
pub mod rsi;
pub mod sma;

pub use adx::Adx;
pub use atr::{true_range, wilder_smooth, Atr};
pub use ema::{ema_of_series, Ema};
pub use rsi::Rsi;
pub use sma::{sma_of_series, Sma, SmaSource};

use crate::domain::Bar;

/// Trait for indicators.
///
/// # Look-ahead contamination guard
/// Every indicator must produce identical values for bars `0..k` whether it
/// is computed on `bars[..k]` or on the full series.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "ema_20", "atr_14").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    use chrono::{Duration, TimeZone, Utc};
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: base + Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect()
}

/// Create bars from explicit (open, high, low, close) tuples for testing.
#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    use chrono::{Duration, TimeZone, Utc};
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Bar {
            timestamp: base + Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume: 1000,
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
