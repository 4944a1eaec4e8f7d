//! Simple Moving Average (SMA).
//!
//! Rolling mean over a lookback window, of either closes or volumes.
//! Lookback: period - 1 (first valid value at index period-1).

use super::Indicator;
use crate::domain::Bar;

/// Which bar field the SMA averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmaSource {
    Close,
    Volume,
}

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    source: SmaSource,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        Self::with_source(period, SmaSource::Close)
    }

    /// Volume baseline: SMA of bar volume.
    pub fn of_volume(period: usize) -> Self {
        Self::with_source(period, SmaSource::Volume)
    }

    pub fn with_source(period: usize, source: SmaSource) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        let name = match source {
            SmaSource::Close => format!("sma_{period}"),
            SmaSource::Volume => format!("volume_sma_{period}"),
        };
        Self {
            period,
            source,
            name,
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let values: Vec<f64> = match self.source {
            SmaSource::Close => bars.iter().map(|b| b.close).collect(),
            SmaSource::Volume => bars.iter().map(|b| b.volume as f64).collect(),
        };
        sma_of_series(&values, self.period)
    }
}

/// Rolling mean of an arbitrary f64 series. Any NaN inside a window makes
/// that window's value NaN.
pub fn sma_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if n < period || period == 0 {
        return result;
    }

    let mut sum = 0.0;
    let mut nan_count = 0usize;
    for &v in values.iter().take(period) {
        if v.is_nan() {
            nan_count += 1;
        } else {
            sum += v;
        }
    }
    if nan_count == 0 {
        result[period - 1] = sum / period as f64;
    }

    // Roll the window forward, tracking NaNs by count so `sum` stays finite.
    for i in period..n {
        let leaving = values[i - period];
        let entering = values[i];
        if leaving.is_nan() {
            nan_count -= 1;
        } else {
            sum -= leaving;
        }
        if entering.is_nan() {
            nan_count += 1;
        } else {
            sum += entering;
        }
        if nan_count == 0 {
            result[i] = sum / period as f64;
        }
    }

    result
}
