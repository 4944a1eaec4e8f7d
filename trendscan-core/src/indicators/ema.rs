//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = k * close[t] + (1 - k) * EMA[t-1], k = 2 / (period + 1)
//! Seed: EMA[period-1] = SMA of first `period` close values.
//! Lookback: period - 1.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            name: format!("ema_{period}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        ema_of_series(&closes, self.period)
    }
}

/// Compute EMA values over an arbitrary f64 series.
///
/// NaN inside the seed window leaves the whole output NaN; NaN after the seed
/// taints every later value.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if n < period || period == 0 {
        return result;
    }

    let k = 2.0 / (period as f64 + 1.0);

    // Seed: SMA of first `period` values
    let mut sum = 0.0;
    for &v in values.iter().take(period) {
        if v.is_nan() {
            return result;
        }
        sum += v;
    }
    let seed = sum / period as f64;
    result[period - 1] = seed;

    let mut prev = seed;
    for i in period..n {
        if values[i].is_nan() {
            return result;
        }
        let ema = values[i] * k + prev * (1.0 - k);
        result[i] = ema;
        prev = ema;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn ema_period_1_equals_close() {
        let bars = make_bars(&[100.0, 200.0, 300.0]);
        let result = Ema::new(1).compute(&bars);
        assert_approx(result[0], 100.0, DEFAULT_EPSILON);
        assert_approx(result[1], 200.0, DEFAULT_EPSILON);
        assert_approx(result[2], 300.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_3_known_values() {
        // k = 2/(3+1) = 0.5
        // Seed at index 2: SMA(10,11,12) = 11.0
        // EMA[3] = 0.5*13 + 0.5*11.0 = 12.0
        // EMA[4] = 0.5*14 + 0.5*12.0 = 13.0
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let result = Ema::new(3).compute(&bars);

        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 11.0, DEFAULT_EPSILON);
        assert_approx(result[3], 12.0, DEFAULT_EPSILON);
        assert_approx(result[4], 13.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_short_input_is_all_nan() {
        let bars = make_bars(&[10.0, 11.0]);
        let result = Ema::new(3).compute(&bars);
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn ema_nan_in_seed_produces_all_nan() {
        let mut bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        bars[1].close = f64::NAN;
        let result = Ema::new(3).compute(&bars);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn ema_nan_after_seed_propagates() {
        let mut bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        bars[3].close = f64::NAN;
        let result = Ema::new(3).compute(&bars);
        assert_approx(result[2], 11.0, DEFAULT_EPSILON);
        assert!(result[3].is_nan());
        assert!(result[4].is_nan());
    }

    #[test]
    fn ema_lookback() {
        assert_eq!(Ema::new(20).lookback(), 19);
        assert_eq!(Ema::new(1).lookback(), 0);
    }

    #[test]
    fn ema_of_series_zero_period_is_nan() {
        let result = ema_of_series(&[1.0, 2.0, 3.0], 0);
        assert!(result.iter().all(|v| v.is_nan()));
    }
}
