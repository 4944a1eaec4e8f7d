//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! ATR uses Wilder smoothing (alpha = 1/period), seeded with the mean of the
//! first `period` true ranges that have a previous close.
//! Lookback: period (needs period+1 bars).

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

/// True Range series.
///
/// TR[0] is NaN: without a previous close it is only a high-low range, and
/// mixing it into the seed would make ATR[period-1] valid on `period` bars.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let n = bars.len();
    let mut tr = vec![f64::NAN; n];

    for i in 1..n {
        let h = bars[i].high;
        let l = bars[i].low;
        let pc = bars[i - 1].close;
        if h.is_nan() || l.is_nan() || pc.is_nan() {
            continue;
        }
        tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
    }

    tr
}

/// Wilder smoothing (alpha = 1/period).
///
/// Seed is the mean of the first run of `period` consecutive non-NaN values,
/// written at the last index of that run. A NaN after the seed taints every
/// later value.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if n < period || period == 0 {
        return result;
    }

    let mut run = 0usize;
    let mut seed_end = None;
    for (i, v) in values.iter().enumerate() {
        if v.is_nan() {
            run = 0;
            continue;
        }
        run += 1;
        if run == period {
            seed_end = Some(i + 1);
            break;
        }
    }

    let Some(seed_end) = seed_end else {
        return result;
    };

    let seed: f64 = values[seed_end - period..seed_end].iter().sum::<f64>() / period as f64;
    result[seed_end - 1] = seed;

    let alpha = 1.0 / period as f64;
    let mut prev = seed;

    for i in seed_end..n {
        if values[i].is_nan() {
            return result;
        }
        let smoothed = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = smoothed;
        prev = smoothed;
    }

    result
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        wilder_smooth(&true_range(bars), self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_bars, DEFAULT_EPSILON};

    #[test]
    fn true_range_basic() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0), // TR = max(8, |108-102|, |100-102|) = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = max(9, |107-106|, |98-106|) = 9
        ]);
        let tr = true_range(&bars);
        assert!(tr[0].is_nan());
        assert_approx(tr[1], 8.0, DEFAULT_EPSILON);
        assert_approx(tr[2], 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let bars = make_ohlc_bars(&[
            (98.0, 102.0, 97.0, 100.0),
            (110.0, 115.0, 108.0, 112.0), // TR = max(7, |115-100|, |108-100|) = 15
        ]);
        let tr = true_range(&bars);
        assert_approx(tr[1], 15.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_period_3() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0), // TR = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = 9
            (99.0, 103.0, 97.0, 101.0),   // TR = 6
            (101.0, 106.0, 100.0, 105.0), // TR = 6
        ]);
        let result = Atr::new(3).compute(&bars);

        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert!(result[2].is_nan());
        // Seed: mean(8, 9, 6) = 23/3
        // ATR[4] = (1/3)*6 + (2/3)*(23/3) = 64/9
        assert_approx(result[3], 23.0 / 3.0, DEFAULT_EPSILON);
        assert_approx(result[4], 64.0 / 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_needs_period_plus_one_bars() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0),
            (106.0, 107.0, 98.0, 99.0),
        ]);
        assert!(Atr::new(3).compute(&bars).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn wilder_seed_skips_leading_nan() {
        let values = [f64::NAN, 2.0, 4.0, 6.0];
        let result = wilder_smooth(&values, 2);
        assert!(result[1].is_nan());
        assert_approx(result[2], 3.0, DEFAULT_EPSILON);
        // 0.5*6 + 0.5*3 = 4.5
        assert_approx(result[3], 4.5, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_lookback() {
        assert_eq!(Atr::new(14).lookback(), 14);
    }
}
