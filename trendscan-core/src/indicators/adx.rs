//! ADX: Average Directional Index (Wilder).
//!
//! Steps:
//! 1. Compute +DM and -DM from consecutive bars
//! 2. Smooth +DM, -DM, and TR using Wilder smoothing (alpha = 1/period)
//! 3. +DI = 100 * smoothed(+DM) / smoothed(TR)
//! 4. -DI = 100 * smoothed(-DM) / smoothed(TR)
//! 5. DX = 100 * |+DI - -DI| / (+DI + -DI)
//! 6. ADX = Wilder-smoothed DX
//!
//! +DM, -DM and TR all start at bar 1, so the three smoothed series share one
//! seed index. First ADX value lands at index 2*period - 1.

use super::atr::{true_range, wilder_smooth};
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    name: String,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ADX period must be >= 1");
        Self {
            period,
            name: format!("adx_{period}"),
        }
    }
}

impl Indicator for Adx {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        2 * self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        if n < 2 {
            return vec![f64::NAN; n];
        }

        let mut plus_dm = vec![f64::NAN; n];
        let mut minus_dm = vec![f64::NAN; n];

        for i in 1..n {
            let (curr, prev) = (&bars[i], &bars[i - 1]);
            if curr.high.is_nan() || curr.low.is_nan() || prev.high.is_nan() || prev.low.is_nan()
            {
                continue;
            }

            let up_move = curr.high - prev.high;
            let down_move = prev.low - curr.low;

            plus_dm[i] = if up_move > down_move && up_move > 0.0 {
                up_move
            } else {
                0.0
            };
            minus_dm[i] = if down_move > up_move && down_move > 0.0 {
                down_move
            } else {
                0.0
            };
        }

        let smooth_tr = wilder_smooth(&true_range(bars), self.period);
        let smooth_plus_dm = wilder_smooth(&plus_dm, self.period);
        let smooth_minus_dm = wilder_smooth(&minus_dm, self.period);

        let mut dx = vec![f64::NAN; n];
        for i in 0..n {
            let (tr, pdm, mdm) = (smooth_tr[i], smooth_plus_dm[i], smooth_minus_dm[i]);
            if tr.is_nan() || pdm.is_nan() || mdm.is_nan() || tr == 0.0 {
                continue;
            }

            let plus_di = 100.0 * pdm / tr;
            let minus_di = 100.0 * mdm / tr;
            let di_sum = plus_di + minus_di;

            dx[i] = if di_sum == 0.0 {
                0.0
            } else {
                100.0 * (plus_di - minus_di).abs() / di_sum
            };
        }

        wilder_smooth(&dx, self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_ohlc_bars;

    #[test]
    fn adx_bounds() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0),
            (106.0, 107.0, 98.0, 99.0),
            (99.0, 103.0, 97.0, 101.0),
            (101.0, 106.0, 100.0, 105.0),
            (105.0, 110.0, 103.0, 108.0),
            (108.0, 112.0, 106.0, 110.0),
            (110.0, 111.0, 104.0, 105.0),
            (105.0, 109.0, 103.0, 107.0),
            (107.0, 113.0, 105.0, 112.0),
        ]);
        let result = Adx::new(3).compute(&bars);

        for (i, &v) in result.iter().enumerate() {
            if !v.is_nan() {
                assert!((0.0..=100.0).contains(&v), "ADX out of bounds at bar {i}: {v}");
            }
        }
    }

    #[test]
    fn adx_first_value_at_twice_period_minus_one() {
        let data: Vec<_> = (0..12)
            .map(|i| {
                let base = 100.0 + i as f64 * 2.0;
                (base, base + 3.0, base - 1.0, base + 2.0)
            })
            .collect();
        let result = Adx::new(3).compute(&make_ohlc_bars(&data));
        assert!(result[4].is_nan());
        assert!(!result[5].is_nan());
    }

    #[test]
    fn adx_strong_trend_is_high() {
        let data: Vec<_> = (0..40)
            .map(|i| {
                let base = 100.0 + i as f64 * 5.0;
                (base - 1.0, base + 3.0, base - 3.0, base + 2.0)
            })
            .collect();
        let result = Adx::new(5).compute(&make_ohlc_bars(&data));
        let last = result[result.len() - 1];
        // Only +DM is ever non-zero, so DX is 100 on every bar.
        assert!(last > 90.0, "ADX should be elevated in strong trend, got {last}");
    }

    #[test]
    fn adx_lookback() {
        assert_eq!(Adx::new(14).lookback(), 27);
        assert_eq!(Adx::new(7).lookback(), 13);
    }

    #[test]
    fn adx_too_few_bars() {
        let bars = make_ohlc_bars(&[(100.0, 105.0, 95.0, 102.0)]);
        let result = Adx::new(3).compute(&bars);
        assert!(result.iter().all(|v| v.is_nan()));
    }
}
