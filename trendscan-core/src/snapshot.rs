//! Indicator calculator: bar series in, `IndicatorSnapshot` out.
//!
//! The calculator is a pure function of its input: it holds only periods, so
//! computing on a truncated slice gives exactly the values the full series
//! had at that point. The win-rate backtester relies on this.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::indicators::{Adx, Atr, Ema, Indicator, Rsi, Sma};

/// Periods for every indicator in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorPeriods {
    pub ema_fast: usize,
    pub ema_mid: usize,
    pub ema_slow: usize,
    pub adx: usize,
    pub atr: usize,
    pub rsi: usize,
    pub volume: usize,
}

impl Default for IndicatorPeriods {
    /// Daily scan: EMA 20/50/200, Wilder 14, volume 20.
    fn default() -> Self {
        Self {
            ema_fast: 20,
            ema_mid: 50,
            ema_slow: 200,
            adx: 14,
            atr: 14,
            rsi: 14,
            volume: 20,
        }
    }
}

impl IndicatorPeriods {
    /// Intraday scan: EMA 9/21/50.
    pub fn intraday() -> Self {
        Self {
            ema_fast: 9,
            ema_mid: 21,
            ema_slow: 50,
            ..Self::default()
        }
    }

    /// Bars needed before every snapshot component is defined.
    pub fn min_bars(&self) -> usize {
        [
            self.ema_fast,
            self.ema_mid,
            self.ema_slow,
            2 * self.adx,
            self.atr + 1,
            self.rsi + 1,
            self.volume,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

/// Indicator values as of one bar. `None` means "not ready": insufficient
/// history, or a non-finite value somewhere upstream.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub close: Option<f64>,
    pub ema_fast: Option<f64>,
    pub ema_mid: Option<f64>,
    pub ema_slow: Option<f64>,
    pub adx: Option<f64>,
    pub atr: Option<f64>,
    pub rsi: Option<f64>,
    pub volume: Option<f64>,
    pub volume_avg: Option<f64>,
}

impl IndicatorSnapshot {
    /// True when every component is defined.
    pub fn is_complete(&self) -> bool {
        [
            self.close,
            self.ema_fast,
            self.ema_mid,
            self.ema_slow,
            self.adx,
            self.atr,
            self.rsi,
            self.volume,
            self.volume_avg,
        ]
        .iter()
        .all(Option::is_some)
    }
}

/// Full indicator series for a bar slice, one value per bar.
#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    close: Vec<f64>,
    ema_fast: Vec<f64>,
    ema_mid: Vec<f64>,
    ema_slow: Vec<f64>,
    adx: Vec<f64>,
    atr: Vec<f64>,
    rsi: Vec<f64>,
    volume: Vec<f64>,
    volume_avg: Vec<f64>,
}

impl IndicatorSeries {
    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    /// Snapshot at bar `index`; all-`None` when out of range.
    pub fn snapshot_at(&self, index: usize) -> IndicatorSnapshot {
        let at = |series: &[f64]| series.get(index).copied().and_then(finite);
        IndicatorSnapshot {
            close: at(&self.close),
            ema_fast: at(&self.ema_fast),
            ema_mid: at(&self.ema_mid),
            ema_slow: at(&self.ema_slow),
            adx: at(&self.adx),
            atr: at(&self.atr),
            rsi: at(&self.rsi),
            volume: at(&self.volume),
            volume_avg: at(&self.volume_avg),
        }
    }
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

/// Computes indicator snapshots from bar series.
#[derive(Debug, Clone)]
pub struct IndicatorCalculator {
    periods: IndicatorPeriods,
    ema_fast: Ema,
    ema_mid: Ema,
    ema_slow: Ema,
    adx: Adx,
    atr: Atr,
    rsi: Rsi,
    volume_avg: Sma,
}

impl IndicatorCalculator {
    /// Panics if any period is zero; `EngineConfig::validate` rejects those
    /// before construction.
    pub fn new(periods: IndicatorPeriods) -> Self {
        Self {
            periods,
            ema_fast: Ema::new(periods.ema_fast),
            ema_mid: Ema::new(periods.ema_mid),
            ema_slow: Ema::new(periods.ema_slow),
            adx: Adx::new(periods.adx),
            atr: Atr::new(periods.atr),
            rsi: Rsi::new(periods.rsi),
            volume_avg: Sma::of_volume(periods.volume),
        }
    }

    pub fn periods(&self) -> &IndicatorPeriods {
        &self.periods
    }

    /// Compute every indicator series over `bars`.
    pub fn series(&self, bars: &[Bar]) -> IndicatorSeries {
        IndicatorSeries {
            close: bars.iter().map(|b| b.close).collect(),
            ema_fast: self.ema_fast.compute(bars),
            ema_mid: self.ema_mid.compute(bars),
            ema_slow: self.ema_slow.compute(bars),
            adx: self.adx.compute(bars),
            atr: self.atr.compute(bars),
            rsi: self.rsi.compute(bars),
            volume: bars.iter().map(|b| b.volume as f64).collect(),
            volume_avg: self.volume_avg.compute(bars),
        }
    }

    /// Snapshot as of the last bar. Empty or short input yields `None` fields.
    pub fn compute(&self, bars: &[Bar]) -> IndicatorSnapshot {
        self.evaluate(bars).0
    }

    /// Snapshot as of the last bar, plus the one as of the bar before it
    /// (needed for fresh-crossover detection).
    pub fn evaluate(&self, bars: &[Bar]) -> (IndicatorSnapshot, Option<IndicatorSnapshot>) {
        let Some(last) = bars.len().checked_sub(1) else {
            return (IndicatorSnapshot::default(), None);
        };
        let series = self.series(bars);
        let previous = last.checked_sub(1).map(|i| series.snapshot_at(i));
        (series.snapshot_at(last), previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars};

    fn trending_closes(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64 * 0.5).collect()
    }

    #[test]
    fn short_series_leaves_averages_undefined() {
        let bars = make_bars(&trending_closes(10));
        let snap = IndicatorCalculator::new(IndicatorPeriods::default()).compute(&bars);
        assert!(snap.ema_fast.is_none());
        assert!(snap.ema_mid.is_none());
        assert!(snap.ema_slow.is_none());
        assert!(snap.adx.is_none());
        assert!(snap.atr.is_none());
        assert!(!snap.is_complete());
        assert_eq!(snap.close, Some(104.5));
    }

    #[test]
    fn empty_series_is_all_none() {
        let (snap, prev) = IndicatorCalculator::new(IndicatorPeriods::default()).evaluate(&[]);
        assert_eq!(snap, IndicatorSnapshot::default());
        assert!(prev.is_none());
    }

    #[test]
    fn complete_once_min_bars_reached() {
        let periods = IndicatorPeriods::default();
        let calc = IndicatorCalculator::new(periods);
        let bars = make_bars(&trending_closes(periods.min_bars()));
        assert!(calc.compute(&bars).is_complete());
        let short = &bars[..periods.min_bars() - 1];
        assert!(!calc.compute(short).is_complete());
    }

    #[test]
    fn previous_snapshot_matches_truncated_compute() {
        let calc = IndicatorCalculator::new(IndicatorPeriods::intraday());
        let bars = make_bars(&trending_closes(80));
        let (_, prev) = calc.evaluate(&bars);
        let truncated = calc.compute(&bars[..79]);
        let prev = prev.unwrap();
        assert_approx(prev.ema_fast.unwrap(), truncated.ema_fast.unwrap(), 1e-12);
        assert_approx(prev.adx.unwrap(), truncated.adx.unwrap(), 1e-12);
    }

    #[test]
    fn non_finite_values_become_none() {
        let mut bars = make_bars(&trending_closes(60));
        bars[59].close = f64::INFINITY;
        let snap = IndicatorCalculator::new(IndicatorPeriods::intraday()).compute(&bars);
        assert!(snap.close.is_none());
        assert!(snap.ema_fast.is_none());
    }

    #[test]
    fn min_bars_default_is_slow_ema() {
        assert_eq!(IndicatorPeriods::default().min_bars(), 200);
        assert_eq!(IndicatorPeriods::intraday().min_bars(), 50);
    }

    #[test]
    fn volume_baseline_present() {
        let bars = make_bars(&trending_closes(25));
        let snap = IndicatorCalculator::new(IndicatorPeriods::intraday()).compute(&bars);
        assert_eq!(snap.volume, Some(1000.0));
        assert_eq!(snap.volume_avg, Some(1000.0));
    }
}
