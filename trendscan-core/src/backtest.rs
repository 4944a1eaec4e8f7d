//! Win-rate backtester: walk-forward replay of the classifier.
//!
//! For every decision index in the trailing window, indicators are recomputed
//! from `bars[..=idx]` only, the classifier is asked what it would have said at
//! that bar's close, and the next `forward_window` bars are scanned to see
//! whether the hypothetical stop or target was hit first.
//!
//! Each index sees only its own prefix of the series. Indices are evaluated on
//! the rayon pool and trials are re-sorted by index afterwards.
//!
//! This is a coarse heuristic, not a backtest with costs or slippage.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::{Direction, SignalClassifier};
use crate::domain::Bar;
use crate::sizer::StopPolicy;
use crate::snapshot::IndicatorCalculator;

/// What to do with a trial that hits neither stop nor target in the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InconclusivePolicy {
    /// Counted as a signal, never as a win.
    CountAsLoss,
    /// Left out of the denominator entirely.
    Exclude,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WinRateConfig {
    /// Trailing decision window, in bars.
    pub lookback_bars: usize,
    /// Bars scanned after each decision.
    pub forward_window: usize,
    /// Shorter series produce no estimate; also the earliest decision index.
    pub min_history: usize,
    pub inconclusive: InconclusivePolicy,
    /// Hypothetical exits. Tighter than the live plan by default (1x / 2x ATR).
    pub exits: StopPolicy,
}

impl Default for WinRateConfig {
    fn default() -> Self {
        Self {
            lookback_bars: 60,
            forward_window: 5,
            min_history: 120,
            inconclusive: InconclusivePolicy::CountAsLoss,
            exits: StopPolicy::atr(1.0, 2.0),
        }
    }
}

/// Outcome of one hypothetical trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialOutcome {
    Win,
    Loss,
    Inconclusive,
}

/// One decision the replay acted on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub index: usize,
    pub direction: Direction,
    pub entry: f64,
    pub stop_loss: f64,
    pub target: f64,
    pub outcome: TrialOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WinRateReport {
    /// Decision indices walked.
    pub evaluated: usize,
    /// Non-NONE verdicts with a usable stop.
    pub total_signals: usize,
    pub wins: usize,
    pub losses: usize,
    pub inconclusive: usize,
    /// Percentage in `[0, 100]`, `None` when unavailable.
    pub win_rate: Option<f64>,
    /// Trials in index order.
    pub trials: Vec<Trial>,
}

#[derive(Debug, Clone)]
pub struct WinRateBacktester {
    calculator: IndicatorCalculator,
    classifier: SignalClassifier,
    config: WinRateConfig,
}

impl WinRateBacktester {
    pub fn new(
        calculator: IndicatorCalculator,
        classifier: SignalClassifier,
        config: WinRateConfig,
    ) -> Self {
        Self {
            calculator,
            classifier,
            config,
        }
    }

    pub fn config(&self) -> &WinRateConfig {
        &self.config
    }

    /// Win-rate percentage, or `None` if unavailable.
    pub fn estimate_win_rate(&self, bars: &[Bar]) -> Option<f64> {
        self.run(bars).win_rate
    }

    /// Half-open range of decision indices for a series of length `n`.
    pub fn decision_range(&self, n: usize) -> std::ops::Range<usize> {
        let WinRateConfig {
            lookback_bars,
            forward_window,
            min_history,
            ..
        } = self.config;
        let end = n.saturating_sub(forward_window);
        let start = min_history.max(n.saturating_sub(lookback_bars + forward_window));
        start..end.max(start)
    }

    /// Full replay with per-trial detail.
    pub fn run(&self, bars: &[Bar]) -> WinRateReport {
        if bars.len() < self.config.min_history {
            debug!(
                bars = bars.len(),
                min = self.config.min_history,
                "series too short for win-rate estimate"
            );
            return WinRateReport::default();
        }

        let range = self.decision_range(bars.len());
        let evaluated = range.len();

        let mut trials: Vec<Trial> = range
            .into_par_iter()
            .filter_map(|idx| self.trial_at(bars, idx))
            .collect();
        trials.sort_by_key(|t| t.index);

        let mut report = WinRateReport {
            evaluated,
            total_signals: trials.len(),
            ..WinRateReport::default()
        };
        for trial in &trials {
            match trial.outcome {
                TrialOutcome::Win => report.wins += 1,
                TrialOutcome::Loss => report.losses += 1,
                TrialOutcome::Inconclusive => report.inconclusive += 1,
            }
        }

        let scored = match self.config.inconclusive {
            InconclusivePolicy::CountAsLoss => report.total_signals,
            InconclusivePolicy::Exclude => report.total_signals - report.inconclusive,
        };
        report.win_rate = (scored > 0).then(|| 100.0 * report.wins as f64 / scored as f64);
        report.trials = trials;

        debug!(
            evaluated = report.evaluated,
            signals = report.total_signals,
            wins = report.wins,
            win_rate = ?report.win_rate,
            "win-rate replay finished"
        );
        report
    }

    /// Replay the decision at `idx` using `bars[..=idx]` only.
    fn trial_at(&self, bars: &[Bar], idx: usize) -> Option<Trial> {
        let (snapshot, previous) = self.calculator.evaluate(&bars[..=idx]);
        let entry = bars[idx].close;
        let direction = self
            .classifier
            .classify(entry, &snapshot, previous.as_ref())
            .direction?;

        let distances = self.config.exits.distances(entry, &snapshot)?;
        let sign = direction.sign();
        let stop_loss = entry - sign * distances.stop;
        let target = entry + sign * distances.target;

        let forward_end = (idx + 1 + self.config.forward_window).min(bars.len());
        let outcome = scan_outcome(direction, stop_loss, target, &bars[idx + 1..forward_end]);

        Some(Trial {
            index: idx,
            direction,
            entry,
            stop_loss,
            target,
            outcome,
        })
    }
}

/// Scan forward bars in order. Within one bar the stop is checked first.
pub fn scan_outcome(
    direction: Direction,
    stop_loss: f64,
    target: f64,
    forward: &[Bar],
) -> TrialOutcome {
    for bar in forward {
        let (stopped, reached) = match direction {
            Direction::Buy => (bar.low <= stop_loss, bar.high >= target),
            Direction::Sell => (bar.high >= stop_loss, bar.low <= target),
        };
        if stopped {
            return TrialOutcome::Loss;
        }
        if reached {
            return TrialOutcome::Win;
        }
    }
    TrialOutcome::Inconclusive
}

/// One-shot estimate over the trailing `lookback_bars` decisions.
pub fn estimate_win_rate(
    bars: &[Bar],
    lookback_bars: usize,
    calculator: &IndicatorCalculator,
    classifier: &SignalClassifier,
    config: &WinRateConfig,
) -> Option<f64> {
    let config = WinRateConfig {
        lookback_bars,
        ..*config
    };
    WinRateBacktester::new(calculator.clone(), classifier.clone(), config).estimate_win_rate(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifierConfig;
    use crate::indicators::{assert_approx, make_bars, make_ohlc_bars};
    use crate::snapshot::IndicatorPeriods;

    fn backtester(config: WinRateConfig) -> WinRateBacktester {
        WinRateBacktester::new(
            IndicatorCalculator::new(IndicatorPeriods::default()),
            SignalClassifier::new(ClassifierConfig::default()),
            config,
        )
    }

    #[test]
    fn buy_target_first_is_win() {
        let fwd = make_ohlc_bars(&[(100.0, 101.0, 99.5, 100.5), (100.5, 104.0, 100.0, 103.5)]);
        assert_eq!(scan_outcome(Direction::Buy, 98.0, 103.0, &fwd), TrialOutcome::Win);
    }

    #[test]
    fn buy_stop_first_is_loss() {
        let fwd = make_ohlc_bars(&[(100.0, 101.0, 97.5, 98.0), (98.0, 110.0, 97.0, 109.0)]);
        assert_eq!(scan_outcome(Direction::Buy, 98.0, 103.0, &fwd), TrialOutcome::Loss);
    }

    #[test]
    fn same_bar_touching_both_is_loss() {
        let fwd = make_ohlc_bars(&[(100.0, 104.0, 97.0, 100.0)]);
        assert_eq!(scan_outcome(Direction::Buy, 98.0, 103.0, &fwd), TrialOutcome::Loss);
    }

    #[test]
    fn sell_mirrors_buy() {
        let fwd = make_ohlc_bars(&[(100.0, 100.5, 96.0, 96.5)]);
        assert_eq!(scan_outcome(Direction::Sell, 102.0, 97.0, &fwd), TrialOutcome::Win);
        let fwd = make_ohlc_bars(&[(100.0, 102.5, 99.0, 102.0)]);
        assert_eq!(scan_outcome(Direction::Sell, 102.0, 97.0, &fwd), TrialOutcome::Loss);
    }

    #[test]
    fn neither_hit_is_inconclusive() {
        let fwd = make_ohlc_bars(&[(100.0, 101.0, 99.0, 100.0); 5]);
        assert_eq!(
            scan_outcome(Direction::Buy, 98.0, 103.0, &fwd),
            TrialOutcome::Inconclusive
        );
    }

    #[test]
    fn flat_series_has_no_estimate() {
        let bars = make_bars(&[100.0; 200]);
        let calc = IndicatorCalculator::new(IndicatorPeriods::default());
        let cls = SignalClassifier::new(ClassifierConfig::default());
        assert_eq!(
            estimate_win_rate(&bars, 60, &calc, &cls, &WinRateConfig::default()),
            None
        );
    }

    #[test]
    fn short_series_has_no_estimate() {
        let bars = make_bars(&(0..100).map(|i| 100.0 + i as f64).collect::<Vec<_>>());
        let report = backtester(WinRateConfig::default()).run(&bars);
        assert_eq!(report.evaluated, 0);
        assert_eq!(report.win_rate, None);
    }

    #[test]
    fn decision_range_bounds() {
        let bt = backtester(WinRateConfig::default());
        assert_eq!(bt.decision_range(250), 185..245);
        // min_history dominates on shorter series
        assert_eq!(bt.decision_range(150), 120..145);
        // empty when nothing fits
        assert!(bt.decision_range(122).is_empty());
    }

    #[test]
    fn steady_uptrend_wins_every_trial() {
        // +1 per bar, each bar spanning prev_close - 1 ..= close + 1: true
        // range is 3, so the 2x target (+6) is touched on the fifth forward
        // bar while lows stay 1 below entry, well clear of the 1x stop.
        let closes: Vec<f64> = (0..260).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars(&closes);
        let report = backtester(WinRateConfig::default()).run(&bars);

        assert_eq!(report.evaluated, 60);
        assert_eq!(report.total_signals, 60);
        assert_eq!(report.wins, 60);
        assert_eq!(report.losses, 0);
        assert!(report.trials.iter().all(|t| t.direction == Direction::Buy));
        assert!(report.trials.windows(2).all(|w| w[0].index < w[1].index));
        assert_approx(report.win_rate.unwrap(), 100.0, 1e-12);
    }

    #[test]
    fn exclude_policy_drops_inconclusive_from_denominator() {
        // Uptrend that stalls: trials near the end cannot reach the target.
        let mut closes: Vec<f64> = (0..240).map(|i| 100.0 + i as f64).collect();
        closes.extend(std::iter::repeat(339.0).take(10));
        let bars = make_bars(&closes);

        let counted = backtester(WinRateConfig::default()).run(&bars);
        let excluded = backtester(WinRateConfig {
            inconclusive: InconclusivePolicy::Exclude,
            ..WinRateConfig::default()
        })
        .run(&bars);

        assert_eq!(counted.total_signals, excluded.total_signals);
        if let (Some(a), Some(b)) = (counted.win_rate, excluded.win_rate) {
            assert!(b >= a);
        }
    }
}
