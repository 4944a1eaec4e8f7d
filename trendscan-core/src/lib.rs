//! TrendScan Core: indicators, signal classification, risk sizing, win-rate
//! replay and alert gating for end-of-day equity scans.
//!
//! Pipeline per symbol:
//! - Indicator snapshot from the bar series (EMA fast/mid/slow, ADX, ATR, RSI,
//!   volume average)
//! - Verdict (BUY / SELL / NONE) with a 0-100 confidence score
//! - Trade plan: entry, stop, target and a quantity bounded by the risk budget
//! - Walk-forward win-rate estimate of the same rule on recent history
//! - Cooldown gate before anything leaves the engine

pub mod backtest;
pub mod classifier;
pub mod config;
pub mod cooldown;
pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod sink;
pub mod sizer;
pub mod snapshot;

pub use backtest::{estimate_win_rate, WinRateBacktester, WinRateConfig, WinRateReport};
pub use classifier::{ClassifierConfig, Direction, RuleSet, SignalClassifier, Verdict};
pub use config::{ConfigError, EngineConfig};
pub use cooldown::{AlertGate, CooldownTracker, DedupPolicy, NoGate};
pub use domain::{Bar, BarError};
pub use engine::{Evaluation, ScanReport, ScanStatus, SignalEngine, TradeSignal};
pub use sizer::{AccountConfig, PositionSizer, StopPolicy, TradePlan};
pub use snapshot::{IndicatorCalculator, IndicatorPeriods, IndicatorSnapshot};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything a scan touches can cross threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<Bar>();
        require_sync::<Bar>();
        require_send::<IndicatorSnapshot>();
        require_sync::<IndicatorSnapshot>();
        require_send::<Verdict>();
        require_sync::<Verdict>();
        require_send::<TradePlan>();
        require_sync::<TradePlan>();
        require_send::<TradeSignal>();
        require_sync::<TradeSignal>();

        require_send::<IndicatorCalculator>();
        require_sync::<IndicatorCalculator>();
        require_send::<SignalClassifier>();
        require_sync::<SignalClassifier>();
        require_send::<PositionSizer>();
        require_sync::<PositionSizer>();
        require_send::<WinRateBacktester>();
        require_sync::<WinRateBacktester>();
        require_send::<SignalEngine>();
        require_sync::<SignalEngine>();
        require_send::<CooldownTracker>();
        require_sync::<CooldownTracker>();

        require_send::<data::CsvProvider>();
        require_sync::<data::CsvProvider>();
        require_send::<data::SyntheticProvider>();
        require_sync::<data::SyntheticProvider>();
        require_send::<data::MemoryProvider>();
        require_sync::<data::MemoryProvider>();
    }

    /// The engine only ever sees gate state through the trait object, so a
    /// shared tracker works from any thread.
    #[test]
    fn engine_scans_from_worker_threads() {
        use std::sync::Arc;

        let engine = Arc::new(SignalEngine::new(EngineConfig::default()).unwrap());
        let gate: Arc<dyn AlertGate> = Arc::new(CooldownTracker::default());
        let closes: Vec<f64> = (0..250).map(|i| 100.0 + i as f64 * 0.5).collect();
        let bars = indicators::make_bars(&closes);
        let now = bars.last().unwrap().timestamp;

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let engine = engine.clone();
                let gate = gate.clone();
                let bars = bars.clone();
                std::thread::spawn(move || {
                    engine
                        .scan_symbol(&format!("S{i}.NS"), &bars, None, now, gate.as_ref())
                        .is_some()
                })
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap());
        }
    }

    #[test]
    fn shared_tracker_emits_one_signal_per_symbol_per_window() {
        use std::sync::{Arc, Barrier};

        let engine = Arc::new(SignalEngine::new(EngineConfig::default()).unwrap());
        let gate: Arc<dyn AlertGate> = Arc::new(CooldownTracker::default());
        let barrier = Arc::new(Barrier::new(8));
        let closes: Vec<f64> = (0..250).map(|i| 100.0 + i as f64 * 0.5).collect();
        let bars = indicators::make_bars(&closes);
        let now = bars.last().unwrap().timestamp;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                let gate = gate.clone();
                let barrier = barrier.clone();
                let bars = bars.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    engine
                        .scan_symbol("TCS.NS", &bars, None, now, gate.as_ref())
                        .is_some()
                })
            })
            .collect();
        let emitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|emitted| *emitted)
            .count();
        assert_eq!(emitted, 1);
    }
}
