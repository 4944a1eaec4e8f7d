//! Signal engine: bars in, gated trade signals out.
//!
//! Built once from an [`EngineConfig`]; every component it owns is immutable,
//! so one engine can be shared across threads. The only mutable state in a
//! scan is the [`AlertGate`] passed in by the caller.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backtest::WinRateBacktester;
use crate::classifier::{Direction, SignalClassifier, Verdict};
use crate::config::{ConfigError, EngineConfig};
use crate::cooldown::AlertGate;
use crate::data::BarProvider;
use crate::domain::{validate_series, Bar};
use crate::sizer::{PositionSizer, TradePlan};
use crate::snapshot::{IndicatorCalculator, IndicatorSnapshot};

/// Everything the engine knows about one symbol, ungated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub symbol: String,
    pub price: Option<f64>,
    pub bar_timestamp: Option<DateTime<Utc>>,
    pub bars: usize,
    pub snapshot: IndicatorSnapshot,
    pub verdict: Verdict,
    pub plan: Option<TradePlan>,
    pub win_rate: Option<f64>,
}

/// An actionable signal that passed the alert gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    pub symbol: String,
    pub direction: Direction,
    pub price: f64,
    pub stop_loss: f64,
    pub target: f64,
    pub secondary_target: Option<f64>,
    pub quantity: u64,
    pub risk_amount: f64,
    pub risk_pct: f64,
    pub confidence: u8,
    /// Percentage in `[0, 100]`; `None` when the replay had nothing to score.
    pub win_rate_estimate: Option<f64>,
    pub indicator_snapshot: IndicatorSnapshot,
    pub bar_timestamp: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
}

impl fmt::Display for TradeSignal {
    /// Plain-text alert message.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.indicator_snapshot;
        writeln!(f, "TRADE SIGNAL")?;
        writeln!(f, "{}: {} (confidence {})", self.symbol, self.direction, self.confidence)?;
        writeln!(f, "Price: {:.2}", self.price)?;
        writeln!(f, "SL: {:.2}", self.stop_loss)?;
        writeln!(f, "TP: {:.2}", self.target)?;
        if let Some(tp2) = self.secondary_target {
            writeln!(f, "TP2: {tp2:.2}")?;
        }
        writeln!(f, "Qty: {} (risk {:.2}, {:.2}%)", self.quantity, self.risk_amount, self.risk_pct)?;
        writeln!(f)?;
        writeln!(f, "Indicators")?;
        writeln!(f, "EMA fast: {}", fmt_opt(s.ema_fast))?;
        writeln!(f, "EMA mid: {}", fmt_opt(s.ema_mid))?;
        writeln!(f, "EMA slow: {}", fmt_opt(s.ema_slow))?;
        writeln!(f, "ADX: {}", fmt_opt(s.adx))?;
        writeln!(f, "ATR: {}", fmt_opt(s.atr))?;
        writeln!(f, "RSI: {}", fmt_opt(s.rsi))?;
        writeln!(f)?;
        match self.win_rate_estimate {
            Some(wr) => write!(f, "Win rate: {wr:.1}%"),
            None => write!(f, "Win rate: N/A"),
        }
    }
}

/// Why a symbol did or did not produce a signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanStatus {
    Signal,
    NoSignal,
    InsufficientData { bars: usize, required: usize },
    Suppressed,
    InvalidSeries { reason: String },
    ProviderError { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolOutcome {
    pub symbol: String,
    #[serde(flatten)]
    pub status: ScanStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub signals: Vec<TradeSignal>,
    pub outcomes: Vec<SymbolOutcome>,
}

impl ScanReport {
    pub fn count(&self, pred: impl Fn(&ScanStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

#[derive(Debug, Clone)]
pub struct SignalEngine {
    config: EngineConfig,
    fingerprint: String,
    calculator: IndicatorCalculator,
    classifier: SignalClassifier,
    sizer: PositionSizer,
    backtester: WinRateBacktester,
}

impl SignalEngine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let fingerprint = config.fingerprint()?;

        let calculator = IndicatorCalculator::new(config.indicators);
        let classifier = SignalClassifier::new(config.classifier);
        let sizer = PositionSizer::new(config.account, config.stops);
        let backtester =
            WinRateBacktester::new(calculator.clone(), classifier.clone(), config.backtest);

        info!(
            fingerprint = %&fingerprint[..12],
            rule_set = ?config.classifier.rule_set,
            capital = config.account.capital,
            risk_fraction = config.account.risk_fraction,
            "signal engine ready"
        );

        Ok(Self {
            config,
            fingerprint,
            calculator,
            classifier,
            sizer,
            backtester,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn calculator(&self) -> &IndicatorCalculator {
        &self.calculator
    }

    pub fn classifier(&self) -> &SignalClassifier {
        &self.classifier
    }

    pub fn sizer(&self) -> &PositionSizer {
        &self.sizer
    }

    pub fn backtester(&self) -> &WinRateBacktester {
        &self.backtester
    }

    /// Bars needed before a decision is attempted.
    pub fn min_bars(&self) -> usize {
        self.config.indicators.min_bars()
    }

    /// Bars to request from a provider so both the live decision and every
    /// win-rate replay index have full indicator history.
    pub fn history_bars(&self) -> usize {
        let bt = &self.config.backtest;
        self.min_bars().max(bt.min_history) + bt.lookback_bars + bt.forward_window
    }

    /// Snapshot, verdict, plan and win rate for `bars`, with no gating.
    /// `quote` overrides the last close as the decision price.
    pub fn evaluate(&self, symbol: &str, bars: &[Bar], quote: Option<f64>) -> Evaluation {
        let (snapshot, previous) = self.calculator.evaluate(bars);
        let price = quote.or_else(|| bars.last().map(|b| b.close));
        let verdict = price
            .map(|p| self.classifier.classify(p, &snapshot, previous.as_ref()))
            .unwrap_or_else(Verdict::none);
        let plan = price.and_then(|p| self.sizer.build_plan(&verdict, p, &snapshot));

        Evaluation {
            symbol: symbol.to_string(),
            price,
            bar_timestamp: bars.last().map(|b| b.timestamp),
            bars: bars.len(),
            snapshot,
            verdict,
            plan,
            win_rate: self.backtester.estimate_win_rate(bars),
        }
    }

    /// Full gated decision for one symbol. `None` for anything short of an
    /// actionable, unsuppressed signal.
    pub fn scan_symbol(
        &self,
        symbol: &str,
        bars: &[Bar],
        quote: Option<f64>,
        now: DateTime<Utc>,
        gate: &dyn AlertGate,
    ) -> Option<TradeSignal> {
        self.decide(symbol, bars, quote, now, gate).ok()
    }

    /// Scan every symbol through `provider`. Provider failures and bad series
    /// are per-symbol no-ops.
    pub fn scan(
        &self,
        provider: &dyn BarProvider,
        symbols: &[String],
        now: DateTime<Utc>,
        gate: &dyn AlertGate,
    ) -> ScanReport {
        let lookback = self.history_bars();
        let mut report = ScanReport::default();

        for symbol in symbols {
            let status = match provider.fetch(symbol, lookback) {
                Err(e) => {
                    warn!(symbol = %symbol, provider = provider.name(), error = %e, "fetch failed");
                    ScanStatus::ProviderError {
                        reason: e.to_string(),
                    }
                }
                Ok(bars) => match self.decide(symbol, &bars, None, now, gate) {
                    Ok(signal) => {
                        report.signals.push(signal);
                        ScanStatus::Signal
                    }
                    Err(status) => status,
                },
            };
            report.outcomes.push(SymbolOutcome {
                symbol: symbol.clone(),
                status,
            });
        }

        info!(
            symbols = symbols.len(),
            signals = report.signals.len(),
            suppressed = report.count(|s| matches!(s, ScanStatus::Suppressed)),
            failed = report.count(|s| matches!(s, ScanStatus::ProviderError { .. })),
            "scan complete"
        );
        report
    }

    fn decide(
        &self,
        symbol: &str,
        bars: &[Bar],
        quote: Option<f64>,
        now: DateTime<Utc>,
        gate: &dyn AlertGate,
    ) -> Result<TradeSignal, ScanStatus> {
        if let Err(e) = validate_series(bars) {
            warn!(symbol, error = %e, "rejecting invalid bar series");
            return Err(ScanStatus::InvalidSeries {
                reason: e.to_string(),
            });
        }
        let Some(last) = bars.last() else {
            return Err(ScanStatus::InsufficientData {
                bars: 0,
                required: self.min_bars(),
            });
        };
        let required = self.min_bars();
        if bars.len() < required {
            debug!(symbol, bars = bars.len(), required, "insufficient history");
            return Err(ScanStatus::InsufficientData {
                bars: bars.len(),
                required,
            });
        }

        let price = quote.unwrap_or(last.close);
        let (snapshot, previous) = self.calculator.evaluate(bars);
        let verdict = self.classifier.classify(price, &snapshot, previous.as_ref());
        let Some(plan) = self.sizer.build_plan(&verdict, price, &snapshot) else {
            debug!(symbol, ?verdict, "no actionable plan");
            return Err(ScanStatus::NoSignal);
        };

        let stamp = self.config.cooldown.stamp(now, last.timestamp);
        if gate.should_suppress(symbol, stamp) {
            return Err(ScanStatus::Suppressed);
        }

        let win_rate_estimate = self.backtester.estimate_win_rate(bars);
        // another scan may have claimed the slot during the replay
        if !gate.try_acquire(symbol, stamp) {
            return Err(ScanStatus::Suppressed);
        }

        info!(
            symbol,
            direction = %plan.direction,
            price,
            quantity = plan.quantity,
            confidence = verdict.confidence,
            win_rate = ?win_rate_estimate,
            "signal"
        );

        Ok(TradeSignal {
            symbol: symbol.to_string(),
            direction: plan.direction,
            price,
            stop_loss: plan.stop_loss,
            target: plan.target,
            secondary_target: plan.secondary_target,
            quantity: plan.quantity,
            risk_amount: plan.risk_amount,
            risk_pct: plan.risk_pct,
            confidence: verdict.confidence,
            win_rate_estimate,
            indicator_snapshot: snapshot,
            bar_timestamp: last.timestamp,
            generated_at: now,
        })
    }
}
