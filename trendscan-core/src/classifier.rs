//! Signal classifier: turns indicator snapshots into a directional verdict.
//!
//! Two rule sets are supported:
//! - **Trend alignment** (daily scans): `price > ema_fast > ema_mid > ema_slow`
//!   and ADX above threshold for BUY, mirrored for SELL. All four conditions
//!   are mandatory.
//! - **Crossover** (intraday scans): a *fresh* cross of the fast average over
//!   the mid average, with RSI inside a bullish-but-not-overbought band
//!   (mirrored for SELL). A cross that already happened on the previous bar
//!   does not fire again.
//!
//! Every verdict carries an additive confidence score in `[0, 100]`. Verdicts
//! below `min_confidence` are demoted to NONE here, before the sizer sees them.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::snapshot::IndicatorSnapshot;

const FAST_ABOVE_MID_POINTS: u32 = 40;
const HEALTHY_OSCILLATOR_POINTS: u32 = 30;
const TREND_AGREEMENT_POINTS: u32 = 30;
const OSCILLATOR_MIDLINE: f64 = 50.0;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    /// +1 for BUY, -1 for SELL. Stops sit at `price - sign * distance`.
    pub fn sign(self) -> f64 {
        match self {
            Self::Buy => 1.0,
            Self::Sell => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => f.write_str("BUY"),
            Self::Sell => f.write_str("SELL"),
        }
    }
}

/// BUY, SELL, or NONE (`direction == None`), with a confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub direction: Option<Direction>,
    pub confidence: u8,
}

impl Verdict {
    pub fn none() -> Self {
        Self {
            direction: None,
            confidence: 0,
        }
    }

    pub fn new(direction: Direction, confidence: u8) -> Self {
        Self {
            direction: Some(direction),
            confidence: confidence.min(100),
        }
    }

    pub fn is_none(&self) -> bool {
        self.direction.is_none()
    }
}

/// Which rule set the classifier applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSet {
    TrendAlignment,
    Crossover,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub rule_set: RuleSet,
    /// ADX must be strictly above this for a trend-aligned verdict.
    pub adx_threshold: f64,
    /// BUY band lower bound for RSI (exclusive). SELL uses `100 - rsi_floor`.
    pub rsi_floor: f64,
    /// BUY band upper bound for RSI (exclusive). SELL uses `100 - rsi_ceiling`.
    pub rsi_ceiling: f64,
    pub min_confidence: u8,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            rule_set: RuleSet::TrendAlignment,
            adx_threshold: 25.0,
            rsi_floor: 50.0,
            rsi_ceiling: 70.0,
            min_confidence: 60,
        }
    }
}

impl ClassifierConfig {
    /// Intraday preset: fresh EMA crossover with RSI band.
    pub fn crossover() -> Self {
        Self {
            rule_set: RuleSet::Crossover,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignalClassifier {
    config: ClassifierConfig,
}

impl SignalClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify the latest snapshot. `previous` is the snapshot one bar
    /// earlier; the crossover rule returns NONE without it.
    pub fn classify(
        &self,
        price: f64,
        snapshot: &IndicatorSnapshot,
        previous: Option<&IndicatorSnapshot>,
    ) -> Verdict {
        if !price.is_finite() {
            return Verdict::none();
        }

        let direction = match self.config.rule_set {
            RuleSet::TrendAlignment => self.trend_direction(price, snapshot),
            RuleSet::Crossover => previous.and_then(|prev| self.crossover_direction(snapshot, prev)),
        };
        let Some(direction) = direction else {
            return Verdict::none();
        };

        let confidence = self.confidence(direction, snapshot);
        if confidence < self.config.min_confidence {
            debug!(
                %direction,
                confidence,
                min = self.config.min_confidence,
                "verdict demoted below minimum confidence"
            );
            return Verdict::none();
        }

        Verdict::new(direction, confidence)
    }

    /// Additive confidence score for `direction`, capped at 100.
    pub fn confidence(&self, direction: Direction, snapshot: &IndicatorSnapshot) -> u8 {
        let mut score = 0u32;

        if let (Some(fast), Some(mid)) = (snapshot.ema_fast, snapshot.ema_mid) {
            let aligned = match direction {
                Direction::Buy => fast > mid,
                Direction::Sell => fast < mid,
            };
            if aligned {
                score += FAST_ABOVE_MID_POINTS;
            }
        }

        if let Some(rsi) = snapshot.rsi {
            if self.in_healthy_band(direction, rsi) {
                score += HEALTHY_OSCILLATOR_POINTS;
            }
        }

        if let (Some(adx), Some(rsi)) = (snapshot.adx, snapshot.rsi) {
            let agrees = match direction {
                Direction::Buy => rsi > OSCILLATOR_MIDLINE,
                Direction::Sell => rsi < OSCILLATOR_MIDLINE,
            };
            if adx > self.config.adx_threshold && agrees {
                score += TREND_AGREEMENT_POINTS;
            }
        }

        score.min(100) as u8
    }

    fn in_healthy_band(&self, direction: Direction, rsi: f64) -> bool {
        let ClassifierConfig {
            rsi_floor,
            rsi_ceiling,
            ..
        } = self.config;
        match direction {
            Direction::Buy => rsi > rsi_floor && rsi < rsi_ceiling,
            Direction::Sell => rsi < 100.0 - rsi_floor && rsi > 100.0 - rsi_ceiling,
        }
    }

    fn trend_direction(&self, price: f64, snap: &IndicatorSnapshot) -> Option<Direction> {
        let fast = snap.ema_fast?;
        let mid = snap.ema_mid?;
        let slow = snap.ema_slow?;
        let adx = snap.adx?;

        let trending = adx > self.config.adx_threshold;
        let up = trending && price > fast && fast > mid && mid > slow;
        let down = trending && price < fast && fast < mid && mid < slow;

        resolve(up, down)
    }

    fn crossover_direction(
        &self,
        snap: &IndicatorSnapshot,
        prev: &IndicatorSnapshot,
    ) -> Option<Direction> {
        let fast = snap.ema_fast?;
        let mid = snap.ema_mid?;
        let prev_fast = prev.ema_fast?;
        let prev_mid = prev.ema_mid?;
        let rsi = snap.rsi?;

        let crossed_up = prev_fast <= prev_mid && fast > mid;
        let crossed_down = prev_fast >= prev_mid && fast < mid;

        let up = crossed_up && self.in_healthy_band(Direction::Buy, rsi);
        let down = crossed_down && self.in_healthy_band(Direction::Sell, rsi);

        resolve(up, down)
    }
}

fn resolve(up: bool, down: bool) -> Option<Direction> {
    match (up, down) {
        (true, false) => Some(Direction::Buy),
        (false, true) => Some(Direction::Sell),
        (true, true) => {
            warn!("both BUY and SELL conditions hold; refusing ambiguous verdict");
            None
        }
        (false, false) => None,
    }
}
