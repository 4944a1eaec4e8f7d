//! Risk & position sizer: verdict + price + volatility → concrete trade plan.
//!
//! Classic fixed-fractional risk: risk `risk_fraction` of capital per trade,
//! with the stop placed either a multiple of ATR or a fixed fraction of price
//! away from entry.
//!
//! # Formula
//! ```text
//! risk_budget   = capital * risk_fraction
//! stop_distance = stop_multiplier * ATR        (or price * stop_fraction)
//! quantity      = floor(risk_budget / stop_distance), floored to lot size
//! ```
//!
//! # Example
//! - Capital: 100,000; risk 1% (1,000)
//! - ATR: 10; stop multiplier 1.5 → stop distance 15
//! - Quantity: floor(1,000 / 15) = 66

use serde::{Deserialize, Serialize};

use crate::classifier::{Direction, Verdict};
use crate::snapshot::IndicatorSnapshot;

/// Account capital and risk budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub capital: f64,
    /// Fraction of capital risked per trade (e.g., 0.01 = 1%).
    pub risk_fraction: f64,
    /// Quantities are floored to a multiple of this.
    pub lot_size: u64,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            capital: 100_000.0,
            risk_fraction: 0.01,
            lot_size: 1,
        }
    }
}

/// How stop and target distances are derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StopPolicy {
    /// Distances are multiples of the volatility measure.
    Atr {
        stop_multiplier: f64,
        target_multiplier: f64,
        #[serde(default)]
        secondary_target_multiplier: Option<f64>,
    },
    /// Distances are fractions of the entry price (0.02 = 2%).
    Percent {
        stop_fraction: f64,
        target_fraction: f64,
        #[serde(default)]
        secondary_target_fraction: Option<f64>,
    },
}

impl Default for StopPolicy {
    fn default() -> Self {
        Self::atr(1.5, 3.0)
    }
}

/// Stop and target distances from entry, in price units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopDistances {
    pub stop: f64,
    pub target: f64,
    pub secondary_target: Option<f64>,
}

impl StopPolicy {
    pub fn atr(stop_multiplier: f64, target_multiplier: f64) -> Self {
        Self::Atr {
            stop_multiplier,
            target_multiplier,
            secondary_target_multiplier: None,
        }
    }

    pub fn percent(stop_fraction: f64, target_fraction: f64) -> Self {
        Self::Percent {
            stop_fraction,
            target_fraction,
            secondary_target_fraction: None,
        }
    }

    /// Distances for an entry at `price`.
    ///
    /// `None` when the stop distance would not be strictly positive and
    /// finite: ATR undefined or zero, or a non-positive multiplier.
    pub fn distances(&self, price: f64, snapshot: &IndicatorSnapshot) -> Option<StopDistances> {
        let (base, stop, target, secondary) = match *self {
            Self::Atr {
                stop_multiplier,
                target_multiplier,
                secondary_target_multiplier,
            } => (
                snapshot.atr?,
                stop_multiplier,
                target_multiplier,
                secondary_target_multiplier,
            ),
            Self::Percent {
                stop_fraction,
                target_fraction,
                secondary_target_fraction,
            } => (price, stop_fraction, target_fraction, secondary_target_fraction),
        };

        let distances = StopDistances {
            stop: base * stop,
            target: base * target,
            secondary_target: secondary.map(|m| base * m),
        };
        (distances.stop.is_finite() && distances.stop > 0.0 && distances.target.is_finite())
            .then_some(distances)
    }
}

/// A tradable plan. Only ever constructed with `quantity >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradePlan {
    pub direction: Direction,
    pub entry: f64,
    pub stop_loss: f64,
    pub target: f64,
    pub secondary_target: Option<f64>,
    pub stop_distance: f64,
    pub quantity: u64,
    /// `quantity * stop_distance`; may sit below the nominal budget after flooring.
    pub risk_amount: f64,
    /// `risk_amount / capital * 100`.
    pub risk_pct: f64,
}

#[derive(Debug, Clone)]
pub struct PositionSizer {
    account: AccountConfig,
    stops: StopPolicy,
}

impl PositionSizer {
    pub fn new(account: AccountConfig, stops: StopPolicy) -> Self {
        Self { account, stops }
    }

    pub fn account(&self) -> &AccountConfig {
        &self.account
    }

    pub fn stops(&self) -> &StopPolicy {
        &self.stops
    }

    /// Build a plan for `verdict` at `price`.
    ///
    /// Returns `None` for a NONE verdict, an unusable price, a degenerate stop
    /// distance, a price level that would land at or below zero, or a size
    /// that floors to zero.
    pub fn build_plan(
        &self,
        verdict: &Verdict,
        price: f64,
        snapshot: &IndicatorSnapshot,
    ) -> Option<TradePlan> {
        let direction = verdict.direction?;
        if !price.is_finite() || price <= 0.0 {
            return None;
        }

        let distances = self.stops.distances(price, snapshot)?;
        let quantity = self.quantity_for(distances.stop)?;

        let sign = direction.sign();
        let stop_loss = price - sign * distances.stop;
        let target = price + sign * distances.target;
        let secondary_target = distances.secondary_target.map(|d| price + sign * d);

        let levels_positive =
            stop_loss > 0.0 && target > 0.0 && secondary_target.map_or(true, |t| t > 0.0);
        if !levels_positive {
            return None;
        }

        let risk_amount = quantity as f64 * distances.stop;
        Some(TradePlan {
            direction,
            entry: price,
            stop_loss,
            target,
            secondary_target,
            stop_distance: distances.stop,
            quantity,
            risk_amount,
            risk_pct: risk_amount / self.account.capital * 100.0,
        })
    }

    /// Whole units affordable within the risk budget, floored to lot size.
    pub fn quantity_for(&self, stop_distance: f64) -> Option<u64> {
        if !stop_distance.is_finite() || stop_distance <= 0.0 {
            return None;
        }
        let budget = self.account.capital * self.account.risk_fraction;
        let units = (budget / stop_distance).floor();
        if !units.is_finite() || units < 1.0 {
            return None;
        }
        let units = units as u64;
        let lot = self.account.lot_size.max(1);
        let quantity = units - units % lot;
        (quantity > 0).then_some(quantity)
    }
}
