//! Alert deduplication.
//!
//! The engine claims a slot from an [`AlertGate`] before emitting a signal.
//! [`CooldownTracker`] is the in-process implementation; state lives for the
//! life of the tracker and is never persisted.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Decides whether an alert for a symbol should be held back.
pub trait AlertGate: Send + Sync {
    fn should_suppress(&self, symbol: &str, at: DateTime<Utc>) -> bool;
    fn mark_alerted(&self, symbol: &str, at: DateTime<Utc>);

    /// Check and mark in one step. Returns `false` when the alert is
    /// suppressed. Implementations shared between threads must make this
    /// atomic so only one caller wins a given slot.
    fn try_acquire(&self, symbol: &str, at: DateTime<Utc>) -> bool {
        if self.should_suppress(symbol, at) {
            return false;
        }
        self.mark_alerted(symbol, at);
        true
    }
}

/// Never suppresses. Useful for dry runs and one-off scans.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGate;

impl AlertGate for NoGate {
    fn should_suppress(&self, _symbol: &str, _at: DateTime<Utc>) -> bool {
        false
    }

    fn mark_alerted(&self, _symbol: &str, _at: DateTime<Utc>) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Suppress while less than `window_secs` has elapsed since the last alert.
    Window { window_secs: i64 },
    /// Suppress a second alert on the same candle.
    SameCandle,
}

impl Default for DedupPolicy {
    fn default() -> Self {
        Self::Window {
            window_secs: 30 * 60,
        }
    }
}

impl DedupPolicy {
    pub fn window(window: Duration) -> Self {
        Self::Window {
            window_secs: window.num_seconds(),
        }
    }

    /// Which timestamp the gate should be keyed on: wall clock for a
    /// window, the candle's own timestamp for same-candle dedup.
    pub fn stamp(&self, now: DateTime<Utc>, candle: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Window { .. } => now,
            Self::SameCandle => candle,
        }
    }

    /// The window as a `Duration`, or `None` for same-candle dedup and for
    /// windows too large to represent.
    pub fn window_duration(&self) -> Option<Duration> {
        match *self {
            Self::Window { window_secs } => Duration::try_seconds(window_secs),
            Self::SameCandle => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct CooldownTracker {
    policy: DedupPolicy,
    last_alert: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl CooldownTracker {
    pub fn new(policy: DedupPolicy) -> Self {
        Self {
            policy,
            last_alert: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> DedupPolicy {
        self.policy
    }

    /// Last recorded alert time for `symbol`.
    pub fn last_alert(&self, symbol: &str) -> Option<DateTime<Utc>> {
        self.state().get(symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.state().len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().is_empty()
    }

    /// Drop entries whose window has fully elapsed at `now`. Same-candle
    /// entries are left alone.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let Some(window) = self.policy.window_duration() else {
            return 0;
        };
        let mut state = self.state();
        let before = state.len();
        state.retain(|_, last| now - *last < window);
        before - state.len()
    }

    pub fn reset(&self) {
        self.state().clear();
    }

    // A poisoned lock only means another thread panicked mid-insert; the map
    // itself is still a valid map.
    fn state(&self) -> MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.last_alert
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CooldownTracker {
    fn suppresses(&self, last: DateTime<Utc>, at: DateTime<Utc>) -> bool {
        match self.policy {
            // unrepresentable windows never expire
            DedupPolicy::Window { .. } => self
                .policy
                .window_duration()
                .map_or(true, |window| at - last < window),
            DedupPolicy::SameCandle => at == last,
        }
    }
}

impl AlertGate for CooldownTracker {
    fn should_suppress(&self, symbol: &str, at: DateTime<Utc>) -> bool {
        let Some(last) = self.last_alert(symbol) else {
            return false;
        };
        let suppress = self.suppresses(last, at);
        if suppress {
            debug!(symbol, %last, %at, "alert suppressed by cooldown");
        }
        suppress
    }

    fn mark_alerted(&self, symbol: &str, at: DateTime<Utc>) {
        self.state().insert(symbol.to_string(), at);
    }

    fn try_acquire(&self, symbol: &str, at: DateTime<Utc>) -> bool {
        let mut state = self.state();
        if let Some(&last) = state.get(symbol) {
            if self.suppresses(last, at) {
                debug!(symbol, %last, %at, "alert suppressed by cooldown");
                return false;
            }
        }
        state.insert(symbol.to_string(), at);
        true
    }
}
