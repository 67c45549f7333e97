use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ddk_schemas::OrderId;
use serde::{Deserialize, Serialize};

/// Why the focused order is (or is not) locked against redispatch.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockReason {
    /// A pending offer is still running; wait for the driver.
    OfferPending,
    /// The order is younger than the override buffer; let auto-dispatch
    /// finish before intervening.
    Buffer,
    /// Unlocked; intervention is permitted.
    Ready,
    /// No order is focused.
    NoOrder,
}

impl LockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockReason::OfferPending => "offer_pending",
            LockReason::Buffer => "buffer",
            LockReason::Ready => "ready",
            LockReason::NoOrder => "no_order",
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, LockReason::OfferPending | LockReason::Buffer)
    }
}

impl std::fmt::Display for LockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lock state of the focused order at one tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockStatus {
    pub reason: LockReason,
    /// Milliseconds until the lock releases on its own (0 when unlocked).
    pub remaining_ms: i64,
}

/// Policy knobs for the auto-redispatch controller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RedispatchConfig {
    /// Minimum order age before manual/automatic intervention is allowed
    /// while upstream is still auto-dispatching.
    pub override_buffer_secs: i64,
    /// Minimum spacing between automatic fires for the same order.
    pub cooldown_secs: i64,
}

impl RedispatchConfig {
    pub fn defaults() -> Self {
        Self {
            override_buffer_secs: 60,
            cooldown_secs: 15,
        }
    }
}

impl Default for RedispatchConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Controller state carried between ticks.
#[derive(Clone, Debug, Default)]
pub struct RedispatchState {
    /// Operator-controlled master switch. Nothing fires while disarmed.
    pub armed: bool,
    /// The focused order and its lock reason as of the previous tick.
    pub last_observed: Option<(OrderId, LockReason)>,
    /// When the controller last fired automatically, per order.
    pub last_fired: BTreeMap<OrderId, DateTime<Utc>>,
}

impl RedispatchState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Outcome of one controller evaluation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RedispatchDecision {
    pub action: RedispatchAction,
    pub reason: RedispatchReason,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RedispatchAction {
    /// Submit a redispatch mutation for the focused order now.
    Fire,
    Hold,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RedispatchReason {
    Fired,
    Disarmed,
    NoFocus,
    /// First tick this order is observed; never fire on selection.
    FirstObservation,
    StillLocked,
    /// Unlocked, but there was no locked→unlocked edge this tick.
    AlreadyUnlocked,
    /// A qualifying edge occurred inside the per-order cooldown window.
    CoolingDown,
}

impl RedispatchDecision {
    pub fn is_fire(&self) -> bool {
        self.action == RedispatchAction::Fire
    }
}
