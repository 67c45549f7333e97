use chrono::{DateTime, Utc};
use ddk_lanes::{Lane, SlaEval, SlaLevel};
use ddk_recommend::DriverRecommendation;
use ddk_redispatch::{LockReason, LockStatus};
use ddk_schemas::{Offer, OrderId};
use serde::Serialize;

/// Point-in-time projection of engine state for the UI layer.
///
/// Produced by every tick; everything in here is derived and owned by the
/// view (no references back into engine state).
#[derive(Clone, Debug, Serialize)]
pub struct DispatchView {
    pub generated_at: DateTime<Utc>,
    /// One summary per lane, in fixed lane order, empty lanes included.
    pub lanes: Vec<LaneSummary>,
    pub focus: Option<FocusView>,
    /// Every live offer record, for badge rendering.
    pub offers: Vec<Offer>,
    pub orders_stale: bool,
    pub drivers_stale: bool,
}

impl DispatchView {
    pub fn lane(&self, lane: Lane) -> &LaneSummary {
        // `lanes` always carries all five, in Lane::ALL order.
        &self.lanes[Lane::ALL.iter().position(|l| *l == lane).unwrap()]
    }

    /// Lock label for the focused order, `"no_order"` when nothing is
    /// focused.
    pub fn lock_label(&self) -> &'static str {
        self.focus
            .as_ref()
            .map(|f| f.lock_label)
            .unwrap_or(LockReason::NoOrder.as_str())
    }
}

/// One work-queue bucket and its SLA rollup.
#[derive(Clone, Debug, Serialize)]
pub struct LaneSummary {
    pub lane: Lane,
    pub orders: Vec<LaneEntry>,
    pub worst: SlaLevel,
    pub warn_count: usize,
    pub bad_count: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct LaneEntry {
    pub order_id: OrderId,
    pub sla: SlaEval,
}

/// Lock/redispatch status and driver ranking for the focused order.
#[derive(Clone, Debug, Serialize)]
pub struct FocusView {
    pub order_id: OrderId,
    pub lane: Lane,
    pub lock: LockStatus,
    /// UI label for the lock state ("offer_pending", "buffer", "ready").
    pub lock_label: &'static str,
    /// Whole seconds until the lock releases, rounded up.
    pub remaining_secs: i64,
    pub auto_redispatch_armed: bool,
    pub recommendations: Vec<DriverRecommendation>,
}
