use chrono::{DateTime, Duration, Utc};
use ddk_geo::seconds_since;
use ddk_lanes::Lane;
use ddk_offers::ms_remaining;
use ddk_schemas::{Offer, OfferStatus, Order};

use crate::{
    LockReason, LockStatus, RedispatchAction, RedispatchConfig, RedispatchDecision,
    RedispatchReason, RedispatchState,
};

/// Observe the focused order's lock state for this tick.
///
/// A pending offer locks the order for the offer's remaining time; an order
/// still inside the override buffer while upstream searches locks it for the
/// rest of the buffer; otherwise it is ready. Buffer age counts from the
/// same reference timestamp the SLA evaluator uses, so a dispatch attempt
/// restarts both clocks together.
pub fn observe_lock(
    order: &Order,
    lane: Lane,
    offer: Option<&Offer>,
    now: DateTime<Utc>,
    cfg: &RedispatchConfig,
) -> LockStatus {
    if let Some(offer) = offer {
        if offer.status == OfferStatus::Pending {
            return LockStatus {
                reason: LockReason::OfferPending,
                remaining_ms: ms_remaining(offer.expires_at, now),
            };
        }
    }

    if matches!(lane, Lane::Searching | Lane::NeedsDriver) {
        let age = seconds_since(order.age_reference(), now);
        if age < cfg.override_buffer_secs {
            return LockStatus {
                reason: LockReason::Buffer,
                remaining_ms: (cfg.override_buffer_secs - age) * 1_000,
            };
        }
    }

    LockStatus {
        reason: LockReason::Ready,
        remaining_ms: 0,
    }
}

/// Evaluate the controller for one tick.
///
/// Fires **only** on the edge `locked → ready` for the same focused order:
/// - never while still locked, never while already unlocked (no repeat fire
///   on every tick);
/// - never on the first observation of a newly focused order;
/// - never within the per-order cooldown of the previous automatic fire;
/// - never while disarmed.
///
/// The observation is recorded unconditionally, so arming the controller
/// between ticks cannot convert a stale edge into an immediate fire, and a
/// fire consumes the cooldown whether or not the mutation later succeeds.
pub fn evaluate(
    cfg: &RedispatchConfig,
    st: &mut RedispatchState,
    focused: Option<(ddk_schemas::OrderId, LockReason)>,
    now: DateTime<Utc>,
) -> RedispatchDecision {
    let hold = |reason| RedispatchDecision {
        action: RedispatchAction::Hold,
        reason,
    };

    let Some((order_id, reason)) = focused else {
        st.last_observed = None;
        return hold(RedispatchReason::NoFocus);
    };

    let prev = st.last_observed.replace((order_id, reason));

    if !st.armed {
        return hold(RedispatchReason::Disarmed);
    }

    let Some((prev_id, prev_reason)) = prev else {
        return hold(RedispatchReason::FirstObservation);
    };
    if prev_id != order_id {
        return hold(RedispatchReason::FirstObservation);
    }

    if reason != LockReason::Ready {
        return hold(RedispatchReason::StillLocked);
    }
    if !prev_reason.is_locked() {
        return hold(RedispatchReason::AlreadyUnlocked);
    }

    if let Some(fired_at) = st.last_fired.get(&order_id) {
        if now - *fired_at < Duration::seconds(cfg.cooldown_secs) {
            return hold(RedispatchReason::CoolingDown);
        }
    }

    st.last_fired.insert(order_id, now);
    RedispatchDecision {
        action: RedispatchAction::Fire,
        reason: RedispatchReason::Fired,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ddk_schemas::{DriverId, GeoPoint, OrderId};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn searching_order(created: i64) -> Order {
        Order {
            id: OrderId(1),
            flow_type: "standard".into(),
            lifecycle_status: "pending".into(),
            dispatch_status: "searching".into(),
            issue_detected: false,
            pickup: GeoPoint { lat: 0.0, lng: 0.0 },
            created_at: t(created),
            last_dispatch_attempt_at: None,
            dispatch_at: None,
            assigned_at: None,
            driver_id: None,
        }
    }

    fn pending_offer(expires: i64) -> Offer {
        Offer {
            order_id: OrderId(1),
            driver_id: Some(DriverId(9)),
            status: OfferStatus::Pending,
            offered_at: t(0),
            expires_at: t(expires),
        }
    }

    #[test]
    fn pending_offer_locks_with_remaining() {
        let cfg = RedispatchConfig::defaults();
        let order = searching_order(0);
        let offer = pending_offer(70);

        let lock = observe_lock(&order, Lane::Offered, Some(&offer), t(30), &cfg);
        assert_eq!(lock.reason, LockReason::OfferPending);
        assert_eq!(lock.remaining_ms, 40_000);
    }

    #[test]
    fn young_searching_order_sits_in_buffer() {
        let cfg = RedispatchConfig::defaults();
        let order = searching_order(0);

        let lock = observe_lock(&order, Lane::Searching, None, t(45), &cfg);
        assert_eq!(lock.reason, LockReason::Buffer);
        assert_eq!(lock.remaining_ms, 15_000);

        let lock = observe_lock(&order, Lane::Searching, None, t(60), &cfg);
        assert_eq!(lock.reason, LockReason::Ready);
        assert_eq!(lock.remaining_ms, 0);
    }

    #[test]
    fn assigned_lane_is_ready_without_buffer() {
        let cfg = RedispatchConfig::defaults();
        let order = searching_order(0);
        let lock = observe_lock(&order, Lane::Assigned, None, t(5), &cfg);
        assert_eq!(lock.reason, LockReason::Ready);
    }

    #[test]
    fn never_fires_on_first_observation_even_if_ready() {
        let cfg = RedispatchConfig::defaults();
        let mut st = RedispatchState::new();
        st.armed = true;

        let d = evaluate(&cfg, &mut st, Some((OrderId(1), LockReason::Ready)), t(100));
        assert_eq!(d.reason, RedispatchReason::FirstObservation);
        assert!(!d.is_fire());
    }

    #[test]
    fn focus_change_resets_the_edge() {
        let cfg = RedispatchConfig::defaults();
        let mut st = RedispatchState::new();
        st.armed = true;

        evaluate(&cfg, &mut st, Some((OrderId(1), LockReason::Buffer)), t(100));
        // Focus moves to order 2, which happens to be ready: no fire.
        let d = evaluate(&cfg, &mut st, Some((OrderId(2), LockReason::Ready)), t(101));
        assert_eq!(d.reason, RedispatchReason::FirstObservation);
    }

    #[test]
    fn disarmed_controller_tracks_but_never_fires() {
        let cfg = RedispatchConfig::defaults();
        let mut st = RedispatchState::new();

        evaluate(&cfg, &mut st, Some((OrderId(1), LockReason::Buffer)), t(100));
        let d = evaluate(&cfg, &mut st, Some((OrderId(1), LockReason::Ready)), t(101));
        assert_eq!(d.reason, RedispatchReason::Disarmed);

        // Arming after the edge passed must not fire retroactively.
        st.armed = true;
        let d = evaluate(&cfg, &mut st, Some((OrderId(1), LockReason::Ready)), t(102));
        assert_eq!(d.reason, RedispatchReason::AlreadyUnlocked);
    }

    #[test]
    fn losing_focus_clears_the_observation() {
        let cfg = RedispatchConfig::defaults();
        let mut st = RedispatchState::new();
        st.armed = true;

        evaluate(&cfg, &mut st, Some((OrderId(1), LockReason::Buffer)), t(100));
        evaluate(&cfg, &mut st, None, t(101));
        // Re-selecting the order while ready is a first observation again.
        let d = evaluate(&cfg, &mut st, Some((OrderId(1), LockReason::Ready)), t(102));
        assert_eq!(d.reason, RedispatchReason::FirstObservation);
    }
}
