use chrono::{DateTime, Utc};
use ddk_geo::seconds_since;
use ddk_schemas::Order;

use crate::{Lane, SlaEval, SlaLevel, SlaPolicy};

/// Evaluate an order's age against its lane budget.
///
/// Age counts from the last dispatch attempt (falling back to creation).
/// Level is Bad at or past the bad threshold, Warn at or past the warn
/// threshold, else Good. A zero budget means the lane has no SLA.
///
/// Pure and total; callers re-evaluate every tick rather than caching.
pub fn evaluate_sla(lane: Lane, order: &Order, now: DateTime<Utc>, policy: &SlaPolicy) -> SlaEval {
    let budget = policy.for_lane(lane);
    let age_secs = seconds_since(order.age_reference(), now);

    let level = if budget.budget_secs == 0 {
        SlaLevel::Good
    } else if age_secs >= budget.bad_secs {
        SlaLevel::Bad
    } else if age_secs >= budget.warn_secs {
        SlaLevel::Warn
    } else {
        SlaLevel::Good
    };

    SlaEval {
        age_secs,
        budget_secs: budget.budget_secs,
        level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ddk_schemas::{GeoPoint, OrderId};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn order_created_at(secs: i64) -> Order {
        Order {
            id: OrderId(1),
            flow_type: "standard".into(),
            lifecycle_status: "pending".into(),
            dispatch_status: "searching".into(),
            issue_detected: false,
            pickup: GeoPoint { lat: 0.0, lng: 0.0 },
            created_at: t(secs),
            last_dispatch_attempt_at: None,
            dispatch_at: None,
            assigned_at: None,
            driver_id: None,
        }
    }

    #[test]
    fn level_thresholds_are_inclusive() {
        let policy = SlaPolicy::default();
        let order = order_created_at(0);

        let eval = |at: i64| evaluate_sla(Lane::Searching, &order, t(at), &policy).level;
        assert_eq!(eval(119), SlaLevel::Good);
        assert_eq!(eval(120), SlaLevel::Warn);
        assert_eq!(eval(179), SlaLevel::Warn);
        assert_eq!(eval(180), SlaLevel::Bad);
    }

    #[test]
    fn last_attempt_resets_the_clock() {
        let policy = SlaPolicy::default();
        let mut order = order_created_at(0);
        order.last_dispatch_attempt_at = Some(t(150));

        let eval = evaluate_sla(Lane::Searching, &order, t(200), &policy);
        assert_eq!(eval.age_secs, 50);
        assert_eq!(eval.level, SlaLevel::Good);
    }

    #[test]
    fn zero_budget_lane_is_always_good() {
        let mut policy = SlaPolicy::default();
        policy.assigned = crate::SlaBudget::none();
        let order = order_created_at(0);

        let eval = evaluate_sla(Lane::Assigned, &order, t(1_000_000), &policy);
        assert_eq!(eval.level, SlaLevel::Good);
        assert_eq!(eval.budget_secs, 0);
    }

    #[test]
    fn future_reference_clamps_age_to_zero() {
        let policy = SlaPolicy::default();
        let order = order_created_at(500);
        let eval = evaluate_sla(Lane::Searching, &order, t(100), &policy);
        assert_eq!(eval.age_secs, 0);
        assert_eq!(eval.level, SlaLevel::Good);
    }
}
