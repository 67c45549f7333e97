use chrono::{DateTime, TimeZone, Utc};
use ddk_engine::{DispatchEngine, EngineCommand};
use serde_json::json;

fn t(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

#[test]
fn scenario_push_invalidation_refresh_once() {
    let mut engine = DispatchEngine::default();
    engine.apply_orders(vec![], t(100));
    engine.apply_drivers(vec![], t(100));

    // An order-refresh class event marks the order cache stale. The next
    // tick requests exactly one refetch; later ticks stay quiet.
    engine.apply_push(&json!({"type": "order_status_changed", "order_id": 4}), t(101));

    let out = engine.tick(t(101));
    assert_eq!(out.commands, vec![EngineCommand::RefreshOrders]);
    assert_eq!(out.view.lock_label(), "no_order");

    let out = engine.tick(t(102));
    assert!(out.commands.is_empty());
}

#[test]
fn scenario_driver_event_refreshes_driver_cache() {
    let mut engine = DispatchEngine::default();
    engine.apply_orders(vec![], t(100));
    engine.apply_drivers(vec![], t(100));

    engine.apply_push(&json!({"event": {"type": "driver_location_changed"}}), t(101));
    let out = engine.tick(t(101));
    assert_eq!(out.commands, vec![EngineCommand::RefreshDrivers]);
}

#[test]
fn scenario_malformed_push_is_ignored() {
    let mut engine = DispatchEngine::default();
    engine.apply_orders(vec![], t(100));
    engine.apply_drivers(vec![], t(100));

    for raw in [json!(null), json!({"kind": "x"}), json!({"type": 3})] {
        engine.apply_push(&raw, t(101));
    }
    let out = engine.tick(t(101));
    assert!(out.commands.is_empty());
}
