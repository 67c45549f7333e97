use chrono::{DateTime, TimeZone, Utc};
use ddk_engine::DispatchEngine;
use ddk_schemas::{DriverId, GeoPoint, OfferStatus, Order, OrderId};

fn t(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn order(id: i64, driver: Option<i64>) -> Order {
    Order {
        id: OrderId(id),
        flow_type: "standard".into(),
        lifecycle_status: "pending".into(),
        dispatch_status: "searching".into(),
        issue_detected: false,
        pickup: GeoPoint { lat: 0.0, lng: 0.0 },
        created_at: t(0),
        last_dispatch_attempt_at: None,
        dispatch_at: None,
        assigned_at: None,
        driver_id: driver.map(DriverId),
    }
}

#[test]
fn scenario_authoritative_override() {
    let mut engine = DispatchEngine::default();
    engine.apply_orders(vec![order(7, None)], t(100));
    engine.stage_offer(OrderId(7), DriverId(3), t(101));

    // The mutation result never arrives, but the next authoritative
    // snapshot already shows driver 3 on the order. The pending offer must
    // become accepted, never remain pending.
    engine.apply_orders(vec![order(7, Some(3))], t(104));
    let out = engine.tick(t(104));
    let offer = &out.view.offers[0];
    assert_eq!(offer.status, OfferStatus::Accepted);
    assert_eq!(offer.driver_id, Some(DriverId(3)));

    // And on the following tick the confirmed record is cleared.
    let out = engine.tick(t(105));
    assert!(out.view.offers.is_empty());
}

#[test]
fn scenario_stale_refetch_cannot_roll_back_truth() {
    let mut engine = DispatchEngine::default();
    engine.apply_orders(vec![order(7, Some(3))], t(110));

    // A slow response from an older fetch claims the order is unassigned.
    // The watermark rejects it; the assignment stands.
    assert!(!engine.apply_orders(vec![order(7, None)], t(108)));
    let out = engine.tick(t(111));
    assert_eq!(out.view.lane(ddk_lanes::Lane::Assigned).orders.len(), 1);
}
