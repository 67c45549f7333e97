use ddk_schemas::{DriverId, OrderId};
use serde_json::Value;

use crate::NormalizedEvent;

/// Normalize a raw push payload into a [`NormalizedEvent`].
///
/// Accepted envelope shapes: `{type}`, `{event: {type}}`, `{data: {type}}`;
/// the first populated `type` string wins. Ids are looked up across the same
/// three envelopes and may arrive as numbers or numeric strings.
///
/// Anything unparseable (non-object payload, missing/non-string type,
/// unknown type, or a transition event without an order id) is discarded
/// silently by returning `None`. Malformed input must never crash the
/// reconciler.
pub fn normalize(raw: &Value) -> Option<NormalizedEvent> {
    let event_type = extract_type(raw)?;

    match event_type {
        "driver_assigned" => Some(NormalizedEvent::DriverAssigned {
            order_id: OrderId(extract_id(raw, "order_id")?),
            driver_id: extract_id(raw, "driver_id").map(DriverId),
        }),
        "driver_offer_expired" => Some(NormalizedEvent::OfferExpired {
            order_id: OrderId(extract_id(raw, "order_id")?),
        }),
        "driver_rejected" => Some(NormalizedEvent::OfferRejected {
            order_id: OrderId(extract_id(raw, "order_id")?),
        }),
        // Unknown-but-plausible types degrade to a cache refresh rather
        // than a drop, so new upstream event names stay harmless.
        t if t.starts_with("order_") || t.contains("dispatch") => Some(NormalizedEvent::OrderSync),
        t if t.starts_with("driver_") => Some(NormalizedEvent::DriverSync),
        _ => None,
    }
}

/// Envelopes the type and id fields may live in, probed in order.
fn envelopes(raw: &Value) -> impl Iterator<Item = &Value> {
    [Some(raw), raw.get("event"), raw.get("data")]
        .into_iter()
        .flatten()
}

fn extract_type(raw: &Value) -> Option<&str> {
    envelopes(raw).find_map(|env| env.get("type").and_then(Value::as_str))
}

fn extract_id(raw: &Value, key: &str) -> Option<i64> {
    envelopes(raw).find_map(|env| {
        let v = env.get(key)?;
        v.as_i64().or_else(|| v.as_str()?.parse().ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flat_envelope() {
        let raw = json!({"type": "driver_assigned", "order_id": 42, "driver_id": 9});
        assert_eq!(
            normalize(&raw),
            Some(NormalizedEvent::DriverAssigned {
                order_id: OrderId(42),
                driver_id: Some(DriverId(9)),
            })
        );
    }

    #[test]
    fn nested_event_envelope() {
        let raw = json!({"event": {"type": "driver_offer_expired", "order_id": 7}});
        assert_eq!(
            normalize(&raw),
            Some(NormalizedEvent::OfferExpired { order_id: OrderId(7) })
        );
    }

    #[test]
    fn nested_data_envelope() {
        let raw = json!({"data": {"type": "driver_rejected", "order_id": "7"}});
        assert_eq!(
            normalize(&raw),
            Some(NormalizedEvent::OfferRejected { order_id: OrderId(7) })
        );
    }

    #[test]
    fn type_and_ids_may_live_in_different_envelopes() {
        let raw = json!({"type": "driver_assigned", "data": {"order_id": 3, "driver_id": "11"}});
        assert_eq!(
            normalize(&raw),
            Some(NormalizedEvent::DriverAssigned {
                order_id: OrderId(3),
                driver_id: Some(DriverId(11)),
            })
        );
    }

    #[test]
    fn assignment_without_driver_id_still_applies() {
        let raw = json!({"type": "driver_assigned", "order_id": 42});
        assert_eq!(
            normalize(&raw),
            Some(NormalizedEvent::DriverAssigned {
                order_id: OrderId(42),
                driver_id: None,
            })
        );
    }

    #[test]
    fn refresh_classes() {
        for ty in ["order_status_changed", "order_location_changed", "dispatch_plan_updated"] {
            let raw = json!({"type": ty, "order_id": 1});
            assert_eq!(normalize(&raw), Some(NormalizedEvent::OrderSync), "{ty}");
        }
        for ty in ["driver_location_changed", "driver_status_changed", "driver_trust_updated"] {
            let raw = json!({"type": ty});
            assert_eq!(normalize(&raw), Some(NormalizedEvent::DriverSync), "{ty}");
        }
    }

    #[test]
    fn malformed_payloads_discard_silently() {
        for raw in [
            json!(null),
            json!("driver_assigned"),
            json!(17),
            json!({}),
            json!({"type": 42}),
            json!({"kind": "driver_assigned"}),
            json!({"type": "checkout_completed"}),
            // transition without an order id
            json!({"type": "driver_assigned", "driver_id": 9}),
            json!({"type": "driver_offer_expired", "order_id": "not-a-number"}),
        ] {
            assert_eq!(normalize(&raw), None, "{raw}");
        }
    }
}
