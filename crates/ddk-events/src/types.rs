use ddk_schemas::{DriverId, OrderId};

/// Canonical form of a push-channel event.
///
/// The push channel delivers heterogeneous envelopes with no ordering or
/// at-most-once guarantee. [`normalize`] is the single parsing boundary that
/// turns them into this closed enum; everything downstream switches on it
/// instead of probing raw payload fields.
///
/// Every variant is an absolute-state intent (set, not increment), so
/// replaying an event is naturally idempotent.
///
/// [`normalize`]: crate::normalize
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NormalizedEvent {
    /// A driver took the offer for this order.
    DriverAssigned {
        order_id: OrderId,
        driver_id: Option<DriverId>,
    },
    /// The upstream offer for this order timed out.
    OfferExpired { order_id: OrderId },
    /// The driver declined the offer for this order.
    OfferRejected { order_id: OrderId },
    /// Something about an order changed: the authoritative order cache is
    /// stale and should be refetched. The offer store is not touched.
    OrderSync,
    /// Driver status/location/trust changed: the driver cache is stale.
    DriverSync,
}
