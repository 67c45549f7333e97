use chrono::{DateTime, Utc};
use ddk_schemas::{DriverId, OfferStatus, OrderId};

/// Policy knobs for the offer store.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OfferStoreConfig {
    /// Offer validity window applied when a patch names no explicit deadline.
    pub ttl_secs: i64,

    /// How long an accepted offer lingers before garbage collection, so the
    /// acceptance is visible for at least one render cycle.
    pub accepted_linger_ms: i64,
}

impl OfferStoreConfig {
    pub fn defaults() -> Self {
        Self {
            ttl_secs: 70,
            accepted_linger_ms: 1_400,
        }
    }
}

impl Default for OfferStoreConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Partial update merged into an offer record by [`OfferStore::upsert`].
///
/// [`OfferStore::upsert`]: crate::OfferStore::upsert
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OfferPatch {
    pub driver_id: Option<DriverId>,
    pub status: Option<OfferStatus>,
    pub offered_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl OfferPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Patch that only moves the offer to `status`.
    pub fn status(status: OfferStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Patch describing a fresh pending offer to `driver_id`.
    pub fn pending(driver_id: DriverId) -> Self {
        Self {
            driver_id: Some(driver_id),
            status: Some(OfferStatus::Pending),
            ..Self::default()
        }
    }

    pub fn with_driver(mut self, driver_id: DriverId) -> Self {
        self.driver_id = Some(driver_id);
        self
    }

    pub fn with_window(mut self, offered_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        self.offered_at = Some(offered_at);
        self.expires_at = Some(expires_at);
        self
    }
}

/// What a sweep pass changed, in deterministic order-id order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Pending offers whose deadline passed, flipped to Expired in place.
    pub expired: Vec<OrderId>,
    /// Records garbage-collected (accepted linger elapsed).
    pub removed: Vec<OrderId>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.expired.is_empty() && self.removed.is_empty()
    }
}
