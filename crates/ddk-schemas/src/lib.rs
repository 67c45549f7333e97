//! ddk-schemas
//!
//! Shared DTOs for the dispatch command center. Orders and drivers are
//! externally owned snapshots (read-only to every engine crate); offers are
//! owned by `ddk-offers`. Upstream free-form strings (`dispatch_status`,
//! driver `status`) are carried raw; interpretation belongs to the engines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub i64);

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriverId(pub i64);

impl std::fmt::Display for DriverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub flow_type: String,
    pub lifecycle_status: String,
    pub dispatch_status: String,
    #[serde(default)]
    pub issue_detected: bool,
    pub pickup: GeoPoint,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_dispatch_attempt_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub dispatch_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assigned_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub driver_id: Option<DriverId>,
}

impl Order {
    /// Reference timestamp for age calculations: the most recent dispatch
    /// attempt, falling back to creation time.
    pub fn age_reference(&self) -> DateTime<Utc> {
        self.last_dispatch_attempt_at.unwrap_or(self.created_at)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub id: DriverId,
    pub name: String,
    pub location: GeoPoint,
    /// Raw upstream presence status ("available", "busy", "away", "offline", …).
    pub status: String,
    pub last_seen_at: DateTime<Utc>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub avg_response_ms: Option<i64>,
    #[serde(default)]
    pub avg_ack_ms: Option<i64>,
    #[serde(default)]
    pub miss_streak: Option<u32>,
    #[serde(default)]
    pub timeout_strikes: Option<u32>,
    #[serde(default)]
    pub idle_flags: Option<u32>,
    #[serde(default)]
    pub shadowbanned_until: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Pending,
    Accepted,
    Expired,
    Rejected,
}

impl OfferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferStatus::Pending => "pending",
            OfferStatus::Accepted => "accepted",
            OfferStatus::Expired => "expired",
            OfferStatus::Rejected => "rejected",
        }
    }
}

/// A time-boxed proposal of a driver to an order.
///
/// `driver_id` is optional: push events that report or transition an
/// upstream offer may carry only the order id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub order_id: OrderId,
    pub driver_id: Option<DriverId>,
    pub status: OfferStatus,
    pub offered_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Wire shape of a `submit_offer` mutation response.
///
/// The endpoint answers with either a dispatch attempt (a pending offer with
/// server-issued timestamps) or an immediate hard assignment, with no
/// discriminating field. Both arms may be absent on degenerate responses.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OfferResponse {
    #[serde(default)]
    pub attempt: Option<DispatchAttempt>,
    #[serde(default)]
    pub order: Option<AssignedOrder>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DispatchAttempt {
    pub offered_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssignedOrder {
    #[serde(default)]
    pub driver_id: Option<DriverId>,
}
