use ddk_schemas::{Offer, OfferStatus, Order};

use crate::Lane;

/// Classify an order into its work-queue lane.
///
/// Precedence, first match wins:
///
/// 1. Assigned driver on the snapshot, or an accepted offer: `Assigned`.
///    Driver assignment is the strongest signal and overrides everything,
///    including `issue_detected` and whatever `dispatch_status` claims.
/// 2. `issue_detected`: `Problem`.
/// 3. Pending offer: `Offered`.
/// 4. Expired or rejected offer: `NeedsDriver` (stays there until the
///    record is explicitly cleared).
/// 5–7. Fall back to the raw upstream `dispatch_status` string.
///
/// Pure and total: identical inputs always produce the identical lane.
pub fn classify(order: &Order, offer: Option<&Offer>) -> Lane {
    let offer_status = offer.map(|o| o.status);

    if order.driver_id.is_some() || offer_status == Some(OfferStatus::Accepted) {
        return Lane::Assigned;
    }
    if order.issue_detected {
        return Lane::Problem;
    }
    match offer_status {
        Some(OfferStatus::Pending) => return Lane::Offered,
        Some(OfferStatus::Expired) | Some(OfferStatus::Rejected) => return Lane::NeedsDriver,
        _ => {}
    }

    // Upstream status strings are free-form; match case-insensitively.
    let raw = order.dispatch_status.to_ascii_lowercase();
    if raw.contains("offer") {
        return Lane::Offered;
    }
    if raw.contains("search") || raw == "planned" || raw.contains("dispatch") {
        return Lane::Searching;
    }
    Lane::NeedsDriver
}
