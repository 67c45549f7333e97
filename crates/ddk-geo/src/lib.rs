//! ddk-geo
//!
//! Geo and time helpers shared by the scorer and the SLA evaluator.
//! Pure deterministic logic. No IO, no wall-clock; callers supply `now`.

use chrono::{DateTime, Utc};
use ddk_schemas::GeoPoint;

/// Mean earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points in kilometers (haversine).
///
/// Inputs are degrees. Non-negative, symmetric, and zero for identical
/// points.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    // h can exceed 1.0 by a few ulps for antipodal points; clamp before asin.
    let h = h.min(1.0);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Whole seconds elapsed since `ts`, saturating at zero.
///
/// A reference timestamp in the future yields 0 rather than a negative age.
pub fn seconds_since(ts: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - ts).num_seconds().max(0)
}

/// `true` if `last_seen` falls within `window_secs` of `now`.
pub fn seen_within(last_seen: DateTime<Utc>, now: DateTime<Utc>, window_secs: i64) -> bool {
    seconds_since(last_seen, now) <= window_secs
}
