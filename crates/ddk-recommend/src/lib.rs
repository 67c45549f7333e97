//! ddk-recommend
//!
//! Ranks candidate drivers for a focused order. Pure function over the
//! driver roster: no mutation, no IO, deterministic output (score ties
//! break on driver id).

use chrono::{DateTime, Utc};
use ddk_geo::{haversine_km, seen_within};
use ddk_schemas::{Driver, DriverId, Order};
use serde::{Deserialize, Serialize};

/// Score weights and limits for driver ranking.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RecommendConfig {
    /// A driver counts as online if seen within this window and not
    /// reporting "offline".
    pub online_window_secs: i64,
    /// Ranked list is truncated to this many entries.
    pub max_results: usize,
}

impl RecommendConfig {
    pub fn defaults() -> Self {
        Self {
            online_window_secs: 90,
            max_results: 18,
        }
    }
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

const ONLINE_BONUS: f64 = 1000.0;
const PROXIMITY_CEILING: f64 = 200.0;
const PROXIMITY_DECAY_PER_KM: f64 = 20.0;
const TIMEOUT_STRIKE_PENALTY: f64 = 3.0;
const MISS_STREAK_PENALTY: f64 = 2.0;
const IDLE_FLAG_PENALTY: f64 = 1.0;

/// One ranked candidate for the focused order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriverRecommendation {
    pub driver_id: DriverId,
    pub name: String,
    pub online: bool,
    pub distance_km: f64,
    pub penalty: f64,
    pub score: f64,
}

fn score_driver(order: &Order, driver: &Driver, now: DateTime<Utc>, cfg: &RecommendConfig) -> DriverRecommendation {
    let online =
        seen_within(driver.last_seen_at, now, cfg.online_window_secs) && driver.status != "offline";
    let distance_km = haversine_km(driver.location, order.pickup);

    // Missing trust metrics are conservatively treated as zero.
    let penalty = f64::from(driver.timeout_strikes.unwrap_or(0)) * TIMEOUT_STRIKE_PENALTY
        + f64::from(driver.miss_streak.unwrap_or(0)) * MISS_STREAK_PENALTY
        + f64::from(driver.idle_flags.unwrap_or(0)) * IDLE_FLAG_PENALTY;
    let trust = driver.score.unwrap_or(0.0);

    let proximity = (PROXIMITY_CEILING - distance_km * PROXIMITY_DECAY_PER_KM).max(0.0);
    let score = if online { ONLINE_BONUS } else { 0.0 } + proximity + trust - penalty;

    DriverRecommendation {
        driver_id: driver.id,
        name: driver.name.clone(),
        online,
        distance_km,
        penalty,
        score,
    }
}

/// Rank `drivers` for `order`, best first, truncated to `cfg.max_results`.
pub fn rank(
    order: &Order,
    drivers: &[Driver],
    now: DateTime<Utc>,
    cfg: &RecommendConfig,
) -> Vec<DriverRecommendation> {
    let mut ranked: Vec<DriverRecommendation> = drivers
        .iter()
        .map(|driver| score_driver(order, driver, now, cfg))
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.driver_id.cmp(&b.driver_id))
    });
    ranked.truncate(cfg.max_results);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ddk_schemas::{GeoPoint, OrderId};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn order_at(lat: f64, lng: f64) -> Order {
        Order {
            id: OrderId(1),
            flow_type: "standard".into(),
            lifecycle_status: "pending".into(),
            dispatch_status: "searching".into(),
            issue_detected: false,
            pickup: GeoPoint { lat, lng },
            created_at: t(0),
            last_dispatch_attempt_at: None,
            dispatch_at: None,
            assigned_at: None,
            driver_id: None,
        }
    }

    fn driver(id: i64, lat: f64, lng: f64, seen: i64) -> Driver {
        Driver {
            id: DriverId(id),
            name: format!("driver-{id}"),
            location: GeoPoint { lat, lng },
            status: "available".into(),
            last_seen_at: t(seen),
            score: None,
            avg_response_ms: None,
            avg_ack_ms: None,
            miss_streak: None,
            timeout_strikes: None,
            idle_flags: None,
            shadowbanned_until: None,
        }
    }

    #[test]
    fn online_outranks_identical_offline() {
        let order = order_at(0.0, 0.0);
        let fresh = driver(1, 0.0, 0.0, 100);
        let mut stale = driver(2, 0.0, 0.0, 0);
        stale.last_seen_at = t(0); // 100s ago, outside the 90s window

        let ranked = rank(&order, &[stale.clone(), fresh.clone()], t(100), &RecommendConfig::defaults());
        assert_eq!(ranked[0].driver_id, DriverId(1));
        assert!(ranked[0].online);
        assert!(!ranked[1].online);
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn offline_status_overrides_fresh_last_seen() {
        let order = order_at(0.0, 0.0);
        let mut d = driver(1, 0.0, 0.0, 100);
        d.status = "offline".into();

        let ranked = rank(&order, &[d], t(100), &RecommendConfig::defaults());
        assert!(!ranked[0].online);
    }

    #[test]
    fn ties_break_on_driver_id_ascending() {
        let order = order_at(0.0, 0.0);
        let drivers = vec![driver(7, 0.0, 0.0, 100), driver(3, 0.0, 0.0, 100)];

        let ranked = rank(&order, &drivers, t(100), &RecommendConfig::defaults());
        assert_eq!(ranked[0].driver_id, DriverId(3));
        assert_eq!(ranked[1].driver_id, DriverId(7));
    }

    #[test]
    fn penalty_drags_score_down() {
        let order = order_at(0.0, 0.0);
        let clean = driver(1, 0.0, 0.0, 100);
        let mut flaky = driver(2, 0.0, 0.0, 100);
        flaky.timeout_strikes = Some(2);
        flaky.miss_streak = Some(3);
        flaky.idle_flags = Some(1);

        let ranked = rank(&order, &[flaky, clean], t(100), &RecommendConfig::defaults());
        assert_eq!(ranked[0].driver_id, DriverId(1));
        assert_eq!(ranked[0].score - ranked[1].score, 13.0);
    }

    #[test]
    fn distance_decay_bottoms_out_at_zero() {
        // ~111km north of the pickup: proximity term is exhausted but never
        // negative.
        let order = order_at(0.0, 0.0);
        let far = driver(1, 1.0, 0.0, 100);
        let ranked = rank(&order, &[far], t(100), &RecommendConfig::defaults());
        assert_eq!(ranked[0].score, ONLINE_BONUS);
    }

    #[test]
    fn truncates_to_max_results() {
        let order = order_at(0.0, 0.0);
        let drivers: Vec<Driver> = (0..40).map(|i| driver(i, 0.0, 0.0, 100)).collect();
        let ranked = rank(&order, &drivers, t(100), &RecommendConfig::defaults());
        assert_eq!(ranked.len(), 18);
    }

    #[test]
    fn input_roster_is_not_mutated() {
        let order = order_at(0.0, 0.0);
        let drivers = vec![driver(2, 0.0, 0.0, 100), driver(1, 0.0, 0.0, 100)];
        let before = drivers.clone();
        let _ = rank(&order, &drivers, t(100), &RecommendConfig::defaults());
        assert_eq!(drivers, before);
    }
}
