use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use ddk_events::{normalize, NormalizedEvent};
use ddk_lanes::{classify, evaluate_sla, Lane, SlaLevel, SlaPolicy};
use ddk_offers::{OfferPatch, OfferStore, OfferStoreConfig};
use ddk_recommend::{rank, RecommendConfig};
use ddk_redispatch::{
    evaluate as evaluate_redispatch, observe_lock, RedispatchConfig, RedispatchState,
};
use ddk_schemas::{Driver, DriverId, OfferResponse, OfferStatus, Order, OrderId};
use serde_json::Value;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::cache::SnapshotCache;
use crate::view::{DispatchView, FocusView, LaneEntry, LaneSummary};

/// All engine policy knobs in one place.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub sla: SlaPolicy,
    pub offers: OfferStoreConfig,
    pub recommend: RecommendConfig,
    pub redispatch: RedispatchConfig,
    /// Snapshots older than this count as stale in the view.
    pub snapshot_stale_secs: i64,
}

impl EngineConfig {
    pub fn defaults() -> Self {
        Self {
            sla: SlaPolicy::default(),
            offers: OfferStoreConfig::defaults(),
            recommend: RecommendConfig::defaults(),
            redispatch: RedispatchConfig::defaults(),
            snapshot_stale_secs: 5,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Handle for one optimistic offer submission.
///
/// Issued by [`DispatchEngine::stage_offer`] and handed back with the
/// mutation result, so a completion that arrives after the attempt was
/// superseded cannot clobber the newer attempt's state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OfferTicket {
    pub attempt_id: Uuid,
    pub order_id: OrderId,
    pub driver_id: DriverId,
}

/// Mutations acknowledged by upstream that invalidate local offer state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MutationKind {
    Redispatch,
    Reassign,
    Cancel,
}

/// Side effects a tick asks the host to perform. The engine itself does no
/// IO.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineCommand {
    Redispatch { order_id: OrderId },
    RefreshOrders,
    RefreshDrivers,
}

/// Result of one tick: the UI projection plus host-side intents.
#[derive(Clone, Debug)]
pub struct TickOutput {
    pub view: DispatchView,
    pub commands: Vec<EngineCommand>,
}

/// Orchestration facade for the dispatch command center.
///
/// Owns the only shared mutable state (the authoritative order/driver
/// snapshots, the offer store, and the redispatch controller state) and
/// exposes the documented operations as its sole mutation surface. A 1 Hz
/// [`tick`] recomputes every derived value (lanes, SLA, locks, rankings)
/// from current in-memory state; nothing on the tick path blocks.
///
/// [`tick`]: DispatchEngine::tick
pub struct DispatchEngine {
    cfg: EngineConfig,
    orders: SnapshotCache<Order>,
    drivers: SnapshotCache<Driver>,
    offers: OfferStore,
    redispatch: RedispatchState,
    focus: Option<OrderId>,
    /// Live optimistic attempt per order; superseded tickets mismatch.
    attempts: BTreeMap<OrderId, Uuid>,
}

impl DispatchEngine {
    pub fn new(cfg: EngineConfig) -> Self {
        let offers = OfferStore::new(cfg.offers);
        Self {
            cfg,
            orders: SnapshotCache::new(),
            drivers: SnapshotCache::new(),
            offers,
            redispatch: RedispatchState::new(),
            focus: None,
            attempts: BTreeMap::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Operator surface
    // -----------------------------------------------------------------------

    pub fn set_focus(&mut self, order_id: Option<OrderId>) {
        self.focus = order_id;
    }

    pub fn focus(&self) -> Option<OrderId> {
        self.focus
    }

    pub fn set_auto_redispatch(&mut self, armed: bool) {
        if self.redispatch.armed != armed {
            info!(armed, "auto-redispatch switch");
        }
        self.redispatch.armed = armed;
    }

    pub fn auto_redispatch_armed(&self) -> bool {
        self.redispatch.armed
    }

    // -----------------------------------------------------------------------
    // Authoritative snapshots
    // -----------------------------------------------------------------------

    /// Apply a refetched order snapshot. Returns `false` if it was rejected
    /// as older than the last accepted one.
    pub fn apply_orders(&mut self, orders: Vec<Order>, fetched_at: DateTime<Utc>) -> bool {
        let accepted = self.orders.apply(orders, fetched_at);
        if !accepted {
            debug!(%fetched_at, "dropped non-monotonic order snapshot");
        }
        accepted
    }

    /// Apply a refetched driver snapshot. Same monotonicity rule as orders.
    pub fn apply_drivers(&mut self, drivers: Vec<Driver>, fetched_at: DateTime<Utc>) -> bool {
        let accepted = self.drivers.apply(drivers, fetched_at);
        if !accepted {
            debug!(%fetched_at, "dropped non-monotonic driver snapshot");
        }
        accepted
    }

    // -----------------------------------------------------------------------
    // Push channel
    // -----------------------------------------------------------------------

    /// Apply one raw push payload. Malformed payloads are dropped silently.
    pub fn apply_push(&mut self, raw: &Value, now: DateTime<Utc>) {
        let Some(event) = normalize(raw) else {
            trace!("discarded unrecognized push payload");
            return;
        };

        match event {
            NormalizedEvent::DriverAssigned { order_id, driver_id } => {
                debug!(%order_id, "push: driver assigned");
                let mut patch = OfferPatch::status(OfferStatus::Accepted);
                patch.driver_id = driver_id;
                self.offers.upsert(order_id, patch, now);
                self.attempts.remove(&order_id);
                // The order itself changed upstream; refresh the snapshot.
                self.orders.invalidate();
            }
            NormalizedEvent::OfferExpired { order_id } => {
                debug!(%order_id, "push: offer expired");
                self.offers
                    .upsert(order_id, OfferPatch::status(OfferStatus::Expired), now);
            }
            NormalizedEvent::OfferRejected { order_id } => {
                debug!(%order_id, "push: offer rejected");
                self.offers
                    .upsert(order_id, OfferPatch::status(OfferStatus::Rejected), now);
            }
            NormalizedEvent::OrderSync => self.orders.invalidate(),
            NormalizedEvent::DriverSync => self.drivers.invalidate(),
        }
    }

    // -----------------------------------------------------------------------
    // Mutation lifecycle (optimistic offers and acks)
    // -----------------------------------------------------------------------

    /// Record an optimistic pending offer before the mutation is sent.
    ///
    /// A new ticket supersedes any earlier attempt for the same order; the
    /// offer window restarts from `now`.
    pub fn stage_offer(&mut self, order_id: OrderId, driver_id: DriverId, now: DateTime<Utc>) -> OfferTicket {
        let expires_at = now + Duration::seconds(self.cfg.offers.ttl_secs);
        self.offers.upsert(
            order_id,
            OfferPatch::pending(driver_id).with_window(now, expires_at),
            now,
        );

        let ticket = OfferTicket {
            attempt_id: Uuid::new_v4(),
            order_id,
            driver_id,
        };
        self.attempts.insert(order_id, ticket.attempt_id);
        debug!(%order_id, %driver_id, "staged optimistic offer");
        ticket
    }

    /// Apply a completed `submit_offer` mutation.
    ///
    /// A hard assignment (`order.driver_id` in the response) always applies
    /// since it is authoritative truth, even for a superseded ticket. An `attempt`
    /// payload only re-times the offer when the ticket is still current.
    pub fn apply_offer_response(&mut self, ticket: &OfferTicket, response: &OfferResponse, now: DateTime<Utc>) {
        if let Some(assigned) = &response.order {
            let driver_id = assigned.driver_id.unwrap_or(ticket.driver_id);
            debug!(order_id = %ticket.order_id, %driver_id, "offer answered with hard assignment");
            let mut patch = OfferPatch::status(OfferStatus::Accepted);
            patch.driver_id = Some(driver_id);
            self.offers.upsert(ticket.order_id, patch, now);
            self.attempts.remove(&ticket.order_id);
            self.orders.invalidate();
            return;
        }

        if !self.is_current(ticket) {
            debug!(order_id = %ticket.order_id, "ignored result for superseded offer attempt");
            return;
        }

        if let Some(attempt) = &response.attempt {
            // Server-issued window overrides the locally assumed TTL.
            self.offers.upsert(
                ticket.order_id,
                OfferPatch::new()
                    .with_driver(ticket.driver_id)
                    .with_window(attempt.offered_at, attempt.expires_at),
                now,
            );
        }
        // A response with neither arm leaves the optimistic record running
        // on its local TTL.
    }

    /// Record a failed `submit_offer` mutation.
    ///
    /// The optimistic offer flips to Expired: the operator sees that the
    /// attempt did not work rather than watching it silently vanish.
    pub fn fail_offer(&mut self, ticket: &OfferTicket, now: DateTime<Utc>) {
        if !self.is_current(ticket) {
            return;
        }
        warn!(order_id = %ticket.order_id, driver_id = %ticket.driver_id, "offer submission failed");
        self.offers
            .upsert(ticket.order_id, OfferPatch::status(OfferStatus::Expired), now);
        self.attempts.remove(&ticket.order_id);
    }

    /// Apply an acknowledged redispatch/reassign/cancel mutation.
    ///
    /// Keyed strictly by order id; a result arriving after focus moved
    /// elsewhere still lands on the right order and never touches focus.
    pub fn apply_mutation_ack(&mut self, order_id: OrderId, kind: MutationKind, _now: DateTime<Utc>) {
        debug!(%order_id, ?kind, "mutation acknowledged");
        self.offers.clear(order_id);
        self.attempts.remove(&order_id);
        self.orders.invalidate();
    }

    fn is_current(&self, ticket: &OfferTicket) -> bool {
        self.attempts.get(&ticket.order_id) == Some(&ticket.attempt_id)
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// One cooperative update cycle: sweep timers, reconcile against the
    /// authoritative snapshot, reclassify every order, and evaluate the
    /// redispatch controller for the focused order.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickOutput {
        let mut commands = Vec::new();

        let sweep = self.offers.sweep(now);
        for order_id in &sweep.expired {
            debug!(%order_id, "offer TTL elapsed");
        }

        let accepted = self.offers.reconcile_assigned(self.orders.items(), now);
        for order_id in accepted {
            debug!(%order_id, "snapshot confirmed assignment");
            self.attempts.remove(&order_id);
        }
        self.prune_unknown_offers();

        // Classification + SLA, one pass over the snapshot.
        let mut summaries: BTreeMap<Lane, LaneSummary> = Lane::ALL
            .iter()
            .map(|lane| {
                (
                    *lane,
                    LaneSummary {
                        lane: *lane,
                        orders: Vec::new(),
                        worst: SlaLevel::Good,
                        warn_count: 0,
                        bad_count: 0,
                    },
                )
            })
            .collect();

        for order in self.orders.items() {
            let lane = classify(order, self.offers.offer(order.id));
            let sla = evaluate_sla(lane, order, now, &self.cfg.sla);

            let summary = summaries.get_mut(&lane).expect("all lanes present");
            summary.worst = summary.worst.max(sla.level);
            match sla.level {
                SlaLevel::Warn => summary.warn_count += 1,
                SlaLevel::Bad => summary.bad_count += 1,
                SlaLevel::Good => {}
            }
            summary.orders.push(LaneEntry {
                order_id: order.id,
                sla,
            });
        }

        // Focused order: lock state, ranking, controller evaluation.
        let focused_order = self
            .focus
            .and_then(|id| self.orders.items().iter().find(|o| o.id == id));

        let focus_view = focused_order.map(|order| {
            let lane = classify(order, self.offers.offer(order.id));
            let lock = observe_lock(
                order,
                lane,
                self.offers.offer(order.id),
                now,
                &self.cfg.redispatch,
            );
            FocusView {
                order_id: order.id,
                lane,
                lock,
                lock_label: lock.reason.as_str(),
                remaining_secs: (lock.remaining_ms + 999) / 1_000,
                auto_redispatch_armed: self.redispatch.armed,
                recommendations: rank(order, self.drivers.items(), now, &self.cfg.recommend),
            }
        });

        let observation = focus_view.as_ref().map(|f| (f.order_id, f.lock.reason));
        let decision = evaluate_redispatch(&self.cfg.redispatch, &mut self.redispatch, observation, now);
        if decision.is_fire() {
            let order_id = observation.expect("fire requires a focused order").0;
            info!(%order_id, "auto-redispatch firing");
            commands.push(EngineCommand::Redispatch { order_id });
        }

        if self.orders.consume_invalidation() {
            commands.push(EngineCommand::RefreshOrders);
        }
        if self.drivers.consume_invalidation() {
            commands.push(EngineCommand::RefreshDrivers);
        }

        let view = DispatchView {
            generated_at: now,
            lanes: summaries.into_values().collect(),
            focus: focus_view,
            offers: self.offers.offers(),
            orders_stale: self.orders.is_stale(now, self.cfg.snapshot_stale_secs),
            drivers_stale: self.drivers.is_stale(now, self.cfg.snapshot_stale_secs),
        };

        TickOutput { view, commands }
    }

    /// Drop offer records for orders the authoritative snapshot no longer
    /// lists (delivered or cancelled upstream). Skipped until the first
    /// snapshot arrives, since an empty unfetched cache proves nothing.
    fn prune_unknown_offers(&mut self) {
        if self.orders.fetched_at().is_none() {
            return;
        }
        let known: BTreeSet<OrderId> = self.orders.items().iter().map(|o| o.id).collect();
        for offer in self.offers.offers() {
            if !known.contains(&offer.order_id) {
                debug!(order_id = %offer.order_id, "pruning offer for unlisted order");
                self.offers.clear(offer.order_id);
                self.attempts.remove(&offer.order_id);
            }
        }
    }
}

impl Default for DispatchEngine {
    fn default() -> Self {
        Self::new(EngineConfig::defaults())
    }
}
