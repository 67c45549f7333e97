use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use ddk_schemas::{Offer, OfferStatus, Order, OrderId};

use crate::{OfferPatch, OfferStoreConfig, SweepReport};

/// Milliseconds until `expires_at`, clamped to zero.
pub fn ms_remaining(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expires_at - now).num_milliseconds().max(0)
}

#[derive(Clone, Debug, PartialEq)]
struct OfferRecord {
    offer: Offer,
    /// Garbage-collection deadline, set once the offer reaches Accepted.
    remove_at: Option<DateTime<Utc>>,
}

/// In-memory table of ephemeral offers, at most one record per order.
///
/// The store is the single owner of offer state. Mutations arrive from three
/// sources (optimistic local submissions, push events, and the periodic
/// authoritative order snapshot) and all go through the operations below.
/// [`reconcile_assigned`] enforces the one ordering rule that matters:
/// snapshot truth always overrides local optimism.
///
/// [`reconcile_assigned`]: OfferStore::reconcile_assigned
#[derive(Clone, Debug)]
pub struct OfferStore {
    cfg: OfferStoreConfig,
    records: BTreeMap<OrderId, OfferRecord>,
}

impl OfferStore {
    pub fn new(cfg: OfferStoreConfig) -> Self {
        Self {
            cfg,
            records: BTreeMap::new(),
        }
    }

    /// Merge `patch` into the order's record, creating one if absent.
    ///
    /// Creation defaults: status Pending, `offered_at = now`,
    /// `expires_at = offered_at + ttl`.
    ///
    /// Merge rules:
    /// - a patch that omits `expires_at` never shortens a running timer;
    /// - a patch whose `status` differs applies its window fields, and a
    ///   transition to Pending with no explicit deadline restarts the TTL
    ///   (a new offer overwrites the prior one);
    /// - reaching Accepted schedules garbage collection after the linger.
    pub fn upsert(&mut self, order_id: OrderId, patch: OfferPatch, now: DateTime<Utc>) {
        let linger = Duration::milliseconds(self.cfg.accepted_linger_ms);

        match self.records.get_mut(&order_id) {
            None => {
                let status = patch.status.unwrap_or(OfferStatus::Pending);
                let offered_at = patch.offered_at.unwrap_or(now);
                let expires_at = patch
                    .expires_at
                    .unwrap_or(offered_at + Duration::seconds(self.cfg.ttl_secs));
                let remove_at = (status == OfferStatus::Accepted).then(|| now + linger);
                self.records.insert(
                    order_id,
                    OfferRecord {
                        offer: Offer {
                            order_id,
                            driver_id: patch.driver_id,
                            status,
                            offered_at,
                            expires_at,
                        },
                        remove_at,
                    },
                );
            }
            Some(rec) => {
                if let Some(driver_id) = patch.driver_id {
                    rec.offer.driver_id = Some(driver_id);
                }
                match patch.status {
                    Some(status) if status != rec.offer.status => {
                        rec.offer.status = status;
                        if status == OfferStatus::Pending {
                            // Fresh offer replacing a dead one: restart the
                            // window unless the patch pins it explicitly.
                            let offered_at = patch.offered_at.unwrap_or(now);
                            rec.offer.offered_at = offered_at;
                            rec.offer.expires_at = patch
                                .expires_at
                                .unwrap_or(offered_at + Duration::seconds(self.cfg.ttl_secs));
                        } else {
                            if let Some(offered_at) = patch.offered_at {
                                rec.offer.offered_at = offered_at;
                            }
                            if let Some(expires_at) = patch.expires_at {
                                rec.offer.expires_at = expires_at;
                            }
                        }
                        rec.remove_at = (status == OfferStatus::Accepted).then(|| now + linger);
                    }
                    _ => {
                        // Same (or no) status: the running timer wins unless
                        // the patch names a new window explicitly.
                        if let Some(offered_at) = patch.offered_at {
                            rec.offer.offered_at = offered_at;
                        }
                        if let Some(expires_at) = patch.expires_at {
                            rec.offer.expires_at = expires_at;
                        }
                    }
                }
            }
        }
    }

    /// Remove the order's record entirely.
    pub fn clear(&mut self, order_id: OrderId) {
        self.records.remove(&order_id);
    }

    /// Expiry and garbage-collection pass.
    ///
    /// Pending offers whose deadline passed flip to Expired **in place**:
    /// downstream classification needs the expired record to pin the order
    /// to needs_driver until it is explicitly cleared. Accepted records past
    /// their linger deadline are removed.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        for (order_id, rec) in self.records.iter_mut() {
            if rec.offer.status == OfferStatus::Pending && rec.offer.expires_at <= now {
                rec.offer.status = OfferStatus::Expired;
                report.expired.push(*order_id);
            }
        }

        let due: Vec<OrderId> = self
            .records
            .iter()
            .filter(|(_, rec)| rec.remove_at.is_some_and(|at| at <= now))
            .map(|(order_id, _)| *order_id)
            .collect();
        for order_id in due {
            self.records.remove(&order_id);
            report.removed.push(order_id);
        }

        report
    }

    /// Reconcile offer state against the authoritative order snapshot.
    ///
    /// For every snapshot order with a driver assigned: a Pending offer
    /// becomes Accepted (driver taken from the snapshot) and is scheduled
    /// for garbage collection; any other surviving record is moot once the
    /// snapshot confirms the assignment and is removed immediately.
    /// Authoritative truth always wins over optimistic local state.
    ///
    /// Returns the orders whose offer was accepted by this pass.
    pub fn reconcile_assigned(&mut self, orders: &[Order], now: DateTime<Utc>) -> Vec<OrderId> {
        let linger = Duration::milliseconds(self.cfg.accepted_linger_ms);
        let mut accepted = Vec::new();

        for order in orders.iter().filter(|o| o.driver_id.is_some()) {
            let Some(rec) = self.records.get_mut(&order.id) else {
                continue;
            };
            if rec.offer.status == OfferStatus::Pending {
                rec.offer.status = OfferStatus::Accepted;
                rec.offer.driver_id = order.driver_id;
                rec.remove_at = Some(now + linger);
                accepted.push(order.id);
            } else {
                self.records.remove(&order.id);
            }
        }

        accepted
    }

    pub fn offer(&self, order_id: OrderId) -> Option<&Offer> {
        self.records.get(&order_id).map(|rec| &rec.offer)
    }

    /// Snapshot of every record, for badge rendering.
    pub fn offers(&self) -> Vec<Offer> {
        self.records.values().map(|rec| rec.offer.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for OfferStore {
    fn default() -> Self {
        Self::new(OfferStoreConfig::defaults())
    }
}
