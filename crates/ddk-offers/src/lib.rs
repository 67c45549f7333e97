//! ddk-offers
//!
//! In-memory offer timer store: TTL computation, expiry sweep, and
//! reconciliation against the authoritative order snapshot.
//!
//! # Invariants
//!
//! - **At most one record per order**: a new pending offer for the same
//!   order overwrites the prior one.
//! - **Timers never shrink silently**: a patch that omits `expires_at`
//!   cannot shorten a running window.
//! - **Authoritative truth wins**: once the order snapshot shows an
//!   assigned driver, local offer state yields (pending → accepted →
//!   garbage-collected), regardless of what optimistic updates claimed.
//!
//! Pure deterministic logic. No IO, no wall-clock; the caller provides
//! `now` on every operation.

mod store;
mod types;

pub use store::{ms_remaining, OfferStore};
pub use types::*;
