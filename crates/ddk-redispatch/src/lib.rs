//! ddk-redispatch
//!
//! Edge-triggered, rate-limited auto-redispatch controller.
//!
//! # Invariants
//!
//! - A fire happens only on the `locked → ready` transition of the focused
//!   order, never level-triggered and never on first observation.
//! - Per-order cooldown between automatic fires, consumed on fire whether
//!   or not the mutation succeeds (failed attempts wait out the cooldown).
//! - Disarmed means no fire, ever; observations are still tracked so a
//!   later arm cannot act on a stale edge.
//!
//! Pure deterministic logic. No IO, no wall-clock. The caller provides `now`
//! and executes the fire intent.

mod controller;
mod types;

pub use controller::{evaluate, observe_lock};
pub use types::*;
