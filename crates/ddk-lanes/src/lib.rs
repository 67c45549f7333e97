//! ddk-lanes
//!
//! Lane classification and SLA evaluation for the dispatch command center.
//!
//! Architectural decisions:
//! - Lanes are derived, never stored (recomputed per order per tick)
//! - Driver assignment is the strongest classification signal
//! - A dead (expired/rejected) offer pins the order to needs_driver until
//!   the offer record is explicitly cleared
//!
//! Pure deterministic logic. No IO, no wall-clock. The caller provides `now`.

mod classify;
mod sla;
mod types;

pub use classify::classify;
pub use sla::evaluate_sla;
pub use types::*;
