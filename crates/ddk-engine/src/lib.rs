//! ddk-engine
//!
//! Orchestration facade for the dispatch command center. Merges three
//! independent, out-of-order signal sources (optimistic local mutation
//! results, periodic authoritative refetch, and asynchronous push events)
//! into one consistent tick-driven view.
//!
//! # Invariants
//!
//! - **Single mutation surface**: the offer store and the snapshot caches
//!   are mutated only through [`DispatchEngine`]'s documented operations,
//!   never ad hoc.
//! - **Authoritative truth wins**: refetched snapshots override optimistic
//!   offer state on every tick; stale refetch responses are rejected by a
//!   monotonicity watermark.
//! - **No IO on the tick path**: [`DispatchEngine::tick`] is pure in-memory
//!   recomputation; network work is returned as [`EngineCommand`] intents
//!   for the host to execute.
//!
//! The host drives `tick(now)` at 1 Hz; the engine owns no timer.

mod cache;
mod engine;
mod view;

pub use cache::SnapshotCache;
pub use engine::{
    DispatchEngine, EngineCommand, EngineConfig, MutationKind, OfferTicket, TickOutput,
};
pub use view::{DispatchView, FocusView, LaneEntry, LaneSummary};
