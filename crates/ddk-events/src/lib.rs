//! ddk-events
//!
//! Single parsing boundary for the realtime push channel: heterogeneous
//! envelopes in, a closed [`NormalizedEvent`] enum out. Malformed payloads
//! are discarded silently; the reconciler never fails on bad input.

mod normalize;
mod types;

pub use normalize::normalize;
pub use types::NormalizedEvent;
