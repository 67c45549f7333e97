//! ddk-runtime
//!
//! Async host loop binding the dispatch engine to its collaborators: the
//! REST client behind [`DispatchClient`], the push channel, and the
//! operator's command stream. The engine itself is framework-agnostic and
//! tick-driven; this crate owns the timers and the spawned network calls.

mod client;
mod runner;

pub use client::{ClientError, DispatchClient};
pub use runner::{run_loop, OperatorCommand, RuntimeConfig};

/// Tracing bootstrap: env-filter driven, defaults to `info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
