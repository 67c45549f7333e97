use async_trait::async_trait;
use ddk_schemas::{Driver, DriverId, OfferResponse, Order, OrderId};

/// Failure of a collaborator call.
///
/// Implements `std::error::Error` so it can be boxed and propagated through
/// `anyhow` chains without extra wrapping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientError {
    /// Authentication/authorization failure. Never swallowed: this
    /// requires operator action and aborts the run loop.
    Unauthorized,
    /// Transport-level failure (timeout, connection loss, upstream 5xx).
    /// The next poll or operator action simply retries.
    Transport(String),
    /// Upstream rejected the mutation (validation or state conflict).
    Rejected(String),
}

impl ClientError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized)
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Unauthorized => write!(f, "unauthorized: operator action required"),
            ClientError::Transport(msg) => write!(f, "transport failure: {msg}"),
            ClientError::Rejected(msg) => write!(f, "rejected by upstream: {msg}"),
        }
    }
}

impl std::error::Error for ClientError {}

/// The REST collaborators the engine depends on (implemented elsewhere).
///
/// All calls are async and non-blocking from the tick's perspective; the
/// run loop spawns them and merges completions back into engine state.
/// Production wires the platform API here; tests use recording stubs.
#[async_trait]
pub trait DispatchClient: Send + Sync {
    async fn list_orders(&self) -> Result<Vec<Order>, ClientError>;

    async fn list_drivers(&self) -> Result<Vec<Driver>, ClientError>;

    /// Propose `driver_id` for `order_id`. The response carries either a
    /// pending attempt or an immediate hard assignment; see
    /// [`OfferResponse`].
    async fn submit_offer(
        &self,
        order_id: OrderId,
        driver_id: DriverId,
    ) -> Result<OfferResponse, ClientError>;

    async fn submit_redispatch(&self, order_id: OrderId) -> Result<(), ClientError>;

    async fn submit_reassign(&self, order_id: OrderId) -> Result<(), ClientError>;

    async fn submit_cancel(
        &self,
        order_id: OrderId,
        reason: Option<String>,
    ) -> Result<(), ClientError>;
}
