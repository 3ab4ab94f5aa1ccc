use async_trait::async_trait;
use serde_json::Value;

use crate::error::KansoError;

/// Real-time push transport.
///
/// Every delivery backend (local in-process channels, a websocket hub, etc.)
/// implements this trait. Sends are fire-and-forget per connection set:
/// callers never consult the outcome for control flow, and implementations
/// drop messages for connections that are gone rather than failing the batch.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Human-readable transport name.
    fn name(&self) -> &str;

    /// Push one named event to a set of live connections.
    async fn send(
        &self,
        connection_ids: &[String],
        event: &str,
        payload: Value,
    ) -> Result<(), KansoError>;
}
