//! In-process transport backed by per-connection mpsc queues.

use async_trait::async_trait;
use kanso_core::error::KansoError;
use kanso_core::traits::Transport;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tracing::warn;

/// A pushed event as seen by one connection.
pub type Delivery = (String, Value);

/// Transport that delivers events to in-process subscribers.
///
/// Each registered connection gets its own unbounded queue. Sends to
/// connections that were never registered, or whose receiver was
/// dropped, are skipped with a warning; the rest of the batch still
/// goes out.
#[derive(Clone, Default)]
pub struct LocalTransport {
    queues: Arc<Mutex<HashMap<String, UnboundedSender<Delivery>>>>,
}

impl LocalTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a queue for a connection and return its receiving end.
    /// Registering the same id again replaces the previous queue.
    pub async fn register(&self, connection_id: &str) -> UnboundedReceiver<Delivery> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.queues.lock().await.insert(connection_id.to_string(), tx);
        rx
    }

    /// Close a connection's queue, dropping any undelivered events.
    pub async fn unregister(&self, connection_id: &str) {
        self.queues.lock().await.remove(connection_id);
    }
}

#[async_trait]
impl Transport for LocalTransport {
    fn name(&self) -> &str {
        "local"
    }

    async fn send(
        &self,
        connection_ids: &[String],
        event: &str,
        payload: Value,
    ) -> Result<(), KansoError> {
        let mut queues = self.queues.lock().await;
        for connection_id in connection_ids {
            match queues.get(connection_id) {
                Some(tx) => {
                    if tx.send((event.to_string(), payload.clone())).is_err() {
                        // Receiver dropped without unregistering.
                        warn!("dropping {event} for dead connection {connection_id}");
                        queues.remove(connection_id);
                    }
                }
                None => warn!("no queue for connection {connection_id}, skipping {event}"),
            }
        }
        Ok(())
    }
}
