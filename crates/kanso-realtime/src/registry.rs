//! Directory of live connections, keyed by user.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Tracks which connection ids currently belong to which user.
///
/// A user may hold several connections at once (multiple tabs, multiple
/// devices). An entry is removed as soon as its last connection goes
/// away, so an absent key means offline. Cheap to clone; all clones
/// share the same directory.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<HashMap<i64, HashSet<String>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for a user. Re-adding an id is a no-op.
    pub async fn add_connection(&self, user_id: i64, connection_id: &str) {
        let mut map = self.inner.write().await;
        map.entry(user_id)
            .or_default()
            .insert(connection_id.to_string());
        debug!("connection {connection_id} added for user {user_id}");
    }

    /// Drop a connection. The user's entry is removed once it is empty.
    pub async fn remove_connection(&self, user_id: i64, connection_id: &str) {
        let mut map = self.inner.write().await;
        if let Some(connections) = map.get_mut(&user_id) {
            connections.remove(connection_id);
            if connections.is_empty() {
                map.remove(&user_id);
            }
        }
        debug!("connection {connection_id} removed for user {user_id}");
    }

    /// All live connection ids for a user. Empty when the user is offline.
    pub async fn connections_for(&self, user_id: i64) -> Vec<String> {
        let map = self.inner.read().await;
        map.get(&user_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Deduplicated union of connection ids across several users.
    pub async fn connections_for_any(&self, user_ids: &[i64]) -> Vec<String> {
        let map = self.inner.read().await;
        let mut union = HashSet::new();
        for user_id in user_ids {
            if let Some(connections) = map.get(user_id) {
                union.extend(connections.iter().cloned());
            }
        }
        union.into_iter().collect()
    }

    /// Whether the user has at least one live connection.
    pub async fn is_online(&self, user_id: i64) -> bool {
        self.inner.read().await.contains_key(&user_id)
    }

    /// Number of distinct users with at least one live connection.
    pub async fn online_users(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_and_list_connections() {
        let registry = ConnectionRegistry::new();
        registry.add_connection(1, "c1").await;
        registry.add_connection(1, "c2").await;
        registry.add_connection(1, "c2").await;

        let mut connections = registry.connections_for(1).await;
        connections.sort();
        assert_eq!(connections, vec!["c1", "c2"]);
        assert!(registry.is_online(1).await);
        assert!(registry.connections_for(2).await.is_empty());
    }

    #[tokio::test]
    async fn test_last_connection_removal_drops_entry() {
        let registry = ConnectionRegistry::new();
        registry.add_connection(1, "c1").await;
        registry.add_connection(1, "c2").await;

        registry.remove_connection(1, "c1").await;
        assert_eq!(registry.connections_for(1).await, vec!["c2"]);
        assert_eq!(registry.online_users().await, 1);

        registry.remove_connection(1, "c2").await;
        assert!(!registry.is_online(1).await);
        assert_eq!(registry.online_users().await, 0, "empty entry must be compacted away");
    }

    #[tokio::test]
    async fn test_remove_unknown_connection_is_harmless() {
        let registry = ConnectionRegistry::new();
        registry.remove_connection(1, "ghost").await;
        registry.add_connection(1, "c1").await;
        registry.remove_connection(1, "ghost").await;
        assert_eq!(registry.connections_for(1).await, vec!["c1"]);
    }

    #[tokio::test]
    async fn test_union_deduplicates_shared_ids() {
        let registry = ConnectionRegistry::new();
        registry.add_connection(1, "shared").await;
        registry.add_connection(1, "only-1").await;
        registry.add_connection(2, "shared").await;

        let mut union = registry.connections_for_any(&[1, 2, 3]).await;
        union.sort();
        assert_eq!(union, vec!["only-1", "shared"]);
    }

    #[tokio::test]
    async fn test_concurrent_churn_settles_empty() {
        let registry = ConnectionRegistry::new();
        let mut handles = Vec::new();
        for user in 0..8i64 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..50 {
                    let id = format!("u{user}-c{i}");
                    registry.add_connection(user, &id).await;
                    registry.remove_connection(user, &id).await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(registry.online_users().await, 0);
    }
}
