//! Application wiring: store, connection registry, transport, services.

use kanso_core::config::Config;
use kanso_core::error::KansoError;
use kanso_core::traits::Transport;
use kanso_realtime::{ConnectionRegistry, LocalTransport};
use kanso_store::Store;
use std::sync::Arc;

use crate::services::{
    ExportService, FocusSessionService, FriendshipService, NotificationService, TaskService,
    TimeBlockService,
};

/// Shared application state.
///
/// Cheap to clone; every clone shares the store pool, the connection
/// registry, and the transport. Services are constructed on demand and
/// hold clones of the same handles.
#[derive(Clone)]
pub struct App {
    pub store: Store,
    pub registry: ConnectionRegistry,
    pub transport: Arc<dyn Transport>,
    pub config: Config,
}

impl App {
    /// Open the store and wire the in-process transport.
    pub async fn new(config: Config) -> Result<Self, KansoError> {
        let transport: Arc<dyn Transport> = Arc::new(LocalTransport::new());
        Self::with_transport(config, transport).await
    }

    /// Wire an externally provided transport (a hub adapter, a test double).
    pub async fn with_transport(
        config: Config,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, KansoError> {
        let store = Store::new(&config.store).await?;
        Ok(Self {
            store,
            registry: ConnectionRegistry::new(),
            transport,
            config,
        })
    }

    pub fn notifications(&self) -> NotificationService {
        NotificationService::new(
            self.store.clone(),
            self.registry.clone(),
            self.transport.clone(),
        )
    }

    pub fn tasks(&self) -> TaskService {
        TaskService::new(
            self.store.clone(),
            self.notifications(),
            self.config.reminder.due_soon_hours,
        )
    }

    pub fn time_blocks(&self) -> TimeBlockService {
        TimeBlockService::new(self.store.clone())
    }

    pub fn friendships(&self) -> FriendshipService {
        FriendshipService::new(self.store.clone(), self.notifications())
    }

    pub fn focus(&self) -> FocusSessionService {
        FocusSessionService::new(
            self.store.clone(),
            self.registry.clone(),
            self.transport.clone(),
        )
    }

    pub fn export(&self) -> ExportService {
        ExportService::new(self.store.clone())
    }
}
