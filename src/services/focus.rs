//! Focus session lifecycle: one open session per user, duration computed
//! on end, start/end pushed to the user's live connections.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kanso_core::error::KansoError;
use kanso_core::focus::{FocusMode, FocusSession, FocusStats};
use kanso_core::traits::Transport;
use kanso_realtime::events::{self, SessionPayload};
use kanso_realtime::ConnectionRegistry;
use kanso_store::Store;
use tracing::{info, warn};

#[derive(Clone)]
pub struct FocusSessionService {
    store: Store,
    registry: ConnectionRegistry,
    transport: Arc<dyn Transport>,
}

impl FocusSessionService {
    pub fn new(store: Store, registry: ConnectionRegistry, transport: Arc<dyn Transport>) -> Self {
        Self {
            store,
            registry,
            transport,
        }
    }

    /// Start a session. Fails if the user already has one open.
    pub async fn start(&self, user_id: i64, mode: FocusMode) -> Result<FocusSession, KansoError> {
        if self.store.active_session_for_user(user_id).await?.is_some() {
            return Err(KansoError::Conflict(
                "there is already an active focus session".to_string(),
            ));
        }

        let session = self
            .store
            .create_focus_session(user_id, mode, Utc::now())
            .await?;
        info!("focus session {} started ({})", session.id, mode.as_str());
        self.push_session(user_id, events::SESSION_STARTED, &session)
            .await;
        Ok(session)
    }

    /// End an open session, recording its duration in whole minutes.
    pub async fn end(&self, session_id: i64, user_id: i64) -> Result<FocusSession, KansoError> {
        let mut session = self
            .store
            .find_focus_session(session_id)
            .await?
            .ok_or_else(|| KansoError::NotFound(format!("focus session {session_id}")))?;

        if session.user_id != user_id {
            return Err(KansoError::Unauthorized(
                "you can only end your own sessions".to_string(),
            ));
        }
        if session.end_time.is_some() {
            return Err(KansoError::Conflict("session is already ended".to_string()));
        }

        let end_time = Utc::now();
        let minutes = ((end_time - session.start_time).num_seconds() as f64 / 60.0).round() as i64;
        self.store
            .end_focus_session(session.id, end_time, minutes)
            .await?;
        session.end_time = Some(end_time);
        session.duration_minutes = Some(minutes);

        info!("focus session {} ended after {minutes} min", session.id);
        self.push_session(user_id, events::SESSION_ENDED, &session)
            .await;
        Ok(session)
    }

    pub async fn active(&self, user_id: i64) -> Result<Option<FocusSession>, KansoError> {
        self.store.active_session_for_user(user_id).await
    }

    /// Sessions intersecting `[start, end]`, open ones included.
    pub async fn list_between(
        &self,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<FocusSession>, KansoError> {
        self.store.sessions_for_user(user_id, start, end).await
    }

    /// Aggregates over completed sessions only.
    pub async fn stats(
        &self,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<FocusStats, KansoError> {
        self.store.focus_stats(user_id, start, end).await
    }

    /// Push a session event to every live connection the user has. Push
    /// failures are logged and swallowed; the session itself is already
    /// persisted.
    async fn push_session(&self, user_id: i64, event: &str, session: &FocusSession) {
        let connections = self.registry.connections_for(user_id).await;
        if connections.is_empty() {
            return;
        }
        let payload = match serde_json::to_value(SessionPayload::from(session)) {
            Ok(value) => value,
            Err(e) => {
                warn!("serializing {event} payload failed: {e}");
                return;
            }
        };
        if let Err(e) = self.transport.send(&connections, event, payload).await {
            warn!("pushing {event} failed: {e}");
        }
    }
}
