use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::assistant::Assistant;
use crate::session::Session;

pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(3600);

struct SessionSlot {
    session: Arc<Mutex<Session>>,
    last_active: Instant,
}

/// Shared state handed to every route handler.
///
/// Sessions are independent; each sits behind its own async mutex, which is
/// held for the full duration of an action so one session never runs two
/// handlers at once. A session nobody has touched for `idle_ttl` is dropped
/// by [`AppState::prune_idle`].
#[derive(Clone)]
pub struct AppState {
    assistant: Arc<Assistant>,
    sessions: Arc<RwLock<HashMap<Uuid, SessionSlot>>>,
    idle_ttl: Duration,
}

impl AppState {
    pub fn new(assistant: Arc<Assistant>) -> Self {
        Self {
            assistant,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_ttl: DEFAULT_IDLE_TTL,
        }
    }

    pub fn with_idle_ttl(mut self, idle_ttl: Duration) -> Self {
        self.idle_ttl = idle_ttl;
        self
    }

    pub fn assistant(&self) -> &Assistant {
        &self.assistant
    }

    pub async fn create_session(&self) -> Uuid {
        self.prune_idle().await;

        let session = Session::new();
        let id = session.id;
        self.sessions.write().await.insert(
            id,
            SessionSlot {
                session: Arc::new(Mutex::new(session)),
                last_active: Instant::now(),
            },
        );
        tracing::info!(session = %id, "session started");
        id
    }

    /// Looks up a session and marks it active.
    pub async fn session(&self, id: Uuid) -> Option<Arc<Mutex<Session>>> {
        let mut sessions = self.sessions.write().await;
        let slot = sessions.get_mut(&id)?;
        slot.last_active = Instant::now();
        Some(Arc::clone(&slot.session))
    }

    pub async fn end_session(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            tracing::info!(session = %id, "session ended");
        }
        removed
    }

    /// Drops sessions idle for longer than the TTL. A session with an action
    /// in flight is kept. Returns how many were dropped.
    pub async fn prune_idle(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, slot| {
            let keep = now.duration_since(slot.last_active) < self.idle_ttl
                || slot.session.try_lock().is_err();
            if !keep {
                tracing::info!(session = %id, "session expired");
            }
            keep
        });
        before - sessions.len()
    }

    /// Runs [`prune_idle`](Self::prune_idle) every `every` until the runtime
    /// shuts down.
    pub fn spawn_idle_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let expired = state.prune_idle().await;
                if expired > 0 {
                    tracing::debug!(expired, "pruned idle sessions");
                }
            }
        })
    }
}
