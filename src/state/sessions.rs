use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::context::{ConversationWindow, WindowConfig};

pub type SessionHandle = Arc<Mutex<ConversationWindow>>;

pub const DEFAULT_MAX_SESSIONS: usize = 1_000;

struct SessionEntry {
    window: SessionHandle,
    last_used: u64,
}

#[derive(Default)]
struct Sessions {
    entries: HashMap<String, SessionEntry>,
    clock: u64,
}

impl Sessions {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn evict_least_recent(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(id, _)| id.clone());
        if let Some(id) = oldest {
            tracing::debug!("Evicting idle session {}", id);
            self.entries.remove(&id);
        }
    }
}

/// One conversation window per session id, at most `max_sessions` of them.
/// Windows are never shared between sessions; the least recently used
/// session is dropped to make room for a new one.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<Sessions>>,
    config: WindowConfig,
    max_sessions: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(WindowConfig::default(), DEFAULT_MAX_SESSIONS)
    }
}

impl SessionRegistry {
    pub fn new(config: WindowConfig, max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(Sessions::default())),
            config,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Returns the window for `session_id`, creating it (and an id when none
    /// was supplied) on first use.
    pub async fn get_or_create(&self, session_id: Option<&str>) -> (String, SessionHandle) {
        let id = match session_id.map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };
        let mut sessions = self.sessions.lock().await;
        let now = sessions.tick();

        if let Some(entry) = sessions.entries.get_mut(&id) {
            entry.last_used = now;
            return (id, entry.window.clone());
        }

        while sessions.entries.len() >= self.max_sessions {
            sessions.evict_least_recent();
        }
        let window = Arc::new(Mutex::new(ConversationWindow::new(self.config.clone())));
        sessions.entries.insert(
            id.clone(),
            SessionEntry {
                window: window.clone(),
                last_used: now,
            },
        );
        (id, window)
    }

    /// Clears the session's history; `false` when the session is unknown.
    pub async fn reset(&self, session_id: &str) -> bool {
        let window = self
            .sessions
            .lock()
            .await
            .entries
            .get(session_id)
            .map(|entry| entry.window.clone());
        match window {
            Some(window) => {
                window.lock().await.reset();
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.entries.len()
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.sessions.lock().await.entries.contains_key(session_id)
    }
}
