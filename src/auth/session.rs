use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::Session;

/// Signed-in sessions keyed by the opaque id kept in the session cookie.
///
/// This is the only place session state lives: sign-in opens an entry,
/// request guards read it, sign-out closes it. Clones share the same map.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry {
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a session and return the id for the cookie.
    pub fn open(&self, session: Session) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let mut map = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(id.clone(), session);
        id
    }

    /// Current session for a cookie id. Expired sessions are dropped.
    pub fn get(&self, id: &str) -> Option<Session> {
        let mut map = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        match map.get(id) {
            Some(s) if s.is_expired() => {
                map.remove(id);
                None
            }
            Some(s) => Some(s.clone()),
            None => None,
        }
    }

    pub fn close(&self, id: &str) -> Option<Session> {
        let mut map = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        map.remove(id)
    }

    /// Drop expired sessions. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut map = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let before = map.len();
        map.retain(|_, s| !s.is_expired());
        before - map.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
