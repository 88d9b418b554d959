//! In-process session service backing the server's own session

use dashmap::DashMap;
use tracing::info;
use uuid::Uuid;

use super::session::{
    SessionDescriptor, SessionError, SessionHandle, SessionQuery, SessionService, SessionSettings,
};

#[derive(Debug, Clone)]
struct StoredSession {
    handle: SessionHandle,
    owner: String,
    settings: SessionSettings,
}

/// Session registry keyed by session name
#[derive(Debug, Default)]
pub struct LocalSessionService {
    sessions: DashMap<String, StoredSession>,
}

impl LocalSessionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionService for LocalSessionService {
    async fn create_session(
        &self,
        owner: &str,
        name: &str,
        settings: SessionSettings,
    ) -> Result<SessionHandle, SessionError> {
        if self.sessions.contains_key(name) {
            return Err(SessionError::AlreadyExists(name.to_string()));
        }

        let handle = SessionHandle {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        self.sessions.insert(
            name.to_string(),
            StoredSession {
                handle: handle.clone(),
                owner: owner.to_string(),
                settings,
            },
        );

        info!(session = %name, session_id = %handle.id, owner = %owner, "Session created");
        Ok(handle)
    }

    async fn find_sessions(
        &self,
        query: &SessionQuery,
    ) -> Result<Vec<SessionDescriptor>, SessionError> {
        let results = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|s| s.settings.should_advertise)
            .filter(|s| s.settings.is_lan_match == query.is_lan_query)
            .filter(|s| !query.presence_only || s.settings.uses_presence)
            .take(query.max_results)
            .map(|s| SessionDescriptor {
                id: s.handle.id,
                owning_user: s.owner,
                attributes: s.settings.attributes,
            })
            .collect();

        Ok(results)
    }

    async fn destroy_session(&self, name: &str) -> Result<(), SessionError> {
        match self.sessions.remove(name) {
            Some(_) => {
                info!(session = %name, "Session destroyed");
                Ok(())
            }
            None => Err(SessionError::NotFound(name.to_string())),
        }
    }

    fn named_session(&self, name: &str) -> Option<SessionHandle> {
        self.sessions.get(name).map(|s| s.handle.clone())
    }
}
