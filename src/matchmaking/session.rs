//! Online-session collaborator interface

use std::collections::HashMap;
use std::future::Future;

use serde::Serialize;
use uuid::Uuid;

/// Name of the session a host advertises
pub const GAME_SESSION: &str = "GameSession";

/// Attribute key the session search filters on
pub const MATCH_TYPE_KEY: &str = "MatchType";

/// Settings for a new session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub is_lan_match: bool,
    pub num_public_connections: u32,
    pub allow_join_in_progress: bool,
    pub allow_join_via_presence: bool,
    pub should_advertise: bool,
    pub uses_presence: bool,
    pub use_lobbies_if_available: bool,
    pub attributes: HashMap<String, String>,
}

impl SessionSettings {
    /// Public, presence-based internet session advertising `match_type`
    pub fn advertised(num_public_connections: u32, match_type: &str) -> Self {
        let mut attributes = HashMap::new();
        attributes.insert(MATCH_TYPE_KEY.to_string(), match_type.to_string());
        Self {
            is_lan_match: false,
            num_public_connections,
            allow_join_in_progress: true,
            allow_join_via_presence: true,
            should_advertise: true,
            uses_presence: true,
            use_lobbies_if_available: false,
            attributes,
        }
    }
}

/// Search parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SessionQuery {
    pub max_results: usize,
    pub is_lan_query: bool,
    /// Only sessions that use presence
    pub presence_only: bool,
}

impl Default for SessionQuery {
    fn default() -> Self {
        Self {
            max_results: 10_000,
            is_lan_query: false,
            presence_only: true,
        }
    }
}

/// A session created by this process
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionHandle {
    pub id: Uuid,
    pub name: String,
}

/// A search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionDescriptor {
    pub id: Uuid,
    pub owning_user: String,
    pub attributes: HashMap<String, String>,
}

impl SessionDescriptor {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn match_type(&self) -> Option<&str> {
        self.attribute(MATCH_TYPE_KEY)
    }
}

/// Session errors reported by the matchmaking service
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session already exists: {0}")]
    AlreadyExists(String),

    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session service unavailable: {0}")]
    Unavailable(String),
}

/// Matchmaking service the session workflow talks to.
/// Completion is delivered by resolving the returned future.
pub trait SessionService: Send + Sync {
    fn create_session(
        &self,
        owner: &str,
        name: &str,
        settings: SessionSettings,
    ) -> impl Future<Output = Result<SessionHandle, SessionError>> + Send;

    fn find_sessions(
        &self,
        query: &SessionQuery,
    ) -> impl Future<Output = Result<Vec<SessionDescriptor>, SessionError>> + Send;

    fn destroy_session(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;

    fn named_session(&self, name: &str) -> Option<SessionHandle>;
}
