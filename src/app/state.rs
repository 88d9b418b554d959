//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::ArenaHandle;
use crate::matchmaking::{LocalSessionService, SessionCoordinator, SessionHandle};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub arena: ArenaHandle,
    pub sessions: Arc<SessionCoordinator<LocalSessionService>>,
    /// Session this server advertises, if hosting succeeded
    pub hosted_session: Option<SessionHandle>,
}

impl AppState {
    pub fn new(
        config: Config,
        arena: ArenaHandle,
        sessions: Arc<SessionCoordinator<LocalSessionService>>,
        hosted_session: Option<SessionHandle>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            arena,
            sessions,
            hosted_session,
        }
    }
}
