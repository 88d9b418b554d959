//! Host/join session workflow
//!
//! Failures never reach game state; they are shown as notifications.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::combat::{Notifier, NotifyColor};

use super::session::{
    SessionDescriptor, SessionHandle, SessionQuery, SessionService, SessionSettings, GAME_SESSION,
};

const SESSION_NOTICE: Duration = Duration::from_secs(15);

pub struct SessionCoordinator<S> {
    service: S,
    notifier: Arc<dyn Notifier>,
    owner: String,
    match_type: String,
    public_connections: u32,
}

impl<S: SessionService> SessionCoordinator<S> {
    pub fn new(
        service: S,
        notifier: Arc<dyn Notifier>,
        owner: impl Into<String>,
        match_type: impl Into<String>,
        public_connections: u32,
    ) -> Self {
        Self {
            service,
            notifier,
            owner: owner.into(),
            match_type: match_type.into(),
            public_connections,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn match_type(&self) -> &str {
        &self.match_type
    }

    /// Host a fresh game session, replacing any existing one
    pub async fn create_game_session(&self) -> Option<SessionHandle> {
        if self.service.named_session(GAME_SESSION).is_some() {
            if let Err(e) = self.service.destroy_session(GAME_SESSION).await {
                warn!(error = %e, "Failed to destroy existing session");
            }
        }

        let settings = SessionSettings::advertised(self.public_connections, &self.match_type);
        match self
            .service
            .create_session(&self.owner, GAME_SESSION, settings)
            .await
        {
            Ok(handle) => {
                self.notifier.notify(
                    &format!("Created Session {}", handle.name),
                    NotifyColor::Blue,
                    SESSION_NOTICE,
                );
                Some(handle)
            }
            Err(e) => {
                warn!(error = %e, "Create session failed");
                self.notifier
                    .notify("Create Session Failed", NotifyColor::Red, SESSION_NOTICE);
                None
            }
        }
    }

    /// Search for sessions and pick the first one of our match type
    pub async fn join_game_session(&self) -> Option<SessionDescriptor> {
        let results = match self.service.find_sessions(&SessionQuery::default()).await {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, "Find sessions failed");
                self.notifier
                    .notify("Find Sessions Failed", NotifyColor::Red, SESSION_NOTICE);
                return None;
            }
        };

        let mut chosen = None;
        for result in results {
            self.notifier.notify(
                &format!("Id: {}, User: {}", result.id, result.owning_user),
                NotifyColor::Orange,
                SESSION_NOTICE,
            );

            if chosen.is_none() && result.match_type() == Some(self.match_type.as_str()) {
                self.notifier.notify(
                    &format!("Joining Match Type: {}", self.match_type),
                    NotifyColor::Orange,
                    SESSION_NOTICE,
                );
                chosen = Some(result);
            }
        }

        match &chosen {
            Some(session) => info!(session_id = %session.id, "Selected session"),
            None => info!(match_type = %self.match_type, "No matching session"),
        }
        chosen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::NotificationLog;
    use crate::matchmaking::session::SessionError;
    use crate::matchmaking::LocalSessionService;

    /// Service whose every call fails
    struct Offline;

    impl SessionService for Offline {
        async fn create_session(
            &self,
            _owner: &str,
            _name: &str,
            _settings: SessionSettings,
        ) -> Result<SessionHandle, SessionError> {
            Err(SessionError::Unavailable("offline".into()))
        }

        async fn find_sessions(
            &self,
            _query: &SessionQuery,
        ) -> Result<Vec<SessionDescriptor>, SessionError> {
            Err(SessionError::Unavailable("offline".into()))
        }

        async fn destroy_session(&self, _name: &str) -> Result<(), SessionError> {
            Err(SessionError::Unavailable("offline".into()))
        }

        fn named_session(&self, _name: &str) -> Option<SessionHandle> {
            None
        }
    }

    fn coordinator<S: SessionService>(service: S, log: &NotificationLog) -> SessionCoordinator<S> {
        SessionCoordinator::new(service, Arc::new(log.clone()), "host", "FreeForAll", 4)
    }

    #[tokio::test]
    async fn hosting_replaces_existing_session() {
        let log = NotificationLog::new();
        let coordinator = coordinator(LocalSessionService::new(), &log);

        let first = coordinator.create_game_session().await.unwrap();
        let second = coordinator.create_game_session().await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(coordinator.service().len(), 1);
        assert_eq!(
            log.texts(),
            vec!["Created Session GameSession".to_string(); 2]
        );
    }

    #[tokio::test]
    async fn join_picks_matching_type() {
        let log = NotificationLog::new();
        let service = LocalSessionService::new();
        service
            .create_session("other", "ctf", SessionSettings::advertised(4, "CaptureTheFlag"))
            .await
            .unwrap();
        let coordinator = coordinator(service, &log);
        let hosted = coordinator.create_game_session().await.unwrap();
        log.drain();

        let chosen = coordinator.join_game_session().await.unwrap();
        assert_eq!(chosen.id, hosted.id);

        let texts = log.texts();
        assert_eq!(texts.iter().filter(|t| t.starts_with("Id: ")).count(), 2);
        assert_eq!(
            texts.iter().filter(|t| *t == "Joining Match Type: FreeForAll").count(),
            1
        );
    }

    #[tokio::test]
    async fn failures_become_notifications() {
        let log = NotificationLog::new();
        let coordinator = coordinator(Offline, &log);

        assert!(coordinator.create_game_session().await.is_none());
        assert!(coordinator.join_game_session().await.is_none());

        let drained = log.drain();
        assert_eq!(drained.len(), 2);
        assert!(drained.iter().all(|n| n.color == NotifyColor::Red));
        assert_eq!(drained[0].text, "Create Session Failed");
    }
}
