//! Matchmaking sessions - the online-session collaborator and its workflow

pub mod coordinator;
pub mod local;
pub mod session;

pub use coordinator::SessionCoordinator;
pub use local::LocalSessionService;
pub use session::{
    SessionDescriptor, SessionError, SessionHandle, SessionQuery, SessionService, SessionSettings,
};
