//! Observer WebSocket connections

pub mod handler;
pub mod protocol;
