//! Combat State Server - server-authoritative character combat replication
//!
//! The library hosts every module so integration tests can drive the arena
//! directly; `main.rs` only wires configuration, logging and the listener.

pub mod app;
pub mod combat;
pub mod config;
pub mod game;
pub mod http;
pub mod matchmaking;
pub mod util;
pub mod ws;
