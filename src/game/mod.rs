//! Character hosting: the authority's arena and the observer's replica

pub mod arena;
pub mod character;
pub mod replica;
pub mod respawn;

pub use arena::{Arena, ArenaHandle, ArenaSettings};
pub use character::Character;
pub use replica::ObserverReplica;

use crate::ws::protocol::{ClientMsg, ServerMsg};
use uuid::Uuid;

/// Client message received from a WebSocket connection
#[derive(Debug, Clone)]
pub struct ArenaInput {
    pub client_id: Uuid,
    pub msg: ClientMsg,
    pub received_at: u64,
}

/// Message leaving the arena. `recipient` limits it to one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ArenaOutput {
    pub recipient: Option<Uuid>,
    pub msg: ServerMsg,
}

impl ArenaOutput {
    pub fn to_all(msg: ServerMsg) -> Self {
        Self {
            recipient: None,
            msg,
        }
    }

    pub fn to(client_id: Uuid, msg: ServerMsg) -> Self {
        Self {
            recipient: Some(client_id),
            msg,
        }
    }

    pub fn is_for(&self, client_id: Uuid) -> bool {
        self.recipient.map_or(true, |r| r == client_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addressed_output_reaches_only_its_recipient() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();

        let pong = ArenaOutput::to(me, ServerMsg::Pong { t: 7 });
        assert!(pong.is_for(me));
        assert!(!pong.is_for(other));

        let removed = ArenaOutput::to_all(ServerMsg::CharacterRemoved {
            character_id: Uuid::nil(),
        });
        assert!(removed.is_for(me));
        assert!(removed.is_for(other));
    }
}
