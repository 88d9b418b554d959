//! WebSocket protocol message definitions
//! These are the wire types between the authority and its observers

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::combat::{FieldUpdate, ServerRpc};

/// Messages sent from an observer to the authority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Spawn a character owned by this connection
    Join { name: String },

    /// Ask for the current state of every character (sent on connect)
    Sync,

    /// Ask the authority to put our character into ragdoll
    RequestStartRagdoll,

    /// Ask the authority to respawn our character
    RequestRespawn,

    /// Damage reported by combat/trigger logic against a character
    DealDamage { target: Uuid, amount: f32 },

    /// Ammo pickup for our character
    PickupAmmo { amount: i32 },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },

    /// Despawn our character
    Leave,
}

impl From<ServerRpc> for ClientMsg {
    fn from(rpc: ServerRpc) -> Self {
        match rpc {
            ServerRpc::StartRagdoll => ClientMsg::RequestStartRagdoll,
            ServerRpc::Respawn => ClientMsg::RequestRespawn,
        }
    }
}

/// Messages sent from the authority to observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome { client_id: Uuid, server_time: u64 },

    /// A character exists (sent on spawn and again to late joiners)
    CharacterSpawned { character: CharacterInfo },

    /// A character was destroyed
    CharacterRemoved { character_id: Uuid },

    /// Replicated field values of one character
    Replicate {
        character_id: Uuid,
        updates: Vec<FieldUpdate>,
    },

    /// Whole seconds left before an automatic respawn
    RespawnCountdown {
        character_id: Uuid,
        seconds_remaining: u32,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },

    /// Error message
    Error { code: String, message: String },
}

/// Spawn-time description of a character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterInfo {
    pub character_id: Uuid,
    /// Connection that controls this character
    pub owner_id: Uuid,
    pub name: String,
    pub max_health: f32,
    pub max_ammo: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_are_tagged() {
        let msg: ClientMsg = serde_json::from_str(r#"{"type":"request_start_ragdoll"}"#).unwrap();
        assert_eq!(msg, ClientMsg::RequestStartRagdoll);

        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"pickup_ammo","amount":3}"#).unwrap();
        assert_eq!(msg, ClientMsg::PickupAmmo { amount: 3 });

        let msg: ClientMsg = serde_json::from_str(r#"{"type":"sync"}"#).unwrap();
        assert_eq!(msg, ClientMsg::Sync);
    }

    #[test]
    fn replicate_wire_shape() {
        let id = Uuid::nil();
        let msg = ServerMsg::Replicate {
            character_id: id,
            updates: vec![FieldUpdate::CurrentHealth(0.0), FieldUpdate::IsRagdoll(true)],
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "replicate");
        assert_eq!(json["updates"][0]["field"], "current_health");
        assert_eq!(json["updates"][1]["value"], true);
    }

    #[test]
    fn rpcs_map_to_requests() {
        assert_eq!(ClientMsg::from(ServerRpc::StartRagdoll), ClientMsg::RequestStartRagdoll);
        assert_eq!(ClientMsg::from(ServerRpc::Respawn), ClientMsg::RequestRespawn);
    }
}
