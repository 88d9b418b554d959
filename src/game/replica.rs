//! Observer-side mirror of the authority's characters
//!
//! Applies `ServerMsg` deliveries to per-character replicas in observer
//! role and turns local ragdoll/respawn requests into outgoing remote calls.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::combat::{
    CharacterRig, CombatContext, CombatHooks, CombatStats, DefaultHooks, NotificationLog,
    ReplicatedCombatState, Role, ServerRpc,
};
use crate::ws::protocol::{CharacterInfo, ClientMsg, ServerMsg};

struct ReplicaEntry {
    state: ReplicatedCombatState,
    rig: CharacterRig,
}

pub struct ObserverReplica {
    client_id: Option<Uuid>,
    own_character: Option<Uuid>,
    characters: HashMap<Uuid, ReplicaEntry>,
    hooks: Arc<dyn CombatHooks>,
    notifications: NotificationLog,
    outbox: Vec<ServerRpc>,
    capsule_half_height: f32,
    respawn_countdown: Option<u32>,
}

impl ObserverReplica {
    pub fn new(capsule_half_height: f32) -> Self {
        Self::with_hooks(capsule_half_height, Arc::new(DefaultHooks))
    }

    pub fn with_hooks(capsule_half_height: f32, hooks: Arc<dyn CombatHooks>) -> Self {
        Self {
            client_id: None,
            own_character: None,
            characters: HashMap::new(),
            hooks,
            notifications: NotificationLog::new(),
            outbox: Vec::new(),
            capsule_half_height,
            respawn_countdown: None,
        }
    }

    pub fn client_id(&self) -> Option<Uuid> {
        self.client_id
    }

    pub fn own_character(&self) -> Option<Uuid> {
        self.own_character
    }

    pub fn state(&self, character_id: &Uuid) -> Option<&ReplicatedCombatState> {
        self.characters.get(character_id).map(|e| &e.state)
    }

    pub fn rig(&self, character_id: &Uuid) -> Option<&CharacterRig> {
        self.characters.get(character_id).map(|e| &e.rig)
    }

    pub fn notifications(&self) -> &NotificationLog {
        &self.notifications
    }

    /// Seconds left on our own respawn countdown, if one is running
    pub fn respawn_countdown(&self) -> Option<u32> {
        self.respawn_countdown
    }

    /// Apply one message from the authority
    pub fn handle(&mut self, msg: &ServerMsg) {
        match msg {
            ServerMsg::Welcome { client_id, .. } => self.client_id = Some(*client_id),
            ServerMsg::CharacterSpawned { character } => self.spawn(character),
            ServerMsg::CharacterRemoved { character_id } => {
                self.characters.remove(character_id);
                if self.own_character == Some(*character_id) {
                    self.own_character = None;
                    self.respawn_countdown = None;
                }
            }
            ServerMsg::Replicate {
                character_id,
                updates,
            } => {
                let Some(entry) = self.characters.get_mut(character_id) else {
                    debug!(character_id = %character_id, "Replication for unknown character");
                    return;
                };
                let mut ctx = CombatContext {
                    rig: &mut entry.rig,
                    notifier: &self.notifications,
                    hooks: self.hooks.as_ref(),
                    outbox: &mut self.outbox,
                };
                for update in updates {
                    entry.state.apply_replicated(*update, &mut ctx);
                }
                if self.own_character == Some(*character_id) && !entry.state.is_ragdoll() {
                    self.respawn_countdown = None;
                }
            }
            ServerMsg::RespawnCountdown {
                character_id,
                seconds_remaining,
            } => {
                if self.own_character == Some(*character_id) {
                    self.respawn_countdown = Some(*seconds_remaining);
                }
            }
            ServerMsg::Pong { .. } | ServerMsg::Error { .. } => {}
        }
    }

    fn spawn(&mut self, info: &CharacterInfo) {
        if self.characters.contains_key(&info.character_id) {
            return;
        }
        let stats = match CombatStats::new(info.max_health, info.max_ammo) {
            Ok(stats) => stats,
            Err(e) => {
                warn!(character_id = %info.character_id, error = %e, "Ignoring character");
                return;
            }
        };

        let owned = self.client_id == Some(info.owner_id);
        if owned {
            self.own_character = Some(info.character_id);
        }

        let state = ReplicatedCombatState::new(stats, Role::Observer, info.name.clone())
            .with_local_control(owned);
        self.characters.insert(
            info.character_id,
            ReplicaEntry {
                state,
                rig: CharacterRig::new(self.capsule_half_height),
            },
        );
    }

    /// Run `f` against our own character's replica
    fn with_own<R>(
        &mut self,
        f: impl FnOnce(&mut ReplicatedCombatState, &mut CombatContext<'_>) -> R,
    ) -> Option<R> {
        let id = self.own_character?;
        let entry = self.characters.get_mut(&id)?;
        let mut ctx = CombatContext {
            rig: &mut entry.rig,
            notifier: &self.notifications,
            hooks: self.hooks.as_ref(),
            outbox: &mut self.outbox,
        };
        Some(f(&mut entry.state, &mut ctx))
    }

    /// Ask the authority to ragdoll our character
    pub fn start_ragdoll(&mut self) {
        self.with_own(|state, ctx| state.start_ragdoll(ctx));
    }

    /// Ask the authority to respawn our character
    pub fn respawn(&mut self) {
        self.with_own(|state, ctx| state.respawn(ctx));
    }

    /// Remote calls queued since the last call, ready to send
    pub fn take_outgoing(&mut self) -> Vec<ClientMsg> {
        self.outbox.drain(..).map(ClientMsg::from).collect()
    }
}
