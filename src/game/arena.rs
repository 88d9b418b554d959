//! Authoritative host loop for all characters

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::interval;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::combat::{CombatHooks, CombatStats, Notifier, ServerRpc};
use crate::config::Config;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

use super::character::{Character, RespawnEvent};
use super::{ArenaInput, ArenaOutput};

/// Host-side settings applied to every character
#[derive(Debug, Clone)]
pub struct ArenaSettings {
    pub stats: CombatStats,
    pub capsule_half_height: f32,
    /// `None` disables automatic respawn
    pub respawn_duration: Option<Duration>,
    pub tick_rate: u32,
}

impl ArenaSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            stats: config.combat,
            capsule_half_height: config.capsule_half_height,
            respawn_duration: config.auto_respawn.then_some(config.respawn_duration),
            tick_rate: config.tick_rate,
        }
    }

    pub fn tick_delta(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.tick_rate.max(1)))
    }
}

impl Default for ArenaSettings {
    fn default() -> Self {
        Self {
            stats: CombatStats::default(),
            capsule_half_height: 96.0,
            respawn_duration: Some(Duration::from_secs(3)),
            tick_rate: 30,
        }
    }
}

/// Handle to the running arena
#[derive(Clone)]
pub struct ArenaHandle {
    pub input_tx: mpsc::Sender<ArenaInput>,
    pub output_tx: broadcast::Sender<ArenaOutput>,
    character_count: Arc<AtomicUsize>,
}

impl ArenaHandle {
    /// Every outgoing message; receivers filter with [`ArenaOutput::is_for`]
    pub fn subscribe(&self) -> broadcast::Receiver<ArenaOutput> {
        self.output_tx.subscribe()
    }

    pub fn character_count(&self) -> usize {
        self.character_count.load(Ordering::Relaxed)
    }

    pub fn observer_count(&self) -> usize {
        self.output_tx.receiver_count()
    }
}

/// The authority for every character it hosts
pub struct Arena {
    settings: ArenaSettings,
    characters: HashMap<Uuid, Character>,
    /// Connection -> controlled character
    owners: HashMap<Uuid, Uuid>,
    input_rx: mpsc::Receiver<ArenaInput>,
    output_tx: broadcast::Sender<ArenaOutput>,
    hooks: Arc<dyn CombatHooks>,
    notifier: Arc<dyn Notifier>,
    character_count: Arc<AtomicUsize>,
    tick: u64,
}

impl Arena {
    pub fn new(
        settings: ArenaSettings,
        hooks: Arc<dyn CombatHooks>,
        notifier: Arc<dyn Notifier>,
    ) -> (Self, ArenaHandle) {
        let (input_tx, input_rx) = mpsc::channel(256);
        let (output_tx, _) = broadcast::channel(256);
        let character_count = Arc::new(AtomicUsize::new(0));

        let handle = ArenaHandle {
            input_tx,
            output_tx: output_tx.clone(),
            character_count: character_count.clone(),
        };

        let arena = Self {
            settings,
            characters: HashMap::new(),
            owners: HashMap::new(),
            input_rx,
            output_tx,
            hooks,
            notifier,
            character_count,
            tick: 0,
        };

        (arena, handle)
    }

    /// Run the authoritative tick loop until every input sender is gone
    pub async fn run(mut self) {
        info!(tick_rate = self.settings.tick_rate, "Arena started");

        let mut tick_interval = interval(self.settings.tick_delta());
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;
            if !self.step() {
                break;
            }
        }

        info!(tick = self.tick, "Arena stopped");
    }

    /// One update step: inputs, respawn timers, replication.
    /// Returns false once the input channel is closed.
    pub fn step(&mut self) -> bool {
        self.tick += 1;
        let open = self.process_inputs();
        self.tick_respawns();
        self.sync_replication();
        open
    }

    pub fn character(&self, id: &Uuid) -> Option<&Character> {
        self.characters.get(id)
    }

    pub fn character_of(&self, client_id: &Uuid) -> Option<&Character> {
        self.owners.get(client_id).and_then(|id| self.characters.get(id))
    }

    fn process_inputs(&mut self) -> bool {
        loop {
            match self.input_rx.try_recv() {
                Ok(input) => self.handle_input(input),
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn handle_input(&mut self, input: ArenaInput) {
        let client_id = input.client_id;
        debug!(
            client_id = %client_id,
            msg = ?input.msg,
            queued_ms = unix_millis().saturating_sub(input.received_at),
            "Client input"
        );

        match input.msg {
            ClientMsg::Join { name } => self.handle_join(client_id, name),
            ClientMsg::Sync => self.send_world(client_id, None),
            ClientMsg::RequestStartRagdoll => self.handle_rpc(client_id, ServerRpc::StartRagdoll),
            ClientMsg::RequestRespawn => self.handle_rpc(client_id, ServerRpc::Respawn),
            ClientMsg::DealDamage { target, amount } => {
                self.handle_damage(client_id, target, amount)
            }
            ClientMsg::PickupAmmo { amount } => self.handle_pickup(client_id, amount),
            ClientMsg::Ping { t } => {
                self.send_to(client_id, ServerMsg::Pong { t });
            }
            ClientMsg::Leave => self.handle_leave(client_id),
        }
    }

    fn handle_join(&mut self, client_id: Uuid, name: String) {
        if self.owners.contains_key(&client_id) {
            warn!(client_id = %client_id, "Client already controls a character");
            self.send_error(client_id, "already_joined", "Connection already controls a character");
            return;
        }

        let character = Character::new(
            Uuid::new_v4(),
            client_id,
            name,
            self.settings.stats,
            self.settings.capsule_half_height,
        );
        let character_id = character.id;

        self.owners.insert(client_id, character_id);
        self.characters.insert(character_id, character);
        self.character_count
            .store(self.characters.len(), Ordering::Relaxed);

        info!(
            client_id = %client_id,
            character_id = %character_id,
            character_count = self.characters.len(),
            "Character spawned"
        );

        if let Some(character) = self.characters.get(&character_id) {
            self.announce(None, character);
        }
        // The joiner may not have synced yet
        self.send_world(client_id, Some(character_id));
    }

    /// Full state of every character (except `skip`) for one connection
    fn send_world(&self, client_id: Uuid, skip: Option<Uuid>) {
        for character in self.characters.values() {
            if Some(character.id) != skip {
                self.announce(Some(client_id), character);
            }
        }
    }

    /// Spawn message plus a snapshot of every field
    fn announce(&self, recipient: Option<Uuid>, character: &Character) {
        let spawned = ServerMsg::CharacterSpawned {
            character: character.info(),
        };
        let snapshot = ServerMsg::Replicate {
            character_id: character.id,
            updates: character.state.snapshot(),
        };
        for msg in [spawned, snapshot] {
            let _ = self.output_tx.send(ArenaOutput { recipient, msg });
        }
    }

    fn handle_rpc(&mut self, client_id: Uuid, rpc: ServerRpc) {
        let Some(character_id) = self.owners.get(&client_id).copied() else {
            debug!(client_id = %client_id, rpc = ?rpc, "Remote call without a character");
            return;
        };
        if let Some(character) = self.characters.get_mut(&character_id) {
            character.handle_rpc(rpc, self.hooks.as_ref(), self.notifier.as_ref());
        }
    }

    fn handle_damage(&mut self, client_id: Uuid, target: Uuid, amount: f32) {
        if !(amount.is_finite() && amount >= 0.0) {
            warn!(client_id = %client_id, amount, "Rejected damage amount");
            self.send_error(
                client_id,
                "invalid_damage",
                "Damage must be a finite, non-negative number",
            );
            return;
        }

        let instigator = self.owners.get(&client_id).copied();
        match self.characters.get_mut(&target) {
            Some(character) => {
                character.take_damage(
                    amount,
                    instigator,
                    None,
                    self.hooks.as_ref(),
                    self.notifier.as_ref(),
                );
            }
            None => debug!(target = %target, "Damage for unknown character"),
        }
    }

    fn handle_pickup(&mut self, client_id: Uuid, amount: i32) {
        let Some(character_id) = self.owners.get(&client_id).copied() else {
            return;
        };
        if let Some(character) = self.characters.get_mut(&character_id) {
            character.with_context(self.hooks.as_ref(), self.notifier.as_ref(), |state, ctx| {
                state.add_ammo(amount, ctx)
            });
        }
    }

    fn handle_leave(&mut self, client_id: Uuid) {
        let Some(character_id) = self.owners.remove(&client_id) else {
            return;
        };
        // Dropping the character releases its respawn timer
        self.characters.remove(&character_id);
        self.character_count
            .store(self.characters.len(), Ordering::Relaxed);

        self.send_all(ServerMsg::CharacterRemoved { character_id });

        info!(client_id = %client_id, character_id = %character_id, "Character removed");
    }

    fn tick_respawns(&mut self) {
        let dt = self.settings.tick_delta();
        let duration = self.settings.respawn_duration;

        for character in self.characters.values_mut() {
            let event = character.tick_respawn(
                duration,
                dt,
                self.hooks.as_ref(),
                self.notifier.as_ref(),
            );
            if let Some(RespawnEvent::Countdown(seconds_remaining)) = event {
                let _ = self.output_tx.send(ArenaOutput::to_all(ServerMsg::RespawnCountdown {
                    character_id: character.id,
                    seconds_remaining,
                }));
            }
        }
    }

    /// Push every changed field to observers. Lost deliveries are not retried.
    fn sync_replication(&mut self) {
        for character in self.characters.values_mut() {
            let updates = character.state.take_replication();
            if updates.is_empty() {
                continue;
            }
            let _ = self.output_tx.send(ArenaOutput::to_all(ServerMsg::Replicate {
                character_id: character.id,
                updates,
            }));
        }
    }

    fn send_all(&self, msg: ServerMsg) {
        let _ = self.output_tx.send(ArenaOutput::to_all(msg));
    }

    fn send_to(&self, client_id: Uuid, msg: ServerMsg) {
        let _ = self.output_tx.send(ArenaOutput::to(client_id, msg));
    }

    fn send_error(&self, client_id: Uuid, code: &str, message: &str) {
        self.send_to(
            client_id,
            ServerMsg::Error {
                code: code.to_string(),
                message: message.to_string(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::{DefaultHooks, FieldUpdate, NotificationLog};

    fn arena() -> (Arena, ArenaHandle, broadcast::Receiver<ArenaOutput>) {
        let settings = ArenaSettings {
            respawn_duration: Some(Duration::from_millis(100)),
            tick_rate: 20,
            ..ArenaSettings::default()
        };
        let (arena, handle) = Arena::new(
            settings,
            Arc::new(DefaultHooks),
            Arc::new(NotificationLog::new()),
        );
        let rx = handle.subscribe();
        (arena, handle, rx)
    }

    fn send(handle: &ArenaHandle, client_id: Uuid, msg: ClientMsg) {
        handle
            .input_tx
            .try_send(ArenaInput {
                client_id,
                msg,
                received_at: unix_millis(),
            })
            .unwrap();
    }

    fn drain_outputs(rx: &mut broadcast::Receiver<ArenaOutput>) -> Vec<ArenaOutput> {
        let mut out = Vec::new();
        while let Ok(output) = rx.try_recv() {
            out.push(output);
        }
        out
    }

    /// Everything sent, whoever it was addressed to
    fn drain(rx: &mut broadcast::Receiver<ArenaOutput>) -> Vec<ServerMsg> {
        drain_outputs(rx).into_iter().map(|o| o.msg).collect()
    }

    /// What one connection's writer would forward
    fn drain_for(rx: &mut broadcast::Receiver<ArenaOutput>, client_id: Uuid) -> Vec<ServerMsg> {
        drain_outputs(rx)
            .into_iter()
            .filter(|o| o.is_for(client_id))
            .map(|o| o.msg)
            .collect()
    }

    fn replicated(msgs: &[ServerMsg], id: Uuid) -> Vec<FieldUpdate> {
        msgs.iter()
            .filter_map(|m| match m {
                ServerMsg::Replicate {
                    character_id,
                    updates,
                } if *character_id == id => Some(updates.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    #[test]
    fn join_spawns_and_announces() {
        let (mut arena, handle, mut rx) = arena();
        let client = Uuid::new_v4();
        send(&handle, client, ClientMsg::Join { name: "hero".into() });
        assert!(arena.step());

        let character_id = arena.character_of(&client).unwrap().id;
        assert_eq!(handle.character_count(), 1);

        let msgs = drain(&mut rx);
        assert!(matches!(
            &msgs[0],
            ServerMsg::CharacterSpawned { character } if character.owner_id == client
        ));
        assert_eq!(
            replicated(&msgs, character_id),
            vec![
                FieldUpdate::CurrentHealth(100.0),
                FieldUpdate::CurrentAmmo(5),
                FieldUpdate::IsRagdoll(false),
            ]
        );
    }

    #[test]
    fn damage_replicates_clamped_health() {
        let (mut arena, handle, mut rx) = arena();
        let victim = Uuid::new_v4();
        let shooter = Uuid::new_v4();
        send(&handle, victim, ClientMsg::Join { name: "victim".into() });
        send(&handle, shooter, ClientMsg::Join { name: "shooter".into() });
        arena.step();
        drain(&mut rx);

        let target = arena.character_of(&victim).unwrap().id;
        send(&handle, shooter, ClientMsg::DealDamage { target, amount: 150.0 });
        arena.step();

        let msgs = drain(&mut rx);
        assert_eq!(replicated(&msgs, target), vec![FieldUpdate::CurrentHealth(0.0)]);
        let victim_character = arena.character(&target).unwrap();
        assert!(!victim_character.rig.input_enabled);
    }

    #[test]
    fn invalid_damage_is_rejected() {
        let (mut arena, handle, mut rx) = arena();
        let client = Uuid::new_v4();
        send(&handle, client, ClientMsg::Join { name: "hero".into() });
        arena.step();
        drain(&mut rx);

        let target = arena.character_of(&client).unwrap().id;
        send(&handle, client, ClientMsg::DealDamage { target, amount: -50.0 });
        arena.step();

        let msgs = drain(&mut rx);
        assert!(matches!(&msgs[0], ServerMsg::Error { code, .. } if code == "invalid_damage"));
        assert_eq!(arena.character(&target).unwrap().state.current_health(), 100.0);
    }

    #[test]
    fn ragdoll_request_counts_down_to_respawn() {
        let (mut arena, handle, mut rx) = arena();
        let client = Uuid::new_v4();
        send(&handle, client, ClientMsg::Join { name: "hero".into() });
        arena.step();
        drain(&mut rx);
        let id = arena.character_of(&client).unwrap().id;

        send(&handle, client, ClientMsg::RequestStartRagdoll);
        arena.step();
        let msgs = drain(&mut rx);
        assert!(arena.character(&id).unwrap().state.is_ragdoll());
        assert!(msgs.iter().any(|m| matches!(
            m,
            ServerMsg::RespawnCountdown { seconds_remaining: 1, .. }
        )));
        assert_eq!(replicated(&msgs, id), vec![FieldUpdate::IsRagdoll(true)]);

        // 100ms at 20 ticks per second
        arena.step();
        let msgs = drain(&mut rx);
        let character = arena.character(&id).unwrap();
        assert!(!character.state.is_ragdoll());
        assert!(character.rig.input_enabled);
        assert_eq!(
            replicated(&msgs, id),
            vec![
                FieldUpdate::CurrentHealth(100.0),
                FieldUpdate::CurrentAmmo(5),
                FieldUpdate::IsRagdoll(false),
            ]
        );
    }

    #[test]
    fn pickup_and_leave() {
        let (mut arena, handle, mut rx) = arena();
        let client = Uuid::new_v4();
        send(&handle, client, ClientMsg::Join { name: "hero".into() });
        arena.step();
        let id = arena.character_of(&client).unwrap().id;

        send(&handle, client, ClientMsg::PickupAmmo { amount: -2 });
        arena.step();
        assert_eq!(arena.character(&id).unwrap().state.current_ammo(), 3);

        send(&handle, client, ClientMsg::Leave);
        arena.step();
        assert!(arena.character(&id).is_none());
        assert_eq!(handle.character_count(), 0);
        assert!(drain(&mut rx)
            .iter()
            .any(|m| matches!(m, ServerMsg::CharacterRemoved { character_id } if *character_id == id)));
    }

    #[test]
    fn sync_sends_current_state_to_a_spectator() {
        let (mut arena, handle, mut rx) = arena();
        let player = Uuid::new_v4();
        send(&handle, player, ClientMsg::Join { name: "hero".into() });
        arena.step();
        let id = arena.character_of(&player).unwrap().id;
        send(&handle, player, ClientMsg::DealDamage { target: id, amount: 40.0 });
        arena.step();
        drain(&mut rx);

        // Nothing changes after this point, so only the sync can deliver health
        let spectator = Uuid::new_v4();
        let mut late_rx = handle.subscribe();
        send(&handle, spectator, ClientMsg::Sync);
        arena.step();

        let msgs = drain_for(&mut late_rx, spectator);
        assert!(matches!(
            &msgs[0],
            ServerMsg::CharacterSpawned { character } if character.character_id == id
        ));
        assert_eq!(
            replicated(&msgs, id),
            vec![
                FieldUpdate::CurrentHealth(60.0),
                FieldUpdate::CurrentAmmo(5),
                FieldUpdate::IsRagdoll(false),
            ]
        );
        assert!(drain_for(&mut rx, player).is_empty());
    }

    #[test]
    fn joiner_receives_existing_characters() {
        let (mut arena, handle, mut rx) = arena();
        let first = Uuid::new_v4();
        send(&handle, first, ClientMsg::Join { name: "first".into() });
        arena.step();
        let first_id = arena.character_of(&first).unwrap().id;
        drain(&mut rx);

        let second = Uuid::new_v4();
        send(&handle, second, ClientMsg::Join { name: "second".into() });
        arena.step();
        let second_id = arena.character_of(&second).unwrap().id;
        let outputs = drain_outputs(&mut rx);

        let to_first: Vec<ServerMsg> = outputs
            .iter()
            .filter(|o| o.is_for(first))
            .map(|o| o.msg.clone())
            .collect();
        assert!(replicated(&to_first, first_id).is_empty());
        assert_eq!(replicated(&to_first, second_id).len(), 3);

        let to_second: Vec<ServerMsg> = outputs
            .into_iter()
            .filter(|o| o.is_for(second))
            .map(|o| o.msg)
            .collect();
        assert_eq!(replicated(&to_second, first_id).len(), 3);
        assert_eq!(replicated(&to_second, second_id).len(), 3);
    }

    #[test]
    fn replies_go_only_to_the_sender() {
        let (mut arena, handle, mut rx) = arena();
        let pinger = Uuid::new_v4();
        let bystander = Uuid::new_v4();
        send(&handle, pinger, ClientMsg::Ping { t: 42 });
        send(
            &handle,
            pinger,
            ClientMsg::DealDamage {
                target: Uuid::new_v4(),
                amount: f32::NAN,
            },
        );
        arena.step();

        let outputs = drain_outputs(&mut rx);
        assert_eq!(outputs.len(), 2);
        assert!(outputs.iter().all(|o| o.recipient == Some(pinger)));
        assert_eq!(outputs[0].msg, ServerMsg::Pong { t: 42 });
        assert!(outputs.iter().all(|o| !o.is_for(bystander)));
    }

    #[test]
    fn step_reports_closed_input() {
        let (mut arena, handle, _rx) = arena();
        drop(handle);
        assert!(!arena.step());
    }
}
