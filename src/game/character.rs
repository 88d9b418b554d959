//! Authority-side character: combat record, rig and respawn timer

use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::combat::{
    CharacterRig, CombatContext, CombatHooks, CombatStats, Notifier, ReplicatedCombatState, Role,
    ServerRpc,
};
use crate::ws::protocol::CharacterInfo;

use super::respawn::{Countdown, RespawnTimer};

/// What a tick of the respawn countdown produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RespawnEvent {
    Countdown(u32),
    Respawned,
}

/// A character hosted by the authority
pub struct Character {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub state: ReplicatedCombatState,
    pub rig: CharacterRig,
    respawn: Option<RespawnTimer>,
}

impl Character {
    pub fn new(
        id: Uuid,
        owner_id: Uuid,
        name: String,
        stats: CombatStats,
        capsule_half_height: f32,
    ) -> Self {
        Self {
            id,
            owner_id,
            state: ReplicatedCombatState::new(stats, Role::Authority, name.clone()),
            name,
            rig: CharacterRig::new(capsule_half_height),
            respawn: None,
        }
    }

    pub fn info(&self) -> CharacterInfo {
        CharacterInfo {
            character_id: self.id,
            owner_id: self.owner_id,
            name: self.name.clone(),
            max_health: self.state.max_health(),
            max_ammo: self.state.max_ammo(),
        }
    }

    /// Run `f` against the combat record with this character's collaborators
    pub fn with_context<R>(
        &mut self,
        hooks: &dyn CombatHooks,
        notifier: &dyn Notifier,
        f: impl FnOnce(&mut ReplicatedCombatState, &mut CombatContext<'_>) -> R,
    ) -> R {
        let mut outbox = Vec::new();
        let result = {
            let mut ctx = CombatContext {
                rig: &mut self.rig,
                notifier,
                hooks,
                outbox: &mut outbox,
            };
            f(&mut self.state, &mut ctx)
        };

        // The authority applies its own requests directly, so nothing should queue
        if !outbox.is_empty() {
            warn!(character_id = %self.id, rpcs = ?outbox, "Authority queued remote calls");
        }
        result
    }

    /// Damage entry point. Instigator and causer are only logged.
    pub fn take_damage(
        &mut self,
        amount: f32,
        instigator: Option<Uuid>,
        causer: Option<Uuid>,
        hooks: &dyn CombatHooks,
        notifier: &dyn Notifier,
    ) -> f32 {
        let health = self.with_context(hooks, notifier, |state, ctx| state.apply_damage(amount, ctx));
        debug!(
            character_id = %self.id,
            instigator = ?instigator,
            causer = ?causer,
            amount,
            health,
            "Damage applied"
        );
        health
    }

    pub fn handle_rpc(&mut self, rpc: ServerRpc, hooks: &dyn CombatHooks, notifier: &dyn Notifier) {
        info!(character_id = %self.id, rpc = ?rpc, "Remote call");
        self.with_context(hooks, notifier, |state, ctx| state.handle_rpc(rpc, ctx));
    }

    /// Advance the respawn countdown. A countdown starts when the character
    /// is found in ragdoll and is released once it is alive again.
    pub fn tick_respawn(
        &mut self,
        duration: Option<Duration>,
        dt: Duration,
        hooks: &dyn CombatHooks,
        notifier: &dyn Notifier,
    ) -> Option<RespawnEvent> {
        if !self.state.is_ragdoll() {
            self.respawn = None;
            return None;
        }

        let duration = duration?;
        let timer = self.respawn.get_or_insert_with(|| RespawnTimer::new(duration));

        match timer.advance(dt) {
            Countdown::Pending { announce } => announce.map(RespawnEvent::Countdown),
            Countdown::Fired => {
                self.respawn = None;
                self.with_context(hooks, notifier, |state, ctx| state.respawn(ctx));
                Some(RespawnEvent::Respawned)
            }
        }
    }

    pub fn has_pending_respawn(&self) -> bool {
        self.respawn.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::{DefaultHooks, NotificationLog};

    fn character() -> Character {
        Character::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "hero".to_string(),
            CombatStats::default(),
            96.0,
        )
    }

    #[test]
    fn respawn_countdown_runs_only_while_ragdoll() {
        let log = NotificationLog::new();
        let mut c = character();
        let dt = Duration::from_millis(500);
        let duration = Some(Duration::from_secs(1));

        assert_eq!(c.tick_respawn(duration, dt, &DefaultHooks, &log), None);
        assert!(!c.has_pending_respawn());

        c.take_damage(100.0, None, None, &DefaultHooks, &log);
        c.handle_rpc(ServerRpc::StartRagdoll, &DefaultHooks, &log);

        assert_eq!(
            c.tick_respawn(duration, dt, &DefaultHooks, &log),
            Some(RespawnEvent::Countdown(1))
        );
        assert!(c.has_pending_respawn());
        assert_eq!(
            c.tick_respawn(duration, dt, &DefaultHooks, &log),
            Some(RespawnEvent::Respawned)
        );

        assert!(!c.state.is_ragdoll());
        assert_eq!(c.state.current_health(), 100.0);
        assert!(!c.has_pending_respawn());
    }

    #[test]
    fn manual_respawn_releases_timer() {
        let log = NotificationLog::new();
        let mut c = character();
        let duration = Some(Duration::from_secs(3));
        let dt = Duration::from_millis(100);

        c.handle_rpc(ServerRpc::StartRagdoll, &DefaultHooks, &log);
        c.tick_respawn(duration, dt, &DefaultHooks, &log);
        assert!(c.has_pending_respawn());

        c.handle_rpc(ServerRpc::Respawn, &DefaultHooks, &log);
        assert_eq!(c.tick_respawn(duration, dt, &DefaultHooks, &log), None);
        assert!(!c.has_pending_respawn());
    }

    #[test]
    fn no_countdown_when_auto_respawn_is_off() {
        let log = NotificationLog::new();
        let mut c = character();
        c.handle_rpc(ServerRpc::StartRagdoll, &DefaultHooks, &log);
        assert_eq!(
            c.tick_respawn(None, Duration::from_secs(10), &DefaultHooks, &log),
            None
        );
        assert!(c.state.is_ragdoll());
    }
}
