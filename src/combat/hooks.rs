//! Overridable on-change hooks
//!
//! The application may supply its own `CombatHooks`; the provided methods
//! forward to the standard behavior in this module so an override can wrap
//! rather than replace it.

use std::time::Duration;

use tracing::debug;

use super::notify::{Notifier, NotifyColor};
use super::rig::CharacterRig;
use super::state::ReplicatedCombatState;
use super::ServerRpc;

const STATUS_DURATION: Duration = Duration::from_secs(5);

/// Collaborators a combat operation may touch
pub struct CombatContext<'a> {
    pub rig: &'a mut CharacterRig,
    pub notifier: &'a dyn Notifier,
    pub hooks: &'a dyn CombatHooks,
    /// Remote calls queued for the authority
    pub outbox: &'a mut Vec<ServerRpc>,
}

pub trait CombatHooks: Send + Sync {
    /// Runs on every instance that observes a new health value
    fn on_health_changed(&self, state: &mut ReplicatedCombatState, ctx: &mut CombatContext<'_>) {
        health_changed(state, ctx);
    }

    /// Runs on every instance that observes a new ammo value
    fn on_ammo_changed(&self, state: &ReplicatedCombatState, ctx: &mut CombatContext<'_>) {
        ammo_changed(state, ctx);
    }
}

/// Standard hook behavior
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl CombatHooks for DefaultHooks {}

/// Standard reaction to a health change.
///
/// The locally controlled instance reports its own health and, at zero,
/// starts the ragdoll and hides its UI once. The authority reports the
/// character's health and, at zero, cuts input and collision; both of
/// those are safe to repeat.
pub fn health_changed(state: &mut ReplicatedCombatState, ctx: &mut CombatContext<'_>) {
    let health = state.current_health();
    let dead = health <= 0.0;

    if !dead {
        state.show_ui();
    }

    if state.is_locally_controlled() && !state.is_ui_hidden() {
        ctx.notifier.notify(
            &format!("You now have {health} health remaining."),
            NotifyColor::Blue,
            STATUS_DURATION,
        );

        if dead {
            ctx.notifier
                .notify("You have been killed.", NotifyColor::Red, STATUS_DURATION);
            state.start_ragdoll(ctx);
            state.hide_ui();
        }
    }

    if state.role().is_authority() {
        ctx.notifier.notify(
            &format!("{} now has {health} health remaining.", state.label()),
            NotifyColor::Blue,
            STATUS_DURATION,
        );

        if dead {
            ctx.rig.set_input_enabled(false);
            ctx.rig.disable_collision();
        }
    }
}

/// Standard reaction to an ammo change: UI only
pub fn ammo_changed(state: &ReplicatedCombatState, ctx: &mut CombatContext<'_>) {
    debug!(
        character = %state.label(),
        ammo = state.current_ammo(),
        "Ammo changed"
    );

    if state.is_locally_controlled() && !state.is_ui_hidden() {
        ctx.notifier.notify(
            &format!("You now have {} ammo.", state.current_ammo()),
            NotifyColor::Blue,
            STATUS_DURATION,
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::combat::{CombatStats, NotificationLog, Role};

    /// Counts invocations and then defers to the standard behavior
    #[derive(Default)]
    struct CountingHooks {
        health_calls: AtomicUsize,
    }

    impl CombatHooks for CountingHooks {
        fn on_health_changed(
            &self,
            state: &mut ReplicatedCombatState,
            ctx: &mut CombatContext<'_>,
        ) {
            self.health_calls.fetch_add(1, Ordering::Relaxed);
            health_changed(state, ctx);
        }
    }

    #[test]
    fn custom_hooks_replace_the_default_strategy() {
        let hooks = CountingHooks::default();
        let log = NotificationLog::new();
        let mut rig = CharacterRig::new(96.0);
        let mut outbox = Vec::new();
        let mut ctx = CombatContext {
            rig: &mut rig,
            notifier: &log,
            hooks: &hooks,
            outbox: &mut outbox,
        };

        let mut state = ReplicatedCombatState::new(CombatStats::default(), Role::Authority, "hero");
        state.apply_damage(30.0, &mut ctx);
        state.apply_damage(30.0, &mut ctx);

        assert_eq!(hooks.health_calls.load(Ordering::Relaxed), 2);
        assert_eq!(
            log.texts(),
            vec![
                "hero now has 70 health remaining.".to_string(),
                "hero now has 40 health remaining.".to_string(),
            ]
        );
    }

    #[test]
    fn local_death_runs_once() {
        let log = NotificationLog::new();
        let mut rig = CharacterRig::new(96.0);
        let mut outbox = Vec::new();
        let mut ctx = CombatContext {
            rig: &mut rig,
            notifier: &log,
            hooks: &DefaultHooks,
            outbox: &mut outbox,
        };

        let mut state = ReplicatedCombatState::new(CombatStats::default(), Role::Observer, "hero")
            .with_local_control(true);
        state.apply_replicated(crate::combat::FieldUpdate::CurrentHealth(0.0), &mut ctx);
        state.on_health_changed(&mut ctx);

        assert_eq!(outbox, vec![ServerRpc::StartRagdoll]);
        assert_eq!(
            log.texts(),
            vec![
                "You now have 0 health remaining.".to_string(),
                "You have been killed.".to_string(),
            ]
        );
        assert!(state.is_ui_hidden());
    }
}
