//! The replicated combat record attached 1:1 to a character

use tracing::{debug, info};

use super::hooks::CombatContext;
use super::replicated::{FieldUpdate, Replicated};
use super::rig::CharacterRig;
use super::{CombatError, CombatStats, Role, ServerRpc};

/// Death state machine position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeState {
    Alive,
    RagdollActive,
}

/// Health, ammo and ragdoll flag of one character.
///
/// Only the authority mutates the fields directly. Observers change them
/// exclusively through [`ReplicatedCombatState::apply_replicated`].
#[derive(Debug, Clone)]
pub struct ReplicatedCombatState {
    role: Role,
    locally_controlled: bool,
    label: String,
    stats: CombatStats,
    health: Replicated<f32>,
    ammo: Replicated<i32>,
    ragdoll: Replicated<bool>,
    ui_hidden: bool,
}

impl ReplicatedCombatState {
    /// Spawn a record at full health and ammo
    pub fn new(stats: CombatStats, role: Role, label: impl Into<String>) -> Self {
        Self {
            role,
            locally_controlled: false,
            label: label.into(),
            stats,
            health: Replicated::new(stats.max_health),
            ammo: Replicated::new(stats.max_ammo),
            ragdoll: Replicated::new(false),
            ui_hidden: false,
        }
    }

    pub fn with_local_control(mut self, locally_controlled: bool) -> Self {
        self.locally_controlled = locally_controlled;
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_locally_controlled(&self) -> bool {
        self.locally_controlled
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn stats(&self) -> CombatStats {
        self.stats
    }

    pub fn max_health(&self) -> f32 {
        self.stats.max_health
    }

    pub fn current_health(&self) -> f32 {
        self.health.get()
    }

    pub fn max_ammo(&self) -> i32 {
        self.stats.max_ammo
    }

    pub fn current_ammo(&self) -> i32 {
        self.ammo.get()
    }

    pub fn is_ragdoll(&self) -> bool {
        self.ragdoll.get()
    }

    pub fn life_state(&self) -> LifeState {
        if self.is_ragdoll() {
            LifeState::RagdollActive
        } else {
            LifeState::Alive
        }
    }

    pub fn is_ui_hidden(&self) -> bool {
        self.ui_hidden
    }

    pub(crate) fn hide_ui(&mut self) {
        if self.locally_controlled {
            self.ui_hidden = true;
        }
    }

    pub(crate) fn show_ui(&mut self) {
        self.ui_hidden = false;
    }

    fn require_authority(&self, op: &'static str) -> Result<(), CombatError> {
        if self.role.is_authority() {
            Ok(())
        } else {
            Err(CombatError::AuthorityViolation(op))
        }
    }

    // ------------------------------------------------------------------
    // Health
    // ------------------------------------------------------------------

    /// Damage entry point. Returns the health after the hit; on an
    /// observer nothing is applied and the unchanged health is returned.
    pub fn apply_damage(&mut self, amount: f32, ctx: &mut CombatContext<'_>) -> f32 {
        if let Err(e) = self.require_authority("apply_damage") {
            debug!(character = %self.label, error = %e, "Ignored");
            return self.current_health();
        }

        self.set_health(self.current_health() - amount, ctx);
        self.current_health()
    }

    /// Store `value` clamped to `[0, max_health]` and run the health hook
    pub fn set_health(&mut self, value: f32, ctx: &mut CombatContext<'_>) {
        if let Err(e) = self.require_authority("set_health") {
            debug!(character = %self.label, error = %e, "Ignored");
            return;
        }
        if value.is_nan() {
            debug!(character = %self.label, error = %CombatError::NotANumber("set_health"), "Ignored");
            return;
        }

        self.health.set(value.clamp(0.0, self.stats.max_health));
        self.on_health_changed(ctx);
    }

    pub fn on_health_changed(&mut self, ctx: &mut CombatContext<'_>) {
        let hooks = ctx.hooks;
        hooks.on_health_changed(self, ctx);
    }

    // ------------------------------------------------------------------
    // Ammo
    // ------------------------------------------------------------------

    /// Full refill
    pub fn refill_ammo(&mut self, ctx: &mut CombatContext<'_>) {
        if let Err(e) = self.require_authority("refill_ammo") {
            debug!(character = %self.label, error = %e, "Ignored");
            return;
        }

        self.ammo.set(self.stats.max_ammo);
        self.on_ammo_changed(ctx);
    }

    /// Pickup entry point. Adds `amount` (negative spends), clamped to
    /// `[0, max_ammo]`.
    pub fn add_ammo(&mut self, amount: i32, ctx: &mut CombatContext<'_>) {
        if let Err(e) = self.require_authority("add_ammo") {
            debug!(character = %self.label, error = %e, "Ignored");
            return;
        }

        let total = i64::from(self.current_ammo()) + i64::from(amount);
        let clamped = total.clamp(0, i64::from(self.stats.max_ammo));
        self.ammo.set(i32::try_from(clamped).unwrap_or(self.stats.max_ammo));
        self.on_ammo_changed(ctx);
    }

    pub fn on_ammo_changed(&self, ctx: &mut CombatContext<'_>) {
        let hooks = ctx.hooks;
        hooks.on_ammo_changed(self, ctx);
    }

    // ------------------------------------------------------------------
    // Ragdoll / death
    // ------------------------------------------------------------------

    /// Alive -> RagdollActive. The authority applies it directly; any other
    /// instance queues a request for the authority.
    pub fn start_ragdoll(&mut self, ctx: &mut CombatContext<'_>) {
        match self.role {
            Role::Authority => {
                self.ragdoll.set(true);
                self.on_ragdoll_changed(ctx.rig);
            }
            Role::Observer => ctx.outbox.push(ServerRpc::StartRagdoll),
        }
    }

    /// RagdollActive -> Alive, requested through the authority the same way
    /// as [`ReplicatedCombatState::start_ragdoll`]
    pub fn respawn(&mut self, ctx: &mut CombatContext<'_>) {
        match self.role {
            Role::Authority => self.apply_respawn(ctx),
            Role::Observer => ctx.outbox.push(ServerRpc::Respawn),
        }
    }

    /// Apply the locally visible side effects of the current ragdoll flag.
    /// Repeating it leaves the rig unchanged.
    pub fn on_ragdoll_changed(&self, rig: &mut CharacterRig) {
        if self.is_ragdoll() {
            rig.enter_ragdoll();
        } else {
            rig.leave_ragdoll();
            rig.restore_collision();
        }
    }

    fn apply_respawn(&mut self, ctx: &mut CombatContext<'_>) {
        self.health.set(self.stats.max_health);
        self.on_health_changed(ctx);

        self.ammo.set(self.stats.max_ammo);
        self.on_ammo_changed(ctx);

        self.ragdoll.set(false);
        self.on_ragdoll_changed(ctx.rig);

        ctx.rig.restore_after_respawn();
        self.force_net_update();

        info!(character = %self.label, "Character respawned");
    }

    /// Authority-side dispatch of a remote call
    pub fn handle_rpc(&mut self, rpc: ServerRpc, ctx: &mut CombatContext<'_>) {
        if let Err(e) = self.require_authority("handle_rpc") {
            debug!(character = %self.label, rpc = ?rpc, error = %e, "Ignored");
            return;
        }

        match rpc {
            ServerRpc::StartRagdoll => self.start_ragdoll(ctx),
            ServerRpc::Respawn => self.apply_respawn(ctx),
        }
    }

    // ------------------------------------------------------------------
    // Replication
    // ------------------------------------------------------------------

    /// Field values changed since the last sync step. Empty on observers.
    pub fn take_replication(&mut self) -> Vec<FieldUpdate> {
        if !self.role.is_authority() {
            return Vec::new();
        }

        let mut updates = Vec::new();
        if let Some(health) = self.health.take_push() {
            updates.push(FieldUpdate::CurrentHealth(health));
        }
        if let Some(ammo) = self.ammo.take_push() {
            updates.push(FieldUpdate::CurrentAmmo(ammo));
        }
        if let Some(ragdoll) = self.ragdoll.take_push() {
            updates.push(FieldUpdate::IsRagdoll(ragdoll));
        }
        updates
    }

    /// Push every field on the next sync step regardless of change
    pub fn force_net_update(&mut self) {
        self.health.mark_dirty();
        self.ammo.mark_dirty();
        self.ragdoll.mark_dirty();
    }

    /// Current value of every field, for observers that join late
    pub fn snapshot(&self) -> Vec<FieldUpdate> {
        vec![
            FieldUpdate::CurrentHealth(self.current_health()),
            FieldUpdate::CurrentAmmo(self.current_ammo()),
            FieldUpdate::IsRagdoll(self.is_ragdoll()),
        ]
    }

    /// Observer-side delivery of one field. Runs the field's on-change hook
    /// when the value differs from the last applied one.
    pub fn apply_replicated(&mut self, update: FieldUpdate, ctx: &mut CombatContext<'_>) {
        if self.role.is_authority() {
            debug!(character = %self.label, field = ?update.field(), "Authority ignores replicated value");
            return;
        }

        match update {
            FieldUpdate::CurrentHealth(health) => {
                if self.health.receive(health) {
                    self.on_health_changed(ctx);
                }
            }
            FieldUpdate::CurrentAmmo(ammo) => {
                if self.ammo.receive(ammo) {
                    self.on_ammo_changed(ctx);
                }
            }
            FieldUpdate::IsRagdoll(ragdoll) => {
                if self.ragdoll.receive(ragdoll) {
                    self.on_ragdoll_changed(ctx.rig);
                }
            }
        }
    }
}
