//! Replicated combat state: health, ammo and the ragdoll/death machine

pub mod hooks;
pub mod notify;
pub mod replicated;
pub mod rig;
pub mod state;

pub use hooks::{CombatContext, CombatHooks, DefaultHooks};
pub use notify::{Notification, NotificationLog, Notifier, NotifyColor, TracingNotifier};
pub use replicated::{FieldId, FieldUpdate, Replicated};
pub use rig::CharacterRig;
pub use state::{LifeState, ReplicatedCombatState};

/// Network role of the process holding a combat record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Sole writer of the record
    Authority,
    /// Holds a read-only replica
    Observer,
}

impl Role {
    pub fn is_authority(self) -> bool {
        matches!(self, Role::Authority)
    }
}

/// One-way reliable calls from any instance to the authority.
///
/// There is no acknowledgment: if the call is lost in transit the caller
/// never learns about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerRpc {
    StartRagdoll,
    Respawn,
}

/// Design-time limits, immutable after spawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombatStats {
    pub max_health: f32,
    pub max_ammo: i32,
}

impl CombatStats {
    pub fn new(max_health: f32, max_ammo: i32) -> Result<Self, CombatError> {
        if !(max_health.is_finite() && max_health > 0.0) {
            return Err(CombatError::InvalidStats("max_health must be positive"));
        }
        if max_ammo < 0 {
            return Err(CombatError::InvalidStats("max_ammo must not be negative"));
        }
        Ok(Self {
            max_health,
            max_ammo,
        })
    }
}

impl Default for CombatStats {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            max_ammo: 5,
        }
    }
}

/// Combat errors. Apart from `InvalidStats` these are absorbed where they
/// occur and only ever logged.
#[derive(Debug, thiserror::Error)]
pub enum CombatError {
    #[error("{0} requires authority")]
    AuthorityViolation(&'static str),

    #[error("{0} received NaN")]
    NotANumber(&'static str),

    #[error("Invalid combat stats: {0}")]
    InvalidStats(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_validation() {
        assert!(CombatStats::new(100.0, 5).is_ok());
        assert!(CombatStats::new(100.0, 0).is_ok());
        assert!(CombatStats::new(0.0, 5).is_err());
        assert!(CombatStats::new(f32::NAN, 5).is_err());
        assert!(CombatStats::new(100.0, -1).is_err());
    }
}
