//! Explicit replicated properties
//!
//! Each replicated field is a value plus the last value that crossed the
//! replication channel. The authority reads pending pushes once per sync
//! step; observers feed deliveries in and learn whether the on-change hook
//! should run.

use serde::{Deserialize, Serialize};

/// Identifies one of the replicated combat fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldId {
    CurrentHealth,
    CurrentAmmo,
    IsRagdoll,
}

/// A single `(fieldId, value)` replication message
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldUpdate {
    CurrentHealth(f32),
    CurrentAmmo(i32),
    IsRagdoll(bool),
}

impl FieldUpdate {
    pub fn field(&self) -> FieldId {
        match self {
            FieldUpdate::CurrentHealth(_) => FieldId::CurrentHealth,
            FieldUpdate::CurrentAmmo(_) => FieldId::CurrentAmmo,
            FieldUpdate::IsRagdoll(_) => FieldId::IsRagdoll,
        }
    }
}

/// A value tracked against its last replicated state
#[derive(Debug, Clone, PartialEq)]
pub struct Replicated<T> {
    value: T,
    /// Last pushed (authority) or last applied (observer). `None` forces a push.
    synced: Option<T>,
}

impl<T: Copy + PartialEq> Replicated<T> {
    /// Start in sync with the spawn value.
    pub fn new(value: T) -> Self {
        Self {
            value,
            synced: Some(value),
        }
    }

    pub fn get(&self) -> T {
        self.value
    }

    /// Authority write. Returns true if the stored value changed.
    pub fn set(&mut self, value: T) -> bool {
        let changed = self.value != value;
        self.value = value;
        changed
    }

    /// Value to push this sync step, if it differs from the last push.
    pub fn take_push(&mut self) -> Option<T> {
        if self.synced == Some(self.value) {
            return None;
        }
        self.synced = Some(self.value);
        Some(self.value)
    }

    /// Re-push on the next sync step even if unchanged.
    pub fn mark_dirty(&mut self) {
        self.synced = None;
    }

    /// Observer delivery. Returns true if the value differs from the last
    /// applied one, i.e. the on-change hook should run.
    pub fn receive(&mut self, value: T) -> bool {
        let changed = self.synced != Some(value);
        self.value = value;
        self.synced = Some(value);
        changed
    }
}
