//! Status snapshots: one `{role, busy}` entry per online role.

use serde::{Deserialize, Serialize};

use crate::call_state::CallState;
use crate::registry::RoleRegistry;
use crate::role::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub role: Role,
    pub busy: bool,
}

/// Build a fresh snapshot in registration order.
pub fn snapshot(registry: &RoleRegistry, calls: &CallState) -> Vec<StatusEntry> {
    registry
        .roles()
        .map(|role| StatusEntry {
            role,
            busy: calls.is_busy(role),
        })
        .collect()
}
