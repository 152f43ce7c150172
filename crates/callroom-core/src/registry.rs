//! Role registry: which roster slot is held by which live connection.

use crate::errors::CallError;
use crate::id::ConnectionId;
use crate::role::Role;

/// Maps each online role to its connection, in registration order.
///
/// At most one entry per role, and at most one role per connection.
#[derive(Debug, Default)]
pub struct RoleRegistry {
    entries: Vec<(Role, ConnectionId)>,
}

impl RoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `role` to `conn`. Fails if the role is already held.
    pub fn register(&mut self, role: Role, conn: ConnectionId) -> Result<(), CallError> {
        if self.lookup(role).is_some() {
            return Err(CallError::RoleTaken(role));
        }
        self.entries.push((role, conn));
        Ok(())
    }

    /// Drop whatever role `conn` holds. Returns that role, if any.
    pub fn unregister(&mut self, conn: ConnectionId) -> Option<Role> {
        let idx = self.entries.iter().position(|&(_, c)| c == conn)?;
        Some(self.entries.remove(idx).0)
    }

    pub fn lookup(&self, role: Role) -> Option<ConnectionId> {
        self.entries
            .iter()
            .find(|&&(r, _)| r == role)
            .map(|&(_, c)| c)
    }

    /// Reverse lookup: the role held by `conn`.
    pub fn role_of(&self, conn: ConnectionId) -> Option<Role> {
        self.entries
            .iter()
            .find(|&&(_, c)| c == conn)
            .map(|&(r, _)| r)
    }

    pub fn is_online(&self, role: Role) -> bool {
        self.lookup(role).is_some()
    }

    /// Online roles in registration order.
    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.entries.iter().map(|&(r, _)| r)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
