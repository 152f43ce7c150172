//! Call pairing and busy tracking.
//!
//! A call is stored once as an unordered pair, so "A talks to B" and
//! "B talks to A" can never disagree. The busy set is kept alongside and
//! only ever changes together with the pair set.

use std::collections::HashSet;

use crate::errors::CallError;
use crate::role::Role;

/// An undirected edge between two distinct roles, stored low-to-high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Edge(Role, Role);

impl Edge {
    fn new(a: Role, b: Role) -> Self {
        if a <= b {
            Edge(a, b)
        } else {
            Edge(b, a)
        }
    }

    fn other(self, role: Role) -> Option<Role> {
        if self.0 == role {
            Some(self.1)
        } else if self.1 == role {
            Some(self.0)
        } else {
            None
        }
    }
}

/// Who is in a call, and with whom.
#[derive(Debug, Default)]
pub struct CallState {
    edges: HashSet<Edge>,
    busy: HashSet<Role>,
}

impl CallState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair `a` with `b` and mark both busy. Nothing changes on error.
    pub fn pair(&mut self, a: Role, b: Role) -> Result<(), CallError> {
        if a == b {
            return Err(CallError::SelfCall);
        }
        if self.is_busy(a) || self.is_busy(b) {
            return Err(CallError::PartyBusy);
        }
        self.edges.insert(Edge::new(a, b));
        self.busy.insert(a);
        self.busy.insert(b);
        Ok(())
    }

    /// Tear down `role`'s call, if any, returning the former partner.
    ///
    /// Always clears `role`'s busy flag, so it is safe to call on an idle role.
    pub fn unpair(&mut self, role: Role) -> Option<Role> {
        let partner = self.partner_of(role);
        if let Some(partner) = partner {
            self.edges.remove(&Edge::new(role, partner));
            self.busy.remove(&partner);
        }
        self.busy.remove(&role);
        partner
    }

    pub fn is_busy(&self, role: Role) -> bool {
        self.busy.contains(&role)
    }

    pub fn partner_of(&self, role: Role) -> Option<Role> {
        self.edges.iter().find_map(|edge| edge.other(role))
    }

    /// Number of calls in progress.
    pub fn active_calls(&self) -> usize {
        self.edges.len()
    }
}
