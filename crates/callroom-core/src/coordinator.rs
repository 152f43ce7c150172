//! The call coordinator: one owned state machine per relay.
//!
//! Each handler runs to completion before the next event is looked at, and
//! either applies all of its mutations or none. Notifications are emitted
//! only after the mutations for that event are done, so every snapshot a
//! client sees is consistent.
//!
//! A connection whose outbound queue is full has missed a notification the
//! rest of the state relies on, so it is evicted and torn down exactly like
//! a disconnect before the next event is processed.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::call_state::CallState;
use crate::errors::CallError;
use crate::id::ConnectionId;
use crate::protocol::{ClientEvent, Notification};
use crate::registry::RoleRegistry;
use crate::role::Role;
use crate::sink::{Delivery, NotificationSink};
use crate::status::{snapshot, StatusEntry};


/// Owns the registry, the call state and the subscriber list.
pub struct CallCoordinator<S> {
    registry: RoleRegistry,
    calls: CallState,
    /// Every attached connection, in attach order. Broadcasts go to all of them.
    subscribers: Vec<(ConnectionId, S)>,
    /// Connections that could not keep up, evicted once the current event is done.
    lagging: Vec<ConnectionId>,
}

impl<S: NotificationSink> CallCoordinator<S> {
    pub fn new() -> Self {
        Self {
            registry: RoleRegistry::new(),
            calls: CallState::new(),
            subscribers: Vec::new(),
            lagging: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Transport hooks
    // -----------------------------------------------------------------------

    /// Start delivering notifications for `conn` to `sink`.
    pub fn attach(&mut self, conn: ConnectionId, sink: S) {
        self.subscribers.retain(|(c, _)| *c != conn);
        self.subscribers.push((conn, sink));
        debug!(%conn, subscribers = self.subscribers.len(), "Connection attached");
    }

    /// The transport lost `conn`: stop delivering to it, then disconnect.
    pub fn detach(&mut self, conn: ConnectionId) {
        self.subscribers.retain(|(c, _)| *c != conn);
        self.disconnect(conn);
    }

    /// Whether notifications for `conn` are still being delivered.
    pub fn is_attached(&self, conn: ConnectionId) -> bool {
        self.subscribers.iter().any(|(c, _)| *c == conn)
    }

    /// Apply one inbound event, reporting failures to the sender only.
    pub fn handle(&mut self, conn: ConnectionId, event: ClientEvent) {
        match event {
            ClientEvent::Join { role } => {
                if let Err(e) = self.join(conn, &role) {
                    self.unicast(conn, Notification::ErrorMsg { message: e.to_string() });
                }
            }
            ClientEvent::CallUser { user_to_call, signal_data, from } => {
                if let Err(e) = self.call_user(&from, &user_to_call, signal_data) {
                    self.unicast(conn, Notification::CallFailed { message: e.to_string() });
                }
            }
            ClientEvent::AnswerCall { to, signal } => self.answer_call(conn, &to, signal),
            ClientEvent::EndCall { from } => {
                if let Err(e) = self.end_call(conn, from.as_deref()) {
                    self.unicast(conn, Notification::ErrorMsg { message: e.to_string() });
                }
            }
        }
        self.evict_lagging();
    }

    // -----------------------------------------------------------------------
    // Event handlers
    // -----------------------------------------------------------------------

    /// Claim `role` for `conn` and broadcast the new roster.
    pub fn join(&mut self, conn: ConnectionId, role: &str) -> Result<(), CallError> {
        let role: Role = role.parse()?;
        if let Some(current) = self.registry.role_of(conn) {
            return Err(CallError::AlreadyJoined(current));
        }
        self.registry.register(role, conn)?;

        info!(%conn, %role, "Role joined");
        self.broadcast_status();
        self.evict_lagging();
        Ok(())
    }

    /// Start a call from `caller` to `callee`, carrying the caller's offer.
    pub fn call_user(&mut self, caller: &str, callee: &str, signal: Value) -> Result<(), CallError> {
        let caller: Role = caller.parse()?;
        let callee: Role = callee.parse()?;
        if caller == callee {
            return Err(CallError::SelfCall);
        }
        if !self.registry.is_online(caller) {
            return Err(CallError::NotJoined(caller));
        }
        if self.calls.is_busy(caller) || self.calls.is_busy(callee) {
            return Err(CallError::PartyBusy);
        }
        let Some(target) = self.registry.lookup(callee) else {
            return Err(CallError::TargetUnreachable(callee));
        };

        self.calls.pair(caller, callee)?;
        info!(%caller, %callee, "Call started");

        self.unicast(target, Notification::Call { from: caller, signal });
        self.broadcast_status();
        self.evict_lagging();
        Ok(())
    }

    /// Forward an answer to whoever rang the responder.
    ///
    /// The target is the responder's recorded partner, or `to` when the
    /// responder has none. Unknown or offline targets are dropped.
    pub fn answer_call(&mut self, conn: ConnectionId, to: &str, signal: Value) {
        let partner = self
            .registry
            .role_of(conn)
            .and_then(|responder| self.calls.partner_of(responder));
        let target = match partner {
            Some(role) => role,
            None => match to.parse::<Role>() {
                Ok(role) => role,
                Err(_) => {
                    debug!(%conn, to, "Answer for unknown role dropped");
                    return;
                }
            },
        };

        match self.registry.lookup(target) {
            Some(target_conn) => {
                debug!(%conn, %target, "Forwarding answer");
                self.unicast(target_conn, Notification::CallAccepted { signal });
            }
            None => debug!(%conn, %target, "Answer target offline, dropped"),
        }
        self.evict_lagging();
    }

    /// Hang up `from` (or the sender's own role) and broadcast the result.
    pub fn end_call(&mut self, conn: ConnectionId, from: Option<&str>) -> Result<(), CallError> {
        let role = match from {
            Some(name) => name.parse::<Role>()?,
            None => match self.registry.role_of(conn) {
                Some(role) => role,
                None => {
                    debug!(%conn, "endCall from connection without a role ignored");
                    return Ok(());
                }
            },
        };

        self.teardown(role);
        self.broadcast_status();
        self.evict_lagging();
        Ok(())
    }

    /// Drop `conn`'s role, ending its call if it was in one.
    pub fn disconnect(&mut self, conn: ConnectionId) {
        self.release(conn);
        self.evict_lagging();
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    pub fn calls(&self) -> &CallState {
        &self.calls
    }

    pub fn status(&self) -> Vec<StatusEntry> {
        snapshot(&self.registry, &self.calls)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Disconnect teardown without eviction, so eviction itself can reuse it.
    fn release(&mut self, conn: ConnectionId) {
        let Some(role) = self.registry.role_of(conn) else {
            debug!(%conn, "Disconnect without a role");
            return;
        };

        self.teardown(role);
        self.registry.unregister(conn);
        info!(%conn, %role, "Role left");
        self.broadcast_status();
    }

    /// Detach and tear down every connection that reported a full queue.
    ///
    /// Teardown broadcasts can fill further queues, so this runs until no
    /// laggard is left.
    fn evict_lagging(&mut self) {
        while let Some(conn) = self.lagging.pop() {
            if !self.is_attached(conn) {
                continue;
            }
            warn!(%conn, "Outbound queue full, evicting connection");
            self.subscribers.retain(|(c, _)| *c != conn);
            self.release(conn);
        }
    }

    /// Unpair `role` and tell the former partner, if still online.
    fn teardown(&mut self, role: Role) {
        let Some(partner) = self.calls.unpair(role) else {
            return;
        };
        info!(%role, %partner, "Call ended");
        if let Some(partner_conn) = self.registry.lookup(partner) {
            self.unicast(partner_conn, Notification::CallEnded);
        }
    }

    fn broadcast_status(&mut self) {
        let users = self.status();
        self.broadcast(Notification::Users { users });
    }

    fn unicast(&mut self, conn: ConnectionId, notification: Notification) {
        let kind = notification.kind();
        let outcome = match self.subscribers.iter().find(|(c, _)| *c == conn) {
            Some((_, sink)) => sink.deliver(notification),
            None => {
                debug!(%conn, kind, "No subscriber for connection");
                return;
            }
        };
        self.record(conn, kind, outcome);
    }

    fn broadcast(&mut self, notification: Notification) {
        let kind = notification.kind();
        let outcomes: Vec<(ConnectionId, Delivery)> = self
            .subscribers
            .iter()
            .map(|(conn, sink)| (*conn, sink.deliver(notification.clone())))
            .collect();
        for (conn, outcome) in outcomes {
            self.record(conn, kind, outcome);
        }
    }

    fn record(&mut self, conn: ConnectionId, kind: &'static str, outcome: Delivery) {
        match outcome {
            Delivery::Delivered => {}
            Delivery::Full => {
                debug!(%conn, kind, "Outbound queue full");
                if !self.lagging.contains(&conn) {
                    self.lagging.push(conn);
                }
            }
            Delivery::Closed => debug!(%conn, kind, "Receiver gone, notification dropped"),
        }
    }
}

impl<S: NotificationSink> Default for CallCoordinator<S> {
    fn default() -> Self {
        Self::new()
    }
}
