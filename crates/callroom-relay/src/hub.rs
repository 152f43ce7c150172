//! The hub task: sole owner of the coordinator.
//!
//! Connection tasks never touch call state directly. They send commands
//! here and the hub applies them one at a time, in arrival order.

use std::sync::Arc;

use callroom_core::id::ConnectionIdAllocator;
use callroom_core::{CallCoordinator, ClientEvent, ConnectionId, Notification};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::RelayError;

const COMMAND_CAPACITY: usize = 1024;

/// Work for the hub.
#[derive(Debug)]
pub enum HubCommand {
    Attach {
        conn: ConnectionId,
        tx: mpsc::Sender<Notification>,
    },
    Event {
        conn: ConnectionId,
        event: ClientEvent,
    },
    Detach {
        conn: ConnectionId,
    },
}

/// Cloneable handle given to each connection task.
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
    ids: Arc<ConnectionIdAllocator>,
}

impl HubHandle {
    pub fn next_connection_id(&self) -> ConnectionId {
        self.ids.allocate()
    }

    pub async fn attach(
        &self,
        conn: ConnectionId,
        tx: mpsc::Sender<Notification>,
    ) -> Result<(), RelayError> {
        self.send(HubCommand::Attach { conn, tx }).await
    }

    pub async fn event(&self, conn: ConnectionId, event: ClientEvent) -> Result<(), RelayError> {
        self.send(HubCommand::Event { conn, event }).await
    }

    pub async fn detach(&self, conn: ConnectionId) -> Result<(), RelayError> {
        self.send(HubCommand::Detach { conn }).await
    }

    async fn send(&self, cmd: HubCommand) -> Result<(), RelayError> {
        self.tx.send(cmd).await.map_err(|_| RelayError::HubClosed)
    }
}

/// Spawn the hub with a fresh coordinator.
pub fn spawn() -> (HubHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
    let handle = HubHandle {
        tx,
        ids: Arc::new(ConnectionIdAllocator::new()),
    };
    let task = tokio::spawn(run(rx, CallCoordinator::new()));
    (handle, task)
}

/// Drain commands until every handle is dropped.
pub async fn run(
    mut rx: mpsc::Receiver<HubCommand>,
    mut coordinator: CallCoordinator<mpsc::Sender<Notification>>,
) {
    while let Some(cmd) = rx.recv().await {
        apply(&mut coordinator, cmd);
    }
    debug!("Hub stopped");
}

fn apply(coordinator: &mut CallCoordinator<mpsc::Sender<Notification>>, cmd: HubCommand) {
    match cmd {
        HubCommand::Attach { conn, tx } => coordinator.attach(conn, tx),
        HubCommand::Event { conn, event } => coordinator.handle(conn, event),
        HubCommand::Detach { conn } => coordinator.detach(conn),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callroom_core::{Role, StatusEntry};
    use serde_json::json;

    async fn connect(hub: &HubHandle) -> (ConnectionId, mpsc::Receiver<Notification>) {
        let conn = hub.next_connection_id();
        let (tx, rx) = mpsc::channel(16);
        hub.attach(conn, tx).await.unwrap();
        (conn, rx)
    }

    #[tokio::test]
    async fn commands_are_applied_in_order() {
        let (hub, _task) = spawn();
        let (c1, mut rx1) = connect(&hub).await;
        let (c2, mut rx2) = connect(&hub).await;
        assert_ne!(c1, c2);

        hub.event(c1, ClientEvent::Join { role: "player1".into() }).await.unwrap();
        hub.event(c2, ClientEvent::Join { role: "player2".into() }).await.unwrap();
        hub.event(
            c1,
            ClientEvent::CallUser {
                user_to_call: "player2".into(),
                signal_data: json!("offer"),
                from: "player1".into(),
            },
        )
        .await
        .unwrap();

        // player2: two roster updates, the incoming call, then the busy roster.
        rx2.recv().await.unwrap();
        rx2.recv().await.unwrap();
        assert_eq!(
            rx2.recv().await.unwrap(),
            Notification::Call { from: Role::Player1, signal: json!("offer") }
        );
        assert_eq!(
            rx2.recv().await.unwrap(),
            Notification::Users {
                users: vec![
                    StatusEntry { role: Role::Player1, busy: true },
                    StatusEntry { role: Role::Player2, busy: true },
                ]
            }
        );

        hub.detach(c2).await.unwrap();
        for _ in 0..3 {
            rx1.recv().await.unwrap();
        }
        assert_eq!(rx1.recv().await.unwrap(), Notification::CallEnded);
        assert_eq!(
            rx1.recv().await.unwrap(),
            Notification::Users {
                users: vec![StatusEntry { role: Role::Player1, busy: false }]
            }
        );
    }

    #[tokio::test]
    async fn hub_stops_when_handles_dropped() {
        let (hub, task) = spawn();
        drop(hub);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn send_after_hub_stops_is_error() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let hub = HubHandle {
            tx,
            ids: Arc::new(ConnectionIdAllocator::new()),
        };
        let err = hub.detach(ConnectionId(1)).await.unwrap_err();
        assert!(matches!(err, RelayError::HubClosed));
    }
}
