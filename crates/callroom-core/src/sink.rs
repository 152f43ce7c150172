//! Outbound notification sinks.

use tokio::sync::mpsc;

use crate::protocol::Notification;

/// What happened to a notification handed to a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The client is not keeping up. The coordinator evicts it.
    Full,
    /// The receiving side is gone; the transport will detach it.
    Closed,
}

/// Somewhere a connection's notifications go. Delivery never blocks.
pub trait NotificationSink {
    fn deliver(&self, notification: Notification) -> Delivery;
}

impl NotificationSink for mpsc::Sender<Notification> {
    fn deliver(&self, notification: Notification) -> Delivery {
        match self.try_send(notification) {
            Ok(()) => Delivery::Delivered,
            Err(mpsc::error::TrySendError::Full(_)) => Delivery::Full,
            Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}

impl NotificationSink for mpsc::UnboundedSender<Notification> {
    fn deliver(&self, notification: Notification) -> Delivery {
        match self.send(notification) {
            Ok(()) => Delivery::Delivered,
            Err(_) => Delivery::Closed,
        }
    }
}
