//! Call-state coordination for a fixed roster of signaling participants.
//!
//! Tracks who is online, who is busy and who is paired with whom, and turns
//! inbound handshake events into outbound notifications. Signal payloads are
//! forwarded untouched; no media passes through here.

pub mod call_state;
pub mod coordinator;
pub mod errors;
pub mod id;
pub mod protocol;
pub mod registry;
pub mod role;
pub mod sink;
pub mod status;

pub use call_state::CallState;
pub use coordinator::CallCoordinator;
pub use errors::CallError;
pub use id::ConnectionId;
pub use protocol::{ClientEvent, Notification};
pub use registry::RoleRegistry;
pub use role::Role;
pub use sink::{Delivery, NotificationSink};
pub use status::{snapshot, StatusEntry};
