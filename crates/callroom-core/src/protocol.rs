//! Wire protocol. Every frame is a JSON object tagged by `"type"`.
//!
//! Role names arrive as plain strings and are validated by the coordinator,
//! so an unknown name becomes an `errorMsg` instead of a parse failure.
//! Signal payloads are opaque JSON and are forwarded as-is.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::role::Role;
use crate::status::StatusEntry;

/// Events a client sends.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    Join {
        role: String,
    },
    CallUser {
        user_to_call: String,
        #[serde(default)]
        signal_data: Value,
        from: String,
    },
    AnswerCall {
        to: String,
        #[serde(default)]
        signal: Value,
    },
    EndCall {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<String>,
    },
}

/// Notifications the relay sends to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Notification {
    ErrorMsg { message: String },
    Users { users: Vec<StatusEntry> },
    Call { from: Role, signal: Value },
    CallAccepted { signal: Value },
    CallFailed { message: String },
    CallEnded,
}

impl Notification {
    /// Wire name, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::ErrorMsg { .. } => "errorMsg",
            Notification::Users { .. } => "users",
            Notification::Call { .. } => "call",
            Notification::CallAccepted { .. } => "callAccepted",
            Notification::CallFailed { .. } => "callFailed",
            Notification::CallEnded => "callEnded",
        }
    }
}
