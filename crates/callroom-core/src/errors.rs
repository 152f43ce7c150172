use crate::role::Role;

/// Per-event failures reported back to the requesting participant only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    #[error("invalid role: {0}")]
    InvalidRole(String),

    #[error("role already taken: {0}")]
    RoleTaken(Role),

    #[error("participant busy")]
    PartyBusy,

    #[error("participant unavailable: {0}")]
    TargetUnreachable(Role),

    #[error("caller not joined: {0}")]
    NotJoined(Role),

    #[error("cannot call yourself")]
    SelfCall,

    #[error("already joined as {0}")]
    AlreadyJoined(Role),
}
