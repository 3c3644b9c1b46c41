use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Presence of a user as tracked by the signaling registry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    #[default]
    Offline,
    Online,
    Busy,
}

/// Entry in the online-users directory snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineUser {
    pub id: Uuid,
    pub username: String,
    pub status: PresenceStatus,
}

/// How a call attempt finished
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CallOutcome {
    /// Answered and later hung up
    Completed,
    /// Explicitly declined by the receiver
    Rejected,
    /// Never answered: ring timeout, caller hang-up, or disconnect
    Missed,
}

/// Structured reason attached to a `call_error` event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CallErrorReason {
    /// The callee has no live connection
    TargetOffline,
    /// The callee is already engaged in a call
    TargetBusy,
    /// The ring window expired without an answer
    NoAnswer,
    /// The caller is already engaged in a call
    AlreadyInCall,
    /// The supplied call id collides with a live call
    CallIdTaken,
}
