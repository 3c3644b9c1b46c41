use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::CallErrorReason;

/// Messages sent from client to server via WebSocket
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Authenticate with the server; must be the first message
    Authenticate { token: String },

    /// Start a call to another user; the call id scopes all later traffic
    PlaceCall { call_id: Uuid, target_user_id: Uuid },

    /// Answer a ringing call
    AcceptCall { call_id: Uuid },

    /// Decline a ringing call
    RejectCall { call_id: Uuid },

    /// End a call (either party, ringing or active)
    HangUp { call_id: Uuid },

    /// Forward a session description offer to the call peer
    Offer { call_id: Uuid, sdp: String },

    /// Forward a session description answer to the call peer
    Answer { call_id: Uuid, sdp: String },

    /// Forward a network path candidate to the call peer
    IceCandidate { call_id: Uuid, candidate: String },

    /// Go offline without closing the socket abruptly
    Logout,

    /// Ping to keep connection alive
    Ping,
}

/// Messages sent from server to client via WebSocket
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Authentication successful
    Authenticated { user_id: Uuid },

    /// Someone is calling
    IncomingCall {
        call_id: Uuid,
        from_user_id: Uuid,
        caller_name: String,
    },

    /// The receiver answered
    CallAccepted { call_id: Uuid },

    /// The receiver declined
    CallRejected { call_id: Uuid },

    /// The call is over (hang-up, disconnect, or ring timeout on the callee side)
    CallEnded { call_id: Uuid },

    /// A call action failed validation or the ring window expired
    CallError {
        call_id: Uuid,
        reason: CallErrorReason,
    },

    /// Session description offer from the call peer
    Offer { call_id: Uuid, sdp: String },

    /// Session description answer from the call peer
    Answer { call_id: Uuid, sdp: String },

    /// Network path candidate from the call peer
    IceCandidate { call_id: Uuid, candidate: String },

    /// Pong response to ping
    Pong,

    /// Protocol-level error (bad message, bad token)
    Error { message: String },
}
