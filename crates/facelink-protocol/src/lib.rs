//! Facelink Protocol
//!
//! Wire types shared between the signaling server and its clients.

pub mod messages;
pub mod types;

pub use messages::{ClientMessage, ServerMessage};
pub use types::{CallErrorReason, CallOutcome, OnlineUser, PresenceStatus};
