//! The call coordinator: a presence registry, a call session table with its
//! ring/answer state machine, and the scoped relay that forwards negotiation
//! payloads between the two peers of a call.

mod coordinator;
mod registry;
mod session;

pub use coordinator::{Coordinator, RelaySignal};
pub use registry::{ConnectionHandle, Registry};
pub use session::{CallSession, CallState, SessionTable};
