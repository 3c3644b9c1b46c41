use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::task::AbortHandle;
use uuid::Uuid;

/// Non-terminal states of a call attempt. Terminal transitions (rejected,
/// timed out, ended) delete the row instead of storing a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Ringing,
    Active,
}

/// One call attempt between exactly two identities
pub struct CallSession {
    pub caller: Uuid,
    pub receiver: Uuid,
    pub state: CallState,
    pub started_at: DateTime<Utc>,
    /// Armed only while ringing; cancelled on every non-timeout exit
    expiry: Option<AbortHandle>,
}

impl CallSession {
    fn new(caller: Uuid, receiver: Uuid) -> Self {
        Self {
            caller,
            receiver,
            state: CallState::Ringing,
            started_at: Utc::now(),
            expiry: None,
        }
    }

    pub fn is_participant(&self, user_id: Uuid) -> bool {
        user_id == self.caller || user_id == self.receiver
    }

    /// The other participant, or `None` for an outsider
    pub fn peer_of(&self, user_id: Uuid) -> Option<Uuid> {
        if user_id == self.caller {
            Some(self.receiver)
        } else if user_id == self.receiver {
            Some(self.caller)
        } else {
            None
        }
    }

    pub fn arm_expiry(&mut self, handle: AbortHandle) {
        self.expiry = Some(handle);
    }

    pub fn cancel_expiry(&mut self) {
        if let Some(handle) = self.expiry.take() {
            handle.abort();
        }
    }
}

/// Live call sessions plus the identity → call membership index.
///
/// The index is maintained alongside every insert/remove, so disconnect
/// cleanup never has to derive membership from connection-layer state.
#[derive(Default)]
pub struct SessionTable {
    calls: HashMap<Uuid, CallSession>,
    members: HashMap<Uuid, Uuid>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self {
            calls: HashMap::new(),
            members: HashMap::new(),
        }
    }

    pub fn contains(&self, call_id: Uuid) -> bool {
        self.calls.contains_key(&call_id)
    }

    pub fn get(&self, call_id: Uuid) -> Option<&CallSession> {
        self.calls.get(&call_id)
    }

    pub fn get_mut(&mut self, call_id: Uuid) -> Option<&mut CallSession> {
        self.calls.get_mut(&call_id)
    }

    /// True if the identity participates in any ringing or active call
    pub fn is_engaged(&self, user_id: Uuid) -> bool {
        self.members.contains_key(&user_id)
    }

    pub fn call_of(&self, user_id: Uuid) -> Option<Uuid> {
        self.members.get(&user_id).copied()
    }

    /// Insert a new ringing call and index both participants
    pub fn insert(&mut self, call_id: Uuid, caller: Uuid, receiver: Uuid) -> &mut CallSession {
        self.members.insert(caller, call_id);
        self.members.insert(receiver, call_id);
        self.calls.entry(call_id).or_insert_with(|| CallSession::new(caller, receiver))
    }

    /// Terminal transition: drop the row, both index entries, and any armed
    /// timer, handing the session back for notification and history
    pub fn remove(&mut self, call_id: Uuid) -> Option<CallSession> {
        let mut session = self.calls.remove(&call_id)?;
        session.cancel_expiry();
        self.members.remove(&session.caller);
        self.members.remove(&session.receiver);
        Some(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_indexes_both_participants() {
        let mut table = SessionTable::new();
        let (call_id, caller, receiver) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        table.insert(call_id, caller, receiver);

        assert!(table.is_engaged(caller));
        assert!(table.is_engaged(receiver));
        assert_eq!(table.call_of(caller), Some(call_id));
        assert_eq!(table.call_of(receiver), Some(call_id));
    }

    #[test]
    fn remove_clears_index_and_is_idempotent() {
        let mut table = SessionTable::new();
        let (call_id, caller, receiver) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        table.insert(call_id, caller, receiver);
        assert!(table.remove(call_id).is_some());

        assert!(!table.is_engaged(caller));
        assert!(!table.is_engaged(receiver));
        assert!(table.remove(call_id).is_none());
    }

    #[test]
    fn peer_of_outsider_is_none() {
        let mut table = SessionTable::new();
        let (call_id, caller, receiver) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        table.insert(call_id, caller, receiver);
        let session = table.get(call_id).unwrap();

        assert_eq!(session.peer_of(caller), Some(receiver));
        assert_eq!(session.peer_of(receiver), Some(caller));
        assert_eq!(session.peer_of(Uuid::new_v4()), None);
    }
}
