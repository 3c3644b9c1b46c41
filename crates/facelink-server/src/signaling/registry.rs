use facelink_protocol::{OnlineUser, PresenceStatus, ServerMessage};
use std::collections::HashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Addressable reference to one user's live WebSocket.
///
/// The socket loop owns the receiving half; the registry only stores this
/// sender side and clears it when the connection dies.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    connection_id: Uuid,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ConnectionHandle {
    pub fn new(connection_id: Uuid, tx: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self { connection_id, tx }
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    /// Best-effort delivery; a closed socket drops the message
    pub fn send(&self, message: ServerMessage) {
        if self.tx.send(message).is_err() {
            tracing::debug!(
                "dropped outbound message for closed connection {}",
                self.connection_id
            );
        }
    }
}

struct PresenceRecord {
    username: String,
    status: PresenceStatus,
    handle: Option<ConnectionHandle>,
}

/// Maps a user identity to its live connection handle and presence status
#[derive(Default)]
pub struct Registry {
    users: HashMap<Uuid, PresenceRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            users: HashMap::new(),
        }
    }

    /// Bind a live connection to an identity and mark it online.
    ///
    /// Re-identifying on a fresh socket silently replaces the stale handle;
    /// the old socket loop is responsible for closing its own end.
    pub fn identify(&mut self, user_id: Uuid, username: String, handle: ConnectionHandle) {
        let record = self.users.entry(user_id).or_insert_with(|| PresenceRecord {
            username: String::new(),
            status: PresenceStatus::Offline,
            handle: None,
        });
        record.username = username;
        record.status = PresenceStatus::Online;
        record.handle = Some(handle);
    }

    pub fn lookup(&self, user_id: Uuid) -> Option<&ConnectionHandle> {
        self.users.get(&user_id).and_then(|r| r.handle.as_ref())
    }

    /// Unknown identities read as offline
    pub fn status(&self, user_id: Uuid) -> PresenceStatus {
        self.users
            .get(&user_id)
            .map(|r| r.status)
            .unwrap_or_default()
    }

    pub fn username(&self, user_id: Uuid) -> Option<&str> {
        self.users.get(&user_id).map(|r| r.username.as_str())
    }

    /// No-op for unknown or already-removed identities
    pub fn set_status(&mut self, user_id: Uuid, status: PresenceStatus) {
        if let Some(record) = self.users.get_mut(&user_id) {
            record.status = status;
        }
    }

    /// Clear the handle and go offline
    pub fn release(&mut self, user_id: Uuid) {
        if let Some(record) = self.users.get_mut(&user_id) {
            record.handle = None;
            record.status = PresenceStatus::Offline;
        }
    }

    /// True while `connection_id` is still the identity's registered handle
    pub fn is_current(&self, user_id: Uuid, connection_id: Uuid) -> bool {
        self.lookup(user_id)
            .map(|h| h.connection_id() == connection_id)
            .unwrap_or(false)
    }

    /// Directory snapshot of everyone who is not offline
    pub fn online_snapshot(&self) -> Vec<OnlineUser> {
        self.users
            .iter()
            .filter(|(_, r)| r.status != PresenceStatus::Offline)
            .map(|(id, r)| OnlineUser {
                id: *id,
                username: r.username.clone(),
                status: r.status,
            })
            .collect()
    }
}
