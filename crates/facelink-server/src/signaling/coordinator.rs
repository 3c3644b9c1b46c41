use crate::history::{CallHistorySink, CallRecord};
use crate::signaling::registry::{ConnectionHandle, Registry};
use crate::signaling::session::{CallSession, CallState, SessionTable};
use chrono::Utc;
use facelink_protocol::{CallErrorReason, CallOutcome, OnlineUser, PresenceStatus, ServerMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Negotiation payload kinds the relay forwards without inspection
#[derive(Debug, Clone)]
pub enum RelaySignal {
    Offer(String),
    Answer(String),
    IceCandidate(String),
}

/// Presence registry + call state machine + scoped relay.
///
/// All mutable state sits behind one lock, so updates that must appear
/// atomic (mark busy and arm the timer, read busy and refuse a call) cannot
/// interleave, and ring-timer firings linearize with explicit cancellation.
pub struct Coordinator {
    inner: Mutex<CoordinatorState>,
    ring_timeout: Duration,
    history: Arc<dyn CallHistorySink>,
}

struct CoordinatorState {
    registry: Registry,
    sessions: SessionTable,
}

impl Coordinator {
    pub fn new(ring_timeout: Duration, history: Arc<dyn CallHistorySink>) -> Self {
        Self {
            inner: Mutex::new(CoordinatorState {
                registry: Registry::new(),
                sessions: SessionTable::new(),
            }),
            ring_timeout,
            history,
        }
    }

    /// Bind a verified identity to its live connection
    pub async fn identify(&self, user_id: Uuid, username: String, handle: ConnectionHandle) {
        let mut state = self.inner.lock().await;
        state.registry.identify(user_id, username, handle);
        tracing::debug!("user {} identified", user_id);
    }

    /// Directory snapshot for the presence REST surface
    pub async fn online_users(&self) -> Vec<OnlineUser> {
        self.inner.lock().await.registry.online_snapshot()
    }

    /// Deliver a message to a user's current connection, if any
    pub async fn send_to_user(&self, user_id: Uuid, message: ServerMessage) {
        let state = self.inner.lock().await;
        if let Some(handle) = state.registry.lookup(user_id) {
            handle.send(message);
        }
    }

    /// Start ringing `target`. Validation failures come back to the caller
    /// as a `call_error` without creating any session state.
    pub async fn place_call(self: &Arc<Self>, caller: Uuid, call_id: Uuid, target: Uuid) {
        let mut guard = self.inner.lock().await;
        let state = &mut *guard;

        if state.sessions.contains(call_id) {
            return send_call_error(&state.registry, caller, call_id, CallErrorReason::CallIdTaken);
        }
        if state.sessions.is_engaged(caller) {
            return send_call_error(
                &state.registry,
                caller,
                call_id,
                CallErrorReason::AlreadyInCall,
            );
        }
        if target == caller {
            return send_call_error(&state.registry, caller, call_id, CallErrorReason::TargetBusy);
        }
        match state.registry.status(target) {
            PresenceStatus::Offline => {
                return send_call_error(
                    &state.registry,
                    caller,
                    call_id,
                    CallErrorReason::TargetOffline,
                );
            }
            PresenceStatus::Busy => {
                return send_call_error(
                    &state.registry,
                    caller,
                    call_id,
                    CallErrorReason::TargetBusy,
                );
            }
            PresenceStatus::Online => {}
        }
        // a ringing receiver is not busy yet, but is still unavailable
        if state.sessions.is_engaged(target) {
            return send_call_error(&state.registry, caller, call_id, CallErrorReason::TargetBusy);
        }

        let caller_name = state
            .registry
            .username(caller)
            .unwrap_or_default()
            .to_string();
        state.registry.set_status(caller, PresenceStatus::Busy);

        let session = state.sessions.insert(call_id, caller, target);

        // one-shot ring timer, owned by the session row until it leaves Ringing
        let ring_timeout = self.ring_timeout;
        let coordinator = Arc::clone(self);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(ring_timeout).await;
            coordinator.ring_expired(call_id).await;
        });
        session.arm_expiry(timer.abort_handle());

        if let Some(handle) = state.registry.lookup(target) {
            handle.send(ServerMessage::IncomingCall {
                call_id,
                from_user_id: caller,
                caller_name,
            });
        }

        tracing::debug!("call {} ringing: {} -> {}", call_id, caller, target);
    }

    /// Answer a ringing call. Anything but the ringing receiver is a no-op.
    pub async fn accept_call(&self, user_id: Uuid, call_id: Uuid) {
        let mut guard = self.inner.lock().await;
        let state = &mut *guard;

        let Some(session) = state.sessions.get_mut(call_id) else {
            return;
        };
        if session.state != CallState::Ringing || session.receiver != user_id {
            return;
        }

        session.cancel_expiry();
        session.state = CallState::Active;
        let caller = session.caller;

        state.registry.set_status(user_id, PresenceStatus::Busy);
        if let Some(handle) = state.registry.lookup(caller) {
            handle.send(ServerMessage::CallAccepted { call_id });
        }

        tracing::debug!("call {} accepted by {}", call_id, user_id);
    }

    /// Decline a ringing call. Anything but the ringing receiver is a no-op.
    pub async fn reject_call(&self, user_id: Uuid, call_id: Uuid) {
        let mut guard = self.inner.lock().await;
        let state = &mut *guard;

        match state.sessions.get(call_id) {
            Some(s) if s.state == CallState::Ringing && s.receiver == user_id => {}
            _ => return,
        }
        let Some(session) = state.sessions.remove(call_id) else {
            return;
        };

        clear_busy(&mut state.registry, session.caller);
        if let Some(handle) = state.registry.lookup(session.caller) {
            handle.send(ServerMessage::CallRejected { call_id });
        }

        self.record(&session, CallOutcome::Rejected);
        tracing::debug!("call {} rejected by {}", call_id, user_id);
    }

    /// End a call from either side, ringing or active
    pub async fn hang_up(&self, user_id: Uuid, call_id: Uuid) {
        let mut guard = self.inner.lock().await;
        let state = &mut *guard;

        match state.sessions.get(call_id) {
            Some(s) if s.is_participant(user_id) => {}
            _ => return,
        }
        let Some(session) = state.sessions.remove(call_id) else {
            return;
        };

        let outcome = match session.state {
            CallState::Active => CallOutcome::Completed,
            CallState::Ringing => CallOutcome::Missed,
        };

        clear_busy(&mut state.registry, session.caller);
        clear_busy(&mut state.registry, session.receiver);

        if let Some(peer) = session.peer_of(user_id) {
            if let Some(handle) = state.registry.lookup(peer) {
                handle.send(ServerMessage::CallEnded { call_id });
            }
        }

        self.record(&session, outcome);
        tracing::debug!("call {} ended by {}", call_id, user_id);
    }

    /// Forward a negotiation payload to the sender's call peer.
    ///
    /// Unknown calls, senders outside the call, and peers without a live
    /// connection all drop the payload silently: never buffered, never
    /// retried. Recovery after loss belongs to the application layer.
    pub async fn relay(&self, sender: Uuid, call_id: Uuid, signal: RelaySignal) {
        let state = self.inner.lock().await;

        let Some(peer) = state.sessions.get(call_id).and_then(|s| s.peer_of(sender)) else {
            tracing::trace!("dropping relay payload for untracked call {}", call_id);
            return;
        };
        let Some(handle) = state.registry.lookup(peer) else {
            return;
        };

        let message = match signal {
            RelaySignal::Offer(sdp) => ServerMessage::Offer { call_id, sdp },
            RelaySignal::Answer(sdp) => ServerMessage::Answer { call_id, sdp },
            RelaySignal::IceCandidate(candidate) => {
                ServerMessage::IceCandidate { call_id, candidate }
            }
        };
        handle.send(message);
    }

    /// Reconcile after a connection is gone: tear down the user's call (if
    /// any), notify the remaining peer, and release presence.
    ///
    /// Duplicate events, and disconnects of a handle a reconnect has already
    /// replaced, are no-ops.
    pub async fn connection_lost(&self, user_id: Uuid, connection_id: Uuid) {
        let mut guard = self.inner.lock().await;
        let state = &mut *guard;

        if !state.registry.is_current(user_id, connection_id) {
            return;
        }

        if let Some(call_id) = state.sessions.call_of(user_id) {
            if let Some(session) = state.sessions.remove(call_id) {
                let outcome = match session.state {
                    CallState::Active => CallOutcome::Completed,
                    CallState::Ringing => CallOutcome::Missed,
                };

                clear_busy(&mut state.registry, session.caller);
                clear_busy(&mut state.registry, session.receiver);

                if let Some(peer) = session.peer_of(user_id) {
                    if let Some(handle) = state.registry.lookup(peer) {
                        handle.send(ServerMessage::CallEnded { call_id });
                    }
                }

                self.record(&session, outcome);
            }
        }

        state.registry.release(user_id);
        tracing::debug!("user {} released", user_id);
    }

    /// Ring timer handler. Cancellation won the race if the call is gone or
    /// already active by the time this runs under the lock.
    async fn ring_expired(&self, call_id: Uuid) {
        let mut guard = self.inner.lock().await;
        let state = &mut *guard;

        match state.sessions.get(call_id) {
            Some(s) if s.state == CallState::Ringing => {}
            _ => return,
        }
        let Some(session) = state.sessions.remove(call_id) else {
            return;
        };

        clear_busy(&mut state.registry, session.caller);

        if let Some(handle) = state.registry.lookup(session.caller) {
            handle.send(ServerMessage::CallError {
                call_id,
                reason: CallErrorReason::NoAnswer,
            });
        }
        if let Some(handle) = state.registry.lookup(session.receiver) {
            handle.send(ServerMessage::CallEnded { call_id });
        }

        self.record(&session, CallOutcome::Missed);
        tracing::debug!("call {} timed out", call_id);
    }

    /// Fire-and-forget handoff to the history collaborator
    fn record(&self, session: &CallSession, outcome: CallOutcome) {
        let record = CallRecord {
            caller: session.caller,
            receiver: session.receiver,
            outcome,
            started_at: session.started_at,
            ended_at: Utc::now(),
        };
        let sink = Arc::clone(&self.history);
        tokio::spawn(async move {
            if let Err(err) = sink.record(record).await {
                tracing::warn!("call history sink failed: {:#}", err);
            }
        });
    }
}

fn send_call_error(registry: &Registry, user_id: Uuid, call_id: Uuid, reason: CallErrorReason) {
    if let Some(handle) = registry.lookup(user_id) {
        handle.send(ServerMessage::CallError { call_id, reason });
    }
}

fn clear_busy(registry: &mut Registry, user_id: Uuid) {
    if registry.status(user_id) == PresenceStatus::Busy {
        registry.set_status(user_id, PresenceStatus::Online);
    }
}
