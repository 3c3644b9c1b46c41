use crate::auth::verify_token;
use crate::signaling::{ConnectionHandle, RelaySignal};
use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use facelink_protocol::{ClientMessage, ServerMessage};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::sync::mpsc;
use uuid::Uuid;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    // First message must be authentication
    let Some((user_id, username)) = authenticate(&state, &mut sender, &mut receiver).await else {
        return;
    };

    let connection_id = Uuid::new_v4();
    send_direct(
        &mut sender,
        &ServerMessage::Authenticated { user_id },
    )
    .await;

    tracing::info!("user {} authenticated on WebSocket", user_id);

    // Channel for outbound events; the coordinator holds the sending half
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state
        .coordinator
        .identify(user_id, username, ConnectionHandle::new(connection_id, tx))
        .await;

    // Forward outbound events to the socket
    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let Ok(json) = serde_json::to_string(&message) else {
                continue;
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Handle incoming messages
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let client_msg: ClientMessage = match serde_json::from_str(&text) {
                    Ok(m) => m,
                    Err(e) => {
                        tracing::warn!("invalid message from {}: {}", user_id, e);
                        continue;
                    }
                };

                if matches!(client_msg, ClientMessage::Logout) {
                    break;
                }
                handle_client_message(&state, user_id, client_msg).await;
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                tracing::warn!("WebSocket error for user {}: {}", user_id, e);
                break;
            }
            _ => {}
        }
    }

    // Cleanup on disconnect or logout
    state.coordinator.connection_lost(user_id, connection_id).await;
    send_task.abort();

    tracing::info!("user {} disconnected from WebSocket", user_id);
}

/// Read and verify the authentication message; any failure closes the socket
async fn authenticate(
    state: &AppState,
    sender: &mut SplitSink<WebSocket, Message>,
    receiver: &mut SplitStream<WebSocket>,
) -> Option<(Uuid, String)> {
    let auth_msg = match receiver.next().await {
        Some(Ok(Message::Text(text))) => text,
        _ => {
            tracing::warn!("WebSocket closed before authentication");
            return None;
        }
    };

    let auth: ClientMessage = match serde_json::from_str(&auth_msg) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!("invalid auth message: {}", e);
            send_direct(
                sender,
                &ServerMessage::Error {
                    message: "Invalid message format".to_string(),
                },
            )
            .await;
            return None;
        }
    };

    match auth {
        ClientMessage::Authenticate { token } => {
            match verify_token(&token, &state.config.jwt_secret) {
                Ok(claims) => Some((claims.sub, claims.username)),
                Err(_) => {
                    send_direct(
                        sender,
                        &ServerMessage::Error {
                            message: "Invalid token".to_string(),
                        },
                    )
                    .await;
                    None
                }
            }
        }
        _ => {
            send_direct(
                sender,
                &ServerMessage::Error {
                    message: "First message must be authentication".to_string(),
                },
            )
            .await;
            None
        }
    }
}

async fn send_direct(sender: &mut SplitSink<WebSocket, Message>, message: &ServerMessage) {
    if let Ok(json) = serde_json::to_string(message) {
        let _ = sender.send(Message::Text(json.into())).await;
    }
}

async fn handle_client_message(state: &AppState, user_id: Uuid, message: ClientMessage) {
    match message {
        ClientMessage::Authenticate { .. } => {
            // Already authenticated
        }
        ClientMessage::PlaceCall {
            call_id,
            target_user_id,
        } => {
            state
                .coordinator
                .place_call(user_id, call_id, target_user_id)
                .await;
        }
        ClientMessage::AcceptCall { call_id } => {
            state.coordinator.accept_call(user_id, call_id).await;
        }
        ClientMessage::RejectCall { call_id } => {
            state.coordinator.reject_call(user_id, call_id).await;
        }
        ClientMessage::HangUp { call_id } => {
            state.coordinator.hang_up(user_id, call_id).await;
        }
        // Opaque negotiation payloads, forwarded to the call peer
        ClientMessage::Offer { call_id, sdp } => {
            state
                .coordinator
                .relay(user_id, call_id, RelaySignal::Offer(sdp))
                .await;
        }
        ClientMessage::Answer { call_id, sdp } => {
            state
                .coordinator
                .relay(user_id, call_id, RelaySignal::Answer(sdp))
                .await;
        }
        ClientMessage::IceCandidate { call_id, candidate } => {
            state
                .coordinator
                .relay(user_id, call_id, RelaySignal::IceCandidate(candidate))
                .await;
        }
        ClientMessage::Logout => {
            // Handled by the socket loop
        }
        ClientMessage::Ping => {
            state
                .coordinator
                .send_to_user(user_id, ServerMessage::Pong)
                .await;
        }
    }
}
