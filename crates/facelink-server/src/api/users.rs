use crate::auth::AuthUser;
use crate::state::AppState;
use axum::{extract::State, Json};
use facelink_protocol::OnlineUser;

/// Snapshot of every user whose presence is not offline
pub async fn get_online_users(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Json<Vec<OnlineUser>> {
    Json(state.coordinator.online_users().await)
}
