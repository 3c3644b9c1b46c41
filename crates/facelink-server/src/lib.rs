//! Facelink Server Library
//!
//! This module exposes the signaling server components for testing and
//! embedding.

pub mod api;
pub mod auth;
pub mod error;
pub mod history;
pub mod signaling;
pub mod state;
pub mod ws;

/// Create and configure the server application
pub fn create_app(config: state::Config) -> axum::Router {
    let app_state = state::AppState::new(config);
    api::create_router(app_state)
}
