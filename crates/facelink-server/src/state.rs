use crate::history::{CallHistorySink, LogHistorySink};
use crate::signaling::Coordinator;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    pub bind_address: String,
    pub jwt_secret: String,
    pub ring_timeout: Duration,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set, using default (insecure for production!)");
            "dev-secret-change-in-production".to_string()
        });

        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let ring_timeout = std::env::var("RING_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(30));

        Ok(Config {
            bind_address,
            jwt_secret,
            ring_timeout,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub coordinator: Arc<Coordinator>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self::with_history(config, Arc::new(LogHistorySink))
    }

    /// Build state with a custom call-history collaborator
    pub fn with_history(config: Config, history: Arc<dyn CallHistorySink>) -> Self {
        let coordinator = Arc::new(Coordinator::new(config.ring_timeout, history));
        Self {
            config,
            coordinator,
        }
    }
}
