//! Call-history collaborator boundary.
//!
//! The coordinator hands a [`CallRecord`] to a sink on every terminal call
//! transition, fire-and-forget. A sink that fails is logged here and never
//! affects the live call path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use facelink_protocol::CallOutcome;
use serde::Serialize;
use uuid::Uuid;

/// Summary of one finished call attempt
#[derive(Debug, Clone, Serialize)]
pub struct CallRecord {
    pub caller: Uuid,
    pub receiver: Uuid,
    pub outcome: CallOutcome,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

/// Receives call records on terminal transitions
#[async_trait]
pub trait CallHistorySink: Send + Sync {
    async fn record(&self, record: CallRecord) -> anyhow::Result<()>;
}

/// Default sink: writes records to the log
pub struct LogHistorySink;

#[async_trait]
impl CallHistorySink for LogHistorySink {
    async fn record(&self, record: CallRecord) -> anyhow::Result<()> {
        tracing::info!(
            caller = %record.caller,
            receiver = %record.receiver,
            outcome = ?record.outcome,
            duration_secs = (record.ended_at - record.started_at).num_seconds(),
            "call finished"
        );
        Ok(())
    }
}
