//! Error types shared by the fetch and analysis pipeline.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failure reported by a [`TraceBackend`](crate::backend::TraceBackend) call.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("tracing backend call failed: {0}")]
    Api(String),
    #[error("tracing backend returned an invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("malformed trace {trace_id}: {reason}")]
    MalformedTrace { trace_id: String, reason: String },
    #[error("invalid time window: start {start} is after end {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl AnalyzeError {
    pub(crate) fn malformed(trace_id: &str, reason: impl Into<String>) -> Self {
        AnalyzeError::MalformedTrace {
            trace_id: trace_id.to_string(),
            reason: reason.into(),
        }
    }
}
