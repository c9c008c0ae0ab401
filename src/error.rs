//! Typed error taxonomy for the intake engine.
//!
//! Every public engine operation returns [`EngineError`]. The REST layer maps
//! each variant to a status code; `Gateway` failures that occur after a chat
//! stream has opened are instead surfaced as a terminal `"⚠️ "` fragment so
//! the client never sees a half-broken HTTP response.

use tracing::error;

/// Errors surfaced by the conversation engine and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Malformed response vector, unknown screener id, bad control directive.
    /// The turn is not committed.
    #[error("validation: {0}")]
    Validation(String),

    /// Unknown session or resume token.
    #[error("not found: {0}")]
    NotFound(String),

    /// Paused session past its expiry. The session is marked abandoned.
    #[error("session expired")]
    Expired,

    /// Optimistic concurrency failure after max CAS retries.
    #[error("session write conflict — retry")]
    Conflict,

    /// LLM provider failure, parse failure, or deadline exceeded.
    #[error("gateway: {0}")]
    Gateway(String),

    /// Invariant violation. Carries a trace id for log correlation; the
    /// session is left unchanged.
    #[error("internal error (trace {trace_id})")]
    Internal { trace_id: String, message: String },
}

impl EngineError {
    /// Wrap an unexpected failure, emitting the full message to the log and
    /// returning only a trace id to the caller.
    pub fn internal(message: impl Into<String>) -> Self {
        let trace_id = uuid::Uuid::new_v4().to_string();
        let message = message.into();
        error!(trace_id = %trace_id, %message, "internal engine error");
        Self::Internal { trace_id, message }
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => Self::NotFound("row not found".into()),
            other => Self::internal(format!("database error: {other}")),
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        Self::internal(format!("serialization error: {e}"))
    }
}

/// Convenience alias used throughout the crate.
pub type EngineResult<T> = Result<T, EngineError>;
