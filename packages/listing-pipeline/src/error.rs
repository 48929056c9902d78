//! Typed errors for the listing pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can tell a
//! retryable persistence conflict from a terminal fetch failure.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::types::{ExtractionAttempt, PageKind};

/// Errors surfaced to the caller of a pipeline invocation.
///
/// Fetch-tier and extraction-tier problems are absorbed internally; only the
/// variants below ever leave [`crate::Pipeline::run`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Every fetch strategy failed or returned insufficient content.
    #[error("all fetch strategies failed for {url} ({} attempts)", .attempts.len())]
    FetchExhausted {
        url: String,
        attempts: Vec<ExtractionAttempt>,
    },

    /// A uniqueness constraint rejected a write the manual check missed.
    ///
    /// The entity most likely exists now; re-resolve and retry.
    #[error("persistence conflict on {constraint}; re-resolve and retry")]
    PersistenceConflict { constraint: String },

    /// The datastore failed for a reason other than a conflict.
    #[error("storage error: {0}")]
    Storage(#[source] StoreError),

    /// The invocation ran past its wall-clock budget and was abandoned.
    #[error("invocation exceeded its {}s budget", .budget.as_secs())]
    BudgetExceeded { budget: Duration },

    /// The page lists many vehicles rather than describing one.
    #[error("page is not a single listing (classified as {kind:?})")]
    UnsupportedPage { kind: PageKind },

    /// The inbound request was malformed.
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },
}

impl PipelineError {
    /// Whether the caller should retry the same URL later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::FetchExhausted { .. }
                | PipelineError::PersistenceConflict { .. }
                | PipelineError::BudgetExceeded { .. }
        )
    }

    /// Structured error body returned to external callers.
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            success: false,
            error: self.to_string(),
            retryable: self.is_retryable(),
        }
    }
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { constraint } => PipelineError::PersistenceConflict { constraint },
            other => PipelineError::Storage(other),
        }
    }
}

/// JSON error body: `{success: false, error, retryable}`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub retryable: bool,
}

/// Errors from a single fetch strategy.
///
/// All of these are recoverable from the orchestrator's point of view: the
/// next strategy is attempted.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Non-success status code
    #[error("HTTP status {code}")]
    Status { code: u16 },

    /// The strategy's own timer fired
    #[error("timed out after {}ms", .elapsed.as_millis())]
    Timeout { elapsed: Duration },

    /// Content arrived but the expected structure is absent
    #[error("expected structural marker missing: {marker}")]
    MissingMarker { marker: String },

    /// Content arrived but is empty or too thin to extract from
    #[error("content too thin ({len} chars of text)")]
    EmptyContent { len: usize },

    /// The rendering service reported a failure
    #[error("rendering service error: {message}")]
    Rendering { message: String },
}

impl FetchError {
    /// Whether the target site is actively refusing us.
    pub fn is_blocking(&self) -> bool {
        matches!(self, FetchError::Status { code: 401 | 403 | 429 | 503 })
    }
}

/// Errors from the datastore collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique constraint violation
    #[error("unique constraint violated: {constraint}")]
    Conflict { constraint: String },

    /// Referenced row does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Backend failure
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors loading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is present but cannot be parsed
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    /// A required variable is missing
    #[error("{name} must be set")]
    Missing { name: &'static str },
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Result type alias for fetch strategies.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_maps_to_persistence_conflict() {
        let err: PipelineError = StoreError::Conflict {
            constraint: "vehicles_vin_key".into(),
        }
        .into();
        assert!(matches!(err, PipelineError::PersistenceConflict { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_backend_error_is_not_retryable() {
        let err: PipelineError = StoreError::Backend("disk full".into()).into();
        assert!(!err.is_retryable());

        let body = err.to_response();
        assert!(!body.success);
        assert!(body.error.contains("disk full"));
    }

    #[test]
    fn test_blocking_statuses() {
        assert!(FetchError::Status { code: 403 }.is_blocking());
        assert!(FetchError::Status { code: 429 }.is_blocking());
        assert!(!FetchError::Status { code: 404 }.is_blocking());
        assert!(!FetchError::EmptyContent { len: 0 }.is_blocking());
    }
}
