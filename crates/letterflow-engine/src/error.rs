//! Engine error types
//!
//! Store, notification and sweep failures, plus the umbrella error the
//! service layer returns to callers.

use letterflow_core::{AccessError, RequestId, TransitionError, ValidationError};

/// Persistence seam failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No record with this id
    #[error("request not found")]
    NotFound,

    /// Insert collided on the request id
    #[error("duplicate request id")]
    DuplicateId,

    /// Insert collided on the secure token
    #[error("duplicate secure token")]
    DuplicateToken,

    /// Backend-specific failure
    #[error("store backend: {0}")]
    Backend(String),
}

/// Notification dispatch failure. Transient: the sweep retries on the next
/// tick without advancing reminder bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    /// The dispatcher rejected the notice
    #[error("dispatch rejected: {0}")]
    Rejected(String),

    /// The dispatcher did not answer in time
    #[error("dispatch timed out")]
    Timeout,
}

/// Sweep tick failure. Per-request failures never surface here - they are
/// aggregated into the tick report instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SweepError {
    /// The previous tick is still running
    #[error("a sweep tick is already in progress")]
    TickInProgress,

    /// Candidate scan failed before any request was processed
    #[error("store: {0}")]
    Store(#[from] StoreError),
}

/// Umbrella error for service and access operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("validation: {0}")]
    Validation(#[from] ValidationError),

    #[error("transition: {0}")]
    Transition(#[from] TransitionError),

    #[error("access: {0}")]
    Access(#[from] AccessError),

    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("notify: {0}")]
    Notify(#[from] NotifyError),

    /// A conditional write kept losing the race
    #[error("write conflict on request {0:?}")]
    Conflict(RequestId),
}

impl EngineError {
    /// Transient errors are worth retrying; rule violations are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Notify(_) | EngineError::Conflict(_) | EngineError::Store(StoreError::Backend(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(EngineError::Notify(NotifyError::Timeout).is_retryable());
        assert!(EngineError::Conflict(RequestId::new()).is_retryable());
        assert!(!EngineError::Store(StoreError::NotFound).is_retryable());
        assert!(!EngineError::Access(AccessError::TokenNotFound).is_retryable());
    }
}
