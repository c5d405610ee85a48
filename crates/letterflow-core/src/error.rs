//! Error types for the request lifecycle
//!
//! Three synchronous failure families:
//! - Creation-time structural validation
//! - Status transition violations
//! - Recipient token access failures

use crate::types::{RequestStatus, RequestType, SubmissionMethod};
use chrono::{DateTime, Utc};

/// Structural validation failure, rejected before any store write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Required text field is empty
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// Submission method not available for the request type
    #[error("submission method {method:?} is not available for request type {request_type:?}")]
    ChannelMismatch {
        method: SubmissionMethod,
        request_type: RequestType,
    },

    /// A draft was included without content
    #[error("draft content is required when a draft is included")]
    MissingDraftContent,

    /// School channel selected without a school email
    #[error("school email is required for school-channel submission")]
    MissingSchoolEmail,

    /// Deadline already passed at creation
    #[error("deadline {0} is not in the future")]
    DeadlineInPast(DateTime<Utc>),
}

/// Requested status change violates the transition rules.
///
/// Never silently coerced - surfaced to the immediate caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// Terminal statuses are immutable
    #[error("status {0:?} is terminal and cannot change")]
    Terminal(RequestStatus),

    /// Transition not in the allowed set
    #[error("illegal transition {from:?} -> {to:?}")]
    Illegal {
        from: RequestStatus,
        to: RequestStatus,
    },

    /// Overdue is assigned by the reconciliation sweep only
    #[error("overdue cannot be requested directly")]
    OverdueIsSweepOnly,
}

/// Recipient token access failure.
///
/// The recipient-facing surface collapses every variant into a generic
/// denial; the precise reason is logged server-side.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    /// Input failed the shape check, no lookup was performed
    #[error("token is malformed")]
    MalformedToken,

    /// No request carries this token
    #[error("token not found")]
    TokenNotFound,

    /// Token validity window has closed
    #[error("token expired at {0}")]
    TokenExpired(DateTime<Utc>),

    /// The request was cancelled by the student
    #[error("request has been cancelled")]
    RequestCancelled,
}

impl AccessError {
    /// The only message a recipient ever sees, whatever the variant.
    pub fn denial_message(&self) -> &'static str {
        "access denied: ask the student to send a new invitation"
    }
}
