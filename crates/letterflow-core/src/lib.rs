//! Letterflow Core - recommendation-request domain model
//!
//! Pure lifecycle logic, no I/O:
//! - The `RecommendationRequest` record and its creation-time validation
//! - Status transition rules (pending / sent / received / overdue / cancelled)
//! - Deadline-driven reminder scheduling
//! - Secure-token issuance for recipient access
//!
//! # Example
//!
//! ```rust,ignore
//! use chrono::Utc;
//! use letterflow_core::{NewRequest, TokenConfig};
//!
//! let now = Utc::now();
//! let request = new_request.into_request(now, &TokenConfig::default())?;
//! assert!(request.token_expires_at >= request.deadline);
//! ```

pub mod error;
pub mod reminder;
pub mod request;
pub mod state_machine;
pub mod token;
pub mod types;

pub use error::{AccessError, TransitionError, ValidationError};
pub use request::{NewRequest, RecommendationRequest};
pub use token::{SecureToken, TokenConfig};
pub use types::{
    ApplicationId, CommunicationStyle, Priority, RecipientId, ReminderFrequency, RequestId,
    RequestStatus, RequestType, ScholarshipId, StudentId, SubmissionMethod,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
