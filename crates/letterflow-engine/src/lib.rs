//! Letterflow Engine - lifecycle orchestration
//!
//! Wires the domain model to its collaborators:
//! - `store`: persistence seam with conditional (compare-and-set) writes
//! - `notify`: outbound notification seam
//! - `service`: request creation and student cancellation
//! - `access`: token-gated recipient actions
//! - `sweep`: the periodic reconciliation tick
//! - `audit`: hash-chained lifecycle event log
//!
//! The sweep is the only writer of automatic overdue transitions and the
//! trigger point for reminder emission. Reminder bookkeeping advances only
//! after a confirmed dispatch, so a failed send is retried next tick.

pub mod access;
pub mod audit;
pub mod error;
pub mod harness;
pub mod notify;
pub mod service;
pub mod store;
pub mod sweep;

pub use access::AccessGate;
pub use audit::{AuditAction, AuditError, AuditEvent, AuditLog};
pub use error::{EngineError, NotifyError, StoreError, SweepError};
pub use notify::{LogNotifier, Notice, Notifier, RecordingNotifier, TemplateKind};
pub use service::RequestService;
pub use store::{CasOutcome, Expected, MemoryStore, RequestStore, RequestUpdate};
pub use sweep::{Sweep, SweepConfig, SweepReport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
