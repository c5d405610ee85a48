//! Hash-chained lifecycle audit log
//!
//! Append-only record of everything that happened to a request: creation,
//! transitions, reminders, access decisions. Each entry carries the hash of
//! its predecessor, so truncation or in-place edits are detectable.

use chrono::{DateTime, Utc};
use letterflow_core::RequestId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    RequestCreated,
    StatusChanged,
    ReminderSent,
    AccessGranted,
    AccessDenied,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub at: DateTime<Utc>,
    pub request_id: RequestId,
    pub action: AuditAction,
    /// Free-form detail. Token material only ever appears as a fingerprint.
    pub detail: String,
    pub prev_hash: [u8; 32],
    pub hash: [u8; 32],
}

#[derive(Debug, Default)]
pub struct AuditLog {
    inner: Mutex<Vec<AuditEvent>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuditError {
    /// A link or entry hash does not match its recomputation
    #[error("audit chain integrity violation at index {0}")]
    IntegrityViolation(usize),
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &self,
        at: DateTime<Utc>,
        request_id: RequestId,
        action: AuditAction,
        detail: impl Into<String>,
    ) -> Uuid {
        let mut guard = self.inner.lock();
        let prev_hash = guard.last().map(|e| e.hash).unwrap_or([0u8; 32]);
        let mut event = AuditEvent {
            event_id: Uuid::new_v4(),
            at,
            request_id,
            action,
            detail: detail.into(),
            prev_hash,
            hash: [0u8; 32],
        };
        event.hash = compute_hash(&event);
        let id = event.event_id;
        guard.push(event);
        id
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.inner.lock().clone()
    }

    pub fn events_for(&self, request_id: RequestId) -> Vec<AuditEvent> {
        self.inner
            .lock()
            .iter()
            .filter(|e| e.request_id == request_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Walk the chain and recompute every hash.
    pub fn verify_integrity(&self) -> Result<(), AuditError> {
        let guard = self.inner.lock();
        let mut prev = [0u8; 32];
        for (index, event) in guard.iter().enumerate() {
            if event.prev_hash != prev {
                return Err(AuditError::IntegrityViolation(index));
            }
            if event.hash != compute_hash(event) {
                return Err(AuditError::IntegrityViolation(index));
            }
            prev = event.hash;
        }
        Ok(())
    }
}

fn compute_hash(event: &AuditEvent) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(event.event_id.as_bytes());
    hasher.update(event.at.timestamp_millis().to_le_bytes());
    hasher.update(event.request_id.0.as_bytes());
    hasher.update([audit_action_tag(event.action)]);
    hasher.update(event.detail.as_bytes());
    hasher.update([0]);
    hasher.update(event.prev_hash);
    hasher.finalize().into()
}

fn audit_action_tag(action: AuditAction) -> u8 {
    match action {
        AuditAction::RequestCreated => 0,
        AuditAction::StatusChanged => 1,
        AuditAction::ReminderSent => 2,
        AuditAction::AccessGranted => 3,
        AuditAction::AccessDenied => 4,
    }
}
