//! Persistence seam
//!
//! `RequestStore` is the only way lifecycle state reaches disk. All sweep
//! and recipient writes are conditional: the caller states which values its
//! decision was computed from, and a write against changed values no-ops.
//! That is the optimistic-concurrency guard against overlapping ticks and
//! cancellation races.

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use letterflow_core::{RecommendationRequest, RequestId, SecureToken};
use letterflow_core::RequestStatus;
use parking_lot::RwLock;
use std::collections::HashMap;

/// The values a conditional write was decided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expected {
    pub status: RequestStatus,
    pub next_reminder_date: Option<DateTime<Utc>>,
}

impl Expected {
    pub fn of(request: &RecommendationRequest) -> Self {
        Self {
            status: request.status,
            next_reminder_date: request.next_reminder_date,
        }
    }
}

/// Field assignments applied when a conditional write wins.
///
/// `next_reminder_date` is doubly optional: the outer level means "assign",
/// the inner is the stored value (which may be empty once the schedule is
/// exhausted).
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestUpdate {
    pub status: Option<RequestStatus>,
    pub sent_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub last_reminder_sent: Option<DateTime<Utc>>,
    pub next_reminder_date: Option<Option<DateTime<Utc>>>,
}

/// Result of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    Updated,
    /// Stored values no longer match the expectation; nothing was written.
    Stale,
}

#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn insert(&self, request: RecommendationRequest) -> Result<(), StoreError>;

    async fn get(&self, id: RequestId) -> Result<RecommendationRequest, StoreError>;

    /// Token lookup for the recipient-facing gate. `None` when no request
    /// carries the token.
    async fn find_by_token(
        &self,
        token: &SecureToken,
    ) -> Result<Option<RecommendationRequest>, StoreError>;

    /// Compare-and-set write: applies `update` only while the stored
    /// status and next reminder date still equal `expected`.
    async fn update_if(
        &self,
        id: RequestId,
        expected: Expected,
        update: RequestUpdate,
    ) -> Result<CasOutcome, StoreError>;

    /// Requests the sweep must look at: non-terminal and either past the
    /// deadline or carrying a due reminder date.
    async fn sweep_candidates(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<RecommendationRequest>, StoreError>;

    async fn list_all(&self) -> Result<Vec<RecommendationRequest>, StoreError>;
}

/// In-memory reference store. Token lookups go through a secondary index.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<RequestId, RecommendationRequest>>,
    token_index: RwLock<HashMap<String, RequestId>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply_update(record: &mut RecommendationRequest, update: RequestUpdate) {
        if let Some(status) = update.status {
            record.status = status;
        }
        if let Some(sent_at) = update.sent_at {
            record.sent_at = Some(sent_at);
        }
        if let Some(received_at) = update.received_at {
            record.received_at = Some(received_at);
        }
        if let Some(last) = update.last_reminder_sent {
            record.last_reminder_sent = Some(last);
        }
        if let Some(next) = update.next_reminder_date {
            record.next_reminder_date = next;
        }
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn insert(&self, request: RecommendationRequest) -> Result<(), StoreError> {
        let mut records = self.records.write();
        if records.contains_key(&request.id) {
            return Err(StoreError::DuplicateId);
        }
        let mut tokens = self.token_index.write();
        let key = request.secure_token.as_str().to_string();
        if tokens.contains_key(&key) {
            return Err(StoreError::DuplicateToken);
        }
        tokens.insert(key, request.id);
        records.insert(request.id, request);
        Ok(())
    }

    async fn get(&self, id: RequestId) -> Result<RecommendationRequest, StoreError> {
        self.records
            .read()
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_token(
        &self,
        token: &SecureToken,
    ) -> Result<Option<RecommendationRequest>, StoreError> {
        let id = match self.token_index.read().get(token.as_str()) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.records.read().get(&id).cloned())
    }

    async fn update_if(
        &self,
        id: RequestId,
        expected: Expected,
        update: RequestUpdate,
    ) -> Result<CasOutcome, StoreError> {
        let mut records = self.records.write();
        let record = records.get_mut(&id).ok_or(StoreError::NotFound)?;

        if record.status != expected.status
            || record.next_reminder_date != expected.next_reminder_date
        {
            return Ok(CasOutcome::Stale);
        }

        Self::apply_update(record, update);
        Ok(CasOutcome::Updated)
    }

    async fn sweep_candidates(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<RecommendationRequest>, StoreError> {
        let records = self.records.read();
        let mut out: Vec<_> = records
            .values()
            .filter(|r| !r.status.is_terminal())
            .filter(|r| {
                r.deadline < now || matches!(r.next_reminder_date, Some(next) if next <= now)
            })
            .cloned()
            .collect();
        // Deterministic processing order for reproducible ticks.
        out.sort_by_key(|r| (r.deadline, r.id));
        Ok(out)
    }

    async fn list_all(&self) -> Result<Vec<RecommendationRequest>, StoreError> {
        let records = self.records.read();
        let mut out: Vec<_> = records.values().cloned().collect();
        out.sort_by_key(|r| (r.created_at, r.id));
        Ok(out)
    }
}
