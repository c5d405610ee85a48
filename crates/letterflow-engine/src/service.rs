//! Student-facing request operations
//!
//! Creation runs validation, computes the first reminder date, issues the
//! secure token and persists the record before the initial notice goes out.
//! Cancellation is a normal transition with a conditional write, so it
//! cannot trample a concurrent sweep or recipient action.

use crate::audit::{AuditAction, AuditLog};
use crate::error::EngineError;
use crate::notify::{Notice, Notifier, TemplateKind};
use crate::store::{CasOutcome, Expected, RequestStore, RequestUpdate};
use chrono::{DateTime, Utc};
use letterflow_core::{state_machine, NewRequest, RecommendationRequest, RequestId};
use letterflow_core::{RequestStatus, TokenConfig};
use std::sync::Arc;

/// How often a conditional write is retried before giving up. Each retry
/// re-reads the record, so a genuine conflict surfaces quickly.
const WRITE_ATTEMPTS: usize = 3;

pub struct RequestService {
    store: Arc<dyn RequestStore>,
    notifier: Arc<dyn Notifier>,
    audit: Arc<AuditLog>,
    token_config: TokenConfig,
}

impl RequestService {
    pub fn new(
        store: Arc<dyn RequestStore>,
        notifier: Arc<dyn Notifier>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            store,
            notifier,
            audit,
            token_config: TokenConfig::default(),
        }
    }

    pub fn with_token_config(mut self, token_config: TokenConfig) -> Self {
        self.token_config = token_config;
        self
    }

    /// Validate, persist and announce a new request.
    ///
    /// The record is durable before the initial notice is attempted; a
    /// failed dispatch is logged and the request stands, with the sweep's
    /// reminder schedule still intact.
    pub async fn create(
        &self,
        input: NewRequest,
        now: DateTime<Utc>,
    ) -> Result<RecommendationRequest, EngineError> {
        let request = input.into_request(now, &self.token_config)?;
        self.store.insert(request.clone()).await?;
        self.audit.record(
            now,
            request.id,
            AuditAction::RequestCreated,
            format!(
                "deadline={} token={}",
                request.deadline,
                request.secure_token.fingerprint()
            ),
        );

        let notice = initial_notice(&request);
        if let Err(err) = self.notifier.send(&notice).await {
            tracing::warn!(
                request_id = %request.id.0,
                error = %err,
                "initial notice failed, request stands"
            );
        }

        tracing::info!(
            request_id = %request.id.0,
            status = request.status.as_str(),
            "request created"
        );
        Ok(request)
    }

    /// Student cancellation. Legal from any non-terminal status; the write
    /// is conditional so a race with the sweep or the recipient resolves to
    /// whichever side committed first.
    pub async fn cancel(
        &self,
        id: RequestId,
        now: DateTime<Utc>,
    ) -> Result<RecommendationRequest, EngineError> {
        for _ in 0..WRITE_ATTEMPTS {
            let mut request = self.store.get(id).await?;
            let expected = Expected::of(&request);

            state_machine::apply(&mut request, RequestStatus::Cancelled, now)?;

            let outcome = self
                .store
                .update_if(
                    id,
                    expected,
                    RequestUpdate {
                        status: Some(RequestStatus::Cancelled),
                        ..Default::default()
                    },
                )
                .await?;

            if outcome == CasOutcome::Updated {
                self.audit.record(
                    now,
                    id,
                    AuditAction::StatusChanged,
                    format!("{} -> cancelled", expected.status.as_str()),
                );
                tracing::info!(request_id = %id.0, "request cancelled");
                return Ok(request);
            }
            // Lost the race; re-read and re-validate against the new state.
        }
        Err(EngineError::Conflict(id))
    }
}

fn initial_notice(request: &RecommendationRequest) -> Notice {
    Notice {
        request_id: request.id,
        recipient: request.recipient_id,
        school_email: request.school_email.clone(),
        kind: TemplateKind::InitialRequest,
        payload: serde_json::json!({
            "title": request.title,
            "deadline": request.deadline,
            "priority": request.priority,
            "communication_style": request.communication_style,
            "relationship_context": request.relationship_context,
            "include_draft": request.include_draft,
        }),
    }
}
