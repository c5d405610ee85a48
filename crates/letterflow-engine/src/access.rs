//! Token-gated recipient actions
//!
//! The recipient holds a secure token, not a session. Every action
//! re-validates the token; it stays usable for repeated interactions until
//! expiry or a terminal status. Callers surface every failure as the same
//! generic denial - the precise reason lives in the server-side log only.

use crate::audit::{AuditAction, AuditLog};
use crate::error::EngineError;
use crate::store::{CasOutcome, Expected, RequestStore, RequestUpdate};
use chrono::{DateTime, Utc};
use letterflow_core::{state_machine, AccessError, RecommendationRequest, SecureToken};
use letterflow_core::RequestStatus;
use std::sync::Arc;

const WRITE_ATTEMPTS: usize = 3;

pub struct AccessGate {
    store: Arc<dyn RequestStore>,
    audit: Arc<AuditLog>,
}

impl AccessGate {
    pub fn new(store: Arc<dyn RequestStore>, audit: Arc<AuditLog>) -> Self {
        Self { store, audit }
    }

    /// Validate a raw token string and return the request it grants.
    ///
    /// Shape check first - malformed input never reaches the store, so
    /// probing with garbage reveals nothing about existing tokens.
    pub async fn validate(
        &self,
        raw_token: &str,
        now: DateTime<Utc>,
    ) -> Result<RecommendationRequest, EngineError> {
        let token = match SecureToken::parse(raw_token) {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!(reason = %err, "recipient access denied");
                return Err(err.into());
            }
        };

        let request = match self.store.find_by_token(&token).await? {
            Some(request) => request,
            None => {
                tracing::warn!(
                    token = %token.fingerprint(),
                    "recipient access denied: unknown token"
                );
                return Err(AccessError::TokenNotFound.into());
            }
        };

        let denial = if now > request.token_expires_at {
            Some(AccessError::TokenExpired(request.token_expires_at))
        } else if request.status == RequestStatus::Cancelled {
            Some(AccessError::RequestCancelled)
        } else {
            None
        };

        if let Some(err) = denial {
            self.audit.record(
                now,
                request.id,
                AuditAction::AccessDenied,
                format!("token={} reason={}", token.fingerprint(), err),
            );
            tracing::warn!(
                request_id = %request.id.0,
                token = %token.fingerprint(),
                reason = %err,
                "recipient access denied"
            );
            return Err(err.into());
        }

        self.audit.record(
            now,
            request.id,
            AuditAction::AccessGranted,
            format!("token={}", token.fingerprint()),
        );
        Ok(request)
    }

    /// Recipient confirms the letter went out (platform or school channel).
    pub async fn mark_sent(
        &self,
        raw_token: &str,
        now: DateTime<Utc>,
    ) -> Result<RecommendationRequest, EngineError> {
        self.transition(raw_token, RequestStatus::Sent, now).await
    }

    /// Recipient (or institution) confirms the letter arrived.
    pub async fn mark_received(
        &self,
        raw_token: &str,
        now: DateTime<Utc>,
    ) -> Result<RecommendationRequest, EngineError> {
        self.transition(raw_token, RequestStatus::Received, now)
            .await
    }

    async fn transition(
        &self,
        raw_token: &str,
        to: RequestStatus,
        now: DateTime<Utc>,
    ) -> Result<RecommendationRequest, EngineError> {
        for _ in 0..WRITE_ATTEMPTS {
            // Re-validation on every attempt: the request may have been
            // cancelled or completed since the last read.
            let mut request = self.validate(raw_token, now).await?;
            let expected = Expected::of(&request);
            let from = request.status;

            state_machine::apply(&mut request, to, now)?;

            let outcome = self
                .store
                .update_if(
                    request.id,
                    expected,
                    RequestUpdate {
                        status: Some(to),
                        sent_at: request.sent_at.filter(|_| to == RequestStatus::Sent),
                        received_at: request
                            .received_at
                            .filter(|_| to == RequestStatus::Received),
                        ..Default::default()
                    },
                )
                .await?;

            if outcome == CasOutcome::Updated {
                self.audit.record(
                    now,
                    request.id,
                    AuditAction::StatusChanged,
                    format!("{} -> {}", from.as_str(), to.as_str()),
                );
                tracing::info!(
                    request_id = %request.id.0,
                    from = from.as_str(),
                    to = to.as_str(),
                    "recipient transition applied"
                );
                return Ok(request);
            }
        }
        Err(EngineError::Conflict(
            self.validate(raw_token, now).await?.id,
        ))
    }
}
