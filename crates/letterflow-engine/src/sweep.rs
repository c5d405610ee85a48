//! Reconciliation sweep
//!
//! One tick scans every candidate request and, per request in order:
//! first persists the overdue transition when the deadline has passed, then
//! dispatches a due reminder. Both can happen for the same request in the
//! same tick.
//!
//! Correctness rules enforced here:
//! - reminder bookkeeping advances only after a confirmed dispatch;
//! - a failure for one request never aborts the tick;
//! - every write is a compare-and-set against the values the decision was
//!   computed from, so overlapping work (cancellation, recipient actions,
//!   a racing tick) resolves to a counted skip instead of a double send;
//! - a second tick refuses to start while one is running.

use crate::audit::{AuditAction, AuditLog};
use crate::error::SweepError;
use crate::notify::{Notice, Notifier, TemplateKind};
use crate::store::{CasOutcome, Expected, RequestStore, RequestUpdate};
use chrono::{DateTime, Utc};
use letterflow_core::{reminder, RecommendationRequest, RequestStatus};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Maximum requests processed concurrently within a tick.
    pub concurrency: usize,
    /// Scan and decide, but write nothing and dispatch nothing.
    pub dry_run: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            dry_run: false,
        }
    }
}

/// Aggregate outcome of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub scanned: usize,
    pub marked_overdue: usize,
    pub reminders_sent: usize,
    pub dispatch_failures: usize,
    /// Conditional writes lost to concurrent activity.
    pub skipped_stale: usize,
}

impl SweepReport {
    fn absorb(&mut self, outcome: RequestOutcome) {
        self.scanned += 1;
        if outcome.marked_overdue {
            self.marked_overdue += 1;
        }
        if outcome.reminder_sent {
            self.reminders_sent += 1;
        }
        if outcome.dispatch_failed {
            self.dispatch_failures += 1;
        }
        if outcome.stale {
            self.skipped_stale += 1;
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct RequestOutcome {
    marked_overdue: bool,
    reminder_sent: bool,
    dispatch_failed: bool,
    stale: bool,
}

pub struct Sweep {
    store: Arc<dyn RequestStore>,
    notifier: Arc<dyn Notifier>,
    audit: Arc<AuditLog>,
    config: SweepConfig,
    tick_guard: Mutex<()>,
}

impl Sweep {
    pub fn new(
        store: Arc<dyn RequestStore>,
        notifier: Arc<dyn Notifier>,
        audit: Arc<AuditLog>,
        config: SweepConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            audit,
            config,
            tick_guard: Mutex::new(()),
        }
    }

    /// Run one tick at `now`.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<SweepReport, SweepError> {
        let _guard = self
            .tick_guard
            .try_lock()
            .map_err(|_| SweepError::TickInProgress)?;

        let candidates = self.store.sweep_candidates(now).await?;
        tracing::info!(candidates = candidates.len(), dry_run = self.config.dry_run, "sweep tick started");

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for request in candidates {
            let permit = semaphore.clone();
            let store = Arc::clone(&self.store);
            let notifier = Arc::clone(&self.notifier);
            let audit = Arc::clone(&self.audit);
            let dry_run = self.config.dry_run;
            tasks.spawn(async move {
                // Holding the permit bounds in-flight requests; each
                // request's own read-decide-write stays sequential.
                let _permit = permit.acquire_owned().await;
                process_request(&*store, &*notifier, &audit, request, now, dry_run).await
            });
        }

        let mut report = SweepReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => report.absorb(outcome),
                Err(err) => {
                    // A panicked worker loses one request for this tick;
                    // the next tick sees it again.
                    tracing::error!(error = %err, "sweep worker failed");
                }
            }
        }

        tracing::info!(
            scanned = report.scanned,
            marked_overdue = report.marked_overdue,
            reminders_sent = report.reminders_sent,
            dispatch_failures = report.dispatch_failures,
            skipped_stale = report.skipped_stale,
            "sweep tick finished"
        );
        Ok(report)
    }
}

/// Per-request tick logic. Overdue handling strictly precedes the reminder
/// check, and both may act in the same pass.
async fn process_request(
    store: &dyn RequestStore,
    notifier: &dyn Notifier,
    audit: &AuditLog,
    mut request: RecommendationRequest,
    now: DateTime<Utc>,
    dry_run: bool,
) -> RequestOutcome {
    let mut outcome = RequestOutcome::default();

    if request.status.is_terminal() {
        return outcome;
    }

    // Step 1: persist the overdue transition.
    if request.is_past_deadline(now) && request.status != RequestStatus::Overdue {
        if dry_run {
            outcome.marked_overdue = true;
        } else {
            let expected = Expected::of(&request);
            let from = request.status;
            match store
                .update_if(
                    request.id,
                    expected,
                    RequestUpdate {
                        status: Some(RequestStatus::Overdue),
                        ..Default::default()
                    },
                )
                .await
            {
                Ok(CasOutcome::Updated) => {
                    request.status = RequestStatus::Overdue;
                    outcome.marked_overdue = true;
                    audit.record(
                        now,
                        request.id,
                        AuditAction::StatusChanged,
                        format!("{} -> overdue", from.as_str()),
                    );
                }
                Ok(CasOutcome::Stale) => {
                    // The record moved under us (cancelled, received, or a
                    // racing tick). Leave it for the next pass.
                    outcome.stale = true;
                    return outcome;
                }
                Err(err) => {
                    tracing::warn!(request_id = %request.id.0, error = %err, "overdue write failed");
                    return outcome;
                }
            }
        }
    }

    // Step 2: reminder emission. Bookkeeping advances only on confirmed
    // dispatch, so a failed send retries at the same mark next tick.
    if request.reminder_due(now) {
        if dry_run {
            outcome.reminder_sent = true;
            return outcome;
        }

        let notice = reminder_notice(&request, now);
        if let Err(err) = notifier.send(&notice).await {
            outcome.dispatch_failed = true;
            tracing::warn!(
                request_id = %request.id.0,
                error = %err,
                "reminder dispatch failed, will retry next tick"
            );
            return outcome;
        }

        let expected = Expected::of(&request);
        let next = reminder::advance(request.deadline, &request.reminder_intervals, now);
        match store
            .update_if(
                request.id,
                expected,
                RequestUpdate {
                    last_reminder_sent: Some(now),
                    next_reminder_date: Some(next),
                    ..Default::default()
                },
            )
            .await
        {
            Ok(CasOutcome::Updated) => {
                outcome.reminder_sent = true;
                audit.record(
                    now,
                    request.id,
                    AuditAction::ReminderSent,
                    match next {
                        Some(next) => format!("next={next}"),
                        None => "schedule exhausted".to_string(),
                    },
                );
            }
            Ok(CasOutcome::Stale) => {
                outcome.stale = true;
            }
            Err(err) => {
                tracing::warn!(request_id = %request.id.0, error = %err, "reminder bookkeeping write failed");
            }
        }
    }

    outcome
}

fn reminder_notice(request: &RecommendationRequest, now: DateTime<Utc>) -> Notice {
    Notice {
        request_id: request.id,
        recipient: request.recipient_id,
        school_email: request.school_email.clone(),
        kind: TemplateKind::Reminder,
        payload: serde_json::json!({
            "title": request.title,
            "deadline": request.deadline,
            "days_remaining": (request.deadline - now).num_days(),
            "status": request.status,
        }),
    }
}
