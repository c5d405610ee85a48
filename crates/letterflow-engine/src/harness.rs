//! Seeded lifecycle simulation
//!
//! Drives the whole engine through the public API: a seeded population of
//! requests, day-by-day sweep ticks, randomized recipient actions and
//! injected dispatch failures. Invariants are checked after every tick and
//! the audit chain at the end, so a seed that trips one reproduces it.

use crate::access::AccessGate;
use crate::audit::AuditLog;
use crate::notify::RecordingNotifier;
use crate::service::RequestService;
use crate::store::{MemoryStore, RequestStore};
use crate::sweep::{Sweep, SweepConfig, SweepReport};
use chrono::{DateTime, Duration, Utc};
use letterflow_core::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Requests to create up front
    pub requests: usize,
    /// Simulated days (one sweep tick per day)
    pub days: i64,
    /// Sweep worker bound
    pub concurrency: usize,
    /// Chance per open request per day of a recipient/student action
    pub action_rate: f64,
    /// Chance per request per day of the dispatcher failing for it
    pub failure_rate: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            requests: 50,
            days: 30,
            concurrency: 8,
            action_rate: 0.10,
            failure_rate: 0.05,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimReport {
    pub ticks: i64,
    pub created: usize,
    pub totals: SweepReport,
    pub final_statuses: BTreeMap<&'static str, usize>,
    pub audit_events: usize,
    pub violations: Vec<String>,
}

impl SimReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn generate_text(&self) -> String {
        let mut out = String::new();
        out.push_str("Simulation Report\n");
        out.push_str("=================\n");
        out.push_str(&format!("Ticks run:          {}\n", self.ticks));
        out.push_str(&format!("Requests created:   {}\n", self.created));
        out.push_str(&format!("Marked overdue:     {}\n", self.totals.marked_overdue));
        out.push_str(&format!("Reminders sent:     {}\n", self.totals.reminders_sent));
        out.push_str(&format!("Dispatch failures:  {}\n", self.totals.dispatch_failures));
        out.push_str(&format!("Stale skips:        {}\n", self.totals.skipped_stale));
        out.push_str(&format!("Audit events:       {}\n", self.audit_events));
        out.push_str("Final statuses:\n");
        for (status, count) in &self.final_statuses {
            out.push_str(&format!("  {status:<10} {count}\n"));
        }
        if self.violations.is_empty() {
            out.push_str("Violations:         none\n");
        } else {
            out.push_str(&format!("Violations:         {}\n", self.violations.len()));
            for v in &self.violations {
                out.push_str(&format!("  - {v}\n"));
            }
        }
        out
    }
}

struct Seeded {
    id: RequestId,
    token: String,
}

/// Run the full simulation. One tick per simulated day.
pub async fn run_simulation(config: SimConfig) -> SimReport {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let base = Utc::now();

    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let audit = Arc::new(AuditLog::new());
    let service = RequestService::new(store.clone(), notifier.clone(), audit.clone());
    let gate = AccessGate::new(store.clone(), audit.clone());
    let sweep = Sweep::new(
        store.clone(),
        notifier.clone(),
        audit.clone(),
        SweepConfig {
            concurrency: config.concurrency,
            dry_run: false,
        },
    );

    let mut report = SimReport::default();
    let mut population = Vec::with_capacity(config.requests);

    for _ in 0..config.requests {
        let input = random_request(&mut rng, base, config.days);
        match service.create(input, base).await {
            Ok(request) => {
                population.push(Seeded {
                    id: request.id,
                    token: request.secure_token.as_str().to_string(),
                });
                report.created += 1;
            }
            Err(err) => report.violations.push(format!("creation failed: {err}")),
        }
    }

    // Terminal statuses observed so far; once set they must never change.
    let mut terminals: HashMap<RequestId, RequestStatus> = HashMap::new();

    for day in 1..=config.days {
        let now = base + Duration::days(day);

        // Flip dispatch failures for this day.
        for seeded in &population {
            if rng.gen_bool(config.failure_rate) {
                notifier.fail_for(seeded.id);
            } else {
                notifier.heal(seeded.id);
            }
        }

        match sweep.run_once(now).await {
            Ok(tick) => {
                report.ticks += 1;
                report.totals.scanned += tick.scanned;
                report.totals.marked_overdue += tick.marked_overdue;
                report.totals.reminders_sent += tick.reminders_sent;
                report.totals.dispatch_failures += tick.dispatch_failures;
                report.totals.skipped_stale += tick.skipped_stale;
            }
            Err(err) => report.violations.push(format!("tick {day}: {err}")),
        }

        // Randomized recipient/student activity after the tick.
        for seeded in &population {
            if !rng.gen_bool(config.action_rate) {
                continue;
            }
            let result = match rng.gen_range(0..3) {
                0 => gate.mark_sent(&seeded.token, now).await.map(|_| ()),
                1 => gate.mark_received(&seeded.token, now).await.map(|_| ()),
                _ => service.cancel(seeded.id, now).await.map(|_| ()),
            };
            // Rule violations are the expected outcome for many random
            // actions; only conflicts that should not happen are recorded.
            if let Err(crate::error::EngineError::Store(err)) = result {
                report.violations.push(format!("store failure: {err}"));
            }
        }

        check_invariants(&*store, &mut terminals, now, &mut report.violations).await;
    }

    if let Err(err) = audit.verify_integrity() {
        report.violations.push(format!("audit: {err}"));
    }
    report.audit_events = audit.len();

    // No request may receive more reminders than it has day-marks.
    if let Ok(all) = store.list_all().await {
        for request in &all {
            let reminders = notifier
                .sent()
                .iter()
                .filter(|n| {
                    n.request_id == request.id
                        && matches!(n.kind, crate::notify::TemplateKind::Reminder)
                })
                .count();
            if reminders > request.reminder_intervals.len() {
                report.violations.push(format!(
                    "request {:?}: {} reminders for {} marks",
                    request.id,
                    reminders,
                    request.reminder_intervals.len()
                ));
            }
        }
        for request in all {
            *report
                .final_statuses
                .entry(request.status.as_str())
                .or_insert(0) += 1;
        }
    }

    report
}

async fn check_invariants(
    store: &dyn RequestStore,
    terminals: &mut HashMap<RequestId, RequestStatus>,
    now: DateTime<Utc>,
    violations: &mut Vec<String>,
) {
    let all = match store.list_all().await {
        Ok(all) => all,
        Err(err) => {
            violations.push(format!("list_all failed: {err}"));
            return;
        }
    };

    for request in all {
        if (request.status == RequestStatus::Received) != request.received_at.is_some() {
            violations.push(format!(
                "request {:?}: received_at inconsistent with status {}",
                request.id,
                request.status.as_str()
            ));
        }
        if request.token_expires_at < request.deadline {
            violations.push(format!(
                "request {:?}: token expires before the deadline",
                request.id
            ));
        }
        if let Some(next) = request.next_reminder_date {
            if next > request.deadline {
                violations.push(format!(
                    "request {:?}: reminder scheduled after the deadline",
                    request.id
                ));
            }
        }
        if let Some(&terminal) = terminals.get(&request.id) {
            if request.status != terminal {
                violations.push(format!(
                    "request {:?}: terminal status {} changed to {} at {}",
                    request.id,
                    terminal.as_str(),
                    request.status.as_str(),
                    now
                ));
            }
        } else if request.status.is_terminal() {
            terminals.insert(request.id, request.status);
        }
    }
}

fn random_request(rng: &mut StdRng, base: DateTime<Utc>, horizon_days: i64) -> NewRequest {
    let deadline = base + Duration::days(rng.gen_range(1..=horizon_days.max(2)));
    let (request_type, submission_method, school_email) = match rng.gen_range(0..3) {
        0 => (
            RequestType::DirectPlatform,
            SubmissionMethod::PlatformOnly,
            None,
        ),
        1 => (
            RequestType::SchoolDirect,
            SubmissionMethod::SchoolOnly,
            Some("records@institution.edu".to_string()),
        ),
        _ => (
            RequestType::Hybrid,
            SubmissionMethod::Both,
            Some("records@institution.edu".to_string()),
        ),
    };
    let reminder_frequency = match rng.gen_range(0..4) {
        0 => ReminderFrequency::Minimal,
        1 => ReminderFrequency::Standard,
        2 => ReminderFrequency::Aggressive,
        _ => ReminderFrequency::Custom,
    };
    let reminder_intervals = if reminder_frequency == ReminderFrequency::Custom {
        vec![rng.gen_range(0..20), rng.gen_range(0..20), rng.gen_range(0..20)]
    } else {
        Vec::new()
    };

    NewRequest {
        student_id: StudentId::new(),
        recipient_id: RecipientId::new(),
        application_id: None,
        scholarship_id: None,
        title: format!("Letter request #{}", rng.gen_range(1000..9999)),
        description: "Recommendation letter for an application".to_string(),
        deadline,
        priority: match rng.gen_range(0..3) {
            0 => Priority::Low,
            1 => Priority::Medium,
            _ => Priority::High,
        },
        request_type,
        submission_method,
        school_email,
        school_instructions: None,
        institution_name: Some("Example University".to_string()),
        include_draft: false,
        draft_content: None,
        communication_style: CommunicationStyle::Polite,
        relationship_context: "Course instructor".to_string(),
        additional_context: None,
        reminder_frequency,
        reminder_intervals,
    }
}
