use anyhow::Result;
use clap::{Parser, Subcommand};
use letterflow_engine::harness::{run_simulation, SimConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "letterflow", version, about = "Recommendation-request lifecycle engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a seeded lifecycle simulation
    Simulate {
        /// Number of requests to create
        #[arg(long, default_value_t = 50)]
        requests: usize,
        /// Simulated days (one sweep tick per day)
        #[arg(long, default_value_t = 30)]
        days: i64,
        /// Random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Sweep worker bound
        #[arg(long, default_value_t = 8)]
        concurrency: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a single sweep tick against a seeded store
    Sweep {
        /// Scan and decide without writing or dispatching
        #[arg(long)]
        dry_run: bool,
        /// Number of requests to seed
        #[arg(long, default_value_t = 20)]
        requests: usize,
        /// Random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Run a short simulation and verify the audit chain
    ValidateLog {
        /// Random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Simulate {
            requests,
            days,
            seed,
            concurrency,
            json,
        } => {
            let report = run_simulation(SimConfig {
                seed,
                requests,
                days,
                concurrency,
                ..Default::default()
            })
            .await;

            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "ticks": report.ticks,
                        "created": report.created,
                        "totals": report.totals,
                        "final_statuses": report.final_statuses,
                        "audit_events": report.audit_events,
                        "violations": report.violations,
                    })
                );
            } else {
                println!("{}", report.generate_text());
            }
            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        Command::Sweep {
            dry_run,
            requests,
            seed,
        } => {
            let report = single_tick(requests, seed, dry_run).await?;
            println!("Sweep tick ({})", if dry_run { "dry run" } else { "live" });
            println!("  Scanned:           {}", report.scanned);
            println!("  Marked overdue:    {}", report.marked_overdue);
            println!("  Reminders sent:    {}", report.reminders_sent);
            println!("  Dispatch failures: {}", report.dispatch_failures);
            println!("  Stale skips:       {}", report.skipped_stale);
        }
        Command::ValidateLog { seed } => {
            let report = run_simulation(SimConfig {
                seed,
                requests: 10,
                days: 10,
                ..Default::default()
            })
            .await;
            let valid = report
                .violations
                .iter()
                .all(|v| !v.starts_with("audit:"));
            println!(
                "Audit chain: {} ({} events)",
                if valid { "VALID" } else { "INVALID" },
                report.audit_events
            );
            std::process::exit(if valid { 0 } else { 1 });
        }
    }
    Ok(())
}

/// Seed a store the way the simulator does, then run exactly one tick.
async fn single_tick(
    requests: usize,
    seed: u64,
    dry_run: bool,
) -> Result<letterflow_engine::SweepReport> {
    use chrono::{Duration, Utc};
    use letterflow_engine::{
        AuditLog, LogNotifier, MemoryStore, RequestService, Sweep, SweepConfig,
    };
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::Arc;

    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(LogNotifier);
    let audit = Arc::new(AuditLog::new());
    let service = RequestService::new(store.clone(), notifier.clone(), audit.clone());

    // Deadlines around "a week out" so a first tick has work to do.
    let now = Utc::now();
    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..requests {
        let days = rng.gen_range(1..14);
        let input = sample_request(now + Duration::days(days));
        service.create(input, now).await?;
    }

    let sweep = Sweep::new(
        store,
        notifier,
        audit,
        SweepConfig {
            dry_run,
            ..Default::default()
        },
    );
    Ok(sweep.run_once(now + Duration::days(7)).await?)
}

fn sample_request(deadline: chrono::DateTime<chrono::Utc>) -> letterflow_core::NewRequest {
    use letterflow_core::*;
    NewRequest {
        student_id: StudentId::new(),
        recipient_id: RecipientId::new(),
        application_id: None,
        scholarship_id: None,
        title: "Recommendation letter".to_string(),
        description: "Letter for an application".to_string(),
        deadline,
        priority: Priority::Medium,
        request_type: RequestType::DirectPlatform,
        submission_method: SubmissionMethod::PlatformOnly,
        school_email: None,
        school_instructions: None,
        institution_name: None,
        include_draft: false,
        draft_content: None,
        communication_style: CommunicationStyle::Polite,
        relationship_context: "Academic advisor".to_string(),
        additional_context: None,
        reminder_frequency: ReminderFrequency::Standard,
        reminder_intervals: Vec::new(),
    }
}
