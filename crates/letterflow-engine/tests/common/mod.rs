use chrono::{DateTime, Duration, Utc};
use letterflow_core::*;
use letterflow_engine::{
    AccessGate, AuditLog, MemoryStore, RecordingNotifier, RequestService, Sweep, SweepConfig,
};
use std::sync::Arc;

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub audit: Arc<AuditLog>,
    pub service: RequestService,
    pub gate: AccessGate,
    pub sweep: Sweep,
}

pub fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let audit = Arc::new(AuditLog::new());
    let service = RequestService::new(store.clone(), notifier.clone(), audit.clone());
    let gate = AccessGate::new(store.clone(), audit.clone());
    let sweep = Sweep::new(
        store.clone(),
        notifier.clone(),
        audit.clone(),
        SweepConfig::default(),
    );
    Fixture {
        store,
        notifier,
        audit,
        service,
        gate,
        sweep,
    }
}

pub fn new_request(deadline: DateTime<Utc>) -> NewRequest {
    NewRequest {
        student_id: StudentId::new(),
        recipient_id: RecipientId::new(),
        application_id: None,
        scholarship_id: None,
        title: "Letter for graduate school".to_string(),
        description: "Recommendation letter for a graduate application".to_string(),
        deadline,
        priority: Priority::High,
        request_type: RequestType::DirectPlatform,
        submission_method: SubmissionMethod::PlatformOnly,
        school_email: None,
        school_instructions: None,
        institution_name: None,
        include_draft: false,
        draft_content: None,
        communication_style: CommunicationStyle::Formal,
        relationship_context: "Research supervisor".to_string(),
        additional_context: None,
        reminder_frequency: ReminderFrequency::Standard,
        reminder_intervals: Vec::new(),
    }
}

pub fn days(n: i64) -> Duration {
    Duration::days(n)
}
