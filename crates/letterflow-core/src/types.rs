use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudentId(pub Uuid);

impl StudentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecipientId(pub Uuid);

impl RecipientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub Uuid);

impl ApplicationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScholarshipId(pub Uuid);

impl ScholarshipId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

/// Which submission channel(s) a request may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    DirectPlatform,
    SchoolDirect,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionMethod {
    PlatformOnly,
    SchoolOnly,
    Both,
}

impl SubmissionMethod {
    /// A method is only valid for request types that open its channel(s).
    pub fn permitted_for(self, request_type: RequestType) -> bool {
        match self {
            SubmissionMethod::PlatformOnly => matches!(
                request_type,
                RequestType::DirectPlatform | RequestType::Hybrid
            ),
            SubmissionMethod::SchoolOnly => {
                matches!(request_type, RequestType::SchoolDirect | RequestType::Hybrid)
            }
            SubmissionMethod::Both => matches!(request_type, RequestType::Hybrid),
        }
    }

    pub fn uses_school_channel(self) -> bool {
        matches!(self, SubmissionMethod::SchoolOnly | SubmissionMethod::Both)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunicationStyle {
    Formal,
    Polite,
    Friendly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderFrequency {
    Minimal,
    Standard,
    Aggressive,
    Custom,
}

impl Default for ReminderFrequency {
    fn default() -> Self {
        ReminderFrequency::Standard
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Sent,
    Received,
    Overdue,
    Cancelled,
}

impl RequestStatus {
    /// Terminal statuses never re-open.
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Received | RequestStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Sent => "sent",
            RequestStatus::Received => "received",
            RequestStatus::Overdue => "overdue",
            RequestStatus::Cancelled => "cancelled",
        }
    }
}
