//! The recommendation request record
//!
//! One request asks one recipient for one letter on behalf of one student,
//! optionally tied to an application or scholarship. `NewRequest` is the
//! creation input; validation runs before anything is persisted.

use crate::error::ValidationError;
use crate::reminder;
use crate::token::{SecureToken, TokenConfig};
use crate::types::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub id: RequestId,
    pub student_id: StudentId,
    pub recipient_id: RecipientId,
    pub application_id: Option<ApplicationId>,
    pub scholarship_id: Option<ScholarshipId>,

    pub title: String,
    pub description: String,
    pub deadline: DateTime<Utc>,
    pub priority: Priority,

    pub request_type: RequestType,
    pub submission_method: SubmissionMethod,
    pub school_email: Option<String>,
    pub school_instructions: Option<String>,
    pub institution_name: Option<String>,

    pub include_draft: bool,
    pub draft_content: Option<String>,
    pub communication_style: CommunicationStyle,
    pub relationship_context: String,
    pub additional_context: Option<String>,

    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    /// Set exactly once, on the first transition into `Sent`.
    pub sent_at: Option<DateTime<Utc>>,
    /// Set exactly once, on the transition into `Received`.
    pub received_at: Option<DateTime<Utc>>,

    /// Normalized day-marks: sorted descending, deduplicated.
    pub reminder_intervals: Vec<u32>,
    pub reminder_frequency: ReminderFrequency,
    pub last_reminder_sent: Option<DateTime<Utc>>,
    pub next_reminder_date: Option<DateTime<Utc>>,

    pub secure_token: SecureToken,
    pub token_expires_at: DateTime<Utc>,
}

impl RecommendationRequest {
    /// Derived read view: past-deadline requests read as overdue even
    /// before the sweep has persisted the transition. Display only -
    /// business decisions trust the persisted `status`.
    pub fn effective_status(&self, now: DateTime<Utc>) -> RequestStatus {
        if !self.status.is_terminal() && self.deadline < now {
            RequestStatus::Overdue
        } else {
            self.status
        }
    }

    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        self.deadline < now
    }

    pub fn reminder_due(&self, now: DateTime<Utc>) -> bool {
        reminder::is_due(self.next_reminder_date, now)
    }

    /// Bookkeeping after a confirmed reminder dispatch. Callers must only
    /// invoke this once the notification collaborator has accepted the send.
    pub fn mark_reminder_sent(&mut self, now: DateTime<Utc>) {
        self.last_reminder_sent = Some(now);
        self.next_reminder_date = reminder::advance(self.deadline, &self.reminder_intervals, now);
    }
}

/// Creation input for a request. Everything the student workflow supplies;
/// the lifecycle fields (status, token, schedule) are derived here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRequest {
    pub student_id: StudentId,
    pub recipient_id: RecipientId,
    pub application_id: Option<ApplicationId>,
    pub scholarship_id: Option<ScholarshipId>,

    pub title: String,
    pub description: String,
    pub deadline: DateTime<Utc>,
    pub priority: Priority,

    pub request_type: RequestType,
    pub submission_method: SubmissionMethod,
    pub school_email: Option<String>,
    pub school_instructions: Option<String>,
    pub institution_name: Option<String>,

    pub include_draft: bool,
    pub draft_content: Option<String>,
    pub communication_style: CommunicationStyle,
    pub relationship_context: String,
    pub additional_context: Option<String>,

    pub reminder_frequency: ReminderFrequency,
    /// Explicit day-marks; empty means "use the frequency's default set".
    pub reminder_intervals: Vec<u32>,
}

impl NewRequest {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyField("title"));
        }
        if self.description.trim().is_empty() {
            return Err(ValidationError::EmptyField("description"));
        }
        if self.relationship_context.trim().is_empty() {
            return Err(ValidationError::EmptyField("relationship_context"));
        }
        if !self.submission_method.permitted_for(self.request_type) {
            return Err(ValidationError::ChannelMismatch {
                method: self.submission_method,
                request_type: self.request_type,
            });
        }
        if self.include_draft
            && self
                .draft_content
                .as_deref()
                .map_or(true, |d| d.trim().is_empty())
        {
            return Err(ValidationError::MissingDraftContent);
        }
        if self.submission_method.uses_school_channel()
            && self
                .school_email
                .as_deref()
                .map_or(true, |e| e.trim().is_empty())
        {
            return Err(ValidationError::MissingSchoolEmail);
        }
        if self.deadline <= now {
            return Err(ValidationError::DeadlineInPast(self.deadline));
        }
        Ok(())
    }

    /// Validate and materialize the full record: normalized schedule, first
    /// reminder date, fresh secure token with its expiry floor.
    pub fn into_request(
        self,
        now: DateTime<Utc>,
        token_config: &TokenConfig,
    ) -> Result<RecommendationRequest, ValidationError> {
        self.validate(now)?;

        let intervals =
            reminder::effective_intervals(self.reminder_frequency, &self.reminder_intervals);
        let next_reminder_date = reminder::next_reminder_date(self.deadline, &intervals, now);
        let token_expires_at = token_config.expiry_for(self.deadline, now);

        Ok(RecommendationRequest {
            id: RequestId::new(),
            student_id: self.student_id,
            recipient_id: self.recipient_id,
            application_id: self.application_id,
            scholarship_id: self.scholarship_id,
            title: self.title,
            description: self.description,
            deadline: self.deadline,
            priority: self.priority,
            request_type: self.request_type,
            submission_method: self.submission_method,
            school_email: self.school_email,
            school_instructions: self.school_instructions,
            institution_name: self.institution_name,
            include_draft: self.include_draft,
            draft_content: self.draft_content,
            communication_style: self.communication_style,
            relationship_context: self.relationship_context,
            additional_context: self.additional_context,
            status: RequestStatus::Pending,
            created_at: now,
            sent_at: None,
            received_at: None,
            reminder_intervals: intervals,
            reminder_frequency: self.reminder_frequency,
            last_reminder_sent: None,
            next_reminder_date,
            secure_token: SecureToken::issue(),
            token_expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn sample_new_request(deadline: DateTime<Utc>) -> NewRequest {
        NewRequest {
            student_id: StudentId::new(),
            recipient_id: RecipientId::new(),
            application_id: None,
            scholarship_id: None,
            title: "Letter for MSc application".to_string(),
            description: "Recommendation letter for the MSc CS application".to_string(),
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
            relationship_context: "Thesis advisor for two years".to_string(),
            additional_context: None,
            reminder_frequency: ReminderFrequency::Standard,
            reminder_intervals: Vec::new(),
        }
    }

    #[test]
    fn creation_computes_first_reminder_and_token_floor() {
        let now = Utc::now();
        let request = sample_new_request(now + Duration::days(10))
            .into_request(now, &TokenConfig::default())
            .unwrap();

        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.next_reminder_date, Some(now + Duration::days(3)));
        assert_eq!(request.reminder_intervals, vec![7, 3, 1]);
        assert!(request.token_expires_at >= request.deadline);
        assert!(request.sent_at.is_none());
        assert!(request.received_at.is_none());
    }

    #[test]
    fn creation_normalizes_explicit_intervals() {
        let now = Utc::now();
        let mut input = sample_new_request(now + Duration::days(20));
        input.reminder_frequency = ReminderFrequency::Custom;
        input.reminder_intervals = vec![1, 14, 7, 14];

        let request = input.into_request(now, &TokenConfig::default()).unwrap();
        assert_eq!(request.reminder_intervals, vec![14, 7, 1]);
        assert_eq!(request.next_reminder_date, Some(now + Duration::days(6)));
    }

    #[test]
    fn validation_rejects_blank_relationship_context() {
        let now = Utc::now();
        let mut input = sample_new_request(now + Duration::days(5));
        input.relationship_context = "   ".to_string();
        assert_eq!(
            input.validate(now),
            Err(ValidationError::EmptyField("relationship_context"))
        );
    }

    #[test]
    fn validation_rejects_channel_mismatch() {
        let now = Utc::now();
        let mut input = sample_new_request(now + Duration::days(5));
        input.request_type = RequestType::SchoolDirect;
        input.submission_method = SubmissionMethod::PlatformOnly;
        assert!(matches!(
            input.validate(now),
            Err(ValidationError::ChannelMismatch { .. })
        ));
    }

    #[test]
    fn validation_requires_school_email_for_school_channel() {
        let now = Utc::now();
        let mut input = sample_new_request(now + Duration::days(5));
        input.request_type = RequestType::SchoolDirect;
        input.submission_method = SubmissionMethod::SchoolOnly;
        input.school_email = None;
        assert_eq!(input.validate(now), Err(ValidationError::MissingSchoolEmail));

        input.school_email = Some("registrar@university.edu".to_string());
        assert!(input.validate(now).is_ok());
    }

    #[test]
    fn validation_requires_draft_content_when_included() {
        let now = Utc::now();
        let mut input = sample_new_request(now + Duration::days(5));
        input.include_draft = true;
        input.draft_content = None;
        assert_eq!(input.validate(now), Err(ValidationError::MissingDraftContent));
    }

    #[test]
    fn validation_rejects_past_deadline() {
        let now = Utc::now();
        let input = sample_new_request(now - Duration::days(1));
        assert!(matches!(
            input.validate(now),
            Err(ValidationError::DeadlineInPast(_))
        ));
    }

    #[test]
    fn effective_status_derives_overdue_without_persisting() {
        let now = Utc::now();
        let mut request = sample_new_request(now + Duration::days(2))
            .into_request(now, &TokenConfig::default())
            .unwrap();

        let later = now + Duration::days(3);
        assert_eq!(request.effective_status(later), RequestStatus::Overdue);
        // Persisted field untouched by the read view.
        assert_eq!(request.status, RequestStatus::Pending);

        request.status = RequestStatus::Received;
        request.received_at = Some(now);
        assert_eq!(request.effective_status(later), RequestStatus::Received);
    }

    #[test]
    fn mark_reminder_sent_advances_the_schedule() {
        let now = Utc::now();
        let mut request = sample_new_request(now + Duration::days(7))
            .into_request(now, &TokenConfig::default())
            .unwrap();
        // 7-day mark is due immediately.
        assert!(request.reminder_due(now));

        request.mark_reminder_sent(now);
        assert_eq!(request.last_reminder_sent, Some(now));
        assert_eq!(request.next_reminder_date, Some(now + Duration::days(4)));
        assert!(!request.reminder_due(now));
    }
}
