//! Status transition rules
//!
//! Legal moves through the request lifecycle. Overdue is special: it is
//! written by the reconciliation sweep alone, never on direct request.

use crate::error::TransitionError;
use crate::request::RecommendationRequest;
use crate::types::RequestStatus;
use chrono::{DateTime, Utc};

/// Validate a requested status change.
///
/// Same-state requests are an idempotent no-op and always succeed.
pub fn validate_transition(
    from: RequestStatus,
    to: RequestStatus,
) -> Result<(), TransitionError> {
    use RequestStatus::*;

    if from == to {
        return Ok(());
    }
    if from.is_terminal() {
        return Err(TransitionError::Terminal(from));
    }
    match to {
        Overdue => Err(TransitionError::OverdueIsSweepOnly),
        Sent if matches!(from, Pending | Overdue) => Ok(()),
        Received if matches!(from, Pending | Sent | Overdue) => Ok(()),
        Cancelled => Ok(()),
        _ => Err(TransitionError::Illegal { from, to }),
    }
}

/// Statuses reachable from `from` by direct request.
pub fn allowed_transitions(from: RequestStatus) -> Vec<RequestStatus> {
    use RequestStatus::*;
    match from {
        Pending => vec![Sent, Received, Cancelled],
        Sent => vec![Received, Cancelled],
        Overdue => vec![Sent, Received, Cancelled],
        Received => vec![],
        Cancelled => vec![],
    }
}

/// Validate and apply a requested transition, with its data side effects.
///
/// Returns the resulting status. `sent_at` and `received_at` are assigned
/// at most once, on the first entry into their status.
pub fn apply(
    request: &mut RecommendationRequest,
    to: RequestStatus,
    now: DateTime<Utc>,
) -> Result<RequestStatus, TransitionError> {
    validate_transition(request.status, to)?;
    if request.status == to {
        return Ok(to);
    }
    match to {
        RequestStatus::Sent => {
            if request.sent_at.is_none() {
                request.sent_at = Some(now);
            }
        }
        RequestStatus::Received => {
            if request.received_at.is_none() {
                request.received_at = Some(now);
            }
        }
        _ => {}
    }
    request.status = to;
    Ok(to)
}

/// Sweep-only overdue write. Idempotent when the record is already overdue.
///
/// Direct callers must go through [`apply`], which rejects `Overdue`.
pub fn mark_overdue(request: &mut RecommendationRequest) -> Result<(), TransitionError> {
    match request.status {
        RequestStatus::Pending | RequestStatus::Sent => {
            request.status = RequestStatus::Overdue;
            Ok(())
        }
        RequestStatus::Overdue => Ok(()),
        terminal => Err(TransitionError::Terminal(terminal)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::NewRequest;
    use crate::token::TokenConfig;
    use crate::types::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn request_with_status(status: RequestStatus) -> RecommendationRequest {
        let now = Utc::now();
        let mut request = NewRequest {
            student_id: StudentId::new(),
            recipient_id: RecipientId::new(),
            application_id: None,
            scholarship_id: None,
            title: "Letter".to_string(),
            description: "A letter".to_string(),
            deadline: now + Duration::days(10),
            priority: Priority::Medium,
            request_type: RequestType::DirectPlatform,
            submission_method: SubmissionMethod::PlatformOnly,
            school_email: None,
            school_instructions: None,
            institution_name: None,
            include_draft: false,
            draft_content: None,
            communication_style: CommunicationStyle::Polite,
            relationship_context: "Former manager".to_string(),
            additional_context: None,
            reminder_frequency: ReminderFrequency::Standard,
            reminder_intervals: Vec::new(),
        }
        .into_request(now, &TokenConfig::default())
        .unwrap();
        request.status = status;
        request
    }

    const ALL_STATUSES: [RequestStatus; 5] = [
        RequestStatus::Pending,
        RequestStatus::Sent,
        RequestStatus::Received,
        RequestStatus::Overdue,
        RequestStatus::Cancelled,
    ];

    #[test]
    fn same_state_is_a_no_op() {
        for status in ALL_STATUSES {
            assert!(validate_transition(status, status).is_ok());
        }
    }

    #[test]
    fn terminal_states_are_immutable() {
        for terminal in [RequestStatus::Received, RequestStatus::Cancelled] {
            for to in ALL_STATUSES {
                if to == terminal {
                    continue;
                }
                assert!(
                    validate_transition(terminal, to).is_err(),
                    "{terminal:?} -> {to:?} must fail"
                );
            }
        }
    }

    #[test]
    fn sent_requires_pending_or_overdue() {
        assert!(validate_transition(RequestStatus::Pending, RequestStatus::Sent).is_ok());
        assert!(validate_transition(RequestStatus::Overdue, RequestStatus::Sent).is_ok());
    }

    #[test]
    fn received_allowed_from_overdue() {
        // The recipient may still deliver after reminders escalated.
        assert!(validate_transition(RequestStatus::Overdue, RequestStatus::Received).is_ok());
    }

    #[test]
    fn overdue_cannot_be_requested_directly() {
        for from in [RequestStatus::Pending, RequestStatus::Sent] {
            assert_eq!(
                validate_transition(from, RequestStatus::Overdue),
                Err(TransitionError::OverdueIsSweepOnly)
            );
        }
    }

    #[test]
    fn apply_sets_received_at_once() {
        let now = Utc::now();
        let mut request = request_with_status(RequestStatus::Pending);

        apply(&mut request, RequestStatus::Received, now).unwrap();
        assert_eq!(request.status, RequestStatus::Received);
        assert_eq!(request.received_at, Some(now));

        // Terminal now: a later attempt fails and the timestamp holds.
        let later = now + Duration::hours(1);
        assert_eq!(
            apply(&mut request, RequestStatus::Sent, later),
            Err(TransitionError::Terminal(RequestStatus::Received))
        );
        assert_eq!(request.received_at, Some(now));
    }

    #[test]
    fn apply_sets_sent_at_only_on_first_entry() {
        let now = Utc::now();
        let mut request = request_with_status(RequestStatus::Pending);

        apply(&mut request, RequestStatus::Sent, now).unwrap();
        assert_eq!(request.sent_at, Some(now));

        // Sweep pushes it overdue, recipient re-sends later.
        mark_overdue(&mut request).unwrap();
        let later = now + Duration::days(2);
        apply(&mut request, RequestStatus::Sent, later).unwrap();
        assert_eq!(request.sent_at, Some(now));
    }

    #[test]
    fn cancellation_allowed_until_received() {
        for from in [RequestStatus::Pending, RequestStatus::Sent, RequestStatus::Overdue] {
            assert!(validate_transition(from, RequestStatus::Cancelled).is_ok());
        }
        assert!(validate_transition(RequestStatus::Received, RequestStatus::Cancelled).is_err());
    }

    #[test]
    fn mark_overdue_is_idempotent_and_respects_terminals() {
        let mut request = request_with_status(RequestStatus::Pending);
        mark_overdue(&mut request).unwrap();
        assert_eq!(request.status, RequestStatus::Overdue);
        mark_overdue(&mut request).unwrap();
        assert_eq!(request.status, RequestStatus::Overdue);

        let mut cancelled = request_with_status(RequestStatus::Cancelled);
        assert_eq!(
            mark_overdue(&mut cancelled),
            Err(TransitionError::Terminal(RequestStatus::Cancelled))
        );
    }

    proptest! {
        #[test]
        fn prop_validate_matches_allowed_set(
            from in prop_oneof![
                Just(RequestStatus::Pending),
                Just(RequestStatus::Sent),
                Just(RequestStatus::Received),
                Just(RequestStatus::Overdue),
                Just(RequestStatus::Cancelled),
            ],
            to in prop_oneof![
                Just(RequestStatus::Pending),
                Just(RequestStatus::Sent),
                Just(RequestStatus::Received),
                Just(RequestStatus::Overdue),
                Just(RequestStatus::Cancelled),
            ]
        ) {
            let res = validate_transition(from, to);
            let allowed = allowed_transitions(from);

            if from == to {
                prop_assert!(res.is_ok());
            } else if res.is_ok() {
                prop_assert!(allowed.contains(&to));
            } else {
                prop_assert!(!allowed.contains(&to));
            }
        }

        #[test]
        fn prop_terminal_states_never_change(
            to in prop_oneof![
                Just(RequestStatus::Pending),
                Just(RequestStatus::Sent),
                Just(RequestStatus::Overdue),
                Just(RequestStatus::Cancelled),
            ]
        ) {
            let now = Utc::now();
            let mut request = request_with_status(RequestStatus::Received);
            let _ = apply(&mut request, to, now);
            prop_assert_eq!(request.status, RequestStatus::Received);
        }
    }
}
