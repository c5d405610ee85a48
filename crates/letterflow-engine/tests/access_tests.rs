mod common;

use common::{days, fixture, new_request};
use chrono::Utc;
use letterflow_core::{AccessError, RequestStatus, TransitionError};
use letterflow_engine::EngineError;
use letterflow_engine::RequestStore;

#[tokio::test]
async fn valid_token_grants_repeated_access() {
    let fx = fixture();
    let now = Utc::now();
    let request = fx.service.create(new_request(now + days(10)), now).await.unwrap();
    let token = request.secure_token.as_str().to_string();

    // Not single-use: the recipient can come back.
    for _ in 0..3 {
        let granted = fx.gate.validate(&token, now + days(1)).await.unwrap();
        assert_eq!(granted.id, request.id);
    }
}

#[tokio::test]
async fn malformed_token_is_rejected_before_lookup() {
    let fx = fixture();
    let now = Utc::now();

    let err = fx.gate.validate("not-a-token", now).await.unwrap_err();
    assert_eq!(err, EngineError::Access(AccessError::MalformedToken));
}

#[tokio::test]
async fn unknown_token_is_not_found() {
    let fx = fixture();
    let now = Utc::now();
    fx.service.create(new_request(now + days(10)), now).await.unwrap();

    let unknown = "ab".repeat(32);
    let err = fx.gate.validate(&unknown, now).await.unwrap_err();
    assert_eq!(err, EngineError::Access(AccessError::TokenNotFound));
}

#[tokio::test]
async fn expired_token_is_rejected_whatever_the_status() {
    let fx = fixture();
    let now = Utc::now();
    let request = fx.service.create(new_request(now + days(5)), now).await.unwrap();
    let token = request.secure_token.as_str().to_string();

    // Even a completed request denies access once the token lapses.
    fx.gate.mark_received(&token, now + days(1)).await.unwrap();

    let long_after = now + days(120);
    let err = fx.gate.validate(&token, long_after).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Access(AccessError::TokenExpired(_))
    ));
}

#[tokio::test]
async fn cancelled_request_denies_access() {
    let fx = fixture();
    let now = Utc::now();
    let request = fx.service.create(new_request(now + days(10)), now).await.unwrap();
    let token = request.secure_token.as_str().to_string();

    fx.service.cancel(request.id, now).await.unwrap();

    let err = fx.gate.validate(&token, now + days(1)).await.unwrap_err();
    assert_eq!(err, EngineError::Access(AccessError::RequestCancelled));
}

#[tokio::test]
async fn every_denial_reads_the_same_to_the_recipient() {
    let errors = [
        AccessError::MalformedToken,
        AccessError::TokenNotFound,
        AccessError::TokenExpired(Utc::now()),
        AccessError::RequestCancelled,
    ];
    let first = errors[0].denial_message();
    for err in &errors {
        assert_eq!(err.denial_message(), first);
    }
}

#[tokio::test]
async fn recipient_marks_sent_then_received() {
    let fx = fixture();
    let now = Utc::now();
    let request = fx.service.create(new_request(now + days(10)), now).await.unwrap();
    let token = request.secure_token.as_str().to_string();

    let sent = fx.gate.mark_sent(&token, now + days(1)).await.unwrap();
    assert_eq!(sent.status, RequestStatus::Sent);
    assert_eq!(sent.sent_at, Some(now + days(1)));

    let received = fx.gate.mark_received(&token, now + days(2)).await.unwrap();
    assert_eq!(received.status, RequestStatus::Received);
    assert_eq!(received.received_at, Some(now + days(2)));

    // Terminal: no way back to sent.
    let err = fx.gate.mark_sent(&token, now + days(3)).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::Transition(TransitionError::Terminal(RequestStatus::Received))
    );
    let stored = fx.store.get(request.id).await.unwrap();
    assert_eq!(stored.status, RequestStatus::Received);
    assert_eq!(stored.received_at, Some(now + days(2)));
}

#[tokio::test]
async fn overdue_request_can_still_be_received() {
    let fx = fixture();
    let now = Utc::now();
    let request = fx.service.create(new_request(now + days(2)), now).await.unwrap();
    let token = request.secure_token.as_str().to_string();

    fx.sweep.run_once(now + days(3)).await.unwrap();
    assert_eq!(
        fx.store.get(request.id).await.unwrap().status,
        RequestStatus::Overdue
    );

    let received = fx.gate.mark_received(&token, now + days(4)).await.unwrap();
    assert_eq!(received.status, RequestStatus::Received);
}

#[tokio::test]
async fn access_decisions_are_audited_with_fingerprints_only() {
    let fx = fixture();
    let now = Utc::now();
    let request = fx.service.create(new_request(now + days(10)), now).await.unwrap();
    let token = request.secure_token.as_str().to_string();

    fx.gate.validate(&token, now).await.unwrap();
    fx.service.cancel(request.id, now).await.unwrap();
    let _ = fx.gate.validate(&token, now + days(1)).await;

    let events = fx.audit.events_for(request.id);
    assert!(!events.is_empty());
    for event in &events {
        assert!(
            !event.detail.contains(&token),
            "raw token leaked into the audit log"
        );
    }
    assert!(fx.audit.verify_integrity().is_ok());
}
