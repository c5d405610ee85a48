//! Outbound notification seam
//!
//! The engine never talks to a mail provider directly. It hands a `Notice`
//! to a `Notifier` and only trusts a confirmed `Ok` - the sweep's reminder
//! bookkeeping advances on nothing less.

use crate::error::NotifyError;
use async_trait::async_trait;
use letterflow_core::{RecipientId, RequestId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Which template the dispatcher should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    /// First contact, sent at creation
    InitialRequest,
    /// Deadline reminder from the sweep
    Reminder,
}

/// One outbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub request_id: RequestId,
    pub recipient: RecipientId,
    /// School mailbox when the school channel is in play.
    pub school_email: Option<String>,
    pub kind: TemplateKind,
    /// Template payload, shaped per kind.
    pub payload: serde_json::Value,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notice: &Notice) -> Result<(), NotifyError>;
}

/// Tracing-backed notifier for local runs. Always succeeds.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notice: &Notice) -> Result<(), NotifyError> {
        tracing::info!(
            request_id = %notice.request_id.0,
            kind = ?notice.kind,
            "notice dispatched"
        );
        Ok(())
    }
}

/// Recording notifier for tests and simulation. Failures can be injected
/// per request to exercise the sweep's retry path.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notice>>,
    failing: Mutex<HashSet<RequestId>>,
    fail_all: std::sync::atomic::AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send for this request fails until `heal` is called.
    pub fn fail_for(&self, id: RequestId) {
        self.failing.lock().insert(id);
    }

    /// Fail every send, whatever the request.
    pub fn fail_all(&self, on: bool) {
        self.fail_all.store(on, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn heal(&self, id: RequestId) {
        self.failing.lock().remove(&id);
    }

    pub fn sent(&self) -> Vec<Notice> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn sent_for(&self, id: RequestId) -> usize {
        self.sent.lock().iter().filter(|n| n.request_id == id).count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notice: &Notice) -> Result<(), NotifyError> {
        if self.fail_all.load(std::sync::atomic::Ordering::SeqCst)
            || self.failing.lock().contains(&notice.request_id)
        {
            return Err(NotifyError::Rejected("injected failure".to_string()));
        }
        self.sent.lock().push(notice.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_notifier_injected_failure() {
        let notifier = RecordingNotifier::new();
        let id = RequestId::new();
        let notice = Notice {
            request_id: id,
            recipient: RecipientId::new(),
            school_email: None,
            kind: TemplateKind::Reminder,
            payload: serde_json::json!({"title": "Letter"}),
        };

        notifier.fail_for(id);
        assert!(notifier.send(&notice).await.is_err());
        assert_eq!(notifier.sent_count(), 0);

        notifier.heal(id);
        notifier.send(&notice).await.unwrap();
        assert_eq!(notifier.sent_for(id), 1);
    }
}
