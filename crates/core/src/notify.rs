use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::approval::{ApprovalAction, ApprovalRequest};
use crate::ledger::BidLedger;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// The outbound-notice port. Transport (SMTP, webhook, ...) lives outside the
/// core; from the workflow's perspective sending is best-effort fire-and-forget.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Default notifier: records the notice in the structured log and delivers
/// nothing. Used wherever a real transport has not been wired in.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        info!(
            event_name = "notify.logged",
            to = to,
            subject = subject,
            body_bytes = body.len(),
            "notification recorded without transport"
        );
        Ok(())
    }
}

/// Composes and dispatches lifecycle notices. Failures are observed and
/// logged but never roll back the workflow transition that triggered them;
/// the domain event has already happened.
pub struct NotificationDispatch {
    notifier: Arc<dyn Notifier>,
    approver_email: String,
}

impl NotificationDispatch {
    pub fn new(notifier: Arc<dyn Notifier>, approver_email: impl Into<String>) -> Self {
        Self { notifier, approver_email: approver_email.into() }
    }

    /// On submission: confirmation to the requester plus a review alert to
    /// the approver. Dual notification is the canonical policy here.
    pub async fn request_submitted(&self, request: &ApprovalRequest, ledger: &BidLedger) {
        let subject = format!("Submission Received - {} / {}", request.site, request.trade);
        let body = format!(
            "Your approval request has been submitted successfully.\n\
             Site: {}\nTrade: {}\nStatus: {}\n\
             You will receive another email once your request has been approved or rejected.\n",
            request.site, request.trade, request.status,
        );
        self.deliver(&request.requester_email, &subject, &body).await;

        let cheapest = ledger.cheapest();
        let subject = format!("Approval Request - {} / {}", request.site, request.trade);
        let body = format!(
            "You have a new subcontract approval to review.\n\
             Site: {}\nTrade: {}\nBids: {} (cheapest {})\nRequest: {}\n",
            request.site,
            request.trade,
            ledger.bids().len(),
            cheapest.quote.to_display_string(0),
            request.id,
        );
        self.deliver(&self.approver_email, &subject, &body).await;
    }

    /// On decision: outcome notice to the requester.
    pub async fn decision_recorded(&self, request: &ApprovalRequest, action: &ApprovalAction) {
        let subject =
            format!("Approval {} - {} / {}", request.status, request.site, request.trade);
        let mut body = format!(
            "Your approval request has been {}.\n\
             Site: {}\nTrade: {}\nDecided by: {}\n",
            request.status.as_str().to_ascii_lowercase(),
            request.site,
            request.trade,
            action.actor_email,
        );
        if let Some(notes) = &action.notes {
            body.push_str(&format!("Notes: {notes}\n"));
        }
        self.deliver(&request.requester_email, &subject, &body).await;
    }

    async fn deliver(&self, to: &str, subject: &str, body: &str) {
        if let Err(error) = self.notifier.send(to, subject, body).await {
            warn!(
                event_name = "notify.delivery_failed",
                to = to,
                subject = subject,
                error = %error,
                "notification delivery failed; workflow transition stands"
            );
        }
    }
}
