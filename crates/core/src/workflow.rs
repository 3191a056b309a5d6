use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::access::{Identity, Role};
use crate::domain::approval::{ActionType, ApprovalRequest, ApprovalRequestId, ApprovalStatus};
use crate::domain::bid::BidDraft;
use crate::errors::{FieldViolation, WorkflowError};
use crate::money::Money;
use crate::notify::{NotificationDispatch, Notifier};
use crate::store::{ApprovalStore, NewAction, NewBid, NewRequest, StoreError};

/// One bid as it arrives from the boundary. `client_ref` is a transient id
/// generated client-side; the store never sees it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidSubmission {
    pub client_ref: String,
    pub contractor: String,
    pub quote: String,
}

/// The creation command as it arrives from the boundary. Money fields are
/// decimal strings end to end; nothing is trusted until `validate` has run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitCommand {
    pub site: String,
    pub trade: String,
    pub tenders_issued: i64,
    pub tenders_received: i64,
    pub budget_value: String,
    pub estimated_profit: String,
    #[serde(default)]
    pub comments: Option<String>,
    pub requester_email: String,
    #[serde(default)]
    pub recommended_bid_ref: Option<String>,
    pub bids: Vec<BidSubmission>,
}

struct ValidatedSubmit {
    site: String,
    trade: String,
    tenders_issued: u32,
    tenders_received: u32,
    budget_value: Money,
    estimated_profit: Money,
    comments: Option<String>,
    requester_email: String,
    recommended_ref: Option<String>,
    drafts: Vec<BidDraft>,
}

impl ValidatedSubmit {
    fn to_new_request(&self) -> NewRequest {
        NewRequest {
            site: self.site.clone(),
            trade: self.trade.clone(),
            tenders_issued: self.tenders_issued,
            tenders_received: self.tenders_received,
            budget_value: self.budget_value,
            estimated_profit: self.estimated_profit,
            comments: self.comments.clone(),
            requester_email: self.requester_email.clone(),
            bids: self
                .drafts
                .iter()
                .map(|draft| NewBid { contractor: draft.contractor.clone(), quote: draft.quote })
                .collect(),
        }
    }
}

/// Collects every violated field constraint, not just the first, so the
/// caller can correct the whole submission in one pass.
fn validate(cmd: &SubmitCommand) -> Result<ValidatedSubmit, Vec<FieldViolation>> {
    let mut violations = Vec::new();

    if cmd.site.trim().is_empty() {
        violations.push(FieldViolation::new("site", "must not be empty"));
    }
    if cmd.trade.trim().is_empty() {
        violations.push(FieldViolation::new("trade", "must not be empty"));
    }

    let tenders_issued = match u32::try_from(cmd.tenders_issued) {
        Ok(count) => count,
        Err(_) => {
            violations.push(FieldViolation::new("tenders_issued", "must be a non-negative integer"));
            0
        }
    };
    let tenders_received = match u32::try_from(cmd.tenders_received) {
        Ok(count) => count,
        Err(_) => {
            violations
                .push(FieldViolation::new("tenders_received", "must be a non-negative integer"));
            0
        }
    };

    let budget_value = Money::parse(&cmd.budget_value).unwrap_or_else(|_| {
        violations.push(FieldViolation::new("budget_value", "must be a decimal amount"));
        Money::ZERO
    });
    let estimated_profit = Money::parse(&cmd.estimated_profit).unwrap_or_else(|_| {
        violations.push(FieldViolation::new("estimated_profit", "must be a decimal amount"));
        Money::ZERO
    });

    if !cmd.requester_email.contains('@') {
        violations.push(FieldViolation::new("requester_email", "must be a valid email address"));
    }

    if cmd.bids.is_empty() {
        violations.push(FieldViolation::new("bids", "at least one bid is required"));
    }
    let mut drafts = Vec::with_capacity(cmd.bids.len());
    for (index, bid) in cmd.bids.iter().enumerate() {
        if bid.contractor.trim().is_empty() {
            violations.push(FieldViolation::new(
                format!("bids[{index}].contractor"),
                "must not be empty",
            ));
        }
        match Money::parse(&bid.quote) {
            Ok(quote) if quote.is_negative() => {
                violations.push(FieldViolation::new(
                    format!("bids[{index}].quote"),
                    "must not be negative",
                ));
            }
            Ok(quote) => drafts.push(BidDraft {
                client_ref: bid.client_ref.clone(),
                contractor: bid.contractor.clone(),
                quote,
            }),
            Err(_) => {
                violations.push(FieldViolation::new(
                    format!("bids[{index}].quote"),
                    "must be a decimal amount",
                ));
            }
        }
    }

    if !violations.is_empty() {
        return Err(violations);
    }

    Ok(ValidatedSubmit {
        site: cmd.site.trim().to_string(),
        trade: cmd.trade.trim().to_string(),
        tenders_issued,
        tenders_received,
        budget_value,
        estimated_profit,
        comments: cmd.comments.clone().filter(|comments| !comments.trim().is_empty()),
        requester_email: cmd.requester_email.clone(),
        recommended_ref: cmd.recommended_bid_ref.clone(),
        drafts,
    })
}

/// Enforces the request state machine and the authorization policy for every
/// transition. Persistence atomicity is delegated to the store; notification
/// dispatch happens after the triggering write commits and is never awaited
/// as a precondition for success.
pub struct WorkflowEngine {
    store: Arc<dyn ApprovalStore>,
    dispatch: NotificationDispatch,
}

impl WorkflowEngine {
    pub fn new(
        store: Arc<dyn ApprovalStore>,
        notifier: Arc<dyn Notifier>,
        approver_email: impl Into<String>,
    ) -> Self {
        Self { store, dispatch: NotificationDispatch::new(notifier, approver_email) }
    }

    /// Validates and creates an approval request from a submit command.
    ///
    /// Persistence is two-phase: request and bids first (one transaction),
    /// then the recommended-bid reference once durable bid ids exist. A
    /// failure between phases leaves a valid request with no recommendation;
    /// the request is never rolled back for that.
    pub async fn create_request(
        &self,
        cmd: SubmitCommand,
        identity: Option<&Identity>,
    ) -> Result<ApprovalRequest, WorkflowError> {
        let identity = identity.ok_or(WorkflowError::Unauthenticated)?;
        if !identity.has_role(Role::Submitter) {
            return Err(WorkflowError::Forbidden("submitter role required".to_string()));
        }
        // Identity binding: the declared requester must be the caller, so a
        // submitter cannot spoof another requester's address.
        if cmd.requester_email != identity.email {
            return Err(WorkflowError::Forbidden(
                "requester email must match the authenticated caller".to_string(),
            ));
        }

        let validated = validate(&cmd).map_err(WorkflowError::Validation)?;

        let mut persisted = self.store.create_request_with_bids(validated.to_new_request()).await?;
        let ledger = persisted
            .ledger()
            .map_err(|error| WorkflowError::Persistence(error.to_string()))?;

        if let Some(recommended_ref) = &validated.recommended_ref {
            if let Some(bid) = ledger.resolve_recommended(recommended_ref, &validated.drafts) {
                match self.store.update_recommended_bid(&persisted.id, &bid.id).await {
                    Ok(()) => persisted.recommended_bid_id = Some(bid.id.clone()),
                    Err(error) => warn!(
                        event_name = "workflow.recommendation_unrecorded",
                        request_id = %persisted.id,
                        error = %error,
                        "recommended-bid reference not recorded; request stands without it"
                    ),
                }
            }
        }

        info!(
            event_name = "workflow.request_created",
            request_id = %persisted.id,
            site = persisted.site,
            trade = persisted.trade,
            bids = persisted.bids.len(),
            "approval request created"
        );

        self.dispatch.request_submitted(&persisted, &ledger).await;

        Ok(persisted)
    }

    /// Applies an approve/reject decision to a pending request: status change
    /// and audit record land atomically, then the requester is notified.
    pub async fn act(
        &self,
        request_id: &ApprovalRequestId,
        action: ActionType,
        notes: Option<String>,
        identity: Option<&Identity>,
    ) -> Result<ApprovalRequest, WorkflowError> {
        let identity = identity.ok_or(WorkflowError::Unauthenticated)?;

        let request = self
            .store
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(request_id.0.clone()))?;

        if !identity.has_role(Role::Approver) {
            return Err(WorkflowError::Forbidden("approver role required".to_string()));
        }
        if request.status != ApprovalStatus::Pending {
            return Err(WorkflowError::InvalidState { status: request.status });
        }

        let new_status = action.resolved_status();
        let new_action =
            NewAction { actor_email: identity.email.clone(), action, notes };

        let recorded = match self.store.apply_decision(request_id, new_status, new_action).await {
            Ok(recorded) => recorded,
            Err(StoreError::Conflict) => {
                // Another caller resolved the request between our read and
                // write; report the state they left behind.
                let status = self
                    .store
                    .find_by_id(request_id)
                    .await?
                    .map(|current| current.status)
                    .ok_or_else(|| WorkflowError::NotFound(request_id.0.clone()))?;
                return Err(WorkflowError::InvalidState { status });
            }
            Err(error) => return Err(error.into()),
        };

        let mut updated = request;
        updated.status = new_status;
        updated.actions.insert(0, recorded.clone());

        info!(
            event_name = "workflow.decision_recorded",
            request_id = %updated.id,
            action = %recorded.action,
            actor = recorded.actor_email,
            "decision applied"
        );

        self.dispatch.decision_recorded(&updated, &recorded).await;

        Ok(updated)
    }

    pub async fn get(
        &self,
        request_id: &ApprovalRequestId,
        identity: Option<&Identity>,
    ) -> Result<ApprovalRequest, WorkflowError> {
        identity.ok_or(WorkflowError::Unauthenticated)?;
        self.store
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(request_id.0.clone()))
    }

    /// All requests, newest first.
    pub async fn list(
        &self,
        identity: Option<&Identity>,
    ) -> Result<Vec<ApprovalRequest>, WorkflowError> {
        identity.ok_or(WorkflowError::Unauthenticated)?;
        Ok(self.store.list_all().await?)
    }
}
