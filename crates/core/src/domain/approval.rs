use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::bid::{Bid, BidId};
use crate::ledger::{BidLedger, LedgerError};
use crate::money::Money;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalRequestId(pub String);

impl fmt::Display for ApprovalRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    Approve,
    Reject,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "APPROVE",
            Self::Reject => "REJECT",
        }
    }

    /// The terminal status this action resolves a pending request to.
    pub fn resolved_status(&self) -> ApprovalStatus {
        match self {
            Self::Approve => ApprovalStatus::Approved,
            Self::Reject => ApprovalStatus::Rejected,
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only audit record of one decision. Created exactly once per
/// successful transition; never mutated or deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalAction {
    pub id: ActionId,
    pub approval_request_id: ApprovalRequestId,
    pub actor_email: String,
    pub action: ActionType,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The unit of work being routed for decision, aggregating request metadata,
/// its bid set, the recommended-bid reference, and the audit trail.
///
/// `recommended_bid_id` is a weak reference: when present it must name a bid
/// in `bids`, and is resolved by lookup rather than ownership.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: ApprovalRequestId,
    pub site: String,
    pub trade: String,
    pub tenders_issued: u32,
    pub tenders_received: u32,
    pub budget_value: Money,
    pub estimated_profit: Money,
    pub comments: Option<String>,
    pub requester_email: String,
    pub recommended_bid_id: Option<BidId>,
    pub status: ApprovalStatus,
    /// Bids in submission order.
    pub bids: Vec<Bid>,
    /// Audit trail, newest first.
    pub actions: Vec<ApprovalAction>,
    pub created_at: DateTime<Utc>,
}

impl ApprovalRequest {
    /// `PENDING` is the sole initial state; `APPROVED` and `REJECTED` are
    /// terminal, so the only transitions are pending-to-terminal.
    pub fn can_transition_to(&self, next: ApprovalStatus) -> bool {
        matches!(
            (self.status, next),
            (ApprovalStatus::Pending, ApprovalStatus::Approved)
                | (ApprovalStatus::Pending, ApprovalStatus::Rejected)
        )
    }

    pub fn recommended_bid(&self) -> Option<&Bid> {
        let wanted = self.recommended_bid_id.as_ref()?;
        self.bids.iter().find(|bid| &bid.id == wanted)
    }

    pub fn ledger(&self) -> Result<BidLedger, LedgerError> {
        BidLedger::new(self.bids.clone())
    }
}
