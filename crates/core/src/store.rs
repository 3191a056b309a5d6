use async_trait::async_trait;
use thiserror::Error;

use crate::domain::approval::{
    ActionType, ApprovalAction, ApprovalRequest, ApprovalRequestId, ApprovalStatus,
};
use crate::domain::bid::BidId;
use crate::money::Money;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("decision conflict: request is no longer pending")]
    Conflict,
    #[error("decode error: {0}")]
    Decode(String),
}

/// A bid to persist; the store assigns the durable id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewBid {
    pub contractor: String,
    pub quote: Money,
}

/// A validated request to persist together with its bids, as one atomic unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewRequest {
    pub site: String,
    pub trade: String,
    pub tenders_issued: u32,
    pub tenders_received: u32,
    pub budget_value: Money,
    pub estimated_profit: Money,
    pub comments: Option<String>,
    pub requester_email: String,
    /// Bids in submission order; the store must preserve this ordering.
    pub bids: Vec<NewBid>,
}

/// A decision to append to the audit trail; the store assigns id and timestamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewAction {
    pub actor_email: String,
    pub action: ActionType,
    pub notes: Option<String>,
}

/// The persistence port the workflow engine consumes. Implementations must
/// provide atomic multi-write transactions: `create_request_with_bids` writes
/// the request and its bids together, and `apply_decision` writes the status
/// change and the audit record together or not at all. Concurrent
/// `apply_decision` calls on one request must be serialized so only the first
/// caller observing `PENDING` succeeds; later callers get `Conflict`.
#[async_trait]
pub trait ApprovalStore: Send + Sync {
    /// Persists a new pending request with its bids and returns it with
    /// durable ids assigned.
    async fn create_request_with_bids(
        &self,
        new_request: NewRequest,
    ) -> Result<ApprovalRequest, StoreError>;

    /// Second phase of request creation: records the recommended-bid
    /// reference once durable bid ids exist.
    async fn update_recommended_bid(
        &self,
        request_id: &ApprovalRequestId,
        bid_id: &BidId,
    ) -> Result<(), StoreError>;

    /// Atomically sets the terminal status and appends the audit record.
    /// Returns `Conflict` when the request is no longer `PENDING`.
    async fn apply_decision(
        &self,
        request_id: &ApprovalRequestId,
        status: ApprovalStatus,
        action: NewAction,
    ) -> Result<ApprovalAction, StoreError>;

    async fn find_by_id(
        &self,
        id: &ApprovalRequestId,
    ) -> Result<Option<ApprovalRequest>, StoreError>;

    /// All requests, newest first.
    async fn list_all(&self) -> Result<Vec<ApprovalRequest>, StoreError>;
}
