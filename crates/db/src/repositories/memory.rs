use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use tenderdesk_core::domain::approval::{
    ActionId, ApprovalAction, ApprovalRequest, ApprovalRequestId, ApprovalStatus,
};
use tenderdesk_core::domain::bid::{Bid, BidId};
use tenderdesk_core::store::{ApprovalStore, NewAction, NewRequest, StoreError};

/// Hashmap-backed store with the same atomicity contract as the SQL store:
/// every multi-write operation happens under one write lock. Useful for tests
/// and for wiring the engine without a database file.
#[derive(Default)]
pub struct InMemoryApprovalStore {
    requests: RwLock<HashMap<String, ApprovalRequest>>,
}

#[async_trait::async_trait]
impl ApprovalStore for InMemoryApprovalStore {
    async fn create_request_with_bids(
        &self,
        new_request: NewRequest,
    ) -> Result<ApprovalRequest, StoreError> {
        let request = ApprovalRequest {
            id: ApprovalRequestId(Uuid::new_v4().to_string()),
            site: new_request.site,
            trade: new_request.trade,
            tenders_issued: new_request.tenders_issued,
            tenders_received: new_request.tenders_received,
            budget_value: new_request.budget_value,
            estimated_profit: new_request.estimated_profit,
            comments: new_request.comments,
            requester_email: new_request.requester_email,
            recommended_bid_id: None,
            status: ApprovalStatus::Pending,
            bids: new_request
                .bids
                .into_iter()
                .map(|bid| Bid {
                    id: BidId(Uuid::new_v4().to_string()),
                    contractor: bid.contractor,
                    quote: bid.quote,
                })
                .collect(),
            actions: Vec::new(),
            created_at: Utc::now(),
        };

        let mut requests = self.requests.write().await;
        requests.insert(request.id.0.clone(), request.clone());
        Ok(request)
    }

    async fn update_recommended_bid(
        &self,
        request_id: &ApprovalRequestId,
        bid_id: &BidId,
    ) -> Result<(), StoreError> {
        let mut requests = self.requests.write().await;
        let request = requests
            .get_mut(&request_id.0)
            .ok_or_else(|| StoreError::Decode(format!("unknown request `{request_id}`")))?;
        request.recommended_bid_id = Some(bid_id.clone());
        Ok(())
    }

    async fn apply_decision(
        &self,
        request_id: &ApprovalRequestId,
        status: ApprovalStatus,
        action: NewAction,
    ) -> Result<ApprovalAction, StoreError> {
        let mut requests = self.requests.write().await;
        let request = requests.get_mut(&request_id.0).ok_or(StoreError::Conflict)?;
        if request.status != ApprovalStatus::Pending {
            return Err(StoreError::Conflict);
        }

        let recorded = ApprovalAction {
            id: ActionId(Uuid::new_v4().to_string()),
            approval_request_id: request_id.clone(),
            actor_email: action.actor_email,
            action: action.action,
            notes: action.notes,
            created_at: Utc::now(),
        };
        request.status = status;
        request.actions.insert(0, recorded.clone());
        Ok(recorded)
    }

    async fn find_by_id(
        &self,
        id: &ApprovalRequestId,
    ) -> Result<Option<ApprovalRequest>, StoreError> {
        let requests = self.requests.read().await;
        Ok(requests.get(&id.0).cloned())
    }

    async fn list_all(&self) -> Result<Vec<ApprovalRequest>, StoreError> {
        let requests = self.requests.read().await;
        let mut all: Vec<ApprovalRequest> = requests.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use tenderdesk_core::domain::approval::{ActionType, ApprovalStatus};
    use tenderdesk_core::money::Money;
    use tenderdesk_core::store::{ApprovalStore, NewAction, NewBid, NewRequest, StoreError};

    use super::InMemoryApprovalStore;

    fn sample_request() -> NewRequest {
        NewRequest {
            site: "Riverside Plaza".to_string(),
            trade: "Roofing".to_string(),
            tenders_issued: 2,
            tenders_received: 2,
            budget_value: Money::parse("9000").expect("budget"),
            estimated_profit: Money::parse("1500").expect("profit"),
            comments: None,
            requester_email: "submitter@example.co.uk".to_string(),
            bids: vec![NewBid {
                contractor: "Alpha".to_string(),
                quote: Money::parse("7200").expect("quote"),
            }],
        }
    }

    #[tokio::test]
    async fn create_and_find_round_trip() {
        let store = InMemoryApprovalStore::default();
        let created = store.create_request_with_bids(sample_request()).await.expect("create");

        let found = store.find_by_id(&created.id).await.expect("find");
        assert_eq!(found, Some(created));
    }

    #[tokio::test]
    async fn decisions_conflict_once_terminal() {
        let store = InMemoryApprovalStore::default();
        let created = store.create_request_with_bids(sample_request()).await.expect("create");

        let action = NewAction {
            actor_email: "approver@example.co.uk".to_string(),
            action: ActionType::Reject,
            notes: None,
        };
        store
            .apply_decision(&created.id, ApprovalStatus::Rejected, action.clone())
            .await
            .expect("first decision");

        let error = store
            .apply_decision(&created.id, ApprovalStatus::Approved, action)
            .await
            .expect_err("second decision");
        assert_eq!(error, StoreError::Conflict);

        let found = store.find_by_id(&created.id).await.expect("find").expect("present");
        assert_eq!(found.status, ApprovalStatus::Rejected);
        assert_eq!(found.actions.len(), 1);
    }
}
