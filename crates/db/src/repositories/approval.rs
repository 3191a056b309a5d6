use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use uuid::Uuid;

use tenderdesk_core::domain::approval::{
    ActionId, ActionType, ApprovalAction, ApprovalRequest, ApprovalRequestId, ApprovalStatus,
};
use tenderdesk_core::domain::bid::{Bid, BidId};
use tenderdesk_core::money::Money;
use tenderdesk_core::store::{ApprovalStore, NewAction, NewRequest, StoreError};

use crate::DbPool;

/// SQLite-backed approval store. Multi-write operations run inside sqlx
/// transactions; the decision write is conditional on current status so
/// concurrent callers are serialized by the database.
pub struct SqlApprovalStore {
    pool: DbPool,
}

impl SqlApprovalStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn unavailable(error: sqlx::Error) -> StoreError {
    StoreError::Unavailable(error.to_string())
}

fn status_from_str(value: &str) -> Result<ApprovalStatus, StoreError> {
    match value {
        "PENDING" => Ok(ApprovalStatus::Pending),
        "APPROVED" => Ok(ApprovalStatus::Approved),
        "REJECTED" => Ok(ApprovalStatus::Rejected),
        other => Err(StoreError::Decode(format!("unknown status `{other}`"))),
    }
}

fn action_from_str(value: &str) -> Result<ActionType, StoreError> {
    match value {
        "APPROVE" => Ok(ActionType::Approve),
        "REJECT" => Ok(ActionType::Reject),
        other => Err(StoreError::Decode(format!("unknown action `{other}`"))),
    }
}

fn money_column(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<Money, StoreError> {
    let raw: String = row.try_get(column).map_err(|e| StoreError::Decode(e.to_string()))?;
    Money::parse(&raw)
        .map_err(|_| StoreError::Decode(format!("column `{column}` holds non-decimal `{raw}`")))
}

fn timestamp_column(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<DateTime<Utc>, StoreError> {
    let raw: String = row.try_get(column).map_err(|e| StoreError::Decode(e.to_string()))?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StoreError::Decode(format!("column `{column}` holds non-rfc3339 `{raw}`")))
}

fn count_column(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<u32, StoreError> {
    let raw: i64 = row.try_get(column).map_err(|e| StoreError::Decode(e.to_string()))?;
    u32::try_from(raw)
        .map_err(|_| StoreError::Decode(format!("column `{column}` holds negative `{raw}`")))
}

fn row_to_bid(row: &sqlx::sqlite::SqliteRow) -> Result<Bid, StoreError> {
    let id: String = row.try_get("id").map_err(|e| StoreError::Decode(e.to_string()))?;
    let contractor: String =
        row.try_get("contractor").map_err(|e| StoreError::Decode(e.to_string()))?;
    Ok(Bid { id: BidId(id), contractor, quote: money_column(row, "quote")? })
}

fn row_to_action(row: &sqlx::sqlite::SqliteRow) -> Result<ApprovalAction, StoreError> {
    let id: String = row.try_get("id").map_err(|e| StoreError::Decode(e.to_string()))?;
    let request_id: String =
        row.try_get("approval_request_id").map_err(|e| StoreError::Decode(e.to_string()))?;
    let actor_email: String =
        row.try_get("actor_email").map_err(|e| StoreError::Decode(e.to_string()))?;
    let action_str: String =
        row.try_get("action").map_err(|e| StoreError::Decode(e.to_string()))?;
    let notes: Option<String> =
        row.try_get("notes").map_err(|e| StoreError::Decode(e.to_string()))?;

    Ok(ApprovalAction {
        id: ActionId(id),
        approval_request_id: ApprovalRequestId(request_id),
        actor_email,
        action: action_from_str(&action_str)?,
        notes,
        created_at: timestamp_column(row, "created_at")?,
    })
}

fn row_to_request(
    row: &sqlx::sqlite::SqliteRow,
    bids: Vec<Bid>,
    actions: Vec<ApprovalAction>,
) -> Result<ApprovalRequest, StoreError> {
    let id: String = row.try_get("id").map_err(|e| StoreError::Decode(e.to_string()))?;
    let site: String = row.try_get("site").map_err(|e| StoreError::Decode(e.to_string()))?;
    let trade: String = row.try_get("trade").map_err(|e| StoreError::Decode(e.to_string()))?;
    let comments: Option<String> =
        row.try_get("comments").map_err(|e| StoreError::Decode(e.to_string()))?;
    let requester_email: String =
        row.try_get("requester_email").map_err(|e| StoreError::Decode(e.to_string()))?;
    let recommended_bid_id: Option<String> =
        row.try_get("recommended_bid_id").map_err(|e| StoreError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| StoreError::Decode(e.to_string()))?;

    Ok(ApprovalRequest {
        id: ApprovalRequestId(id),
        site,
        trade,
        tenders_issued: count_column(row, "tenders_issued")?,
        tenders_received: count_column(row, "tenders_received")?,
        budget_value: money_column(row, "budget_value")?,
        estimated_profit: money_column(row, "estimated_profit")?,
        comments,
        requester_email,
        recommended_bid_id: recommended_bid_id.map(BidId),
        status: status_from_str(&status_str)?,
        bids,
        actions,
        created_at: timestamp_column(row, "created_at")?,
    })
}

impl SqlApprovalStore {
    async fn hydrate(
        &self,
        row: &sqlx::sqlite::SqliteRow,
    ) -> Result<ApprovalRequest, StoreError> {
        let id: String = row.try_get("id").map_err(|e| StoreError::Decode(e.to_string()))?;

        let bid_rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, contractor, quote FROM bid
             WHERE approval_request_id = ? ORDER BY position ASC",
        )
        .bind(&id)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;
        let bids = bid_rows.iter().map(row_to_bid).collect::<Result<Vec<_>, _>>()?;

        let action_rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, approval_request_id, actor_email, action, notes, created_at
             FROM approval_action
             WHERE approval_request_id = ?
             ORDER BY created_at DESC, rowid DESC",
        )
        .bind(&id)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;
        let actions = action_rows.iter().map(row_to_action).collect::<Result<Vec<_>, _>>()?;

        row_to_request(row, bids, actions)
    }
}

#[async_trait::async_trait]
impl ApprovalStore for SqlApprovalStore {
    async fn create_request_with_bids(
        &self,
        new_request: NewRequest,
    ) -> Result<ApprovalRequest, StoreError> {
        let request_id = Uuid::new_v4().to_string();
        let created_at = Utc::now();

        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        sqlx::query(
            "INSERT INTO approval_request (id, site, trade, tenders_issued, tenders_received,
                                           budget_value, estimated_profit, comments,
                                           requester_email, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'PENDING', ?)",
        )
        .bind(&request_id)
        .bind(&new_request.site)
        .bind(&new_request.trade)
        .bind(i64::from(new_request.tenders_issued))
        .bind(i64::from(new_request.tenders_received))
        .bind(new_request.budget_value.to_string())
        .bind(new_request.estimated_profit.to_string())
        .bind(&new_request.comments)
        .bind(&new_request.requester_email)
        .bind(created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;

        let mut bids = Vec::with_capacity(new_request.bids.len());
        for (position, new_bid) in new_request.bids.into_iter().enumerate() {
            let bid_id = Uuid::new_v4().to_string();
            sqlx::query(
                "INSERT INTO bid (id, approval_request_id, contractor, quote, position, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&bid_id)
            .bind(&request_id)
            .bind(&new_bid.contractor)
            .bind(new_bid.quote.to_string())
            .bind(position as i64)
            .bind(created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
            .execute(&mut *tx)
            .await
            .map_err(unavailable)?;

            bids.push(Bid {
                id: BidId(bid_id),
                contractor: new_bid.contractor,
                quote: new_bid.quote,
            });
        }

        tx.commit().await.map_err(unavailable)?;

        Ok(ApprovalRequest {
            id: ApprovalRequestId(request_id),
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
            bids,
            actions: Vec::new(),
            created_at,
        })
    }

    async fn update_recommended_bid(
        &self,
        request_id: &ApprovalRequestId,
        bid_id: &BidId,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE approval_request SET recommended_bid_id = ? WHERE id = ?")
            .bind(&bid_id.0)
            .bind(&request_id.0)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn apply_decision(
        &self,
        request_id: &ApprovalRequestId,
        status: ApprovalStatus,
        action: NewAction,
    ) -> Result<ApprovalAction, StoreError> {
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        // Conditional on PENDING: a rival decision between our caller's read
        // and this write leaves zero affected rows, and the transaction rolls
        // back with nothing appended.
        let updated = sqlx::query(
            "UPDATE approval_request SET status = ? WHERE id = ? AND status = 'PENDING'",
        )
        .bind(status.as_str())
        .bind(&request_id.0)
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;

        if updated.rows_affected() == 0 {
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

        sqlx::query(
            "INSERT INTO approval_action (id, approval_request_id, actor_email, action, notes, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&recorded.id.0)
        .bind(&recorded.approval_request_id.0)
        .bind(&recorded.actor_email)
        .bind(recorded.action.as_str())
        .bind(&recorded.notes)
        .bind(recorded.created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;

        tx.commit().await.map_err(unavailable)?;

        Ok(recorded)
    }

    async fn find_by_id(
        &self,
        id: &ApprovalRequestId,
    ) -> Result<Option<ApprovalRequest>, StoreError> {
        let row = sqlx::query(
            "SELECT id, site, trade, tenders_issued, tenders_received, budget_value,
                    estimated_profit, comments, requester_email, recommended_bid_id,
                    status, created_at
             FROM approval_request WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        match row {
            Some(ref row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn list_all(&self) -> Result<Vec<ApprovalRequest>, StoreError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, site, trade, tenders_issued, tenders_received, budget_value,
                    estimated_profit, comments, requester_email, recommended_bid_id,
                    status, created_at
             FROM approval_request ORDER BY created_at DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        let mut requests = Vec::with_capacity(rows.len());
        for row in &rows {
            requests.push(self.hydrate(row).await?);
        }
        Ok(requests)
    }
}

#[cfg(test)]
mod tests {
    use tenderdesk_core::domain::approval::{ActionType, ApprovalRequestId, ApprovalStatus};
    use tenderdesk_core::money::Money;
    use tenderdesk_core::store::{ApprovalStore, NewAction, NewBid, NewRequest, StoreError};

    use super::SqlApprovalStore;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn sample_request(site: &str) -> NewRequest {
        NewRequest {
            site: site.to_string(),
            trade: "Groundworks".to_string(),
            tenders_issued: 4,
            tenders_received: 3,
            budget_value: Money::parse("5000").expect("budget"),
            estimated_profit: Money::parse("1200").expect("profit"),
            comments: Some("three returns".to_string()),
            requester_email: "submitter@example.co.uk".to_string(),
            bids: vec![
                NewBid {
                    contractor: "Alpha Civils".to_string(),
                    quote: Money::parse("1000").expect("quote"),
                },
                NewBid {
                    contractor: "Border Groundworks".to_string(),
                    quote: Money::parse("900").expect("quote"),
                },
            ],
        }
    }

    fn decision(actor: &str) -> NewAction {
        NewAction {
            actor_email: actor.to_string(),
            action: ActionType::Approve,
            notes: Some("within budget".to_string()),
        }
    }

    #[tokio::test]
    async fn create_assigns_ids_and_preserves_submission_order() {
        let store = SqlApprovalStore::new(setup().await);

        let created =
            store.create_request_with_bids(sample_request("Riverside Plaza")).await.expect("create");

        assert_eq!(created.status, ApprovalStatus::Pending);
        assert_eq!(created.bids.len(), 2);
        assert!(!created.bids[0].id.0.is_empty());

        let found =
            store.find_by_id(&created.id).await.expect("find").expect("present");
        assert_eq!(found.bids[0].contractor, "Alpha Civils");
        assert_eq!(found.bids[1].contractor, "Border Groundworks");
        assert_eq!(found.budget_value, Money::parse("5000").expect("budget"));
        assert!(found.actions.is_empty());
    }

    #[tokio::test]
    async fn recommended_bid_reference_round_trips() {
        let store = SqlApprovalStore::new(setup().await);
        let created =
            store.create_request_with_bids(sample_request("Riverside Plaza")).await.expect("create");

        let recommended = created.bids[1].id.clone();
        store.update_recommended_bid(&created.id, &recommended).await.expect("update");

        let found = store.find_by_id(&created.id).await.expect("find").expect("present");
        assert_eq!(found.recommended_bid_id, Some(recommended));
        assert_eq!(found.recommended_bid().expect("resolve").contractor, "Border Groundworks");
    }

    #[tokio::test]
    async fn apply_decision_transitions_and_appends_exactly_one_action() {
        let store = SqlApprovalStore::new(setup().await);
        let created =
            store.create_request_with_bids(sample_request("Riverside Plaza")).await.expect("create");

        let recorded = store
            .apply_decision(&created.id, ApprovalStatus::Approved, decision("approver@example.co.uk"))
            .await
            .expect("decision");
        assert_eq!(recorded.action, ActionType::Approve);

        let found = store.find_by_id(&created.id).await.expect("find").expect("present");
        assert_eq!(found.status, ApprovalStatus::Approved);
        assert_eq!(found.actions.len(), 1);
        assert_eq!(found.actions[0].id, recorded.id);
        assert_eq!(found.actions[0].actor_email, "approver@example.co.uk");
    }

    #[tokio::test]
    async fn second_decision_conflicts_and_appends_nothing() {
        let store = SqlApprovalStore::new(setup().await);
        let created =
            store.create_request_with_bids(sample_request("Riverside Plaza")).await.expect("create");

        store
            .apply_decision(&created.id, ApprovalStatus::Rejected, decision("approver@example.co.uk"))
            .await
            .expect("first decision");

        let error = store
            .apply_decision(&created.id, ApprovalStatus::Approved, decision("rival@example.co.uk"))
            .await
            .expect_err("second decision");
        assert_eq!(error, StoreError::Conflict);

        // No partial state: status unchanged, no second audit record.
        let found = store.find_by_id(&created.id).await.expect("find").expect("present");
        assert_eq!(found.status, ApprovalStatus::Rejected);
        assert_eq!(found.actions.len(), 1);
    }

    #[tokio::test]
    async fn decision_on_unknown_request_conflicts() {
        let store = SqlApprovalStore::new(setup().await);
        let error = store
            .apply_decision(
                &ApprovalRequestId("missing".to_string()),
                ApprovalStatus::Approved,
                decision("approver@example.co.uk"),
            )
            .await
            .expect_err("unknown id");
        assert_eq!(error, StoreError::Conflict);
    }

    #[tokio::test]
    async fn find_by_id_returns_none_for_unknown() {
        let store = SqlApprovalStore::new(setup().await);
        let found =
            store.find_by_id(&ApprovalRequestId("missing".to_string())).await.expect("find");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn list_all_returns_newest_first() {
        let store = SqlApprovalStore::new(setup().await);
        store.create_request_with_bids(sample_request("First Site")).await.expect("first");
        store.create_request_with_bids(sample_request("Second Site")).await.expect("second");

        let listed = store.list_all().await.expect("list");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].site, "Second Site");
        assert_eq!(listed[1].site, "First Site");
    }
}
