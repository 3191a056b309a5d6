//! End-to-end workflow runs against the SQLite store: the engine's
//! authorization, validation, two-phase creation, and atomic decision
//! behavior as observed through real persistence.

use std::sync::Arc;

use tokio::sync::Mutex;

use tenderdesk_core::access::{Identity, Role};
use tenderdesk_core::domain::approval::{ActionType, ApprovalStatus};
use tenderdesk_core::errors::WorkflowError;
use tenderdesk_core::notify::{Notifier, NotifyError};
use tenderdesk_core::workflow::{BidSubmission, SubmitCommand, WorkflowEngine};
use tenderdesk_db::{connect_with_settings, migrations, SqlApprovalStore};

const APPROVER: &str = "approver@example.co.uk";
const SUBMITTER: &str = "submitter@example.co.uk";

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), NotifyError> {
        self.sent.lock().await.push((to.to_string(), subject.to_string()));
        Ok(())
    }
}

async fn engine() -> (WorkflowEngine, Arc<SqlApprovalStore>, Arc<RecordingNotifier>) {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");

    let store = Arc::new(SqlApprovalStore::new(pool));
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = WorkflowEngine::new(store.clone(), notifier.clone(), APPROVER);
    (engine, store, notifier)
}

fn submitter() -> Identity {
    Identity::new(SUBMITTER, vec![Role::Submitter])
}

fn approver() -> Identity {
    Identity::new(APPROVER, vec![Role::Approver])
}

fn command() -> SubmitCommand {
    SubmitCommand {
        site: "Riverside Plaza".to_string(),
        trade: "Groundworks".to_string(),
        tenders_issued: 4,
        tenders_received: 3,
        budget_value: "5000".to_string(),
        estimated_profit: "1200".to_string(),
        comments: Some("three returns, one decline".to_string()),
        requester_email: SUBMITTER.to_string(),
        recommended_bid_ref: Some("tmp-2".to_string()),
        bids: vec![
            BidSubmission {
                client_ref: "tmp-1".to_string(),
                contractor: "Alpha Civils".to_string(),
                quote: "1000".to_string(),
            },
            BidSubmission {
                client_ref: "tmp-2".to_string(),
                contractor: "Border Groundworks".to_string(),
                quote: "900".to_string(),
            },
        ],
    }
}

#[tokio::test]
async fn submit_persists_request_with_resolved_recommendation() {
    let (engine, _, notifier) = engine().await;

    let created = engine.create_request(command(), Some(&submitter())).await.expect("created");
    assert_eq!(created.status, ApprovalStatus::Pending);

    // Re-read through the store: the recommendation points at a durable bid id.
    let found = engine.get(&created.id, Some(&submitter())).await.expect("found");
    let recommended = found.recommended_bid().expect("recommendation recorded");
    assert_eq!(recommended.contractor, "Border Groundworks");

    let sent = notifier.sent.lock().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].0, SUBMITTER);
    assert_eq!(sent[1].0, APPROVER);
}

#[tokio::test]
async fn decision_round_trip_is_atomic_and_terminal() {
    let (engine, _, notifier) = engine().await;
    let created = engine.create_request(command(), Some(&submitter())).await.expect("created");

    let decided = engine
        .act(&created.id, ActionType::Approve, Some("within budget".to_string()), Some(&approver()))
        .await
        .expect("decision");
    assert_eq!(decided.status, ApprovalStatus::Approved);

    let found = engine.get(&created.id, Some(&approver())).await.expect("found");
    assert_eq!(found.status, ApprovalStatus::Approved);
    assert_eq!(found.actions.len(), 1);
    assert_eq!(found.actions[0].actor_email, APPROVER);
    assert_eq!(found.actions[0].notes.as_deref(), Some("within budget"));

    // A second decision fails with the post-transition state and appends nothing.
    let error = engine
        .act(&created.id, ActionType::Reject, None, Some(&approver()))
        .await
        .expect_err("terminal");
    assert_eq!(error, WorkflowError::InvalidState { status: ApprovalStatus::Approved });

    let found = engine.get(&created.id, Some(&approver())).await.expect("found");
    assert_eq!(found.actions.len(), 1);

    let sent = notifier.sent.lock().await;
    // Submission pair plus one outcome notice; the failed decision sent nothing.
    assert_eq!(sent.len(), 3);
    assert!(sent[2].1.starts_with("Approval APPROVED"));
}

#[tokio::test]
async fn non_approver_cannot_decide_and_request_stays_pending() {
    let (engine, _, _) = engine().await;
    let created = engine.create_request(command(), Some(&submitter())).await.expect("created");

    let error = engine
        .act(&created.id, ActionType::Approve, None, Some(&submitter()))
        .await
        .expect_err("submitter cannot act");
    assert!(matches!(error, WorkflowError::Forbidden(_)));

    let found = engine.get(&created.id, Some(&submitter())).await.expect("found");
    assert_eq!(found.status, ApprovalStatus::Pending);
    assert!(found.actions.is_empty());
}

#[tokio::test]
async fn rejected_submission_leaves_no_rows_behind() {
    let (engine, _, _) = engine().await;

    let mut cmd = command();
    cmd.bids.clear();
    cmd.recommended_bid_ref = None;

    let error =
        engine.create_request(cmd, Some(&submitter())).await.expect_err("empty bid set");
    assert!(matches!(error, WorkflowError::Validation(_)));

    let listed = engine.list(Some(&approver())).await.expect("list");
    assert!(listed.is_empty());
}

#[tokio::test]
async fn listing_orders_newest_first() {
    let (engine, _, _) = engine().await;

    engine.create_request(command(), Some(&submitter())).await.expect("first");
    let mut second = command();
    second.site = "Harbour Works".to_string();
    engine.create_request(second, Some(&submitter())).await.expect("second");

    let listed = engine.list(Some(&approver())).await.expect("list");
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].site, "Harbour Works");
    assert_eq!(listed[1].site, "Riverside Plaza");
}
