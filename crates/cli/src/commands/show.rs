use serde_json::json;

use tenderdesk_core::access::{Identity, Role};
use tenderdesk_core::domain::approval::ApprovalRequestId;

use crate::commands::{build_engine, current_thread_runtime, load_config, CommandResult};

pub fn run(id: &str, actor: &str, roles: Vec<Role>) -> CommandResult {
    let config = match load_config("show") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match current_thread_runtime("show") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let identity = Identity::new(actor, roles);
    let request_id = ApprovalRequestId(id.to_string());

    runtime.block_on(async {
        let engine = match build_engine("show", &config).await {
            Ok(engine) => engine,
            Err(failure) => return failure,
        };

        let request = match engine.get(&request_id, Some(&identity)).await {
            Ok(request) => request,
            Err(error) => return CommandResult::workflow_failure("show", &error),
        };

        // A persisted request always carries at least one bid; a ledger
        // failure here means the row set was tampered with out of band.
        let ledger = match request.ledger() {
            Ok(ledger) => ledger,
            Err(error) => {
                return CommandResult::failure("show", "persistence", error.to_string(), 4);
            }
        };
        let cheapest_id = ledger.cheapest().id.clone();

        let comparison: Vec<serde_json::Value> = ledger
            .bids()
            .iter()
            .map(|bid| {
                json!({
                    "id": bid.id.0,
                    "contractor": bid.contractor,
                    "quote": bid.quote,
                    "delta_to_cheapest": ledger.delta_for(bid),
                    "percent_above_cheapest": ledger.percent_for(bid).round_dp(2).to_string(),
                    "cheapest": bid.id == cheapest_id,
                    "recommended": request.recommended_bid_id.as_ref() == Some(&bid.id),
                })
            })
            .collect();

        let history: Vec<serde_json::Value> = request
            .actions
            .iter()
            .map(|action| {
                json!({
                    "id": action.id.0,
                    "action": action.action.as_str(),
                    "actor_email": action.actor_email,
                    "notes": action.notes,
                    "created_at": action.created_at.to_rfc3339(),
                })
            })
            .collect();

        CommandResult::success_with_details(
            "show",
            format!("approval request {}", request.id),
            Some(json!({
                "id": request.id.0,
                "site": request.site,
                "trade": request.trade,
                "status": request.status.as_str(),
                "tenders_issued": request.tenders_issued,
                "tenders_received": request.tenders_received,
                "budget_value": request.budget_value,
                "estimated_profit": request.estimated_profit,
                "comments": request.comments,
                "requester_email": request.requester_email,
                "recommended_contractor":
                    request.recommended_bid().map(|bid| bid.contractor.clone()),
                "created_at": request.created_at.to_rfc3339(),
                "bids": comparison,
                "history": history,
            })),
        )
    })
}
