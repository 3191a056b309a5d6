use serde_json::json;

use tenderdesk_core::access::{Identity, Role};

use crate::commands::{build_engine, current_thread_runtime, load_config, CommandResult};

pub fn run(actor: &str, roles: Vec<Role>) -> CommandResult {
    let config = match load_config("list") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match current_thread_runtime("list") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let identity = Identity::new(actor, roles);

    runtime.block_on(async {
        let engine = match build_engine("list", &config).await {
            Ok(engine) => engine,
            Err(failure) => return failure,
        };

        match engine.list(Some(&identity)).await {
            Ok(requests) => {
                let summaries: Vec<serde_json::Value> = requests
                    .iter()
                    .map(|request| {
                        json!({
                            "id": request.id.0,
                            "site": request.site,
                            "trade": request.trade,
                            "status": request.status.as_str(),
                            "requester_email": request.requester_email,
                            "bids": request.bids.len(),
                            "budget_value": request.budget_value,
                            "created_at": request.created_at.to_rfc3339(),
                        })
                    })
                    .collect();
                CommandResult::success_with_details(
                    "list",
                    format!("{} approval request(s)", summaries.len()),
                    Some(json!({ "requests": summaries })),
                )
            }
            Err(error) => CommandResult::workflow_failure("list", &error),
        }
    })
}
