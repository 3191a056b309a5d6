use std::fs;
use std::path::Path;

use serde_json::json;

use tenderdesk_core::access::{Identity, Role};
use tenderdesk_core::workflow::SubmitCommand;

use crate::commands::{build_engine, current_thread_runtime, load_config, CommandResult};

pub fn run(file: &Path, actor: &str, roles: Vec<Role>) -> CommandResult {
    let config = match load_config("submit") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let raw = match fs::read_to_string(file) {
        Ok(raw) => raw,
        Err(error) => {
            return CommandResult::failure(
                "submit",
                "bad_request",
                format!("could not read `{}`: {error}", file.display()),
                2,
            );
        }
    };
    let cmd: SubmitCommand = match serde_json::from_str(&raw) {
        Ok(cmd) => cmd,
        Err(error) => {
            return CommandResult::failure(
                "submit",
                "bad_request",
                format!("could not parse `{}`: {error}", file.display()),
                2,
            );
        }
    };

    let runtime = match current_thread_runtime("submit") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let identity = Identity::new(actor, roles);

    runtime.block_on(async {
        let engine = match build_engine("submit", &config).await {
            Ok(engine) => engine,
            Err(failure) => return failure,
        };

        match engine.create_request(cmd, Some(&identity)).await {
            Ok(request) => CommandResult::success_with_details(
                "submit",
                "approval request created",
                Some(json!({
                    "id": request.id.0,
                    "site": request.site,
                    "trade": request.trade,
                    "status": request.status.as_str(),
                    "bids": request.bids.len(),
                    "recommended_bid_id": request.recommended_bid_id.map(|id| id.0),
                })),
            ),
            Err(error) => CommandResult::workflow_failure("submit", &error),
        }
    })
}
