use clap::ValueEnum;
use serde_json::json;

use tenderdesk_core::access::{Identity, Role};
use tenderdesk_core::domain::approval::{ActionType, ApprovalRequestId};

use crate::commands::{build_engine, current_thread_runtime, load_config, CommandResult};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum DecisionArg {
    Approve,
    Reject,
}

impl From<DecisionArg> for ActionType {
    fn from(arg: DecisionArg) -> Self {
        match arg {
            DecisionArg::Approve => ActionType::Approve,
            DecisionArg::Reject => ActionType::Reject,
        }
    }
}

pub fn run(
    id: &str,
    action: DecisionArg,
    notes: Option<String>,
    actor: &str,
    roles: Vec<Role>,
) -> CommandResult {
    let config = match load_config("decide") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match current_thread_runtime("decide") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let identity = Identity::new(actor, roles);
    let request_id = ApprovalRequestId(id.to_string());

    runtime.block_on(async {
        let engine = match build_engine("decide", &config).await {
            Ok(engine) => engine,
            Err(failure) => return failure,
        };

        match engine.act(&request_id, action.into(), notes, Some(&identity)).await {
            Ok(request) => {
                let latest = request.actions.first();
                CommandResult::success_with_details(
                    "decide",
                    format!("request {} is now {}", request.id, request.status),
                    Some(json!({
                        "id": request.id.0,
                        "status": request.status.as_str(),
                        "action": latest.map(|action| action.action.as_str()),
                        "actor_email": latest.map(|action| action.actor_email.clone()),
                        "notes": latest.and_then(|action| action.notes.clone()),
                    })),
                )
            }
            Err(error) => CommandResult::workflow_failure("decide", &error),
        }
    })
}
