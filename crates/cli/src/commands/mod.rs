pub mod config;
pub mod decide;
pub mod list;
pub mod migrate;
pub mod show;
pub mod submit;

use std::sync::Arc;

use serde::Serialize;

use tenderdesk_core::config::{AppConfig, LoadOptions};
use tenderdesk_core::errors::WorkflowError;
use tenderdesk_core::notify::LoggingNotifier;
use tenderdesk_core::workflow::WorkflowEngine;
use tenderdesk_db::{connect, SqlApprovalStore};

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_details(command, message, None)
    }

    pub fn success_with_details(
        command: &str,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            details,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            details: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn workflow_failure(command: &str, error: &WorkflowError) -> Self {
        let (error_class, exit_code) = workflow_error_class(error);
        Self::failure(command, error_class, error.to_string(), exit_code)
    }
}

/// Shared preamble for commands that need the workflow engine: load config,
/// build a current-thread runtime, connect the pool. Failures come back as
/// ready-to-print command results.
pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })
}

pub(crate) fn current_thread_runtime(
    command: &str,
) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        )
    })
}

pub(crate) async fn build_engine(
    command: &str,
    config: &AppConfig,
) -> Result<WorkflowEngine, CommandResult> {
    let pool = connect(&config.database).await.map_err(|error| {
        CommandResult::failure(command, "db_connectivity", error.to_string(), 4)
    })?;

    Ok(WorkflowEngine::new(
        Arc::new(SqlApprovalStore::new(pool)),
        Arc::new(LoggingNotifier),
        config.mail.approver_email.clone(),
    ))
}

fn workflow_error_class(error: &WorkflowError) -> (&'static str, u8) {
    match error {
        WorkflowError::Unauthenticated => ("unauthenticated", 6),
        WorkflowError::Forbidden(_) => ("forbidden", 7),
        WorkflowError::Validation(_) => ("validation", 2),
        WorkflowError::NotFound(_) => ("not_found", 8),
        WorkflowError::InvalidState { .. } => ("invalid_state", 9),
        WorkflowError::Persistence(_) => ("persistence", 4),
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

#[cfg(test)]
mod tests {
    use tenderdesk_core::domain::approval::ApprovalStatus;
    use tenderdesk_core::errors::{FieldViolation, WorkflowError};

    use super::{workflow_error_class, CommandResult};

    #[test]
    fn workflow_errors_map_to_stable_classes() {
        let cases = [
            (WorkflowError::Unauthenticated, "unauthenticated"),
            (WorkflowError::Forbidden("approver role required".to_string()), "forbidden"),
            (
                WorkflowError::Validation(vec![FieldViolation::new("site", "must not be empty")]),
                "validation",
            ),
            (WorkflowError::NotFound("AR-1".to_string()), "not_found"),
            (WorkflowError::InvalidState { status: ApprovalStatus::Approved }, "invalid_state"),
            (WorkflowError::Persistence("database locked".to_string()), "persistence"),
        ];
        for (error, expected) in cases {
            assert_eq!(workflow_error_class(&error).0, expected);
        }
    }

    #[test]
    fn success_payload_is_json_with_ok_status() {
        let result = CommandResult::success("migrate", "applied pending migrations");
        assert_eq!(result.exit_code, 0);
        let parsed: serde_json::Value =
            serde_json::from_str(&result.output).expect("valid json");
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["command"], "migrate");
    }

    #[test]
    fn failure_payload_carries_error_class_and_exit_code() {
        let result =
            CommandResult::workflow_failure("decide", &WorkflowError::NotFound("x".to_string()));
        assert_eq!(result.exit_code, 8);
        let parsed: serde_json::Value =
            serde_json::from_str(&result.output).expect("valid json");
        assert_eq!(parsed["error_class"], "not_found");
    }
}
