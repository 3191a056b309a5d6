use serde_json::json;

use crate::commands::{load_config, CommandResult};

pub fn run() -> CommandResult {
    let config = match load_config("config") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let format = match config.logging.format {
        tenderdesk_core::config::LogFormat::Compact => "compact",
        tenderdesk_core::config::LogFormat::Pretty => "pretty",
        tenderdesk_core::config::LogFormat::Json => "json",
    };

    CommandResult::success_with_details(
        "config",
        "effective configuration",
        Some(json!({
            "database": {
                "url": config.database.url,
                "max_connections": config.database.max_connections,
                "timeout_secs": config.database.timeout_secs,
            },
            "mail": {
                "approver_email": config.mail.approver_email,
                "from_address": config.mail.from_address,
                "smtp_host": config.mail.smtp_host,
                // The secret itself never leaves the config type.
                "smtp_password": config.mail.smtp_password.as_ref().map(|_| "<redacted>"),
            },
            "logging": {
                "level": config.logging.level,
                "format": format,
            },
        })),
    )
}
