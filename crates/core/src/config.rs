use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub mail: MailConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Addressing for notification dispatch. The SMTP credential is held for the
/// external transport; the core never opens a connection itself.
#[derive(Clone, Debug)]
pub struct MailConfig {
    pub approver_email: String,
    pub from_address: String,
    pub smtp_host: Option<String>,
    pub smtp_password: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub approver_email: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://tenderdesk.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            mail: MailConfig {
                approver_email: "approvals@tenderdesk.local".to_string(),
                from_address: "noreply@tenderdesk.local".to_string(),
                smtp_host: None,
                smtp_password: None,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    mail: Option<MailPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct MailPatch {
    approver_email: Option<String>,
    from_address: Option<String>,
    smtp_host: Option<String>,
    smtp_password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    /// Layered load: defaults, then an optional `tenderdesk.toml` patch, then
    /// `TENDERDESK_*` environment overrides, then programmatic overrides.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("tenderdesk.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(mail) = patch.mail {
            if let Some(approver_email) = mail.approver_email {
                self.mail.approver_email = approver_email;
            }
            if let Some(from_address) = mail.from_address {
                self.mail.from_address = from_address;
            }
            if let Some(smtp_host) = mail.smtp_host {
                self.mail.smtp_host = Some(smtp_host);
            }
            if let Some(smtp_password_value) = mail.smtp_password {
                self.mail.smtp_password = Some(smtp_password_value.into());
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = env::var("TENDERDESK_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(value) = env::var("TENDERDESK_DB_MAX_CONNECTIONS") {
            self.database.max_connections =
                value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                    key: "TENDERDESK_DB_MAX_CONNECTIONS".to_string(),
                    value,
                })?;
        }
        if let Ok(approver_email) = env::var("TENDERDESK_APPROVER_EMAIL") {
            self.mail.approver_email = approver_email;
        }
        if let Ok(from_address) = env::var("TENDERDESK_FROM_ADDRESS") {
            self.mail.from_address = from_address;
        }
        if let Ok(smtp_host) = env::var("TENDERDESK_SMTP_HOST") {
            self.mail.smtp_host = Some(smtp_host);
        }
        if let Ok(smtp_password_value) = env::var("TENDERDESK_SMTP_PASSWORD") {
            self.mail.smtp_password = Some(smtp_password_value.into());
        }
        if let Ok(level) = env::var("TENDERDESK_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(value) = env::var("TENDERDESK_LOG_FORMAT") {
            self.logging.format =
                value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                    key: "TENDERDESK_LOG_FORMAT".to_string(),
                    value,
                })?;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(url) = overrides.database_url {
            self.database.url = url;
        }
        if let Some(approver_email) = overrides.approver_email {
            self.mail.approver_email = approver_email;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if !self.mail.approver_email.contains('@') {
            return Err(ConfigError::Validation(format!(
                "mail.approver_email `{}` is not an email address",
                self.mail.approver_email
            )));
        }
        if !self.mail.from_address.contains('@') {
            return Err(ConfigError::Validation(format!(
                "mail.from_address `{}` is not an email address",
                self.mail.from_address
            )));
        }
        Ok(())
    }
}

fn resolve_config_path(requested: Option<&Path>) -> Option<PathBuf> {
    match requested {
        Some(path) if path.exists() => Some(path.to_path_buf()),
        Some(_) => None,
        None => {
            let default = PathBuf::from("tenderdesk.toml");
            default.exists().then_some(default)
        }
    }
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::load(LoadOptions::default()).expect("defaults");
        assert_eq!(config.database.url, "sqlite://tenderdesk.db");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn toml_patch_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "[database]\nurl = \"sqlite://custom.db\"\n\n\
             [mail]\napprover_email = \"qs@example.co.uk\"\n\n\
             [logging]\nlevel = \"debug\"\nformat = \"json\"\n"
        )
        .expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        })
        .expect("load");

        assert_eq!(config.database.url, "sqlite://custom.db");
        assert_eq!(config.mail.approver_email, "qs@example.co.uk");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let error = AppConfig::load(LoadOptions {
            config_path: Some("does-not-exist.toml".into()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        })
        .expect_err("missing file");
        assert!(matches!(error, ConfigError::MissingConfigFile(_)));
    }

    #[test]
    fn programmatic_overrides_win() {
        let config = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                approver_email: Some("lead@example.co.uk".to_string()),
                log_level: Some("trace".to_string()),
            },
            ..LoadOptions::default()
        })
        .expect("load");

        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.mail.approver_email, "lead@example.co.uk");
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn rejects_non_email_approver_address() {
        let error = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                approver_email: Some("not-an-address".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect_err("invalid address");
        assert!(matches!(error, ConfigError::Validation(_)));
    }
}
