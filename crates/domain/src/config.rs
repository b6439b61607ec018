//! Configuration management

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_MANAGER_ROLE;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
    #[serde(skip_serializing, default)]
    pub encryption_key: Option<String>,
}

/// ETA alert batch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// Six-field cron expression (seconds first) for the recompute batch.
    pub cron_expression: String,
    /// Members of this role receive every digest.
    pub manager_role: String,
    /// Only mail the digest when the run changed at least one folder. Set to
    /// `false` to re-mail it on every run while folders stay flagged.
    pub report_only_on_change: bool,
    pub job_timeout_seconds: u64,
    pub enabled: bool,
}

/// Outgoing mail configuration
///
/// Without `smtp_host` mails are recorded but never leave the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub from_address: String,
    pub smtp_user: Option<String>,
    #[serde(skip_serializing)]
    pub smtp_password: Option<String>,
}

/// Log output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub filter: String,
    pub json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                path: "transitdesk.db".to_string(),
                pool_size: 8,
                encryption_key: None,
            },
            alerts: AlertsConfig::default(),
            mail: MailConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            cron_expression: "0 0 7 * * *".to_string(),
            manager_role: DEFAULT_MANAGER_ROLE.to_string(),
            report_only_on_change: true,
            job_timeout_seconds: 300,
            enabled: true,
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: 587,
            from_address: "noreply@transitdesk.local".to_string(),
            smtp_user: None,
            smtp_password: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "info".to_string(), json: false }
    }
}
