//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Attempt to load from environment variables
//! 2. If a required variable is missing, fall back to a config file
//! 3. Probe the working directory, its parents and the executable directory
//! 4. JSON and TOML are supported, detected by extension
//!
//! ## Environment Variables
//! Required:
//! - `TRANSITDESK_DB_PATH`: Database file path
//! - `TRANSITDESK_DB_POOL_SIZE`: Connection pool size
//!
//! Optional:
//! - `TRANSITDESK_DB_ENCRYPTION_KEY`: SQLCipher key
//! - `TRANSITDESK_ALERT_CRON`: Six-field cron expression of the alert batch
//! - `TRANSITDESK_ALERT_ENABLED`: Whether the batch is scheduled
//! - `TRANSITDESK_ALERT_TIMEOUT`: Batch timeout in seconds
//! - `TRANSITDESK_MANAGER_ROLE`: Role whose members receive every digest
//! - `TRANSITDESK_REPORT_ONLY_ON_CHANGE`: Skip unchanged digests
//! - `TRANSITDESK_SMTP_HOST`, `TRANSITDESK_SMTP_PORT`, `TRANSITDESK_SMTP_USER`,
//!   `TRANSITDESK_SMTP_PASSWORD`, `TRANSITDESK_MAIL_FROM`
//! - `TRANSITDESK_LOG_FILTER`, `TRANSITDESK_LOG_JSON`

use std::path::{Path, PathBuf};
use std::str::FromStr;

use transitdesk_domain::{
    AlertsConfig, Config, DatabaseConfig, LoggingConfig, MailConfig, Result, TransitDeskError,
};

const CONFIG_FILE_NAMES: [&str; 4] =
    ["config.json", "config.toml", "transitdesk.json", "transitdesk.toml"];

/// Load configuration, preferring the environment over files.
///
/// # Errors
/// Returns `TransitDeskError::Config` when neither source yields a valid
/// configuration.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables.
///
/// # Errors
/// Returns `TransitDeskError::Config` if a required variable is missing or a
/// value does not parse.
pub fn load_from_env() -> Result<Config> {
    let db_path = env_var("TRANSITDESK_DB_PATH")?;
    let db_pool_size: u32 = env_parse("TRANSITDESK_DB_POOL_SIZE", "pool size")?;
    let db_encryption_key = env_opt("TRANSITDESK_DB_ENCRYPTION_KEY");

    let alert_defaults = AlertsConfig::default();
    let alerts = AlertsConfig {
        cron_expression: env_opt("TRANSITDESK_ALERT_CRON")
            .unwrap_or(alert_defaults.cron_expression),
        manager_role: env_opt("TRANSITDESK_MANAGER_ROLE").unwrap_or(alert_defaults.manager_role),
        report_only_on_change: env_bool(
            "TRANSITDESK_REPORT_ONLY_ON_CHANGE",
            alert_defaults.report_only_on_change,
        ),
        job_timeout_seconds: env_parse_or(
            "TRANSITDESK_ALERT_TIMEOUT",
            "alert timeout",
            alert_defaults.job_timeout_seconds,
        )?,
        enabled: env_bool("TRANSITDESK_ALERT_ENABLED", alert_defaults.enabled),
    };

    let mail_defaults = MailConfig::default();
    let mail = MailConfig {
        smtp_host: env_opt("TRANSITDESK_SMTP_HOST"),
        smtp_port: env_parse_or("TRANSITDESK_SMTP_PORT", "SMTP port", mail_defaults.smtp_port)?,
        from_address: env_opt("TRANSITDESK_MAIL_FROM").unwrap_or(mail_defaults.from_address),
        smtp_user: env_opt("TRANSITDESK_SMTP_USER"),
        smtp_password: env_opt("TRANSITDESK_SMTP_PASSWORD"),
    };

    let logging_defaults = LoggingConfig::default();
    let logging = LoggingConfig {
        filter: env_opt("TRANSITDESK_LOG_FILTER").unwrap_or(logging_defaults.filter),
        json: env_bool("TRANSITDESK_LOG_JSON", logging_defaults.json),
    };

    Ok(Config {
        database: DatabaseConfig {
            path: db_path,
            pool_size: db_pool_size,
            encryption_key: db_encryption_key,
        },
        alerts,
        mail,
        logging,
    })
}

/// Load configuration from a file.
///
/// If `path` is `None`, probes the standard locations (see
/// [`probe_config_paths`]).
///
/// # Errors
/// Returns `TransitDeskError::Config` if the file is missing, unreadable or
/// invalid.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(TransitDeskError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            TransitDeskError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| TransitDeskError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| TransitDeskError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| TransitDeskError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(TransitDeskError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a configuration file.
///
/// Searches, in order, the working directory and its two parents, then the
/// executable's directory and its two parents. Within each directory
/// `config.{json,toml}` wins over `transitdesk.{json,toml}`.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        roots.push(exe_dir);
    }

    roots
        .iter()
        .flat_map(|root| root.ancestors().take(3))
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        TransitDeskError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Non-empty optional variable.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T>(key: &str, label: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_var(key)?
        .trim()
        .parse::<T>()
        .map_err(|e| TransitDeskError::Config(format!("Invalid {label}: {e}")))
}

fn env_parse_or<T>(key: &str, label: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        Some(_) => env_parse(key, label),
        None => Ok(default),
    }
}

/// Parse a boolean variable.
///
/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off`
/// (case-insensitive).
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
