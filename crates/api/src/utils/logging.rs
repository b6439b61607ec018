//! Tracing subscriber setup and stable error labels for log fields.

use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;
use transitdesk_domain::{LoggingConfig, TransitDeskError};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `config.filter`. Returns an error when a subscriber
/// is already installed or the filter does not parse.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = build_filter(config)?;

    if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(true).with_target(true))
            .try_init()?;
    } else {
        tracing_subscriber::registry().with(filter).with(fmt::layer().with_target(true)).try_init()?;
    }
    Ok(())
}

fn build_filter(config: &LoggingConfig) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(&config.filter)?),
    }
}

/// Stable label for a domain error, used as a structured log field.
#[inline]
pub const fn error_label(error: &TransitDeskError) -> &'static str {
    match error {
        TransitDeskError::Database(_) => "database",
        TransitDeskError::Config(_) => "config",
        TransitDeskError::Messaging(_) => "messaging",
        TransitDeskError::Scheduling(_) => "scheduling",
        TransitDeskError::NotFound(_) => "not_found",
        TransitDeskError::InvalidInput(_) => "invalid_input",
        TransitDeskError::Validation(_) => "validation",
        TransitDeskError::Internal(_) => "internal",
    }
}
