//! Post-merge configuration validation.

use std::collections::HashSet;

use url::Url;

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

const LOG_FORMATS: [&str; 4] = ["pretty", "compact", "json", "full"];
const LOG_TARGETS: [&str; 3] = ["stdout", "stderr", "file"];

/// Validate a fully merged configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_runtime(config)?;
    validate_fetch(config)?;
    validate_logging(config)?;
    validate_apps(config)?;
    Ok(())
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn validate_runtime(config: &Config) -> ConfigResult<()> {
    if config.runtime.lifecycle_timeout_secs == 0 {
        return Err(invalid(
            "runtime.lifecycle_timeout_secs",
            "must be greater than zero",
        ));
    }
    if config.runtime.event_channel_capacity == 0 {
        return Err(invalid(
            "runtime.event_channel_capacity",
            "must be greater than zero",
        ));
    }
    Ok(())
}

fn validate_fetch(config: &Config) -> ConfigResult<()> {
    let fetch = &config.fetch;
    if fetch.timeout_secs == 0 {
        return Err(invalid("fetch.timeout_secs", "must be greater than zero"));
    }
    if fetch.user_agent.trim().is_empty() {
        return Err(invalid("fetch.user_agent", "must not be empty"));
    }
    if fetch.max_document_bytes == 0 {
        return Err(invalid(
            "fetch.max_document_bytes",
            "must be greater than zero",
        ));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let logging = &config.logging;
    if !LOG_FORMATS.contains(&logging.format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unknown format '{}'; expected one of: {}",
                logging.format,
                LOG_FORMATS.join(", ")
            ),
        ));
    }
    if !LOG_TARGETS.contains(&logging.target.as_str()) {
        return Err(invalid(
            "logging.target",
            format!(
                "unknown target '{}'; expected one of: {}",
                logging.target,
                LOG_TARGETS.join(", ")
            ),
        ));
    }
    if logging.target == "file" && logging.directory.as_deref().is_none_or(str::is_empty) {
        return Err(invalid(
            "logging.directory",
            "required when logging.target is \"file\"",
        ));
    }
    Ok(())
}

fn validate_apps(config: &Config) -> ConfigResult<()> {
    let mut seen = HashSet::new();
    for (i, app) in config.apps.iter().enumerate() {
        let field = |name: &str| format!("apps[{i}].{name}");

        let name_ok = !app.name.is_empty()
            && app
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !name_ok {
            return Err(invalid(
                field("name"),
                format!(
                    "'{}' must be non-empty and use only letters, digits, '-' and '_'",
                    app.name
                ),
            ));
        }
        if !seen.insert(app.name.as_str()) {
            return Err(invalid(
                field("name"),
                format!("duplicate application name '{}'", app.name),
            ));
        }

        if let Err(e) = Url::parse(&app.entry) {
            return Err(invalid(
                field("entry"),
                format!("'{}' is not an absolute URL: {e}", app.entry),
            ));
        }
        if app.container.trim().is_empty() {
            return Err(invalid(field("container"), "must not be empty"));
        }
        if !app.active_rule.starts_with('/') {
            return Err(invalid(
                field("active_rule"),
                format!("'{}' must start with '/'", app.active_rule),
            ));
        }
    }
    Ok(())
}
