//! Conversion from `mosaic_config::Config` to runtime types.

use std::path::PathBuf;
use std::time::Duration;

use mosaic_assets::FetchSettings;
use mosaic_config::Config;
use mosaic_core::{AppDescriptor, CoreResult};
use mosaic_telemetry::{FileRotation, LogConfig, LogFormat, LogTarget};

/// Convert the `[logging]` section to a [`LogConfig`].
#[must_use]
pub fn to_log_config(cfg: &Config) -> LogConfig {
    let logging = &cfg.logging;
    let format = match logging.format.as_str() {
        "pretty" => LogFormat::Pretty,
        "json" => LogFormat::Json,
        "full" => LogFormat::Full,
        _ => LogFormat::Compact,
    };

    let mut log_config = LogConfig::new(&logging.level).with_format(format);
    log_config = match (logging.target.as_str(), &logging.directory) {
        ("file", Some(dir)) => log_config.with_file_logging(
            PathBuf::from(dir),
            &logging.file_prefix,
            FileRotation::Daily,
        ),
        ("stdout", _) => log_config.with_target(LogTarget::Stdout),
        _ => log_config.with_target(LogTarget::Stderr),
    };
    if !logging.timestamps {
        log_config = log_config.without_timestamps();
    }
    if !logging.ansi {
        log_config = log_config.without_ansi();
    }
    for directive in &logging.directives {
        log_config = log_config.with_directive(directive);
    }

    log_config
}

/// Convert the `[fetch]` section to [`FetchSettings`].
#[must_use]
pub fn to_fetch_settings(cfg: &Config) -> FetchSettings {
    FetchSettings {
        timeout: Duration::from_secs(cfg.fetch.timeout_secs),
        user_agent: cfg.fetch.user_agent.clone(),
        max_bytes: usize::try_from(cfg.fetch.max_document_bytes).unwrap_or(usize::MAX),
    }
}

/// Lifecycle hook timeout from `[runtime]`.
#[must_use]
pub fn lifecycle_timeout(cfg: &Config) -> Duration {
    Duration::from_secs(cfg.runtime.lifecycle_timeout_secs)
}

/// Convert every `[[apps]]` entry, in order.
///
/// # Errors
///
/// Returns the first descriptor that fails validation.
pub fn to_descriptors(cfg: &Config) -> CoreResult<Vec<AppDescriptor>> {
    cfg.apps
        .iter()
        .map(|app| AppDescriptor::new(&app.name, &app.entry, &app.container, &app.active_rule))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_config::AppSection;

    #[test]
    fn test_log_config_mapping() {
        let mut cfg = Config::default();
        cfg.logging.level = "debug".to_owned();
        cfg.logging.format = "json".to_owned();
        cfg.logging.timestamps = false;
        cfg.logging.directives = vec!["mosaic_runtime=trace".to_owned()];

        let lc = to_log_config(&cfg);
        assert_eq!(lc.level, "debug");
        assert_eq!(lc.format, LogFormat::Json);
        assert!(!lc.timestamps);
        assert_eq!(lc.directives, vec!["mosaic_runtime=trace"]);
        assert_eq!(lc.target, LogTarget::Stderr);
    }

    #[test]
    fn test_file_target_mapping() {
        let mut cfg = Config::default();
        cfg.logging.target = "file".to_owned();
        cfg.logging.directory = Some("/var/log/mosaic".to_owned());

        let lc = to_log_config(&cfg);
        assert_eq!(lc.target, LogTarget::File("/var/log/mosaic".into()));
        assert!(!lc.ansi);
    }

    #[test]
    fn test_fetch_and_timeouts() {
        let mut cfg = Config::default();
        cfg.fetch.timeout_secs = 3;
        cfg.runtime.lifecycle_timeout_secs = 7;

        let settings = to_fetch_settings(&cfg);
        assert_eq!(settings.timeout, Duration::from_secs(3));
        assert_eq!(settings.user_agent, "mosaic");
        assert_eq!(settings.max_bytes, 5_242_880);
        assert_eq!(lifecycle_timeout(&cfg), Duration::from_secs(7));
    }

    #[test]
    fn test_descriptors_keep_order() {
        let mut cfg = Config::default();
        cfg.apps = vec![
            AppSection {
                name: "orders".to_owned(),
                entry: "http://localhost:7100/".to_owned(),
                container: "#subapp".to_owned(),
                active_rule: "/orders".to_owned(),
            },
            AppSection {
                name: "billing".to_owned(),
                entry: "http://localhost:7200/".to_owned(),
                container: "#subapp".to_owned(),
                active_rule: "/billing".to_owned(),
            },
        ];

        let descriptors = to_descriptors(&cfg).unwrap();
        assert_eq!(descriptors[0].name(), "orders");
        assert!(descriptors[1].matches("/billing/invoices"));
    }
}
