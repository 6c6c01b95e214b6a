//! Configuration struct definitions.
//!
//! Every section derives `Default` with the same values as the embedded
//! `defaults.toml`, so a partially written file deserializes cleanly.

use serde::{Deserialize, Serialize};

/// The whole configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Orchestrator settings.
    pub runtime: RuntimeSection,
    /// Network settings for entry documents and assets.
    pub fetch: FetchSection,
    /// Log pipeline.
    pub logging: LoggingSection,
    /// Applications to register, in precedence order.
    pub apps: Vec<AppSection>,
}

/// `[runtime]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSection {
    /// Upper bound for each bootstrap, mount and unmount hook.
    pub lifecycle_timeout_secs: u64,
    /// Capacity of the event bus channel.
    pub event_channel_capacity: usize,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            lifecycle_timeout_secs: 30,
            event_channel_capacity: 256,
        }
    }
}

/// `[fetch]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSection {
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Largest accepted response body.
    pub max_document_bytes: u64,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "mosaic".to_owned(),
            max_document_bytes: 5_242_880,
        }
    }
}

/// `[logging]`
///
/// Plain strings here; the CLI turns them into a telemetry `LogConfig`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Base filter.
    pub level: String,
    /// `pretty`, `compact`, `json` or `full`.
    pub format: String,
    /// `stdout`, `stderr` or `file`.
    pub target: String,
    /// Log directory, required when `target = "file"`.
    pub directory: Option<String>,
    /// File name prefix for file logging.
    pub file_prefix: String,
    /// Include timestamps.
    pub timestamps: bool,
    /// Use ANSI colors.
    pub ansi: bool,
    /// Extra filter directives.
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            target: "stderr".to_owned(),
            directory: None,
            file_prefix: "mosaic".to_owned(),
            timestamps: true,
            ansi: true,
            directives: Vec::new(),
        }
    }
}

/// One `[[apps]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSection {
    /// Unique application name.
    pub name: String,
    /// Absolute URL of the entry document.
    pub entry: String,
    /// Mount target selector.
    #[serde(default = "default_container")]
    pub container: String,
    /// Path prefix activating the application.
    pub active_rule: String,
}

fn default_container() -> String {
    "#subapp".to_owned()
}
