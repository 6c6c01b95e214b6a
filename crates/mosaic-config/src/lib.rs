//! Mosaic Config - Layered configuration for the Mosaic orchestrator.
//!
//! # Usage
//!
//! ```rust,no_run
//! use mosaic_config::Config;
//!
//! let resolved = Config::load(None).unwrap();
//! for app in &resolved.config.apps {
//!     println!("{} -> {}", app.active_rule, app.entry);
//! }
//! ```
//!
//! # Precedence
//!
//! From highest to lowest priority:
//!
//! 1. Environment overrides (`MOSAIC_LOG_LEVEL`, `MOSAIC_LOG_FORMAT`,
//!    `MOSAIC_FETCH_TIMEOUT_SECS`, `MOSAIC_LIFECYCLE_TIMEOUT_SECS`)
//! 2. The explicit file, or `./mosaic.toml`
//! 3. Embedded defaults (`defaults.toml` compiled into the binary)
//!
//! This crate has no dependencies on other Mosaic crates. Conversion into
//! runtime types happens at the CLI boundary.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

/// `MOSAIC_*` environment overrides.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layer merging.
pub mod merge;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::ResolvedConfig;
pub use types::*;

impl Config {
    /// Load with full precedence chain.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a file is malformed or the merged
    /// configuration fails validation.
    pub fn load(explicit: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit)
    }

    /// Load one file over the defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file is unreadable, malformed or invalid.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
