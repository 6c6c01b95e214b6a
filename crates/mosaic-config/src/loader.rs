//! Config file discovery and layered loading.
//!
//! 1. Parse the embedded `defaults.toml`
//! 2. Merge the explicit file, or `./mosaic.toml` when present
//! 3. Apply `MOSAIC_*` environment overrides
//! 4. Deserialize and validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::env::{apply_env_overrides, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::deep_merge;
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
pub const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// File looked up in the working directory when no path is given.
pub const LOCAL_CONFIG_FILE: &str = "mosaic.toml";

/// Largest accepted config file (1 MB).
const MAX_CONFIG_FILE_SIZE: usize = 1_048_576;

/// A loaded configuration and where it came from.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// The final configuration.
    pub config: Config,
    /// Files merged over the defaults.
    pub loaded_files: Vec<String>,
    /// Environment variables that overrode a value.
    pub env_overrides: Vec<String>,
}

impl ResolvedConfig {
    /// Render the configuration as TOML.
    ///
    /// # Errors
    ///
    /// [`ConfigError::RenderError`] if serialization fails.
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(&self.config)?)
    }
}

/// Load with the process environment and working directory.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a file is unreadable or malformed, an
/// override does not parse, or the result fails validation.
pub fn load(explicit: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    let cwd = std::env::current_dir().map_err(|e| ConfigError::ReadError {
        path: ".".to_owned(),
        source: e,
    })?;
    load_with(explicit, &cwd, &collect_env_vars())
}

/// Load with an explicit working directory and environment.
///
/// An explicit file must exist. Without one, `{cwd}/mosaic.toml` is merged
/// if it exists.
///
/// # Errors
///
/// See [`load`].
pub fn load_with(
    explicit: Option<&Path>,
    cwd: &Path,
    env: &HashMap<String, String>,
) -> ConfigResult<ResolvedConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;
    let mut loaded_files = Vec::new();

    let file = match explicit {
        Some(path) => Some((read_file(path)?, path.to_path_buf())),
        None => {
            let local: PathBuf = cwd.join(LOCAL_CONFIG_FILE);
            try_read_file(&local)?.map(|overlay| (overlay, local))
        },
    };
    if let Some((overlay, path)) = file {
        deep_merge(&mut merged, &overlay);
        info!(path = %path.display(), "loaded config file");
        loaded_files.push(path.display().to_string());
    }

    let env_overrides = apply_env_overrides(&mut merged, env)?;
    if !env_overrides.is_empty() {
        debug!(count = env_overrides.len(), "applied environment overrides");
    }

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;
    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        loaded_files,
        env_overrides,
    })
}

/// Load a single file over the defaults, ignoring the environment.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file is unreadable, malformed or invalid.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let cwd = path.parent().unwrap_or_else(|| Path::new("."));
    load_with(Some(path), cwd, &HashMap::new()).map(|resolved| resolved.config)
}

fn read_file(path: &Path) -> ConfigResult<toml::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_file(path, &content)
}

/// Read a file, returning `None` if it doesn't exist.
fn try_read_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_file(path, &content).map(Some),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            Ok(None)
        },
        Err(e) => Err(ConfigError::ReadError {
            path: path.display().to_string(),
            source: e,
        }),
    }
}

fn parse_file(path: &Path, content: &str) -> ConfigResult<toml::Value> {
    if content.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len()
            ),
        });
    }
    toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const APPS_TOML: &str = r##"
[runtime]
lifecycle_timeout_secs = 5

[[apps]]
name = "orders"
entry = "http://localhost:7100/"
active_rule = "/orders"

[[apps]]
name = "billing"
entry = "http://localhost:7200/"
container = "#main"
active_rule = "/billing"
"##;

    #[test]
    fn test_defaults_deserialize_to_default_config() {
        let config: Config = toml::from_str(DEFAULTS_TOML).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_defaults_only() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = load_with(None, dir.path(), &HashMap::new()).unwrap();
        assert_eq!(resolved.config, Config::default());
        assert!(resolved.loaded_files.is_empty());
    }

    #[test]
    fn test_local_file_discovered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(LOCAL_CONFIG_FILE), APPS_TOML).unwrap();

        let resolved = load_with(None, dir.path(), &HashMap::new()).unwrap();
        let config = resolved.config;
        assert_eq!(config.runtime.lifecycle_timeout_secs, 5);
        assert_eq!(config.runtime.event_channel_capacity, 256);
        assert_eq!(config.apps.len(), 2);
        assert_eq!(config.apps[0].container, "#subapp");
        assert_eq!(config.apps[1].container, "#main");
        assert_eq!(resolved.loaded_files.len(), 1);
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, APPS_TOML).unwrap();
        let env = HashMap::from([(
            "MOSAIC_LIFECYCLE_TIMEOUT_SECS".to_owned(),
            "9".to_owned(),
        )]);

        let resolved = load_with(Some(&path), dir.path(), &env).unwrap();
        assert_eq!(resolved.config.runtime.lifecycle_timeout_secs, 9);
        assert_eq!(resolved.env_overrides, vec!["MOSAIC_LIFECYCLE_TIMEOUT_SECS"]);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_with(Some(&dir.path().join("nope.toml")), dir.path(), &HashMap::new());
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[fetch]\nuser_agent = \"\"\n").unwrap();
        assert!(matches!(
            load_file(&path),
            Err(ConfigError::ValidationError { field, .. }) if field == "fetch.user_agent"
        ));

        std::fs::write(&path, "[fetch\n").unwrap();
        assert!(matches!(load_file(&path), Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_oversized_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.toml");
        let data = "x = \"".to_owned() + &"a".repeat(1_100_000) + "\"";
        std::fs::write(&path, data).unwrap();
        assert!(matches!(
            load_file(&path),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_render_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(LOCAL_CONFIG_FILE), APPS_TOML).unwrap();
        let resolved = load_with(None, dir.path(), &HashMap::new()).unwrap();

        let rendered = resolved.to_toml().unwrap();
        let reparsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(reparsed, resolved.config);
    }
}
