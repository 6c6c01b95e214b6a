//! `MOSAIC_*` environment overrides.
//!
//! Environment values win over every file layer.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::merge::set_path;

#[derive(Clone, Copy)]
enum Kind {
    Text,
    Integer,
}

struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
    kind: Kind,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "MOSAIC_LOG_LEVEL",
        field_path: "logging.level",
        kind: Kind::Text,
    },
    EnvMapping {
        var_name: "MOSAIC_LOG_FORMAT",
        field_path: "logging.format",
        kind: Kind::Text,
    },
    EnvMapping {
        var_name: "MOSAIC_FETCH_TIMEOUT_SECS",
        field_path: "fetch.timeout_secs",
        kind: Kind::Integer,
    },
    EnvMapping {
        var_name: "MOSAIC_LIFECYCLE_TIMEOUT_SECS",
        field_path: "runtime.lifecycle_timeout_secs",
        kind: Kind::Integer,
    },
];

/// Snapshot of the process environment, restricted to `MOSAIC_*` variables.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with("MOSAIC_"))
        .collect()
}

/// Apply every known override present in `env` to the merged tree.
///
/// Returns the names of the variables that were applied.
///
/// # Errors
///
/// [`ConfigError::EnvError`] if a numeric variable does not parse.
pub fn apply_env_overrides(
    merged: &mut toml::Value,
    env: &HashMap<String, String>,
) -> ConfigResult<Vec<String>> {
    let mut applied = Vec::new();
    for mapping in ENV_MAPPINGS {
        let Some(raw) = env.get(mapping.var_name) else {
            continue;
        };
        let value = match mapping.kind {
            Kind::Text => toml::Value::String(raw.clone()),
            Kind::Integer => {
                let parsed = raw.trim().parse::<i64>().map_err(|e| ConfigError::EnvError {
                    var_name: mapping.var_name.to_owned(),
                    message: format!("expected an integer: {e}"),
                })?;
                toml::Value::Integer(parsed)
            },
        };
        if set_path(merged, mapping.field_path, value) {
            debug!(var = mapping.var_name, field = mapping.field_path, "applied env override");
            applied.push(mapping.var_name.to_owned());
        }
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_overrides_applied() {
        let mut merged: toml::Value = toml::from_str("[logging]\nlevel = \"info\"").unwrap();
        let applied = apply_env_overrides(
            &mut merged,
            &env(&[
                ("MOSAIC_LOG_LEVEL", "debug"),
                ("MOSAIC_FETCH_TIMEOUT_SECS", "7"),
                ("MOSAIC_UNRELATED", "x"),
            ]),
        )
        .unwrap();

        assert_eq!(applied, vec!["MOSAIC_LOG_LEVEL", "MOSAIC_FETCH_TIMEOUT_SECS"]);
        assert_eq!(merged["logging"]["level"].as_str(), Some("debug"));
        assert_eq!(merged["fetch"]["timeout_secs"].as_integer(), Some(7));
    }

    #[test]
    fn test_bad_integer_rejected() {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        let err = apply_env_overrides(
            &mut merged,
            &env(&[("MOSAIC_LIFECYCLE_TIMEOUT_SECS", "soon")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::EnvError { var_name, .. } if var_name == "MOSAIC_LIFECYCLE_TIMEOUT_SECS"));
    }
}
