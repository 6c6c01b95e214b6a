//! The host's true global context.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use crate::value::Value;

/// Host-owned singletons that every application reads unwrapped.
///
/// These resolve against the host even after an application has written the
/// same name into its own store.
pub const PASSTHROUGH_KEYS: &[&str] = &["document", "location", "history", "navigator"];

/// Whether `key` is a host-owned passthrough reference.
#[must_use]
pub(crate) fn is_passthrough(key: &str) -> bool {
    PASSTHROUGH_KEYS.contains(&key)
}

/// The shared global context of the host page.
///
/// Sandboxes hold a shared reference and only ever read it. Writes go through
/// [`define`](Self::define), which is reserved for the host itself.
#[derive(Debug, Default)]
pub struct HostGlobals {
    values: RwLock<BTreeMap<String, Value>>,
}

impl HostGlobals {
    /// Create an empty host context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a host context seeded with `entries`.
    pub fn with_entries<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let values = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self {
            values: RwLock::new(values),
        }
    }

    /// Read a host global.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Whether the host defines `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Define or replace a host global. Host-side only.
    pub fn define(&self, key: impl Into<String>, value: Value) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value);
    }

    /// All defined keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_get() {
        let host = HostGlobals::with_entries([("title", Value::from("host"))]);
        assert_eq!(host.get("title"), Some(Value::from("host")));
        assert!(host.get("missing").is_none());

        host.define("count", Value::Number(1.0));
        assert!(host.contains("count"));
        assert_eq!(host.keys(), vec!["count", "title"]);
    }

    #[test]
    fn test_passthrough_keys() {
        assert!(is_passthrough("document"));
        assert!(is_passthrough("navigator"));
        assert!(!is_passthrough("window"));
    }
}
