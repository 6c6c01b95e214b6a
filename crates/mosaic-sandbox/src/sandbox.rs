//! Per-application global store layered over the host globals.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use mosaic_core::AppName;
use tracing::trace;

use crate::error::{SandboxError, SandboxResult};
use crate::host::{HostGlobals, is_passthrough};
use crate::value::Value;

/// An isolated global context for one application instance.
///
/// Layering works like a copy-on-write overlay: the host globals are the
/// lower layer, the private store is the upper layer. Reads check the upper
/// layer first. Writes only ever touch the upper layer; a nested write into a
/// host-owned object first copies that object up.
///
/// The application's own name is a reserved key: assigning a function, or an
/// object carrying functions, to it records the application's lifecycle
/// exports instead of an ordinary global.
#[derive(Debug)]
pub struct Sandbox {
    app: AppName,
    host: Arc<HostGlobals>,
    store: RwLock<BTreeMap<String, Value>>,
    exports: RwLock<Option<Value>>,
}

impl Sandbox {
    /// Create an empty sandbox for `app` over `host`.
    #[must_use]
    pub fn new(app: AppName, host: Arc<HostGlobals>) -> Self {
        Self {
            app,
            host,
            store: RwLock::new(BTreeMap::new()),
            exports: RwLock::new(None),
        }
    }

    /// The owning application.
    #[must_use]
    pub fn app(&self) -> &AppName {
        &self.app
    }

    /// The shared host context.
    #[must_use]
    pub fn host(&self) -> &Arc<HostGlobals> {
        &self.host
    }

    /// Read a global as seen by this application.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        if is_passthrough(key) {
            return self.host.get(key);
        }
        if key == self.app.as_str()
            && let Some(exports) = self.exports()
        {
            return Some(exports);
        }
        if let Some(value) = self.read_store(key) {
            return Some(value);
        }
        self.host.get(key)
    }

    /// Whether `key` resolves to anything for this application.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Write a global. Never reaches the host or another sandbox.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if key == self.app.as_str() && value.is_callable_export() {
            trace!(app = %self.app, "Recorded lifecycle exports");
            *self.exports.write().unwrap_or_else(PoisonError::into_inner) = Some(value);
            return;
        }
        trace!(app = %self.app, key = %key, "Sandbox write");
        self.store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value);
    }

    /// Remove a private write so reads fall back to the host again.
    ///
    /// Host globals are never deleted. Returns `true` if a private value existed.
    pub fn delete(&self, key: &str) -> bool {
        self.store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }

    /// Read a nested value, e.g. `["config", "theme"]`.
    #[must_use]
    pub fn get_path(&self, path: &[String]) -> Option<Value> {
        let (root, rest) = path.split_first()?;
        let value = self.get(root)?;
        value.get_path(rest).cloned()
    }

    /// Write a nested value.
    ///
    /// If the root object has not been written by this application yet, the
    /// host's copy is cloned into the private store first, so the host object
    /// itself is never mutated. Paths under the identity key update the
    /// recorded exports, matching what [`Sandbox::get`] returns for it.
    ///
    /// # Errors
    ///
    /// [`SandboxError::Undefined`] if the root does not resolve, and
    /// [`SandboxError::NotAnObject`] if an intermediate step is missing or
    /// not compound.
    pub fn set_path(&self, path: &[String], value: Value) -> SandboxResult<()> {
        let Some((root, rest)) = path.split_first() else {
            return Err(SandboxError::NotAnObject {
                path: String::new(),
            });
        };
        if rest.is_empty() {
            self.set(root.clone(), value);
            return Ok(());
        }

        let dotted = path.join(".");
        if root == self.app.as_str() {
            let mut exports = self.exports.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(target) = exports.as_mut() {
                return if target.set_path(rest, value) {
                    trace!(app = %self.app, path = %dotted, "Updated lifecycle exports");
                    Ok(())
                } else {
                    Err(SandboxError::NotAnObject { path: dotted })
                };
            }
        }

        let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        if !store.contains_key(root) {
            let lower = self.host.get(root).ok_or_else(|| SandboxError::Undefined {
                path: dotted.clone(),
                root: root.clone(),
            })?;
            trace!(app = %self.app, key = %root, "Copied host object into sandbox");
            store.insert(root.clone(), lower);
        }

        let target = store
            .get_mut(root)
            .ok_or_else(|| SandboxError::Undefined {
                path: dotted.clone(),
                root: root.clone(),
            })?;
        if target.set_path(rest, value) {
            Ok(())
        } else {
            Err(SandboxError::NotAnObject { path: dotted })
        }
    }

    /// Keys this application has written, sorted.
    #[must_use]
    pub fn written_keys(&self) -> Vec<String> {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Lifecycle exports recorded under the reserved identity key.
    #[must_use]
    pub fn exports(&self) -> Option<Value> {
        self.exports
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn read_store(&self, key: &str) -> Option<Value> {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}
