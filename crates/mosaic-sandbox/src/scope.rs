//! The switchable global scope.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use mosaic_core::AppName;
use tracing::{debug, error, trace};

use crate::error::{SandboxError, SandboxResult};
use crate::host::HostGlobals;
use crate::sandbox::Sandbox;
use crate::script::{Script, ScriptEngine};
use crate::value::Value;

/// The global object seen by whichever application is currently running.
///
/// Exactly one sandbox (or none) backs the scope at a time. Switching is a
/// single atomic pointer swap; the sandboxes' stores are never copied.
/// Wrappers for compound values are cached per property and dropped on every
/// switch so a wrapper built for one application is never handed to another.
#[derive(Debug)]
pub struct GlobalScope {
    host: Arc<HostGlobals>,
    active: ArcSwapOption<Sandbox>,
    cache: DashMap<String, Arc<ScopedObject>>,
    switches: AtomicU64,
}

impl GlobalScope {
    /// Create a scope over `host` with no application active.
    #[must_use]
    pub fn new(host: Arc<HostGlobals>) -> Self {
        Self {
            host,
            active: ArcSwapOption::empty(),
            cache: DashMap::new(),
            switches: AtomicU64::new(0),
        }
    }

    /// The host globals.
    #[must_use]
    pub fn host(&self) -> &Arc<HostGlobals> {
        &self.host
    }

    /// Create a sandbox bound to this scope's host.
    #[must_use]
    pub fn sandbox_for(&self, app: AppName) -> Arc<Sandbox> {
        Arc::new(Sandbox::new(app, Arc::clone(&self.host)))
    }

    /// Make `next` the backing sandbox. Returns the previous one.
    pub fn switch_to(&self, next: Option<Arc<Sandbox>>) -> Option<Arc<Sandbox>> {
        let next_app = next.as_ref().map(|s| s.app().to_string());
        let previous = self.active.swap(next);
        self.cache.clear();
        self.switches.fetch_add(1, Ordering::Relaxed);
        trace!(
            from = ?previous.as_ref().map(|s| s.app().to_string()),
            to = ?next_app,
            "Global scope switched"
        );
        previous
    }

    /// Detach the current sandbox; the scope falls back to host globals.
    pub fn release(&self) -> Option<Arc<Sandbox>> {
        self.switch_to(None)
    }

    /// The sandbox currently backing the scope.
    #[must_use]
    pub fn active(&self) -> Option<Arc<Sandbox>> {
        self.active.load_full()
    }

    /// The application currently backing the scope.
    #[must_use]
    pub fn active_app(&self) -> Option<AppName> {
        self.active.load().as_ref().map(|s| s.app().clone())
    }

    /// How many switches have happened.
    #[must_use]
    pub fn switch_count(&self) -> u64 {
        self.switches.load(Ordering::Relaxed)
    }

    /// Number of cached object wrappers.
    #[must_use]
    pub fn cached_wrappers(&self) -> usize {
        self.cache.len()
    }

    /// A view onto the current global object.
    #[must_use]
    pub fn view(&self) -> GlobalView<'_> {
        GlobalView { scope: self }
    }

    /// Run `script` inside `sandbox`.
    ///
    /// The scope is switched to `sandbox` if it is not already active and is
    /// left that way; callers release it when their batch is done. Errors and
    /// panics raised by the engine are caught, logged against the owning
    /// application and returned, never propagated as a panic.
    ///
    /// # Errors
    ///
    /// [`SandboxError::Execution`] if the script raised.
    pub fn execute(
        &self,
        sandbox: &Arc<Sandbox>,
        engine: &dyn ScriptEngine,
        script: &Script,
    ) -> SandboxResult<()> {
        let already_active = self
            .active
            .load()
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, sandbox));
        if !already_active {
            self.switch_to(Some(Arc::clone(sandbox)));
        }

        let label = script.label();
        debug!(app = %sandbox.app(), script = %label, engine = engine.name(), "Executing script");

        let view = self.view();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            engine.execute(script, &view)
        }));

        let message = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => e.message,
            Err(payload) => panic_message(payload.as_ref()),
        };
        error!(app = %sandbox.app(), script = %label, error = %message, "Script failed");
        Err(SandboxError::Execution {
            app: sandbox.app().clone(),
            script: label,
            message,
        })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "script panicked".to_string()
    }
}

/// Borrowed view of the global object, as handed to script engines.
#[derive(Debug, Clone, Copy)]
pub struct GlobalView<'a> {
    scope: &'a GlobalScope,
}

impl GlobalView<'_> {
    /// The application whose sandbox backs this view.
    #[must_use]
    pub fn active_app(&self) -> Option<AppName> {
        self.scope.active_app()
    }

    /// Read a global.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        match self.scope.active.load().as_ref() {
            Some(sandbox) => sandbox.get(key),
            None => self.scope.host.get(key),
        }
    }

    /// Whether `key` resolves to anything.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Write a global into the active sandbox.
    ///
    /// # Errors
    ///
    /// [`SandboxError::NoActiveSandbox`] if no application is active.
    pub fn set(&self, key: impl Into<String>, value: Value) -> SandboxResult<()> {
        let sandbox = self.require_active()?;
        let key = key.into();
        self.scope.cache.remove(&key);
        sandbox.set(key, value);
        Ok(())
    }

    /// Delete a private write from the active sandbox.
    ///
    /// # Errors
    ///
    /// [`SandboxError::NoActiveSandbox`] if no application is active.
    pub fn delete(&self, key: &str) -> SandboxResult<bool> {
        let sandbox = self.require_active()?;
        self.scope.cache.remove(key);
        Ok(sandbox.delete(key))
    }

    /// Wrapper for a compound global, so nested writes stay in the active
    /// sandbox. Returns `None` for scalars, missing keys, or when no
    /// application is active.
    #[must_use]
    pub fn object(&self, key: &str) -> Option<Arc<ScopedObject>> {
        if let Some(cached) = self.scope.cache.get(key) {
            return Some(Arc::clone(cached.value()));
        }
        let sandbox = self.scope.active.load_full()?;
        if !sandbox.get(key)?.is_compound() {
            return None;
        }
        let wrapper = Arc::new(ScopedObject {
            sandbox,
            path: vec![key.to_string()],
        });
        self.scope
            .cache
            .insert(key.to_string(), Arc::clone(&wrapper));
        Some(wrapper)
    }

    fn require_active(&self) -> SandboxResult<Arc<Sandbox>> {
        self.scope
            .active
            .load_full()
            .ok_or(SandboxError::NoActiveSandbox)
    }
}

/// A compound value reached through a sandbox.
///
/// Reads resolve through the owning sandbox; writes copy the root object up
/// into that sandbox's store before mutating it.
#[derive(Debug)]
pub struct ScopedObject {
    sandbox: Arc<Sandbox>,
    path: Vec<String>,
}

impl ScopedObject {
    /// The application this wrapper is bound to.
    #[must_use]
    pub fn app(&self) -> &AppName {
        self.sandbox.app()
    }

    /// Dotted path from the global object.
    #[must_use]
    pub fn path(&self) -> String {
        self.path.join(".")
    }

    /// Current value of the whole object.
    #[must_use]
    pub fn value(&self) -> Option<Value> {
        self.sandbox.get_path(&self.path)
    }

    /// Read a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<Value> {
        self.sandbox.get_path(&self.child_path(field))
    }

    /// Write a field.
    ///
    /// # Errors
    ///
    /// See [`Sandbox::set_path`].
    pub fn set(&self, field: &str, value: Value) -> SandboxResult<()> {
        self.sandbox.set_path(&self.child_path(field), value)
    }

    /// Wrapper for a compound field.
    #[must_use]
    pub fn object(&self, field: &str) -> Option<ScopedObject> {
        let path = self.child_path(field);
        if !self.sandbox.get_path(&path)?.is_compound() {
            return None;
        }
        Some(ScopedObject {
            sandbox: Arc::clone(&self.sandbox),
            path,
        })
    }

    fn child_path(&self, field: &str) -> Vec<String> {
        let mut path = self.path.clone();
        path.push(field.to_string());
        path
    }
}
