//! The script execution seam.

use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::scope::GlobalView;

/// Where a script came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOrigin {
    /// Fetched from an absolute URL.
    External(String),
    /// Inline block; `index` counts inline scripts in document order.
    Inline {
        /// Position among the entry document's inline scripts.
        index: usize,
    },
}

/// A script ready to run inside a sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    /// Where the source came from.
    pub origin: ScriptOrigin,
    /// Source text.
    pub source: String,
}

impl Script {
    /// An externally fetched script.
    #[must_use]
    pub fn external(url: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            origin: ScriptOrigin::External(url.into()),
            source: source.into(),
        }
    }

    /// An inline script.
    #[must_use]
    pub fn inline(index: usize, source: impl Into<String>) -> Self {
        Self {
            origin: ScriptOrigin::Inline { index },
            source: source.into(),
        }
    }

    /// Short label for logs and errors.
    #[must_use]
    pub fn label(&self) -> String {
        match &self.origin {
            ScriptOrigin::External(url) => url.clone(),
            ScriptOrigin::Inline { index } => format!("inline#{index}"),
        }
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// An error raised by application code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ScriptError {
    /// What the code raised.
    pub message: String,
}

impl ScriptError {
    /// Create a script error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Runs application code against a substituted global context.
///
/// Engines never see the host globals directly: every read and write goes
/// through the [`GlobalView`] of the application being executed.
pub trait ScriptEngine: Send + Sync {
    /// Execute `script` with `global` standing in for the global object.
    ///
    /// # Errors
    ///
    /// Returns a [`ScriptError`] if the code raises.
    fn execute(&self, script: &Script, global: &GlobalView<'_>) -> Result<(), ScriptError>;

    /// Engine name, for diagnostics.
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// An engine that evaluates nothing.
///
/// Used when the host only needs markup and styles mounted, e.g. from the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct InertEngine;

impl ScriptEngine for InertEngine {
    fn execute(&self, script: &Script, global: &GlobalView<'_>) -> Result<(), ScriptError> {
        debug!(
            script = %script.label(),
            app = ?global.active_app().map(|a| a.to_string()),
            bytes = script.source.len(),
            "Skipping script evaluation"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "inert"
    }
}
