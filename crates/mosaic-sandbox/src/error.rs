use mosaic_core::AppName;
use thiserror::Error;

/// Errors raised by sandbox operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SandboxError {
    /// Application code raised while executing.
    #[error("script {script} of application '{app}' failed: {message}")]
    Execution {
        /// The owning application.
        app: AppName,
        /// Script location or inline label.
        script: String,
        /// What the script raised.
        message: String,
    },

    /// A write was attempted through the global scope while no application is active.
    #[error("no application is active; host globals are read-only")]
    NoActiveSandbox,

    /// A nested write targeted a path whose parent is not an object.
    #[error("cannot write '{path}': parent is not an object")]
    NotAnObject {
        /// Dotted path of the failed write.
        path: String,
    },

    /// A nested write targeted a root property that does not exist.
    #[error("cannot write '{path}': '{root}' is not defined")]
    Undefined {
        /// Dotted path of the failed write.
        path: String,
        /// The missing root property.
        root: String,
    },
}

/// A specialized Result type for sandbox operations.
pub type SandboxResult<T> = Result<T, SandboxError>;
