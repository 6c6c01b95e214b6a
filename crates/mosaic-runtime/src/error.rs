//! Runtime error types.

use std::time::Duration;

use mosaic_assets::AssetError;
use mosaic_core::{AppName, CoreError};
use mosaic_events::LifecycleStage;
use thiserror::Error;

/// Why a lifecycle step failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookFailure {
    /// The hook raised or rejected.
    #[error("{0}")]
    Raised(String),

    /// The hook did not settle in time.
    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    /// The markup could not be written into the mount target.
    #[error("render failed: {0}")]
    Render(String),
}

/// Errors that can occur in the runtime.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    /// An application with this name is already registered.
    #[error("application '{name}' is already registered")]
    DuplicateName {
        /// The rejected name.
        name: AppName,
    },

    /// No application with this name is registered.
    #[error("unknown application '{name}'")]
    UnknownApp {
        /// The requested name.
        name: String,
    },

    /// The load pipeline failed.
    #[error("failed to load '{app}': {source}")]
    Load {
        /// The application.
        app: AppName,
        /// The underlying asset error.
        source: AssetError,
    },

    /// Rendering, bootstrap or mount failed.
    #[error("failed to mount '{app}' during {stage}: {reason}")]
    Mount {
        /// The application.
        app: AppName,
        /// The failing step.
        stage: LifecycleStage,
        /// What went wrong.
        reason: HookFailure,
    },

    /// The unmount hook failed. Teardown still completed.
    #[error("unmount of '{app}' failed: {reason}")]
    Unmount {
        /// The application.
        app: AppName,
        /// What went wrong.
        reason: HookFailure,
    },

    /// The operation needs `start()` to have been called.
    #[error("the orchestrator has not been started")]
    NotStarted,

    /// The route driver stopped.
    #[error("the route driver has shut down")]
    Shutdown,

    /// Building a component failed.
    #[error("setup failed: {0}")]
    Setup(String),

    /// Invalid descriptor values.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl RuntimeError {
    /// The application the error concerns, if any.
    #[must_use]
    pub fn app(&self) -> Option<&AppName> {
        match self {
            Self::DuplicateName { name } => Some(name),
            Self::Load { app, .. } | Self::Mount { app, .. } | Self::Unmount { app, .. } => {
                Some(app)
            },
            _ => None,
        }
    }

    /// The lifecycle step the error belongs to, if any.
    #[must_use]
    pub fn stage(&self) -> Option<LifecycleStage> {
        match self {
            Self::Load { .. } => Some(LifecycleStage::Load),
            Self::Mount { stage, .. } => Some(*stage),
            Self::Unmount { .. } => Some(LifecycleStage::Unmount),
            _ => None,
        }
    }

    /// Whether a hook ran out of time.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Mount {
                reason: HookFailure::TimedOut(_),
                ..
            } | Self::Unmount {
                reason: HookFailure::TimedOut(_),
                ..
            }
        )
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
