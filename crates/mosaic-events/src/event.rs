//! Event types for the Mosaic event bus.

use std::fmt;

use chrono::{DateTime, Utc};
use mosaic_core::{AppName, LifecycleStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata attached to every event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// When the event was created.
    pub timestamp: DateTime<Utc>,
    /// Component that generated the event.
    pub source: String,
}

impl EventMetadata {
    /// Create new event metadata.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
        }
    }
}

/// The lifecycle step an activation failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    /// Fetching or parsing assets.
    Load,
    /// Writing markup into the mount target.
    Render,
    /// The one-time bootstrap hook.
    Bootstrap,
    /// The mount hook.
    Mount,
    /// The unmount hook.
    Unmount,
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Load => "load",
            Self::Render => "render",
            Self::Bootstrap => "bootstrap",
            Self::Mount => "mount",
            Self::Unmount => "unmount",
        })
    }
}

/// All events the orchestrator publishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MosaicEvent {
    /// `start()` completed its first run.
    Started {
        /// Event metadata.
        metadata: EventMetadata,
        /// Number of registered applications at start time.
        registered: usize,
    },

    /// A navigation notification reached the orchestrator.
    RouteChanged {
        /// Event metadata.
        metadata: EventMetadata,
        /// The new path.
        path: String,
    },

    /// An application instance changed lifecycle status.
    StatusChanged {
        /// Event metadata.
        metadata: EventMetadata,
        /// The application.
        app: AppName,
        /// Previous status.
        from: LifecycleStatus,
        /// New status.
        to: LifecycleStatus,
    },

    /// The load pipeline finished for an application.
    AppLoaded {
        /// Event metadata.
        metadata: EventMetadata,
        /// The application.
        app: AppName,
        /// Number of scripts executed.
        scripts: usize,
        /// Number of stylesheets scoped.
        styles: usize,
    },

    /// An activation or teardown step failed.
    ActivationFailed {
        /// Event metadata.
        metadata: EventMetadata,
        /// The application.
        app: AppName,
        /// Where it failed.
        stage: LifecycleStage,
        /// Error message.
        error: String,
    },

    /// An application script raised while executing in its sandbox.
    ScriptFailed {
        /// Event metadata.
        metadata: EventMetadata,
        /// The application.
        app: AppName,
        /// Script location or inline label.
        script: String,
        /// Error message.
        error: String,
    },

    /// The global state bus changed.
    GlobalStateChanged {
        /// Event metadata.
        metadata: EventMetadata,
        /// Keys whose value changed.
        keys: Vec<String>,
    },
}

impl MosaicEvent {
    /// Stable snake_case event name.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::RouteChanged { .. } => "route_changed",
            Self::StatusChanged { .. } => "status_changed",
            Self::AppLoaded { .. } => "app_loaded",
            Self::ActivationFailed { .. } => "activation_failed",
            Self::ScriptFailed { .. } => "script_failed",
            Self::GlobalStateChanged { .. } => "global_state_changed",
        }
    }

    /// The application the event concerns, if any.
    #[must_use]
    pub fn app(&self) -> Option<&AppName> {
        match self {
            Self::StatusChanged { app, .. }
            | Self::AppLoaded { app, .. }
            | Self::ActivationFailed { app, .. }
            | Self::ScriptFailed { app, .. } => Some(app),
            Self::Started { .. } | Self::RouteChanged { .. } | Self::GlobalStateChanged { .. } => {
                None
            },
        }
    }

    /// The event metadata.
    #[must_use]
    pub fn metadata(&self) -> &EventMetadata {
        match self {
            Self::Started { metadata, .. }
            | Self::RouteChanged { metadata, .. }
            | Self::StatusChanged { metadata, .. }
            | Self::AppLoaded { metadata, .. }
            | Self::ActivationFailed { metadata, .. }
            | Self::ScriptFailed { metadata, .. }
            | Self::GlobalStateChanged { metadata, .. } => metadata,
        }
    }
}
