//! Application instance lifecycle status.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The lifecycle status of an application instance.
///
/// ```text
/// NotLoaded -> Loading -> NotMounted -> Mounting -> Mounted -> Unmounting -> NotMounted
/// ```
///
/// At most one instance may be [`Mounting`](Self::Mounting) or
/// [`Mounted`](Self::Mounted) at any time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleStatus {
    /// Assets have not been fetched, or the last load attempt failed.
    #[default]
    NotLoaded,
    /// The load pipeline is running.
    Loading,
    /// Loaded and idle.
    NotMounted,
    /// Bootstrap/mount hooks are running.
    Mounting,
    /// Rendered into its mount target and in control.
    Mounted,
    /// The unmount hook is running.
    Unmounting,
}

impl LifecycleStatus {
    /// Whether this status counts toward the single-active-application invariant.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Mounting | Self::Mounted)
    }

    /// Whether the transition `self -> next` is part of the lifecycle graph.
    ///
    /// Failure rollbacks (`Loading -> NotLoaded`, `Mounting -> NotMounted`)
    /// are included.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::NotLoaded, Self::Loading)
                | (Self::Loading, Self::NotMounted | Self::NotLoaded)
                | (Self::NotMounted, Self::Mounting)
                | (Self::Mounting, Self::Mounted | Self::NotMounted)
                | (Self::Mounted, Self::Unmounting)
                | (Self::Unmounting, Self::NotMounted)
        )
    }

    /// Stable upper-case label, as used in logs and events.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotLoaded => "NOT_LOADED",
            Self::Loading => "LOADING",
            Self::NotMounted => "NOT_MOUNTED",
            Self::Mounting => "MOUNTING",
            Self::Mounted => "MOUNTED",
            Self::Unmounting => "UNMOUNTING",
        }
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
