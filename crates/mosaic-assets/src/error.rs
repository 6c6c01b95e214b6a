//! Asset resolution errors.

use thiserror::Error;

/// Errors raised while fetching or parsing application assets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    /// The request could not be completed.
    #[error("failed to fetch {url}: {reason}")]
    Fetch {
        /// Requested URL.
        url: String,
        /// Transport error.
        reason: String,
    },

    /// The server answered with a non-success status.
    #[error("fetching {url} returned HTTP {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The response exceeded the configured size limit.
    #[error("{url} exceeds the {limit} byte limit")]
    TooLarge {
        /// Requested URL.
        url: String,
        /// Configured limit.
        limit: usize,
    },

    /// Part of an entry document could not be interpreted.
    #[error("malformed markup in {url}: {reason}")]
    Parse {
        /// Entry URL.
        url: String,
        /// What was wrong.
        reason: String,
    },

    /// The HTTP client could not be constructed.
    #[error("http client error: {0}")]
    Client(String),
}

impl AssetError {
    /// Whether this is a fetch failure (transport or status).
    #[must_use]
    pub fn is_fetch(&self) -> bool {
        matches!(
            self,
            Self::Fetch { .. } | Self::Status { .. } | Self::TooLarge { .. }
        )
    }
}

/// A specialized Result type for asset operations.
pub type AssetResult<T> = Result<T, AssetError>;
