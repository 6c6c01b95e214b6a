use thiserror::Error;

/// Errors raised while constructing core types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The application name is empty or contains characters outside `[A-Za-z0-9_-]`.
    #[error("invalid application name '{name}': {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The entry location is not an absolute URI.
    #[error("invalid entry location '{entry}': {reason}")]
    InvalidEntry {
        /// The rejected entry.
        entry: String,
        /// Parser message.
        reason: String,
    },

    /// The activation rule does not start with `/`.
    #[error("invalid activation rule '{0}': rules must start with '/'")]
    InvalidRule(String),

    /// The mount target selector is empty.
    #[error("mount target selector must not be empty")]
    EmptyContainer,
}

/// A specialized Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
