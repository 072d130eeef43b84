//! Classified outcomes of management API calls

use thiserror::Error;

/// Result type alias for admin operations
pub type Result<T> = std::result::Result<T, AdminError>;

/// Failure of a management operation, classified by what the caller can do about it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdminError {
    /// The entity already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The entity does not exist where existence was required
    #[error("Gone: {0}")]
    Gone(String),

    /// Network, timeout, malformed response or unexpected status
    #[error("Transport error: {0}")]
    Transport(String),

    /// Programming or configuration error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Category of an [`AdminError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`AdminError::Conflict`]
    Conflict,
    /// See [`AdminError::Gone`]
    Gone,
    /// See [`AdminError::Transport`]
    Transport,
    /// See [`AdminError::Internal`]
    Internal,
}

impl AdminError {
    /// Create a conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Create a gone error
    pub fn gone(message: impl Into<String>) -> Self {
        Self::Gone(message.into())
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Gone(_) => ErrorKind::Gone,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the entity was absent
    pub fn is_gone(&self) -> bool {
        self.kind() == ErrorKind::Gone
    }

    /// Whether the entity already existed
    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    /// Human readable message without the category prefix
    pub fn message(&self) -> &str {
        match self {
            Self::Conflict(msg) | Self::Gone(msg) | Self::Transport(msg) | Self::Internal(msg) => {
                msg
            }
        }
    }
}

impl From<reqwest::Error> for AdminError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Transport(format!("Request timed out: {}", err))
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<broker_config::ConfigError> for AdminError {
    fn from(err: broker_config::ConfigError) -> Self {
        Self::Internal(err.to_string())
    }
}
