//! Error types for resource client calls.

use std::fmt;

/// Errors that can occur while talking to the resource service.
#[derive(Debug)]
pub enum ResourceError {
    /// The request never produced a response (connection, timeout, TLS).
    Transport(String),

    /// The service answered with a non-success status.
    Status {
        /// HTTP status code.
        code: u16,
        /// Error message reported by the service.
        message: String,
    },

    /// The service refused a write because the target changed underneath
    /// it, e.g. a job that another submission already resolved.
    Conflict(String),

    /// The addressed record does not exist (or is not visible to the caller).
    NotFound(String),

    /// Failed to decode a response body.
    Deserialization(String),

    /// Failed to encode a request body.
    Serialization(String),

    /// Invalid client configuration.
    Configuration(String),
}

impl ResourceError {
    /// Maps an error status code and message to the matching variant.
    ///
    /// # Examples
    ///
    /// ```
    /// use manual_tasks::resource::ResourceError;
    ///
    /// assert!(ResourceError::from_status(409, "already resolved").is_conflict());
    /// assert!(matches!(
    ///     ResourceError::from_status(404, "gone"),
    ///     ResourceError::NotFound(_)
    /// ));
    /// assert!(matches!(
    ///     ResourceError::from_status(500, "boom"),
    ///     ResourceError::Status { code: 500, .. }
    /// ));
    /// ```
    pub fn from_status(code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            _ => Self::Status { code, message },
        }
    }

    /// Returns `true` when the service rejected a write as conflicting.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Status { code, message } => {
                write!(f, "resource service returned {code}: {message}")
            },
            Self::Conflict(msg) => write!(f, "conflict: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Deserialization(msg) => write!(f, "deserialization error: {msg}"),
            Self::Serialization(msg) => write!(f, "serialization error: {msg}"),
            Self::Configuration(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl std::error::Error for ResourceError {}

impl From<std::io::Error> for ResourceError {
    fn from(err: std::io::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<toml::de::Error> for ResourceError {
    fn from(err: toml::de::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<serde_json::Error> for ResourceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Deserialization(err.to_string())
    }
}
