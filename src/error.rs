//! Error types for the mapping layer.

use thiserror::Error;

use crate::diagnostics::Diagnostic;

/// Errors raised while translating between plan, state and remote values.
///
/// Every variant carries the attribute path it was raised at, so that the
/// resulting [`Diagnostic`] can point at the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// A value could not be represented as JSON.
    #[error("Encoding error at '{path}': {reason}")]
    Encoding {
        /// Attribute path of the payload.
        path: String,
        /// What went wrong.
        reason: String,
    },

    /// A value did not match the shape it was decoded into.
    #[error("Decoding error at '{path}': {reason}")]
    Decoding {
        /// Attribute path of the value.
        path: String,
        /// What went wrong.
        reason: String,
    },

    /// A field without a remote default was still unknown at conversion time.
    #[error("Incomplete value at '{path}': value is not yet known")]
    IncompleteValue {
        /// Attribute path of the unknown field.
        path: String,
    },

    /// A field was read as known while it was null or unknown.
    #[error("Invalid state at '{path}': expected a known value, found {found}")]
    InvalidState {
        /// Attribute path of the field.
        path: String,
        /// `"null"` or `"unknown"`.
        found: &'static str,
    },
}

impl MappingError {
    /// Build an [`MappingError::Encoding`] error.
    pub fn encoding(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::Encoding {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a [`MappingError::Decoding`] error.
    pub fn decoding(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decoding {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a [`MappingError::IncompleteValue`] error.
    pub fn incomplete(path: impl Into<String>) -> Self {
        Self::IncompleteValue { path: path.into() }
    }

    /// The attribute path the error was raised at.
    pub fn path(&self) -> &str {
        match self {
            Self::Encoding { path, .. } => path,
            Self::Decoding { path, .. } => path,
            Self::IncompleteValue { path } => path,
            Self::InvalidState { path, .. } => path,
        }
    }

    /// Re-root the error under `prefix`.
    ///
    /// Nested decoders report paths relative to the block they decode; the
    /// enclosing converter calls this to make them absolute.
    pub fn within(self, prefix: &str) -> Self {
        if prefix.is_empty() {
            return self;
        }
        let join = |path: String| {
            if path.is_empty() {
                prefix.to_string()
            } else {
                format!("{}.{}", prefix, path)
            }
        };
        match self {
            Self::Encoding { path, reason } => Self::Encoding {
                path: join(path),
                reason,
            },
            Self::Decoding { path, reason } => Self::Decoding {
                path: join(path),
                reason,
            },
            Self::IncompleteValue { path } => Self::IncompleteValue { path: join(path) },
            Self::InvalidState { path, found } => Self::InvalidState {
                path: join(path),
                found,
            },
        }
    }

    /// Convert the error into an error [`Diagnostic`] attributed to its path.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let summary = match self {
            Self::Encoding { .. } => "Unable to encode JSON payload",
            Self::Decoding { .. } => "Unable to decode value",
            Self::IncompleteValue { .. } => "Value is not yet known",
            Self::InvalidState { .. } => "Value accessed in an invalid state",
        };
        let diagnostic = Diagnostic::error(summary).with_detail(self.to_string());
        if self.path().is_empty() {
            diagnostic
        } else {
            diagnostic.with_attribute(self.path())
        }
    }
}

/// Errors returned by a remote-service client implementation.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Resource already exists (create conflict).
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    /// Permission denied (authentication/authorization failure).
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Quota or rate limit exceeded.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Service temporarily unavailable.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Operation timed out.
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// The remote service rejected the request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A response body could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Get the error message as a string.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) => msg,
            Self::AlreadyExists(msg) => msg,
            Self::PermissionDenied(msg) => msg,
            Self::ResourceExhausted(msg) => msg,
            Self::Unavailable(msg) => msg,
            Self::DeadlineExceeded(msg) => msg,
            Self::InvalidRequest(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
        }
    }

    /// Whether the error means the remote resource no longer exists.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Convert the error into an error [`Diagnostic`].
    pub fn to_diagnostic(&self, summary: impl Into<String>) -> Diagnostic {
        Diagnostic::error(summary).with_detail(self.to_string())
    }
}
