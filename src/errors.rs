//! Bus Error Hierarchy
//!
//! Errors are split by who can observe them:
//! - [`ApiError`] is answered to the requesting participant as an error packet.
//! - [`CollaboratorError`] comes from external collaborators (endpoint, preference store,
//!   chooser). It is logged and degraded to a fallback, never surfaced to the requester.
//! - [`Error`] wraps both plus process-level failures (configuration, channels).

use std::time::Duration;

use config::ConfigError;
use serde_json::json;
use serde_json::Value;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

/// Result of a single request inside a directory.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Request-level failures
    #[error(transparent)]
    Api(#[from] ApiError),

    /// External collaborator failures that had no fallback
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// A resource pattern failed to compile
    #[error("Invalid resource pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Packet addressed to a directory this node does not run
    #[error("No directory named {0}")]
    UnknownDirectory(String),

    /// A directory runner or its caller went away
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// Path fails the directory's resource pattern
    #[error("Invalid resource for {api}: {resource}")]
    BadResource { api: String, resource: String },

    /// Payload content type is outside the entity's allowed set
    #[error("Content type {content_type:?} is not allowed for {resource}")]
    ContentTypeMismatch {
        resource: String,
        content_type: Option<String>,
    },

    /// Mutation of a terminal in-flight intent, or a transition the record does not allow
    #[error("State conflict on {resource}: {reason}")]
    StateConflict { resource: String, reason: String },

    /// Action is not understood by this directory
    #[error("Unknown action {action:?} for {resource}")]
    BadAction { resource: String, action: String },

    /// Caller is outside the entity's allowed callers, or the entity is computed
    #[error("{src} may not modify {resource}")]
    NoPermission { resource: String, src: String },

    /// Entity payload could not be interpreted for this action
    #[error("Malformed entity for {resource}: {reason}")]
    BadContent { resource: String, reason: String },

    /// Invocation found no handler; carries the failed in-flight record
    #[error("No handler matches {resource}")]
    NoMatch { resource: String, in_flight: Value },
}

impl ApiError {
    /// Value placed in the `response` field of the error packet.
    pub fn response_name(&self) -> &'static str {
        match self {
            ApiError::BadResource { .. } => "badResource",
            ApiError::ContentTypeMismatch { .. } => "badContent",
            ApiError::StateConflict { .. } => "badState",
            ApiError::BadAction { .. } => "badAction",
            ApiError::NoPermission { .. } => "noPermission",
            ApiError::BadContent { .. } => "badRequest",
            ApiError::NoMatch { .. } => "noMatch",
        }
    }

    /// Entity of the error packet.
    pub fn body(&self) -> Value {
        match self {
            ApiError::NoMatch { in_flight, .. } => json!({
                "message": self.to_string(),
                "inFlightIntent": in_flight,
            }),
            _ => json!({ "message": self.to_string() }),
        }
    }

    pub(crate) fn bad_resource(
        api: &str,
        resource: &str,
    ) -> Self {
        ApiError::BadResource {
            api: api.to_string(),
            resource: resource.to_string(),
        }
    }

    pub(crate) fn state_conflict(
        resource: &str,
        reason: impl Into<String>,
    ) -> Self {
        ApiError::StateConflict {
            resource: resource.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn bad_content(
        resource: &str,
        reason: impl ToString,
    ) -> Self {
        ApiError::BadContent {
            resource: resource.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CollaboratorError {
    /// Endpoint or store could not be reached
    #[error("Collaborator unreachable: {0}")]
    Unreachable(String),

    /// Collaborator answered but refused the request
    #[error("Collaborator rejected the request: {0}")]
    Rejected(String),

    /// Collaborator did not answer in time
    #[error("Collaborator timed out after {0:?}")]
    Timeout(Duration),

    /// Collaborator answered with something we cannot use
    #[error("Malformed collaborator response: {0}")]
    Malformed(String),
}
