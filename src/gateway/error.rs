// ABOUTME: Gateway error types with SNAFU unification.
// ABOUTME: Stack and tag API errors share one kind() accessor for callers.

use snafu::Snafu;
use thiserror::Error;

/// Errors from stack-level API calls.
#[derive(Debug, Error)]
pub enum StackError {
    #[error("stack not found: {0}")]
    NotFound(String),

    #[error("expected exactly one stack named {name}, API reported {count}")]
    Ambiguous { name: String, count: usize },

    #[error("API error {code}: {message}")]
    Api { code: String, message: String },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("undecodable response: {0}")]
    Decode(String),
}

/// Errors from tag reads and writes on the anchor resource.
#[derive(Debug, Error)]
pub enum TagError {
    #[error("no anchor resource tagged for {0}")]
    AnchorNotFound(String),

    #[error("expected exactly one anchor resource for {scope}, found {count}")]
    AmbiguousAnchor { scope: String, count: usize },

    #[error("API error {code}: {message}")]
    Api { code: String, message: String },

    #[error("transport failure: {0}")]
    Transport(String),
}

/// Unified gateway error for stack and tag operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum GatewayError {
    #[snafu(display("stack operation failed: {source}"))]
    Stack { source: StackError },

    #[snafu(display("tag operation failed: {source}"))]
    Tag { source: TagError },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// The named stack or anchor does not exist.
    NotFound,
    /// A by-name lookup matched other than one result.
    Ambiguous,
    /// The remote service rejected or failed the call.
    Service,
    /// The service could not be reached or answered garbage.
    Connection,
}

impl GatewayError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> GatewayErrorKind {
        match self {
            GatewayError::Stack { source } => match source {
                StackError::NotFound(_) => GatewayErrorKind::NotFound,
                StackError::Ambiguous { .. } => GatewayErrorKind::Ambiguous,
                StackError::Api { .. } => GatewayErrorKind::Service,
                StackError::Transport(_) | StackError::Decode(_) => GatewayErrorKind::Connection,
            },
            GatewayError::Tag { source } => match source {
                TagError::AnchorNotFound(_) => GatewayErrorKind::NotFound,
                TagError::AmbiguousAnchor { .. } => GatewayErrorKind::Ambiguous,
                TagError::Api { .. } => GatewayErrorKind::Service,
                TagError::Transport(_) => GatewayErrorKind::Connection,
            },
        }
    }
}

impl From<StackError> for GatewayError {
    fn from(source: StackError) -> Self {
        GatewayError::Stack { source }
    }
}

impl From<TagError> for GatewayError {
    fn from(source: TagError) -> Self {
        GatewayError::Tag { source }
    }
}
