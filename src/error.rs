// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Error types for Kalamari interception
//!
//! Every failure either surfaces immediately from the decision call
//! (resolution conflicts, invalid overrides) or through the outcome of the
//! command that was sent (transport failures).

use thiserror::Error;

use crate::intercept::DecisionKind;

/// Result type alias for interception operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for request interception
#[derive(Error, Debug)]
pub enum Error {
    /// A terminal decision was attempted on an already-resolved request
    #[error("Request {request_id} already resolved by {resolved_by}; refusing {attempted}")]
    AlreadyResolved {
        request_id: String,
        attempted: DecisionKind,
        resolved_by: DecisionKind,
    },

    /// `continue_request()` called from a chain position that already passed on
    #[error("Request {request_id}: handler #{position} no longer holds the chain turn")]
    StaleContinuation { request_id: String, position: usize },

    /// A notification arrived for a request id that is still in flight
    #[error("Request {0} is already being intercepted")]
    DuplicateRequest(String),

    /// Override record failed boundary validation
    #[error("Invalid override for {field}: {reason}")]
    InvalidOverride { field: &'static str, reason: String },

    /// Inbound notification could not be understood
    #[error("Invalid notification: {0}")]
    InvalidNotification(String),

    /// The facade rejected a command
    #[error("Command {method} for request {request_id} failed: {reason}")]
    Transport {
        method: String,
        request_id: String,
        reason: String,
    },

    /// The protocol session is gone
    #[error("Command channel has been closed")]
    ChannelClosed,

    /// Handler-defined failure
    #[error("Handler error: {0}")]
    Handler(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid URL pattern
    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a transport error for a failed command
    pub fn transport(
        method: impl Into<String>,
        request_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::Transport {
            method: method.into(),
            request_id: request_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a handler error
    pub fn handler<S: Into<String>>(msg: S) -> Self {
        Error::Handler(msg.into())
    }

    /// Create an invalid override error
    pub fn invalid_override(field: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidOverride {
            field,
            reason: reason.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a resolution conflict (double decision)
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Error::AlreadyResolved { .. } | Error::StaleContinuation { .. }
        )
    }

    /// Check if the facade failed to deliver a command
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. } | Error::ChannelClosed)
    }

    /// Get the request id this error is scoped to, if any
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Error::AlreadyResolved { request_id, .. } => Some(request_id),
            Error::StaleContinuation { request_id, .. } => Some(request_id),
            Error::DuplicateRequest(id) => Some(id),
            Error::Transport { request_id, .. } => Some(request_id),
            _ => None,
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add operation context to error
    fn context(self, msg: &str) -> Result<T>;
}

impl<T, E: Into<Error>> ErrorContext<T> for std::result::Result<T, E> {
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            match err {
                Error::Io(io) => Error::Config(format!("{}: {}", msg, io)),
                Error::Serialization(json) => Error::Config(format!("{}: {}", msg, json)),
                other => Error::Other(format!("{}: {}", msg, other)),
            }
        })
    }
}
