//! Error handling for the medbook client

use std::fmt;
use thiserror::Error;

use crate::appointments::AppointmentStatus;

/// Unified error type for the medbook client
#[derive(Error, Debug)]
pub enum Error {
    /// The backend rejected the username/password pair
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// A field or request shape failed a check before sending
    #[error("Validation error: {0}")]
    Validation(String),

    /// The backend refused the request as malformed (400/422)
    #[error("Rejected by server ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// A booking was attempted without selecting a slot
    #[error("A time slot must be selected")]
    SlotRequired,

    /// The requested status change is not an edge of the lifecycle
    #[error("Cannot move an appointment from {from} to {to}")]
    IllegalTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    /// No live session; nothing was sent
    #[error("Not logged in")]
    Unauthenticated,

    /// The backend rejected the presented credential; the session has been cleared
    #[error("Session expired or rejected")]
    Unauthorized,

    /// Authenticated, but the role lacks the capability
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Lost a race with a concurrent actor
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The referenced entity no longer exists
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transport failure or timeout
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Any other non-success answer from the backend
    #[error("Request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// JWT errors
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Token persistence errors
    #[error("Storage error: {0}")]
    Storage(String),
}

/// The user-facing classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidCredentials,
    Validation,
    Unauthorized,
    Forbidden,
    Conflict,
    NotFound,
    Network,
    Server,
}

impl Error {
    /// Create a new validation error
    pub fn validation<T: fmt::Display>(msg: T) -> Self {
        Error::Validation(msg.to_string())
    }

    /// Create a new forbidden error
    pub fn forbidden<T: fmt::Display>(msg: T) -> Self {
        Error::Forbidden(msg.to_string())
    }

    /// Create a new conflict error
    pub fn conflict<T: fmt::Display>(msg: T) -> Self {
        Error::Conflict(msg.to_string())
    }

    /// Create a new not-found error
    pub fn not_found<T: fmt::Display>(msg: T) -> Self {
        Error::NotFound(msg.to_string())
    }

    /// Create a new storage error
    pub fn storage<T: fmt::Display>(msg: T) -> Self {
        Error::Storage(msg.to_string())
    }

    /// Classify this error for display.
    ///
    /// Local rejections (`SlotRequired`, `IllegalTransition`) are validation
    /// failures; a missing session is treated like a rejected one.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidCredentials => ErrorKind::InvalidCredentials,
            Error::Validation(_)
            | Error::Rejected { .. }
            | Error::SlotRequired
            | Error::IllegalTransition { .. } => ErrorKind::Validation,
            Error::Unauthenticated | Error::Unauthorized => ErrorKind::Unauthorized,
            Error::Forbidden(_) => ErrorKind::Forbidden,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Network(_) => ErrorKind::Network,
            Error::Api { .. }
            | Error::Json(_)
            | Error::Url(_)
            | Error::Jwt(_)
            | Error::Storage(_) => ErrorKind::Server,
        }
    }

    /// Whether this error was produced without any network round trip.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Error::Validation(_)
                | Error::SlotRequired
                | Error::IllegalTransition { .. }
                | Error::Unauthenticated
        )
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
