//! Result and error types for the core library

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
///
/// Remote failures are classified once, at the gateway, and travel through
/// the flows unchanged so the owning flow can decide which safe state to
/// return to.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upload rejected: {0}")]
    UploadRejected(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Not signed in")]
    Unauthenticated,

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Failure category shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    NetworkFailure,
    ValidationFailure,
    NotFound,
    UploadRejected,
    AuthFailure,
    Unauthenticated,
    Busy,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::NetworkFailure => "network_failure",
            ErrorCategory::ValidationFailure => "validation_failure",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::UploadRejected => "upload_rejected",
            ErrorCategory::AuthFailure => "auth_failure",
            ErrorCategory::Unauthenticated => "unauthenticated",
            ErrorCategory::Busy => "busy",
            ErrorCategory::Internal => "internal",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an upload rejected error
    pub fn upload_rejected(msg: impl Into<String>) -> Self {
        Self::UploadRejected(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Network(_) => ErrorCategory::NetworkFailure,
            Error::Validation(_) => ErrorCategory::ValidationFailure,
            Error::NotFound(_) => ErrorCategory::NotFound,
            Error::UploadRejected(_) => ErrorCategory::UploadRejected,
            Error::Auth(_) => ErrorCategory::AuthFailure,
            Error::Unauthenticated => ErrorCategory::Unauthenticated,
            Error::InvalidState(_) => ErrorCategory::Busy,
            Error::Config(_) | Error::Io(_) | Error::Json(_) | Error::Other(_) => {
                ErrorCategory::Internal
            }
        }
    }

    /// Short user-facing text for this error
    ///
    /// Never includes the underlying transport or server text.
    pub fn user_message(&self) -> &'static str {
        match self.category() {
            ErrorCategory::NetworkFailure => "Could not reach the receipt service. Please try again.",
            ErrorCategory::ValidationFailure => "Some of the values were rejected. Please check and try again.",
            ErrorCategory::NotFound => "That receipt no longer exists.",
            ErrorCategory::UploadRejected => "Upload failed. Please try again.",
            ErrorCategory::AuthFailure => "Sign-in failed. Please try again.",
            ErrorCategory::Unauthenticated => "Please sign in to continue.",
            ErrorCategory::Busy => "Another operation is still in progress.",
            ErrorCategory::Internal => "Something went wrong.",
        }
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of one operation as printed by `--json`
///
/// Failures carry the category and the fixed user message, never the raw
/// error text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
}

impl<T> OperationResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            category: None,
        }
    }

    pub fn failed(error: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.user_message().to_string()),
            category: Some(error.category()),
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        result.map_or_else(|e| Self::failed(&e), Self::ok)
    }
}
