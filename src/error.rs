//! Error handling module for the queue workers
//!
//! This module defines the error type shared by every worker component,
//! along with the classification used to decide whether a failure is worth
//! retrying or should be dropped as malformed content.

use thiserror::Error;

/// Result type alias for worker operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the queue workers
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Broker connection, channel or publish errors
    #[error("Broker error: {0}")]
    Broker(String),

    /// Validation errors for inbound payloads
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Backend answered with a non-success status
    #[error("Backend returned status {status}: {body}")]
    BackendStatus { status: u16, body: String },

    /// Image decoding or encoding errors
    #[error("Image error: {0}")]
    Image(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// A bounded retry loop ran out of attempts
    #[error("Gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

impl Error {
    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Create a broker error
    pub fn broker<S: Into<String>>(msg: S) -> Self {
        Error::Broker(msg.into())
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Error::Validation(msg.into())
    }

    /// Create an HTTP error
    pub fn http<S: Into<String>>(msg: S) -> Self {
        Error::Http(msg.into())
    }

    /// Create an image error
    pub fn image<S: Into<String>>(msg: S) -> Self {
        Error::Image(msg.into())
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Broker(_) | Error::Http(_) | Error::Timeout(_) | Error::Io(_) => true,
            Error::BackendStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Check if this error describes bad message content
    ///
    /// Content errors can never be fixed by processing the same message
    /// again, so they are dropped instead of retried.
    pub fn is_content_error(&self) -> bool {
        match self {
            Error::Validation(_) | Error::Serialization(_) | Error::Image(_) => true,
            Error::BackendStatus { status, .. } => (400..500).contains(status) && *status != 429,
            _ => false,
        }
    }

    /// Get a short machine-friendly name for this error
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::Config(_) => "configuration_error",
            Error::Broker(_) => "broker_error",
            Error::Validation(_) => "validation_error",
            Error::Serialization(_) => "serialization_error",
            Error::Io(_) => "io_error",
            Error::Http(_) => "http_error",
            Error::BackendStatus { .. } => "backend_status",
            Error::Image(_) => "image_error",
            Error::Internal(_) => "internal_error",
            Error::Timeout(_) => "timeout",
            Error::RetriesExhausted { .. } => "retries_exhausted",
        }
    }
}

impl From<lapin::Error> for Error {
    fn from(err: lapin::Error) -> Self {
        Error::Broker(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(err.to_string())
        } else {
            Error::Http(err.to_string())
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => Error::Io(e),
            other => Error::Image(other.to_string()),
        }
    }
}

/// Convert from envconfig::Error to our Error type
impl From<envconfig::Error> for Error {
    fn from(err: envconfig::Error) -> Self {
        Error::Config(err.to_string())
    }
}
