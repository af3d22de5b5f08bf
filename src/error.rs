use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::ApiError;

/// Application-level errors (configuration, I/O, client setup).
#[derive(Debug, Error)]
pub enum HumanizerError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Classified(#[from] ClassifiedError),
}

/// User-facing failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InputTooShort,
    InputTooLong,
    InsufficientCredits,
    AuthFailure,
    RateLimited,
    ServiceError,
    NetworkError,
    ProcessingTimeout,
    UnknownApiError,
    Cancelled,
}

impl ErrorKind {
    /// Display message shown to the user. Never contains transport details.
    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::InputTooShort => {
                "Text is too short. Please enter at least 50 characters."
            }
            ErrorKind::InputTooLong => {
                "Text exceeds the maximum character limit. Please reduce the text length."
            }
            ErrorKind::InsufficientCredits => {
                "Insufficient credits in your account. Please upgrade your plan."
            }
            ErrorKind::AuthFailure => {
                "Sorry, there was an error processing your text. API authentication failed. Please contact support."
            }
            ErrorKind::RateLimited => {
                "Sorry, there was an error processing your text. Rate limit exceeded. Please try again in a moment."
            }
            ErrorKind::ServiceError => {
                "Sorry, there was an error processing your text. Server error. Please try again later."
            }
            ErrorKind::NetworkError => {
                "Sorry, there was an error processing your text. Please check your internet connection and try again."
            }
            ErrorKind::ProcessingTimeout => {
                "Processing took too long. Please try again with shorter text."
            }
            ErrorKind::UnknownApiError => {
                "Sorry, there was an error processing your text. Please try again or contact support if the problem persists."
            }
            ErrorKind::Cancelled => "Processing was cancelled.",
        }
    }

    /// Whether the caller should offer a "try again" affordance.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::NetworkError
                | ErrorKind::RateLimited
                | ErrorKind::ServiceError
                | ErrorKind::ProcessingTimeout
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InputTooShort => "InputTooShort",
            ErrorKind::InputTooLong => "InputTooLong",
            ErrorKind::InsufficientCredits => "InsufficientCredits",
            ErrorKind::AuthFailure => "AuthFailure",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::ServiceError => "ServiceError",
            ErrorKind::NetworkError => "NetworkError",
            ErrorKind::ProcessingTimeout => "ProcessingTimeout",
            ErrorKind::UnknownApiError => "UnknownApiError",
            ErrorKind::Cancelled => "Cancelled",
        };
        write!(f, "{name}")
    }
}

/// A failure the workflow could not recover from, ready to show to a user.
///
/// `message` and `retryable` are always derived from `kind`. The optional
/// `status` and `detail` fields carry diagnostics for logging only.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
    pub status: Option<u16>,
    pub detail: Option<String>,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: kind.message().to_string(),
            retryable: kind.is_retryable(),
            status: None,
            detail: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl From<ErrorKind> for ClassifiedError {
    fn from(kind: ErrorKind) -> Self {
        ClassifiedError::new(kind)
    }
}

/// Maps raw client failures onto the [`ErrorKind`] taxonomy.
///
/// Classification looks at status codes and error shape only, never at
/// message text.
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn classify(err: &ApiError) -> ClassifiedError {
        match err {
            ApiError::Status { status, message } => {
                Self::classify_status(*status).with_status(*status).with_detail(message.clone())
            }
            ApiError::Transport(e) => {
                ClassifiedError::new(ErrorKind::NetworkError).with_detail(e.to_string())
            }
            ApiError::Decode(msg) => {
                ClassifiedError::new(ErrorKind::ServiceError).with_detail(msg.clone())
            }
        }
    }

    fn classify_status(status: u16) -> ClassifiedError {
        let kind = match status {
            402 => ErrorKind::InsufficientCredits,
            401 => ErrorKind::AuthFailure,
            429 => ErrorKind::RateLimited,
            500..=599 => ErrorKind::ServiceError,
            _ => ErrorKind::UnknownApiError,
        };
        ClassifiedError::new(kind)
    }
}
