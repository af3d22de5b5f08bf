//! Raw failures from the humanization service client.
//!
//! [`ApiError`] keeps exactly what went wrong on the wire. It is turned into
//! a user-facing [`ClassifiedError`](crate::error::ClassifiedError) by
//! [`ErrorClassifier`](crate::error::ErrorClassifier) before it leaves the
//! client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The service answered with a non-2xx status.
    /// `message` is the `error` field of the body, or the status reason.
    #[error("API error (status {status}): {message}")]
    Status { status: u16, message: String },

    /// No response was received (DNS, refused connection, timeout).
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A 2xx response whose body could not be understood.
    #[error("failed to decode response: {0}")]
    Decode(String),
}
