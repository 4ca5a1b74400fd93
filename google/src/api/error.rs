use thiserror::Error;

use super::common::GoogleErrorBody;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("googleapi: Error {status}: {message}")]
    ApiError {
        status: u16,
        message: String,
        #[source]
        details: Option<Box<GoogleErrorBody>>,
    },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,

    #[error("Error waiting for {activity}: operation {name} failed with code {code}: {message}")]
    OperationFailed {
        activity: String,
        name: String,
        code: i32,
        message: String,
    },

    #[error("Timeout waiting for {activity} after {secs} seconds")]
    OperationTimeout { activity: String, secs: u64 },
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for a 404 from the remote side
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
