//! Error taxonomy shared by the HTTP layer, the providers and the config loader.
//!
//! Transport failures, malformed payloads and backend-reported failures are kept
//! in separate variants so callers can tell "the network broke" apart from "the
//! backend said no". Unavailable tracks are not errors at all, see
//! [`crate::types::PlayableUrl`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection failure or timeout. Never retried by the core.
    #[error("Request failed: {source}")]
    Request {
        timed_out: bool,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request got empty response.")]
    EmptyResponse,

    #[error("Invalid or malformed response parts ({0})")]
    Malformed(String),

    #[error("Invalid or malformed response parts. (Max redirects reached)")]
    TooManyRedirects,

    /// Non-2xx response on a client without a response classifier.
    #[error("Request failed with status code {0}.")]
    Status(u16),

    /// Well-formed response carrying a backend-native failure.
    #[error("[{status}] {message}")]
    Backend { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid uri: {0}")]
    InvalidUrl(String),

    #[error("HTTP client has been shut down")]
    Closed,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        ApiError::Backend {
            status,
            message: message.into(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Request { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Request { timed_out: true, .. })
    }

    pub fn is_backend(&self) -> bool {
        matches!(self, ApiError::Backend { .. } | ApiError::Status(_))
    }

    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            ApiError::EmptyResponse | ApiError::Malformed(_) | ApiError::TooManyRedirects
        )
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Request {
            timed_out: e.is_timeout(),
            source: e,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Malformed(format!("json-request: {}", e))
    }
}
