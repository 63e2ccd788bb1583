//! Custom error types for scholarfeed.
//!
//! All library functions return `Result<T, ScholarFeedError>` instead of using `unwrap()`.

use thiserror::Error;

/// Main error type for scholarfeed operations.
#[derive(Debug, Error)]
pub enum ScholarFeedError {
    /// The author identifier resolved to no profile
    #[error("Author not found: {0}")]
    NotFound(String),

    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// HTML parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Rate limited by the profile source
    #[error("Rate limited, retry after {0}s")]
    RateLimited(u64),

    /// Profile source returned an unexpected status
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Error message
        message: String,
    },

    /// CAPTCHA page served instead of content
    #[error("CAPTCHA detected, please refresh cookies")]
    Captcha,

    /// Source answered but listed nothing
    #[error("Empty result: {0}")]
    EmptyResult(String),

    /// Detail fetch for a single publication failed
    #[error("Detail fill failed for '{title}': {reason}")]
    DetailFill {
        /// Title of the publication whose detail was requested
        title: String,
        /// Underlying failure
        reason: String,
    },

    /// Proxy could not be configured
    #[error("Proxy setup failed: {0}")]
    ProxySetup(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),
}

impl ScholarFeedError {
    /// Whether the failure came from talking to the remote source.
    ///
    /// These are the errors the retry policy is meant to absorb.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::Parse(_)
                | Self::RateLimited(_)
                | Self::Api { .. }
                | Self::Captcha
                | Self::EmptyResult(_)
                | Self::NotFound(_)
        )
    }
}

/// Result type alias using `ScholarFeedError`
pub type Result<T> = std::result::Result<T, ScholarFeedError>;
