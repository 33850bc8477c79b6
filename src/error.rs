//! Error types for data providers and configuration.
//!
//! Provider errors never reach API callers. Adapters return them so the
//! [`DataService`](crate::service::DataService) can log which provider
//! failed and why before falling through to the next one.

use thiserror::Error;

/// Why a provider produced no data.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Real-data mode is switched off.
    #[error("real-data mode is disabled")]
    Disabled,

    /// A required setting (base URL, resource ID) is missing.
    #[error("provider not configured: {0}")]
    NotConfigured(&'static str),

    /// The request exceeded the client timeout.
    #[error("API took too long to respond")]
    Timeout,

    /// Transport or body-decoding failure reported by reqwest.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// The upstream answered with a non-success status code.
    #[error("upstream returned {status} for {url}")]
    Status { status: u16, url: String },

    /// The upstream embedded an error message in an otherwise valid response.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// The response envelope had no `data` payload.
    #[error("response contained no data")]
    MissingData,

    /// The payload did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if let Some(status) = err.status() {
            ProviderError::Status {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else if err.is_decode() {
            ProviderError::Decode(err.to_string())
        } else {
            ProviderError::Http(err)
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Decode(err.to_string())
    }
}

/// Invalid configuration value read from the environment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}
