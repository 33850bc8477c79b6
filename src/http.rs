//! Shared HTTP client used by every provider adapter.
//!
//! One client means one timeout policy: NWIC and the government endpoints
//! are both cut off after the configured request timeout.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::error::ProviderError;

const USER_AGENT: &str = concat!("groundwatch/", env!("CARGO_PKG_VERSION"));

/// Build the shared client with a uniform request timeout.
pub fn build_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(ProviderError::Http)
}

/// Reject non-success statuses, then decode the JSON body.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::Status {
            status: status.as_u16(),
            url: response.url().to_string(),
        });
    }
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}
