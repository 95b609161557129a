//! HTTP call function for fetching one JSON resource per key.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum CallError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status {status} from {url}")]
    Status { status: StatusCode, url: String },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Parameters shared by every call of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParams {
    pub base_url: String,
    pub api_key: Option<String>,
    pub api_key_header: String,
}

impl RequestParams {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            api_key_header: "X-Api-Key".to_string(),
        }
    }

    pub fn with_api_key(mut self, header: impl Into<String>, api_key: impl Into<String>) -> Self {
        self.api_key_header = header.into();
        self.api_key = Some(api_key.into());
        self
    }

    /// Resource URL for `key`, i.e. `{base_url}/{key}`
    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}

/// Thin wrapper over a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()?;

        Ok(Self { http })
    }

    /// GET `{base_url}/{key}` and decode the body as JSON.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        key: &str,
        params: &RequestParams,
    ) -> Result<T, CallError> {
        let url = params.url_for(key);

        let mut request = self.http.get(&url);
        if let Some(api_key) = &params.api_key {
            request = request.header(params.api_key_header.as_str(), api_key);
        }

        let response = request.send().await.map_err(|source| CallError::Transport {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CallError::Status { status, url });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| CallError::Decode { url, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_trims_trailing_slash() {
        let params = RequestParams::new("https://api.example.com/matches/");
        assert_eq!(
            params.url_for("EUW1_123"),
            "https://api.example.com/matches/EUW1_123"
        );
    }

    #[test]
    fn test_with_api_key() {
        let params = RequestParams::new("http://localhost").with_api_key("X-Riot-Token", "secret");
        assert_eq!(params.api_key_header, "X-Riot-Token");
        assert_eq!(params.api_key.as_deref(), Some("secret"));
    }
}
