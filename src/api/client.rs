use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use super::types::{QueryRequest, QueryResponse};
use crate::util::validate_backend_url;

/// Cap on error bodies echoed back to the user.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Backend unreachable at {0}")]
    Unreachable(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("Backend returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("Unexpected response from backend: {0}")]
    Decode(String),
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_connect() {
            let target = err
                .url()
                .map(|u| u.origin().ascii_serialization())
                .unwrap_or_default();
            ApiError::Unreachable(target)
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err)
        }
    }
}

/// Client for the aggregation backend's JSON API.
///
/// Requests are never retried here; callers surface the error and let the
/// user retry.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base: Url,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(ApiError::Network)?;
        Self::with_client(http, base_url)
    }

    /// Build around an existing `reqwest::Client` (shares its connection pool).
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, ApiError> {
        let mut base =
            validate_backend_url(base_url).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        // Url::join replaces the last segment unless the path ends with '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// `POST /query`
    pub async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, ApiError> {
        tracing::debug!(
            start = %request.start,
            end = %request.end,
            limit = request.limit,
            query = %request.query,
            "Querying backend"
        );
        let response: QueryResponse = self.post_json("query", request).await?;
        tracing::info!(
            feeds = response.feeds.len(),
            count = response.count,
            "Query complete"
        );
        Ok(response)
    }

    /// `POST /query_config`: the backend's current configuration document.
    pub async fn query_config(&self) -> Result<serde_json::Value, ApiError> {
        self.post_json("query_config", &serde_json::json!({})).await
    }

    /// `POST /apply_config`: replace the backend configuration.
    pub async fn apply_config(&self, config: &serde_json::Value) -> Result<(), ApiError> {
        let _: serde_json::Value = self.post_json("apply_config", config).await?;
        tracing::info!("Backend configuration applied");
        Ok(())
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self
            .base
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;

        let response = self.http.post(url).json(body).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes);
            let body = crate::util::truncate_to_width(text.trim(), MAX_ERROR_BODY).into_owned();
            tracing::warn!(path, status = status.as_u16(), "Backend request failed");
            return Err(ApiError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        // Some endpoints answer with an empty body on success.
        let bytes: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &bytes
        };
        serde_json::from_slice(bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client = BackendClient::new("http://localhost:1300/prefix", Duration::from_secs(5))
            .unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:1300/prefix/");
        assert_eq!(
            client.base_url().join("query").unwrap().as_str(),
            "http://localhost:1300/prefix/query"
        );
    }

    #[test]
    fn test_rejects_non_http_base() {
        let result = BackendClient::new("file:///etc/passwd", Duration::from_secs(5));
        assert!(matches!(result, Err(ApiError::InvalidUrl(_))));
    }
}
