//! Pass-through HTTP proxy for the backend API.
//!
//! `ANY /api/{*path}?backendUrl=<url>` forwards method, headers and body to
//! `<url>/<path>` and relays the upstream response unchanged. Lets a browser
//! or another client reach a backend on a private network through one origin.
//!
//! Status mapping for proxy-side failures:
//! - missing or invalid `backendUrl` → 400
//! - path listed in `disabled_proxy_paths` → 404
//! - upstream refuses the connection → 503
//! - any other forwarding failure → 500

use std::future::Future;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderName, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use thiserror::Error;
use tokio::net::TcpListener;
use url::Url;

use crate::util::{validate_backend_url, UrlValidationError};

/// Query parameter naming the upstream base URL.
pub const BACKEND_URL_PARAM: &str = "backendUrl";

/// Connection-scoped headers that must not be forwarded (RFC 9110 §7.6.1),
/// plus `host`, which reqwest derives from the target URL.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Missing backendUrl query parameter")]
    MissingBackendUrl,

    #[error("Invalid backendUrl: {0}")]
    InvalidBackendUrl(#[from] UrlValidationError),

    #[error("Path is disabled: {0}")]
    Disabled(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(#[source] reqwest::Error),

    #[error("Proxy request failed: {0}")]
    Upstream(#[source] reqwest::Error),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingBackendUrl | Self::InvalidBackendUrl(_) => StatusCode::BAD_REQUEST,
            Self::Disabled(_) => StatusCode::NOT_FOUND,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::Unavailable(err)
        } else {
            Self::Upstream(err)
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "Proxy request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Proxy request rejected");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

// ============================================================================
// Server
// ============================================================================

/// Shared state of the proxy routes.
#[derive(Clone)]
pub struct ProxyState {
    client: reqwest::Client,
    disabled_paths: Arc<[String]>,
}

impl ProxyState {
    pub fn new(client: reqwest::Client, disabled_paths: &[String]) -> Self {
        let disabled_paths = disabled_paths
            .iter()
            .map(|p| p.trim_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .collect();
        Self {
            client,
            disabled_paths,
        }
    }

    fn is_disabled(&self, path: &str) -> bool {
        let path = path.trim_matches('/');
        self.disabled_paths.iter().any(|d| {
            path == d.as_str()
                || path
                    .strip_prefix(d.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

pub fn router(state: ProxyState) -> Router {
    Router::new()
        .route("/api/{*path}", any(forward))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Serve the proxy on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: ProxyState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "Proxy listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("Proxy stopped");
    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn forward(
    State(state): State<ProxyState>,
    Path(path): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let target = target_url(&path, uri.query())?;
    if state.is_disabled(&path) {
        return Err(ProxyError::Disabled(path));
    }

    tracing::debug!(%method, %target, "Forwarding request");
    let upstream = state
        .client
        .request(method, target)
        .headers(forwardable_headers(&headers))
        .body(body)
        .send()
        .await?;

    let status = upstream.status();
    let response_headers = forwardable_headers(upstream.headers());
    let bytes = upstream.bytes().await?;

    Ok((status, response_headers, bytes).into_response())
}

// ============================================================================
// Request Rewriting
// ============================================================================

/// Build `<backendUrl>/<path>?<other params>` from the incoming request.
///
/// The path is appended to the backend's own path rather than URL-joined, so
/// a crafted path cannot switch hosts.
pub fn target_url(path: &str, query: Option<&str>) -> Result<Url, ProxyError> {
    let mut backend = None;
    let mut rest = url::form_urlencoded::Serializer::new(String::new());
    let mut has_rest = false;
    for (key, value) in url::form_urlencoded::parse(query.unwrap_or("").as_bytes()) {
        if key == BACKEND_URL_PARAM {
            backend = Some(value.into_owned());
        } else {
            rest.append_pair(&key, &value);
            has_rest = true;
        }
    }

    let backend = backend
        .filter(|b| !b.trim().is_empty())
        .ok_or(ProxyError::MissingBackendUrl)?;
    let mut url = validate_backend_url(backend.trim())?;

    let joined = format!(
        "{}/{}",
        url.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
    url.set_fragment(None);
    if has_rest {
        url.set_query(Some(&rest.finish()));
    } else {
        url.set_query(None);
    }
    Ok(url)
}

/// Copy headers minus hop-by-hop ones, including any named in `Connection`.
pub fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    let named_by_connection: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if HOP_BY_HOP.contains(&name.as_str()) || named_by_connection.contains(name) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_target_url_strips_backend_param() {
        let url = target_url(
            "query",
            Some("backendUrl=http%3A%2F%2Flocalhost%3A1300&x=1&y=a%20b"),
        )
        .unwrap();
        assert_eq!(url.as_str(), "http://localhost:1300/query?x=1&y=a+b");
    }

    #[test]
    fn test_target_url_keeps_backend_path() {
        let url = target_url("v1/query_config", Some("backendUrl=http://h:1/base/")).unwrap();
        assert_eq!(url.as_str(), "http://h:1/base/v1/query_config");
    }

    #[test]
    fn test_target_url_cannot_switch_host() {
        let url = target_url("//evil.example/x", Some("backendUrl=http://h:1")).unwrap();
        assert_eq!(url.host_str(), Some("h"));
    }

    #[test]
    fn test_target_url_rejects_missing_or_invalid() {
        assert!(matches!(
            target_url("query", None),
            Err(ProxyError::MissingBackendUrl)
        ));
        assert!(matches!(
            target_url("query", Some("backendUrl=")),
            Err(ProxyError::MissingBackendUrl)
        ));
        let err = target_url("query", Some("backendUrl=file:///etc")).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_hop_by_hop_headers_removed() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("proxy:5173"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-trace"));
        headers.insert("x-trace", HeaderValue::from_static("1"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer t"));

        let out = forwardable_headers(&headers);
        assert_eq!(out.len(), 2);
        assert!(out.contains_key(header::CONTENT_TYPE));
        assert!(out.contains_key(header::AUTHORIZATION));
    }

    #[test]
    fn test_disabled_paths_match_segments() {
        let state = ProxyState::new(
            reqwest::Client::new(),
            &["/apply_config/".to_string(), String::new()],
        );
        assert!(state.is_disabled("apply_config"));
        assert!(state.is_disabled("apply_config/sub"));
        assert!(!state.is_disabled("apply_config_v2"));
        assert!(!state.is_disabled("query"));
    }
}
