//! HTTP transport
//!
//! Every outbound request goes through `HttpTransport`, so the protocol
//! clients never touch reqwest directly. `ReqwestTransport` is the
//! production implementation; tests script responses in memory.

use std::future::Future;

use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use thiserror::Error;
use url::Url;

use crate::config::AppConfig;
use crate::error::ResolveError;

/// Accept header for ActivityPub content negotiation
pub const ACTIVITY_ACCEPT: &str = "application/activity+json, application/ld+json; profile=\"https://www.w3.org/ns/activitystreams\", application/json";

/// Accept header for WebFinger JRD documents
pub const JRD_ACCEPT: &str = "application/jrd+json, application/json";

/// Accept header for NodeInfo documents
pub const JSON_ACCEPT: &str = "application/json";

/// Outbound GET request
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: Url,
    pub headers: HeaderMap,
    /// Let the transport follow 3xx responses itself
    pub follow_redirects: bool,
}

impl OutboundRequest {
    pub fn get(url: Url) -> Self {
        Self {
            url,
            headers: HeaderMap::new(),
            follow_redirects: true,
        }
    }

    /// Add a header; invalid names or values are dropped with a warning
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::warn!(header = name, "Dropping invalid request header"),
        }
        self
    }

    pub fn without_redirects(mut self) -> Self {
        self.follow_redirects = false;
        self
    }

    pub fn is_signed(&self) -> bool {
        self.headers.contains_key("signature")
    }
}

/// Response as seen by the protocol clients
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn is_redirect(&self) -> bool {
        matches!(
            self.status,
            StatusCode::MOVED_PERMANENTLY
                | StatusCode::FOUND
                | StatusCode::TEMPORARY_REDIRECT
                | StatusCode::PERMANENT_REDIRECT
        )
    }

    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(http::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
    }

    /// Body as lossy UTF-8, for diagnostics
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Connection-level failure (DNS, TLS, timeout, reset)
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError(err.to_string())
    }
}

/// Issues outbound GET requests
pub trait HttpTransport: Send + Sync {
    fn send(
        &self,
        request: OutboundRequest,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}

/// reqwest-backed transport
///
/// Holds two clients: one that follows redirects (discovery and actor
/// fetches) and one that never does (object fetches, which handle
/// redirects themselves).
#[derive(Clone)]
pub struct ReqwestTransport {
    following: reqwest::Client,
    direct: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &AppConfig) -> Result<Self, ResolveError> {
        let build = |policy: reqwest::redirect::Policy| {
            reqwest::Client::builder()
                .user_agent(config.http.user_agent.clone())
                .timeout(config.timeout())
                .redirect(policy)
                .build()
                .map_err(|e| ResolveError::Config(format!("Failed to build HTTP client: {}", e)))
        };

        Ok(Self {
            following: build(reqwest::redirect::Policy::limited(config.http.max_redirects))?,
            direct: build(reqwest::redirect::Policy::none())?,
        })
    }
}

impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: OutboundRequest) -> Result<TransportResponse, TransportError> {
        let client = if request.follow_redirects {
            &self.following
        } else {
            &self.direct
        };

        tracing::debug!(
            url = %request.url,
            signed = request.is_signed(),
            follow_redirects = request.follow_redirects,
            "Sending request"
        );

        let response = client
            .get(request.url)
            .headers(request.headers)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        tracing::debug!(
            status = %status,
            content_type = ?headers.get(http::header::CONTENT_TYPE),
            bytes = body.len(),
            "Received response"
        );

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}
