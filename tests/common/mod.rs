//! Common test utilities for E2E tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use fedi_lookup::config::AppConfig;
use fedi_lookup::federation::{HttpTransport, OutboundRequest, TransportError, TransportResponse};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde_json::Value;
use url::Url;

/// Request as seen by the fake transport
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub signed: bool,
    pub follow_redirects: bool,
    pub headers: HeaderMap,
}

type Scripted = Result<TransportResponse, String>;

/// In-memory transport with scripted responses
///
/// Responses are keyed by normalized URL. Signed requests prefer a
/// signed-only response when one is scripted. Unscripted URLs answer 404.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<HashMap<String, Scripted>>,
    signed_routes: Mutex<HashMap<String, Scripted>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a response for both unsigned and signed requests
    pub fn route(&self, url: &str, response: TransportResponse) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .insert(normalize(url), Ok(response));
        self
    }

    /// Script a JSON body with status 200
    pub fn json(&self, url: &str, body: Value) -> &Self {
        self.route(url, json_response(StatusCode::OK, &body))
    }

    /// Script a response only for signed requests
    pub fn signed_route(&self, url: &str, response: TransportResponse) -> &Self {
        self.signed_routes
            .lock()
            .unwrap()
            .insert(normalize(url), Ok(response));
        self
    }

    /// Script a connection failure
    pub fn fail(&self, url: &str, reason: &str) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .insert(normalize(url), Err(reason.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// URLs requested, in order
    pub fn requested_urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }

    pub fn signed_requests(&self) -> Vec<RecordedRequest> {
        self.requests().into_iter().filter(|r| r.signed).collect()
    }
}

impl HttpTransport for FakeTransport {
    async fn send(&self, request: OutboundRequest) -> Result<TransportResponse, TransportError> {
        let url = request.url.to_string();
        let signed = request.is_signed();

        self.requests.lock().unwrap().push(RecordedRequest {
            url: url.clone(),
            signed,
            follow_redirects: request.follow_redirects,
            headers: request.headers.clone(),
        });

        let signed_response = if signed {
            self.signed_routes.lock().unwrap().get(&url).cloned()
        } else {
            None
        };
        let scripted = signed_response.or_else(|| self.routes.lock().unwrap().get(&url).cloned());

        match scripted {
            Some(Ok(response)) => Ok(response),
            Some(Err(reason)) => Err(TransportError(reason)),
            None => Ok(not_found()),
        }
    }
}

fn normalize(url: &str) -> String {
    Url::parse(url).expect("scripted URL must parse").to_string()
}

pub fn json_response(status: StatusCode, body: &Value) -> TransportResponse {
    TransportResponse {
        status,
        headers: HeaderMap::new(),
        body: serde_json::to_vec(body).unwrap(),
    }
}

pub fn text_response(status: StatusCode, body: &str) -> TransportResponse {
    TransportResponse {
        status,
        headers: HeaderMap::new(),
        body: body.as_bytes().to_vec(),
    }
}

pub fn redirect(status: StatusCode, location: &str) -> TransportResponse {
    let mut headers = HeaderMap::new();
    headers.insert(
        http::header::LOCATION,
        HeaderValue::from_str(location).unwrap(),
    );
    TransportResponse {
        status,
        headers,
        body: Vec::new(),
    }
}

pub fn not_found() -> TransportResponse {
    text_response(StatusCode::NOT_FOUND, "Not Found")
}

/// Configuration for tests: small keys, no pauses
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.signing.key_bits = 1024;
    config.resolver.attempt_delay_ms = 0;
    config
}

/// WebFinger URL for `user@domain`, as the resolver builds it
pub fn webfinger(user: &str, domain: &str) -> String {
    format!(
        "https://{}/.well-known/webfinger?resource=acct%3A{}%40{}",
        domain, user, domain
    )
}

/// Actor document with a single public key
pub fn actor(id: &str) -> Value {
    serde_json::json!({
        "@context": "https://www.w3.org/ns/activitystreams",
        "id": id,
        "type": "Person",
        "preferredUsername": "bob",
        "publicKey": {
            "id": format!("{}#main-key", id),
            "owner": id,
            "publicKeyPem": "-----BEGIN PUBLIC KEY-----\n...\n-----END PUBLIC KEY-----",
        },
    })
}

/// Note attributed to `author`
pub fn note(id: &str, author: &str, content: &str) -> Value {
    serde_json::json!({
        "@context": "https://www.w3.org/ns/activitystreams",
        "id": id,
        "type": "Note",
        "attributedTo": author,
        "content": content,
        "published": "2024-03-01T12:00:00Z",
    })
}
