//! ActivityPub object fetching
//!
//! Signature-first: a direct unsigned GET (redirects handled here, not by
//! the client) yields the object that tells us which key id to sign
//! with, then the same URL is fetched again with an HTTP Signature and
//! the signed response is what callers get.

use std::sync::LazyLock;

use http::StatusCode;
use regex::bytes::Regex;
use serde_json::Value;
use url::Url;

use super::signature::{SigningSession, sign_request};
use super::transport::{ACTIVITY_ACCEPT, HttpTransport, OutboundRequest, TransportResponse};
use crate::config::AppConfig;
use crate::data::{FetchedObject, public_key_id};
use crate::error::ResolveError;

static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*[a-zA-Z]").expect("valid ANSI escape pattern"));

/// Result of an unsigned attempt
enum DirectOutcome {
    Object(FetchedObject),
    Redirect(Url),
}

/// Object fetcher
pub struct ObjectFetcher<'a, T> {
    transport: &'a T,
    config: &'a AppConfig,
}

impl<'a, T: HttpTransport> ObjectFetcher<'a, T> {
    pub fn new(transport: &'a T, config: &'a AppConfig) -> Self {
        Self { transport, config }
    }

    /// Fetch an ActivityPub object
    ///
    /// # Steps
    /// 1. Direct GET; 301/302/307/308 move to `Location` (relative
    ///    references resolved against the current URL)
    /// 2. Key id from the direct result: the `publicKey.id` of its
    ///    `attributedTo` (or activity `actor`), else the object's own
    ///    `publicKey.id`
    /// 3. Signed GET at the final URL
    ///
    /// # Errors
    /// - `Transport` / `FetchFailed` / `EmptyResponse` / `DecodeFailed`
    /// - `RedirectLoop` past `http.max_redirects` hops
    /// - `NoSigningKey` when no key id can be found
    pub async fn fetch_object(
        &self,
        session: &mut SigningSession,
        url: &Url,
    ) -> Result<FetchedObject, ResolveError> {
        tracing::info!(%url, "Fetching ActivityPub object");

        let limit = self.config.http.max_redirects;
        let mut current = url.clone();
        let mut hops = 0;

        let preview = loop {
            match self.fetch_direct(&current).await? {
                DirectOutcome::Object(object) => break object,
                DirectOutcome::Redirect(next) => {
                    hops += 1;
                    if hops > limit {
                        return Err(ResolveError::RedirectLoop {
                            url: url.to_string(),
                            limit,
                        });
                    }
                    tracing::info!(from = %current, to = %next, "Found redirect");
                    current = next;
                }
            }
        };

        let key_id = self.discover_key_id(&preview).await?;
        self.fetch_signed(session, &current, &key_id).await
    }

    /// Plain GET for an actor document, redirects followed by the client
    pub async fn fetch_actor(&self, url: &Url) -> Result<FetchedObject, ResolveError> {
        tracing::debug!(%url, "Fetching actor data");

        let request = OutboundRequest::get(url.clone()).header("accept", ACTIVITY_ACCEPT);
        let response = self.send(url, request).await?;

        if response.status != StatusCode::OK {
            return Err(fetch_failed(url, &response));
        }

        decode_object(url, response.body)
    }

    async fn fetch_direct(&self, url: &Url) -> Result<DirectOutcome, ResolveError> {
        tracing::debug!(%url, "Fetching ActivityPub object directly");

        let request = OutboundRequest::get(url.clone())
            .header("accept", ACTIVITY_ACCEPT)
            .without_redirects();
        let response = self.send(url, request).await?;

        if response.is_redirect() {
            if let Some(location) = response.location() {
                let next = url.join(location).map_err(|e| ResolveError::InvalidUrl {
                    input: location.to_string(),
                    reason: e.to_string(),
                })?;
                return Ok(DirectOutcome::Redirect(next));
            }
        }

        if response.status != StatusCode::OK {
            return Err(fetch_failed(url, &response));
        }

        decode_object(url, response.body).map(DirectOutcome::Object)
    }

    async fn fetch_signed(
        &self,
        session: &mut SigningSession,
        url: &Url,
        key_id: &str,
    ) -> Result<FetchedObject, ResolveError> {
        tracing::info!(%url, key_id, "Fetching ActivityPub object with HTTP signature");

        let keypair = session.keypair().await?;
        let signed = sign_request(
            "GET",
            url,
            None,
            key_id,
            &keypair,
            self.config.signing.validity_seconds,
        )?;

        let request = OutboundRequest::get(url.clone())
            .header("accept", ACTIVITY_ACCEPT)
            .header("host", &signed.host)
            .header("date", &signed.date)
            .header("digest", &signed.digest)
            .header("signature", &signed.signature)
            .without_redirects();
        let response = self.send(url, request).await?;

        if response.status != StatusCode::OK {
            return Err(fetch_failed(url, &response));
        }

        decode_object(url, response.body)
    }

    async fn discover_key_id(&self, object: &FetchedObject) -> Result<String, ResolveError> {
        let Some(actor) = object.key_owner() else {
            tracing::debug!(url = %object.url, "No attributedTo or actor, looking for a key on the object");
            return object
                .public_key_id()
                .map(str::to_string)
                .ok_or_else(|| ResolveError::NoSigningKey {
                    url: object.url.to_string(),
                    reason: "object has no attributedTo, actor or publicKey.id".to_string(),
                });
        };

        let no_key = |reason: String| ResolveError::NoSigningKey {
            url: object.url.to_string(),
            reason,
        };

        let actor_url = Url::parse(actor)
            .map_err(|e| no_key(format!("invalid attributedTo {}: {}", actor, e)))?;
        let actor_doc = self
            .fetch_actor(&actor_url)
            .await
            .map_err(|e| no_key(format!("could not fetch actor data: {}", e)))?;

        public_key_id(&actor_doc.object)
            .map(str::to_string)
            .ok_or_else(|| no_key(format!("actor {} has no publicKey.id", actor_url)))
    }

    async fn send(
        &self,
        url: &Url,
        request: OutboundRequest,
    ) -> Result<TransportResponse, ResolveError> {
        self.transport
            .send(request)
            .await
            .map_err(|e| ResolveError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }
}

fn fetch_failed(url: &Url, response: &TransportResponse) -> ResolveError {
    ResolveError::FetchFailed {
        url: url.to_string(),
        status: response.status.as_u16(),
        body: response.body_text(),
    }
}

/// Decode a body into an object, stripping terminal escape sequences
/// some servers leave in their output
pub fn decode_object(url: &Url, body: Vec<u8>) -> Result<FetchedObject, ResolveError> {
    if body.is_empty() {
        return Err(ResolveError::EmptyResponse {
            url: url.to_string(),
        });
    }

    let raw = if ANSI_ESCAPE.is_match(&body) {
        ANSI_ESCAPE.replace_all(&body, &b""[..]).into_owned()
    } else {
        body
    };

    match serde_json::from_slice::<Value>(&raw) {
        Ok(Value::Object(object)) => Ok(FetchedObject {
            url: url.clone(),
            raw,
            object,
        }),
        Ok(_) => Err(ResolveError::DecodeFailed {
            url: url.to_string(),
            reason: "expected a JSON object".to_string(),
        }),
        Err(e) => Err(ResolveError::DecodeFailed {
            url: url.to_string(),
            reason: e.to_string(),
        }),
    }
}
