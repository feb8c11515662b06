//! WebFinger protocol implementation
//!
//! Used to discover ActivityPub actor URIs from `user@domain` handles.

use url::Url;

use super::transport::{HttpTransport, JRD_ACCEPT, OutboundRequest};
use crate::data::{WebFingerDocument, WebFingerLink};
use crate::error::ResolveError;

/// `rel` of the HTML profile page link
pub const PROFILE_PAGE_REL: &str = "http://webfinger.net/rel/profile-page";

/// Split a handle into `(username, domain)`
///
/// Accepts `user@domain` and `@user@domain`.
pub fn parse_handle(handle: &str) -> Result<(&str, &str), ResolveError> {
    let stripped = handle.strip_prefix('@').unwrap_or(handle);
    let mut parts = stripped.split('@');

    match (parts.next(), parts.next(), parts.next()) {
        (Some(user), Some(domain), None) if !user.is_empty() && !domain.is_empty() => {
            Ok((user, domain))
        }
        _ => Err(ResolveError::InvalidHandle(handle.to_string())),
    }
}

/// Build the WebFinger lookup URL for `acct:user@domain`
pub fn webfinger_url(username: &str, domain: &str) -> Result<Url, ResolveError> {
    let resource = format!("acct:{}@{}", username, domain);
    let url = format!(
        "https://{}/.well-known/webfinger?resource={}",
        domain,
        urlencoding::encode(&resource)
    );

    Url::parse(&url).map_err(|e| ResolveError::InvalidUrl {
        input: url,
        reason: e.to_string(),
    })
}

/// Pick the actor link from a JRD document
///
/// Priority, first match wins:
/// 1. `rel=self` with an `activity+json` type
/// 2. `rel=self` with any type
/// 3. the profile page
pub fn select_actor_link(document: &WebFingerDocument) -> Option<&WebFingerLink> {
    let with_href = |link: &&WebFingerLink| link.href.as_deref().is_some_and(|h| !h.is_empty());

    let activity_self = document.links.iter().filter(with_href).find(|link| {
        link.rel == "self"
            && link
                .link_type
                .as_deref()
                .is_some_and(|t| t.contains("activity+json"))
    });

    activity_self
        .or_else(|| {
            document
                .links
                .iter()
                .filter(with_href)
                .find(|link| link.rel == "self")
        })
        .or_else(|| {
            document
                .links
                .iter()
                .filter(with_href)
                .find(|link| link.rel == PROFILE_PAGE_REL)
        })
}

/// WebFinger client
pub struct WebFingerClient<'a, T> {
    transport: &'a T,
}

impl<'a, T: HttpTransport> WebFingerClient<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    /// Resolve a handle to its ActivityPub actor URL
    ///
    /// # Arguments
    /// * `handle` - Account address (`user@domain` or `@user@domain`)
    ///
    /// # Errors
    /// - `InvalidHandle` for anything but exactly two `@`-separated parts
    /// - `WebFingerUnreachable` on transport failure or non-200
    /// - `WebFingerMalformed` when the body is not a JRD document
    /// - `WebFingerNoActorLink` when no usable link is listed
    pub async fn discover_actor(&self, handle: &str) -> Result<Url, ResolveError> {
        let (username, domain) = parse_handle(handle)?;
        let url = webfinger_url(username, domain)?;

        tracing::info!(%url, "Fetching WebFinger data");

        let request = OutboundRequest::get(url.clone()).header("accept", JRD_ACCEPT);
        let response = self.transport.send(request).await.map_err(|e| {
            ResolveError::WebFingerUnreachable {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;

        if response.status != http::StatusCode::OK {
            return Err(ResolveError::WebFingerUnreachable {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status),
            });
        }

        let document: WebFingerDocument =
            serde_json::from_slice(&response.body).map_err(|e| {
                ResolveError::WebFingerMalformed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            })?;

        let subject = if document.subject.is_empty() {
            format!("acct:{}@{}", username, domain)
        } else {
            document.subject.clone()
        };

        let link = select_actor_link(&document)
            .ok_or_else(|| ResolveError::WebFingerNoActorLink {
                subject: subject.clone(),
            })?;
        let href = link.href.as_deref().unwrap_or_default();

        tracing::info!(
            rel = %link.rel,
            link_type = link.link_type.as_deref().unwrap_or(""),
            href,
            "Found actor link"
        );

        Url::parse(href).map_err(|_| ResolveError::WebFingerNoActorLink { subject })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(links: serde_json::Value) -> WebFingerDocument {
        serde_json::from_value(json!({ "subject": "acct:bob@b.example", "links": links }))
            .expect("jrd")
    }

    #[test]
    fn parse_handle_accepts_both_forms() {
        assert_eq!(parse_handle("bob@b.example").expect("plain"), ("bob", "b.example"));
        assert_eq!(parse_handle("@bob@b.example").expect("prefixed"), ("bob", "b.example"));
    }

    #[test]
    fn parse_handle_rejects_malformed() {
        for handle in ["bob", "@bob", "bob@b@c", "@@b.example", "bob@"] {
            assert!(
                matches!(parse_handle(handle), Err(ResolveError::InvalidHandle(_))),
                "{handle} should be rejected"
            );
        }
    }

    #[test]
    fn webfinger_url_encodes_resource() {
        let url = webfinger_url("bob", "b.example").expect("url");
        assert_eq!(
            url.as_str(),
            "https://b.example/.well-known/webfinger?resource=acct%3Abob%40b.example"
        );
    }

    #[test]
    fn activity_self_link_beats_profile_page() {
        let doc = document(json!([
            { "rel": PROFILE_PAGE_REL, "type": "text/html", "href": "https://b.example/@bob" },
            { "rel": "self", "type": "text/html", "href": "https://b.example/html/bob" },
            { "rel": "self", "type": "application/activity+json", "href": "https://b.example/users/bob" },
        ]));

        let link = select_actor_link(&doc).expect("link");
        assert_eq!(link.href.as_deref(), Some("https://b.example/users/bob"));
    }

    #[test]
    fn untyped_self_link_beats_profile_page() {
        let doc = document(json!([
            { "rel": PROFILE_PAGE_REL, "href": "https://b.example/@bob" },
            { "rel": "self", "href": "https://b.example/actor/bob" },
        ]));

        let link = select_actor_link(&doc).expect("link");
        assert_eq!(link.href.as_deref(), Some("https://b.example/actor/bob"));
    }

    #[test]
    fn profile_page_is_last_resort() {
        let doc = document(json!([
            { "rel": "http://ostatus.org/schema/1.0/subscribe", "template": "https://b.example/authorize?uri={uri}" },
            { "rel": PROFILE_PAGE_REL, "href": "https://b.example/@bob" },
        ]));

        let link = select_actor_link(&doc).expect("link");
        assert_eq!(link.href.as_deref(), Some("https://b.example/@bob"));
    }

    #[test]
    fn no_usable_link() {
        let doc = document(json!([{ "rel": "self", "type": "application/activity+json" }]));
        assert!(select_actor_link(&doc).is_none());
    }
}
