//! Resolution orchestrator
//!
//! Drives a single input to its terminal outcome: classification, the
//! matching discovery path, then a small trampoline that follows
//! canonical ids and unwraps Announce activities with explicit depth
//! counters.

use url::Url;

use super::classify::{Route, classify};
use super::cross_instance::{CrossInstanceResolver, CrossInstanceTarget};
use crate::config::AppConfig;
use crate::data::{FetchedObject, Resolution};
use crate::error::ResolveError;
use crate::federation::{
    HttpTransport, NodeInfoClient, ObjectFetcher, ReqwestTransport, SigningSession,
    WebFingerClient,
};
use crate::render;

/// Trampoline state
enum Step {
    /// Fetch this URL next
    Fetch(Url),
    /// Decide what to do with a fetched object
    Inspect {
        object: FetchedObject,
        follow_canonical: bool,
    },
}

/// Resolves Fediverse input to ActivityPub objects or NodeInfo documents
///
/// Holds no state between calls; every `resolve` gets its own signing
/// session.
pub struct Resolver<T = ReqwestTransport> {
    transport: T,
    config: AppConfig,
}

impl Resolver<ReqwestTransport> {
    /// Create a resolver backed by reqwest
    pub fn new(config: AppConfig) -> Result<Self, ResolveError> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self { transport, config })
    }
}

impl<T: HttpTransport> Resolver<T> {
    pub fn with_transport(transport: T, config: AppConfig) -> Self {
        Self { transport, config }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Resolve input and render the result
    pub async fn resolve_and_render(&self, input: &str) -> Result<String, ResolveError> {
        let resolution = self.resolve(input).await?;
        Ok(render::render_resolution(&resolution))
    }

    /// Resolve input to its terminal outcome
    ///
    /// # Routes
    /// - bare domain: NodeInfo document
    /// - handle: WebFinger, then the actor object
    /// - cross-instance URL: template enumeration against the origin
    /// - other URL: the object, following canonical ids
    ///
    /// Announce activities whose `object` is a URL are replaced by the
    /// announced object.
    pub async fn resolve(&self, input: &str) -> Result<Resolution, ResolveError> {
        let input = input.trim();
        let mut session = SigningSession::new(self.config.signing.key_bits);

        let route = classify(input)?;
        tracing::debug!(input, ?route, "Classified input");

        let object = match route {
            Route::BareDomain { domain } => {
                tracing::info!(%domain, "Detected bare domain, fetching nodeinfo");
                let nodeinfo = NodeInfoClient::new(&self.transport).discover(&domain).await?;
                return Ok(Resolution::NodeInfo(nodeinfo));
            }
            Route::Handle(handle) => {
                tracing::info!(%handle, "Detected Fediverse handle, using WebFinger resolution");
                let actor = WebFingerClient::new(&self.transport)
                    .discover_actor(&handle)
                    .await?;
                self.run(&mut session, Step::Fetch(actor)).await?
            }
            Route::Url(url) => match CrossInstanceTarget::from_url(&url) {
                Some(target) => {
                    let object = CrossInstanceResolver::new(&self.transport, &self.config)
                        .resolve(&mut session, &target)
                        .await?;
                    let step = Step::Inspect {
                        object,
                        follow_canonical: false,
                    };
                    self.run(&mut session, step).await?
                }
                None => {
                    tracing::info!(%url, "Detected URL, attempting direct resolution");
                    self.run(&mut session, Step::Fetch(url)).await?
                }
            },
        };

        Ok(Resolution::Object(object))
    }

    async fn run(
        &self,
        session: &mut SigningSession,
        mut step: Step,
    ) -> Result<FetchedObject, ResolveError> {
        let fetcher = ObjectFetcher::new(&self.transport, &self.config);
        let max_depth = self.config.resolver.max_canonical_depth;
        let mut canonical_hops = 0;
        let mut unwraps = 0;

        loop {
            step = match step {
                Step::Fetch(url) => Step::Inspect {
                    object: fetcher.fetch_object(session, &url).await?,
                    follow_canonical: true,
                },
                Step::Inspect {
                    object,
                    follow_canonical,
                } => {
                    let canonical = follow_canonical
                        .then(|| canonical_redirect(&object))
                        .flatten();

                    if let Some(canonical) = canonical {
                        canonical_hops += 1;
                        if canonical_hops > max_depth {
                            return Err(ResolveError::CanonicalLoopSuspected {
                                url: canonical.to_string(),
                                depth: max_depth,
                            });
                        }
                        tracing::info!(
                            requested = %object.url,
                            canonical = %canonical,
                            "Following canonical id"
                        );
                        step = Step::Fetch(canonical);
                        continue;
                    }

                    let Some(announced) = object.announced_url().map(str::to_string) else {
                        return Ok(object);
                    };

                    let announced = Url::parse(&announced).map_err(|e| ResolveError::InvalidUrl {
                        input: announced.clone(),
                        reason: e.to_string(),
                    })?;

                    unwraps += 1;
                    if unwraps > max_depth {
                        return Err(ResolveError::CanonicalLoopSuspected {
                            url: announced.to_string(),
                            depth: max_depth,
                        });
                    }
                    tracing::info!(announce = %object.url, object = %announced, "Unwrapping Announce");
                    canonical_hops = 0;
                    Step::Fetch(announced)
                }
            };
        }
    }
}

/// Canonical id to follow, if it differs from where the object came from
///
/// Ids that are not absolute http(s) URLs are not followed.
fn canonical_redirect(object: &FetchedObject) -> Option<Url> {
    let id = Url::parse(object.id()?).ok()?;
    if !matches!(id.scheme(), "http" | "https") || id == object.url {
        return None;
    }
    Some(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fetched(url: &str, value: serde_json::Value) -> FetchedObject {
        FetchedObject {
            url: Url::parse(url).expect("url"),
            raw: serde_json::to_vec(&value).expect("serialize"),
            object: value.as_object().expect("object").clone(),
        }
    }

    #[test]
    fn canonical_redirect_ignores_matching_id() {
        let object = fetched(
            "https://a.example/notes/1",
            json!({ "id": "https://a.example/notes/1" }),
        );
        assert_eq!(canonical_redirect(&object), None);
    }

    #[test]
    fn canonical_redirect_follows_differing_id() {
        let object = fetched(
            "https://a.example/@bob/1",
            json!({ "id": "https://a.example/users/bob/statuses/1" }),
        );
        assert_eq!(
            canonical_redirect(&object).map(String::from),
            Some("https://a.example/users/bob/statuses/1".to_string())
        );
    }

    #[test]
    fn canonical_redirect_ignores_empty_and_non_http_ids() {
        for id in [json!(""), json!("urn:uuid:1234"), json!(17)] {
            let object = fetched("https://a.example/notes/1", json!({ "id": id }));
            assert_eq!(canonical_redirect(&object), None);
        }
    }
}
