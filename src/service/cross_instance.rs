//! Cross-instance URL resolution
//!
//! `https://a.example/@bob@b.example/42` is how instance `a` displays a
//! post it copied from `b`. The object lives on `b`, but every server
//! software names its object URLs differently, so the configured
//! templates are tried one after another against `b`.

use url::Url;

use crate::config::AppConfig;
use crate::data::FetchedObject;
use crate::error::ResolveError;
use crate::federation::{HttpTransport, ObjectFetcher, SigningSession, WebFingerClient};

/// Origin coordinates extracted from a cross-instance URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossInstanceTarget {
    /// Origin host (`host[:port]`)
    pub host: String,
    pub user: String,
    pub post_id: String,
}

impl CrossInstanceTarget {
    /// Recognise `/@user@host/postId` paths
    ///
    /// Profile URLs (`/@user@host` without a post id) are not matched.
    pub fn from_url(url: &Url) -> Option<Self> {
        let mut segments = url.path_segments()?;
        let account = segments.next()?.strip_prefix('@')?;
        let (user, host) = account.split_once('@')?;
        if user.is_empty() || host.is_empty() || host.contains('@') {
            return None;
        }

        let post_id = segments.next().filter(|id| !id.is_empty())?;

        Some(Self {
            host: host.to_string(),
            user: user.to_string(),
            post_id: post_id.to_string(),
        })
    }

    /// Fill `{host}`, `{user}` and `{id}` placeholders
    pub fn expand(&self, template: &str) -> String {
        template
            .replace("{host}", &self.host)
            .replace("{user}", &self.user)
            .replace("{id}", &self.post_id)
    }
}

/// Enumerates URL templates against the origin instance
pub struct CrossInstanceResolver<'a, T> {
    transport: &'a T,
    config: &'a AppConfig,
}

impl<'a, T: HttpTransport> CrossInstanceResolver<'a, T> {
    pub fn new(transport: &'a T, config: &'a AppConfig) -> Self {
        Self { transport, config }
    }

    /// Fetch the original object from the origin instance
    ///
    /// Templates are tried in configured order, each through the full
    /// object fetcher; the first success wins. A configurable pause
    /// separates attempts.
    ///
    /// # Errors
    /// `CrossInstanceUnresolved` naming the origin host and carrying the
    /// last per-template error.
    pub async fn resolve(
        &self,
        session: &mut SigningSession,
        target: &CrossInstanceTarget,
    ) -> Result<FetchedObject, ResolveError> {
        tracing::info!(
            host = %target.host,
            user = %target.user,
            post_id = %target.post_id,
            "Detected cross-instance URL"
        );

        let fetcher = ObjectFetcher::new(self.transport, self.config);
        let templates = &self.config.resolver.cross_instance_templates;
        let mut last_error = None;

        for (attempt, template) in templates.iter().enumerate() {
            if attempt > 0 {
                self.pause().await;
            }

            let candidate = target.expand(template);
            tracing::info!(url = %candidate, "Trying URL format");

            let result = match Url::parse(&candidate) {
                Ok(url) => fetcher.fetch_object(session, &url).await,
                Err(e) => Err(ResolveError::InvalidUrl {
                    input: candidate.clone(),
                    reason: e.to_string(),
                }),
            };

            match result {
                Ok(object) => {
                    self.confirm_author(target, &object).await;
                    return Ok(object);
                }
                Err(error) => {
                    tracing::warn!(url = %candidate, %error, "URL format failed");
                    last_error = Some(Box::new(error));
                }
            }
        }

        Err(ResolveError::CrossInstanceUnresolved {
            host: target.host.clone(),
            attempts: templates.len(),
            last_error,
        })
    }

    /// Guess the actor URL of `user` on `host`
    ///
    /// Tries the configured actor templates with plain GETs, accepting the
    /// first JSON object carrying an `id`, then falls back to WebFinger.
    pub async fn guess_actor_url(&self, user: &str, host: &str) -> Option<Url> {
        self.guess_actor(user, host, true).await
    }

    async fn guess_actor(&self, user: &str, host: &str, paced: bool) -> Option<Url> {
        let fetcher = ObjectFetcher::new(self.transport, self.config);
        let target = CrossInstanceTarget {
            host: host.to_string(),
            user: user.to_string(),
            post_id: String::new(),
        };

        for (attempt, template) in self.config.resolver.actor_path_templates.iter().enumerate() {
            if paced && attempt > 0 {
                self.pause().await;
            }

            let Ok(candidate) = Url::parse(&target.expand(template)) else {
                continue;
            };

            match fetcher.fetch_actor(&candidate).await {
                Ok(actor) => {
                    if let Some(id) = actor.id().and_then(|id| Url::parse(id).ok()) {
                        tracing::debug!(%candidate, actor = %id, "Actor URL guessed");
                        return Some(id);
                    }
                }
                Err(error) => tracing::debug!(%candidate, %error, "Actor URL guess failed"),
            }
        }

        if paced && !self.config.resolver.actor_path_templates.is_empty() {
            self.pause().await;
        }
        let handle = format!("{}@{}", user, host);
        match WebFingerClient::new(self.transport).discover_actor(&handle).await {
            Ok(url) => Some(url),
            Err(error) => {
                tracing::debug!(%handle, %error, "WebFinger fallback failed");
                None
            }
        }
    }

    /// Best-effort check that the object belongs to the expected actor
    ///
    /// The object is accepted either way, so the guesses run unpaced.
    async fn confirm_author(&self, target: &CrossInstanceTarget, object: &FetchedObject) {
        let Some(author) = object.attributed_to() else {
            return;
        };

        match self.guess_actor(&target.user, &target.host, false).await {
            Some(actor) if actor.as_str() == author => {
                tracing::info!(%actor, "Cross-instance object author confirmed");
            }
            Some(actor) => tracing::warn!(
                expected = %actor,
                found = author,
                "Cross-instance object is attributed to a different actor"
            ),
            None => tracing::warn!(
                user = %target.user,
                host = %target.host,
                "Could not determine actor to confirm cross-instance object"
            ),
        }
    }

    async fn pause(&self) {
        let delay = self.config.attempt_delay();
        if !delay.is_zero() {
            tracing::debug!(?delay, "Waiting before next attempt");
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(url: &str) -> Option<CrossInstanceTarget> {
        CrossInstanceTarget::from_url(&Url::parse(url).expect("url"))
    }

    #[test]
    fn recognises_cross_instance_urls() {
        assert_eq!(
            target("https://a.example/@bob@b.example/42"),
            Some(CrossInstanceTarget {
                host: "b.example".to_string(),
                user: "bob".to_string(),
                post_id: "42".to_string(),
            })
        );
    }

    #[test]
    fn ignores_local_and_profile_urls() {
        assert_eq!(target("https://a.example/@bob/42"), None);
        assert_eq!(target("https://a.example/@bob@b.example"), None);
        assert_eq!(target("https://a.example/@bob@b.example/"), None);
        assert_eq!(target("https://a.example/users/bob@b.example/42"), None);
    }

    #[test]
    fn expands_templates() {
        let target = target("https://a.example/@bob@b.example/42").expect("target");

        assert_eq!(
            target.expand("https://{host}/users/{user}/statuses/{id}"),
            "https://b.example/users/bob/statuses/42"
        );
        assert_eq!(target.expand("https://{host}/notice/{id}"), "https://b.example/notice/42");
    }
}
