//! Input classification
//!
//! Decides whether raw input is a bare domain, a handle or a URL.

use url::Url;

use crate::error::ResolveError;

/// Where an input is routed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Server root; NodeInfo lookup. `domain` is `host[:port]`.
    BareDomain { domain: String },
    /// `user@domain` or `@user@domain`; WebFinger lookup
    Handle(String),
    /// Anything else, scheme added when missing
    Url(Url),
}

/// Classify input
///
/// Rules, in order:
/// 1. Bare domain: `https://` is prefixed when the input has neither a
///    scheme nor an `@`; the URL must have a host, an empty or `/` path,
///    no query and no fragment. Userinfo is ignored.
/// 2. Handle: contains `@` but no `/` or `:`, with one `@`, or two and a
///    leading `@`.
/// 3. URL: everything else.
pub fn classify(input: &str) -> Result<Route, ResolveError> {
    let has_scheme = input.contains("://");

    let normalized = if !has_scheme && !input.contains('@') {
        format!("https://{}", input)
    } else {
        input.to_string()
    };

    if let Ok(url) = Url::parse(&normalized) {
        if let Some(domain) = bare_domain(&url) {
            return Ok(Route::BareDomain { domain });
        }
    }

    if is_handle(input) {
        return Ok(Route::Handle(input.to_string()));
    }

    let with_scheme = if input.starts_with("http://") || input.starts_with("https://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    };

    Url::parse(&with_scheme)
        .map(Route::Url)
        .map_err(|e| ResolveError::InvalidUrl {
            input: input.to_string(),
            reason: e.to_string(),
        })
}

fn bare_domain(url: &Url) -> Option<String> {
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    if !matches!(url.path(), "" | "/") || url.query().is_some() || url.fragment().is_some() {
        return None;
    }

    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

fn is_handle(input: &str) -> bool {
    if input.contains('/') || input.contains(':') {
        return false;
    }

    let at_count = input.matches('@').count();
    if input.starts_with('@') {
        at_count == 2
    } else {
        at_count == 1
    }
}
