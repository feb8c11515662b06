//! Error types for fedi-lookup
//!
//! Every stage of a resolution reports failures as a `ResolveError`
//! variant naming the stage and the URL or host it was working on.

use thiserror::Error;

/// Resolution error taxonomy
///
/// A resolution either succeeds with a renderable object or fails with
/// exactly one of these. Variants carry enough context (URL, status,
/// body) to retry the failing step by hand.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Input looked like a handle but is not `user@domain`
    #[error("invalid handle format: {0}")]
    InvalidHandle(String),

    /// Input or a discovered link is not a usable URL
    #[error("invalid URL {input}: {reason}")]
    InvalidUrl { input: String, reason: String },

    /// WebFinger endpoint could not be reached or answered non-200
    #[error("WebFinger request to {url} failed: {reason}")]
    WebFingerUnreachable { url: String, reason: String },

    /// WebFinger body was not a JRD document
    #[error("WebFinger response from {url} is malformed: {reason}")]
    WebFingerMalformed { url: String, reason: String },

    /// JRD document had no usable actor link
    #[error("no ActivityPub actor link in WebFinger response for {subject}")]
    WebFingerNoActorLink { subject: String },

    /// Discovery document lists neither NodeInfo 2.1 nor 2.0
    #[error("no NodeInfo schema 2.1 or 2.0 advertised by {domain}")]
    NodeInfoSchemaUnsupported { domain: String },

    /// NodeInfo discovery or document request failed
    #[error("NodeInfo request to {url} failed: {reason}")]
    NodeInfoUnreachable { url: String, reason: String },

    /// NodeInfo discovery or document body could not be decoded
    #[error("NodeInfo response from {url} is malformed: {reason}")]
    NodeInfoMalformed { url: String, reason: String },

    /// No public key id could be found to put in the signature
    #[error("no signing key id discoverable for {url}: {reason}")]
    NoSigningKey { url: String, reason: String },

    /// Key generation or signing failed locally
    #[error("signing error: {0}")]
    Signing(String),

    /// Connection, TLS or timeout failure while fetching an object
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    /// Object request answered with a non-success status
    #[error("request to {url} failed with status {status}, body: {body}")]
    FetchFailed {
        url: String,
        status: u16,
        body: String,
    },

    /// Object request succeeded with an empty body
    #[error("received empty response body from {url}")]
    EmptyResponse { url: String },

    /// Object body is not a JSON object
    #[error("error decoding response from {url}: {reason}")]
    DecodeFailed { url: String, reason: String },

    /// Redirect chain exceeded the configured hop limit
    #[error("too many redirects starting at {url} (limit {limit})")]
    RedirectLoop { url: String, limit: usize },

    /// Every cross-instance URL template failed
    #[error(
        "failed to fetch content from original instance {host}: all {attempts} URL formats tried{}",
        .last_error.as_ref().map(|e| format!(", last error: {e}")).unwrap_or_default()
    )]
    CrossInstanceUnresolved {
        host: String,
        attempts: usize,
        last_error: Option<Box<ResolveError>>,
    },

    /// Canonical id (or Announce) following went deeper than allowed
    #[error("canonical id chain too deep at {url} (more than {depth} hops)")]
    CanonicalLoopSuspected { url: String, depth: usize },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for ResolveError {
    fn from(err: config::ConfigError) -> Self {
        ResolveError::Config(err.to_string())
    }
}

/// Result type alias using ResolveError
pub type Result<T> = std::result::Result<T, ResolveError>;
