//! HTTP Signatures for outgoing fetches
//!
//! Implements signing per:
//! https://docs.joinmastodon.org/spec/security/
//!
//! Keys are ephemeral. The receiving server has never seen the public
//! half, so these signatures only satisfy servers that require a
//! well-formed `Signature` header to be present; servers that verify
//! against the advertised actor key will still reject them.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, Utc};
use rsa::signature::{RandomizedSigner, SignatureEncoding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use url::Url;

use crate::error::ResolveError;

/// `Digest` header value for an empty body
pub const EMPTY_BODY_DIGEST: &str = "SHA-256=47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=";

/// Headers covered by every signature, in signing order
pub const SIGNED_HEADERS: [&str; 4] = ["(request-target)", "host", "date", "digest"];

/// Ephemeral RSA keypair
///
/// Generated in memory for a single resolution and dropped with it.
pub struct SigningKeypair {
    private_key: RsaPrivateKey,
}

impl SigningKeypair {
    /// Generate a fresh keypair
    ///
    /// CPU-bound (hundreds of milliseconds at 2048 bits); async callers
    /// should run it on a blocking thread.
    pub fn generate(bits: usize) -> Result<Self, ResolveError> {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| ResolveError::Signing(format!("Failed to generate RSA key: {}", e)))?;
        Ok(Self { private_key })
    }

    pub fn public_key(&self) -> RsaPublicKey {
        RsaPublicKey::from(&self.private_key)
    }
}

impl std::fmt::Debug for SigningKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeypair").finish_non_exhaustive()
    }
}

/// Keypair holder for one top-level resolution
///
/// The key is generated on first use, so resolutions that never sign
/// (NodeInfo lookups) never pay for it.
#[derive(Debug)]
pub struct SigningSession {
    key_bits: usize,
    keypair: Option<Arc<SigningKeypair>>,
}

impl SigningSession {
    pub fn new(key_bits: usize) -> Self {
        Self {
            key_bits,
            keypair: None,
        }
    }

    pub fn has_keypair(&self) -> bool {
        self.keypair.is_some()
    }

    /// Keypair for this session, generated on a blocking thread if needed
    pub async fn keypair(&mut self) -> Result<Arc<SigningKeypair>, ResolveError> {
        if let Some(keypair) = &self.keypair {
            return Ok(Arc::clone(keypair));
        }

        let bits = self.key_bits;
        tracing::debug!(bits, "Generating ephemeral signing key");
        let keypair = tokio::task::spawn_blocking(move || SigningKeypair::generate(bits))
            .await
            .map_err(|e| ResolveError::Signing(format!("Key generation task failed: {}", e)))??;

        let keypair = Arc::new(keypair);
        self.keypair = Some(Arc::clone(&keypair));
        Ok(keypair)
    }
}

/// Headers to add for signed request
#[derive(Debug, Clone)]
pub struct SignatureHeaders {
    /// Host header value (`host[:port]`)
    pub host: String,
    /// Date header value (RFC 7231)
    pub date: String,
    /// Digest header value
    pub digest: String,
    /// Signature header value
    pub signature: String,
}

/// Sign an HTTP request
///
/// Creates the headers for an outgoing signed request. The URL and
/// method are only read.
///
/// # Arguments
/// * `method` - HTTP method (e.g., "GET")
/// * `url` - Full URL being requested
/// * `body` - Request body; `None` signs the empty-body digest
/// * `key_id` - Public key id to advertise (actor#main-key)
/// * `keypair` - Ephemeral keypair
/// * `validity_seconds` - Width of the `created`..`expires` window
///
/// # Example
/// ```ignore
/// let headers = sign_request("GET", &url, None, key_id, &keypair, 300)?;
/// ```
pub fn sign_request(
    method: &str,
    url: &Url,
    body: Option<&[u8]>,
    key_id: &str,
    keypair: &SigningKeypair,
    validity_seconds: u64,
) -> Result<SignatureHeaders, ResolveError> {
    sign_request_at(
        method,
        url,
        body,
        key_id,
        keypair,
        validity_seconds,
        Utc::now(),
    )
}

fn sign_request_at(
    method: &str,
    url: &Url,
    body: Option<&[u8]>,
    key_id: &str,
    keypair: &SigningKeypair,
    validity_seconds: u64,
    now: DateTime<Utc>,
) -> Result<SignatureHeaders, ResolveError> {
    // 1. Host and request target
    let host = host_header(url)?;
    let request_target = format!("{} {}", method.to_lowercase(), path_and_query(url));

    // 2. Date and Digest
    let date = now.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
    let digest = match body {
        Some(body) => generate_digest(body),
        None => EMPTY_BODY_DIGEST.to_string(),
    };

    // 3. Signing string
    let signing_string = [
        format!("(request-target): {}", request_target),
        format!("host: {}", host),
        format!("date: {}", date),
        format!("digest: {}", digest),
    ]
    .join("\n");

    // 4. Sign with RSA-SHA256
    let signing_key = rsa::pkcs1v15::SigningKey::<Sha256>::new(keypair.private_key.clone());
    let mut rng = rand::thread_rng();
    let signature = signing_key
        .try_sign_with_rng(&mut rng, signing_string.as_bytes())
        .map_err(|e| ResolveError::Signing(format!("Failed to sign request: {}", e)))?;
    let signature_b64 = BASE64.encode(signature.to_bytes());

    // 5. Signature header
    let created = now.timestamp();
    let expires = created + validity_seconds as i64;
    let signature_header = format!(
        "keyId=\"{}\",algorithm=\"rsa-sha256\",created={},expires={},headers=\"{}\",signature=\"{}\"",
        key_id,
        created,
        expires,
        SIGNED_HEADERS.join(" "),
        signature_b64
    );

    Ok(SignatureHeaders {
        host,
        date,
        digest,
        signature: signature_header,
    })
}

/// `host[:port]` as it must appear in the Host header
fn host_header(url: &Url) -> Result<String, ResolveError> {
    let host = url.host_str().ok_or_else(|| ResolveError::InvalidUrl {
        input: url.to_string(),
        reason: "missing host".to_string(),
    })?;

    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

fn path_and_query(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

/// Generate SHA-256 digest for body
///
/// # Returns
/// `SHA-256=base64(hash)`
pub fn generate_digest(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    let hash = hasher.finalize();
    format!("SHA-256={}", BASE64.encode(hash))
}
