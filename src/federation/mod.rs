//! ActivityPub federation module
//!
//! Handles:
//! - HTTP transport
//! - HTTP Signatures (outgoing only)
//! - WebFinger
//! - NodeInfo
//! - Object and actor fetching

mod fetcher;
mod nodeinfo;
mod signature;
mod transport;
mod webfinger;

pub use fetcher::{ObjectFetcher, decode_object};
pub use nodeinfo::{NodeInfoClient, select_nodeinfo_href};
pub use signature::{
    EMPTY_BODY_DIGEST, SIGNED_HEADERS, SignatureHeaders, SigningKeypair, SigningSession,
    generate_digest, sign_request,
};
pub use transport::{
    ACTIVITY_ACCEPT, HttpTransport, JRD_ACCEPT, JSON_ACCEPT, OutboundRequest, ReqwestTransport,
    TransportError, TransportResponse,
};
pub use webfinger::{
    PROFILE_PAGE_REL, WebFingerClient, parse_handle, select_actor_link, webfinger_url,
};
