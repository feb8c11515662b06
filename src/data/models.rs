//! Data models
//!
//! Wire documents (WebFinger, NodeInfo discovery) are typed; ActivityPub
//! objects and NodeInfo documents stay opaque JSON maps so unknown
//! fields pass through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use super::fields::FieldAccess;

/// WebFinger JRD response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebFingerDocument {
    #[serde(default)]
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aliases: Option<Vec<String>>,
    #[serde(default)]
    pub links: Vec<WebFingerLink>,
}

/// WebFinger link
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebFingerLink {
    #[serde(default)]
    pub rel: String,
    #[serde(rename = "type")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

/// `/.well-known/nodeinfo` discovery document
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeInfoDiscoveryDocument {
    #[serde(default)]
    pub links: Vec<NodeInfoLink>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeInfoLink {
    #[serde(default)]
    pub rel: String,
    #[serde(default)]
    pub href: String,
}

/// Versioned NodeInfo document (2.0 / 2.1), kept opaque
#[derive(Debug, Clone)]
pub struct NodeInfoDocument {
    /// URL the document was fetched from
    pub url: Url,
    /// Body as received
    pub raw: Vec<u8>,
    /// Decoded body
    pub document: Map<String, Value>,
}

/// ActivityPub object as fetched
#[derive(Debug, Clone)]
pub struct FetchedObject {
    /// URL that was requested (after redirects)
    pub url: Url,
    /// Body as received, minus terminal escape sequences
    pub raw: Vec<u8>,
    /// Decoded body
    pub object: Map<String, Value>,
}

impl FetchedObject {
    /// Canonical `id` of the object
    pub fn id(&self) -> Option<&str> {
        self.object.str_field("id")
    }

    /// ActivityStreams `type`; the first entry when given as an array
    pub fn object_type(&self) -> Option<&str> {
        self.object.str_field("type").or_else(|| {
            self.object
                .array_field("type")
                .and_then(|types| types.iter().find_map(Value::as_str))
        })
    }

    /// Author actor URL, if the object names one
    pub fn attributed_to(&self) -> Option<&str> {
        self.object.link_field("attributedTo")
    }

    /// Actor whose key signs requests for this object: the author, or the
    /// `actor` of an activity
    pub fn key_owner(&self) -> Option<&str> {
        self.attributed_to()
            .or_else(|| self.object.link_field("actor"))
    }

    /// Public key id advertised directly on the object (actors)
    pub fn public_key_id(&self) -> Option<&str> {
        public_key_id(&self.object)
    }

    /// `object` of an Announce when it is a bare URL rather than inline
    pub fn announced_url(&self) -> Option<&str> {
        if self.object_type() != Some("Announce") {
            return None;
        }
        self.object.str_field("object")
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.object)
    }
}

/// `publicKey.id`, falling back to `publicKey.0.id`
pub fn public_key_id(document: &Map<String, Value>) -> Option<&str> {
    document
        .str_field("publicKey.id")
        .or_else(|| document.str_field("publicKey.0.id"))
}

/// Terminal outcome of a successful resolution
#[derive(Debug, Clone)]
pub enum Resolution {
    Object(FetchedObject),
    NodeInfo(NodeInfoDocument),
}

impl Resolution {
    pub fn raw(&self) -> &[u8] {
        match self {
            Resolution::Object(object) => &object.raw,
            Resolution::NodeInfo(nodeinfo) => &nodeinfo.raw,
        }
    }

    pub fn document(&self) -> &Map<String, Value> {
        match self {
            Resolution::Object(object) => &object.object,
            Resolution::NodeInfo(nodeinfo) => &nodeinfo.document,
        }
    }
}
