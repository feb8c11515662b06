//! Data layer
//!
//! - `models`: wire documents and resolution outcomes
//! - `fields`: dotted-path accessors over untyped JSON

mod fields;
mod models;

pub use fields::FieldAccess;
pub use models::{
    FetchedObject, NodeInfoDiscoveryDocument, NodeInfoDocument, NodeInfoLink, Resolution,
    WebFingerDocument, WebFingerLink, public_key_id,
};
