//! NodeInfo discovery
//!
//! Two steps: `/.well-known/nodeinfo` lists schema links, the chosen
//! link points at the versioned document.

use serde_json::Value;
use url::Url;

use super::transport::{HttpTransport, JSON_ACCEPT, OutboundRequest, TransportResponse};
use crate::data::{NodeInfoDiscoveryDocument, NodeInfoDocument};
use crate::error::ResolveError;

/// Supported schema `rel` suffixes, most preferred first
const SCHEMA_SUFFIXES: [&str; 2] = ["/schema/2.1", "/schema/2.0"];

/// Pick the versioned document href, preferring 2.1 over 2.0
pub fn select_nodeinfo_href(discovery: &NodeInfoDiscoveryDocument) -> Option<&str> {
    SCHEMA_SUFFIXES.iter().find_map(|suffix| {
        discovery
            .links
            .iter()
            .find(|link| link.rel.ends_with(suffix) && !link.href.is_empty())
            .map(|link| link.href.as_str())
    })
}

/// NodeInfo client
pub struct NodeInfoClient<'a, T> {
    transport: &'a T,
}

impl<'a, T: HttpTransport> NodeInfoClient<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    /// Fetch the NodeInfo document of a domain (`host[:port]`)
    ///
    /// # Errors
    /// - `NodeInfoUnreachable` on transport failure or non-200 at either step
    /// - `NodeInfoMalformed` when either body cannot be decoded
    /// - `NodeInfoSchemaUnsupported` when neither 2.1 nor 2.0 is listed
    pub async fn discover(&self, domain: &str) -> Result<NodeInfoDocument, ResolveError> {
        let discovery_url = parse_url(&format!("https://{}/.well-known/nodeinfo", domain))?;

        tracing::info!(url = %discovery_url, "Fetching nodeinfo discovery");
        let response = self.get(&discovery_url).await?;
        let discovery: NodeInfoDiscoveryDocument = serde_json::from_slice(&response.body)
            .map_err(|e| ResolveError::NodeInfoMalformed {
                url: discovery_url.to_string(),
                reason: e.to_string(),
            })?;

        let href = select_nodeinfo_href(&discovery).ok_or_else(|| {
            ResolveError::NodeInfoSchemaUnsupported {
                domain: domain.to_string(),
            }
        })?;
        let document_url = discovery_url.join(href).map_err(|e| ResolveError::InvalidUrl {
            input: href.to_string(),
            reason: e.to_string(),
        })?;

        tracing::info!(url = %document_url, "Fetching nodeinfo");
        let response = self.get(&document_url).await?;
        let document = match serde_json::from_slice::<Value>(&response.body) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return Err(ResolveError::NodeInfoMalformed {
                    url: document_url.to_string(),
                    reason: "expected a JSON object".to_string(),
                });
            }
            Err(e) => {
                return Err(ResolveError::NodeInfoMalformed {
                    url: document_url.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        Ok(NodeInfoDocument {
            url: document_url,
            raw: response.body,
            document,
        })
    }

    async fn get(&self, url: &Url) -> Result<TransportResponse, ResolveError> {
        let request = OutboundRequest::get(url.clone()).header("accept", JSON_ACCEPT);
        let response = self.transport.send(request).await.map_err(|e| {
            ResolveError::NodeInfoUnreachable {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;

        if response.status != http::StatusCode::OK {
            return Err(ResolveError::NodeInfoUnreachable {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status),
            });
        }

        Ok(response)
    }
}

fn parse_url(url: &str) -> Result<Url, ResolveError> {
    Url::parse(url).map_err(|e| ResolveError::InvalidUrl {
        input: url.to_string(),
        reason: e.to_string(),
    })
}
