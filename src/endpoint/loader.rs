use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;
use tracing::warn;

use super::Endpoint;
use super::EndpointRegistry;

/// One externally persisted entity.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEntity {
    pub resource: String,
    pub entity: Value,
    pub content_type: Option<String>,
}

impl RemoteEntity {
    /// Documents without a `resource` field are not directory entities.
    pub fn from_document(document: &Value) -> Option<Self> {
        let resource = document.get("resource")?.as_str()?.to_string();
        let entity = document.get("entity").cloned().unwrap_or_else(|| {
            let mut body = document.clone();
            if let Some(map) = body.as_object_mut() {
                map.remove("_links");
                map.remove("_embedded");
            }
            body
        });
        let content_type = document
            .get("contentType")
            .and_then(Value::as_str)
            .map(str::to_string);
        Some(Self {
            resource,
            entity,
            content_type,
        })
    }
}

/// Relation naming the documents of a directory.
const ITEM_RELATION: &str = "item";

fn items(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(entries)) => entries.iter().collect(),
        Some(single @ Value::Object(_)) => vec![single],
        _ => Vec::new(),
    }
}

/// Fetches and persists directory entities through an [`Endpoint`].
#[derive(Clone)]
pub struct EndpointLoader {
    endpoint: Arc<dyn Endpoint>,
    api_root: String,
    /// Links of the last root document loaded
    registry: Arc<RwLock<EndpointRegistry>>,
}

impl std::fmt::Debug for EndpointLoader {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("EndpointLoader").field("api_root", &self.api_root).finish()
    }
}

impl EndpointLoader {
    pub fn new(
        endpoint: Arc<dyn Endpoint>,
        api_root: &str,
    ) -> Self {
        Self {
            endpoint,
            api_root: api_root.to_string(),
            registry: Arc::new(RwLock::new(EndpointRegistry::default())),
        }
    }

    /// Endpoint path of `resource`: the root's templated `item` link when it
    /// has one, the resource path itself otherwise.
    pub fn href_of(
        &self,
        resource: &str,
    ) -> String {
        self.registry
            .read()
            .expand(ITEM_RELATION, resource)
            .unwrap_or_else(|| resource.to_string())
    }

    /// Everything the root document embeds or links as an item.
    ///
    /// Never fails: an unreachable root means nothing is loaded, an
    /// unreachable item is skipped.
    pub async fn load(&self) -> Vec<RemoteEntity> {
        let root = match self.endpoint.get(&self.api_root).await {
            Ok(root) => root,
            Err(e) => {
                warn!(api_root = %self.api_root, "endpoint unreachable, nothing loaded: {}", e);
                return Vec::new();
            }
        };
        *self.registry.write() = EndpointRegistry::from_root(&root);

        let embedded = items(root.pointer("/_embedded/item"));
        let seen: HashSet<&str> = embedded
            .iter()
            .filter_map(|doc| doc.pointer("/_links/self/href").and_then(Value::as_str))
            .collect();
        let mut loaded: Vec<RemoteEntity> = embedded
            .iter()
            .filter_map(|doc| RemoteEntity::from_document(doc))
            .collect();

        let linked: Vec<&str> = items(root.pointer("/_links/item"))
            .into_iter()
            .filter(|link| !link.get("templated").and_then(Value::as_bool).unwrap_or(false))
            .filter_map(|link| link.get("href").and_then(Value::as_str))
            .filter(|href| !seen.contains(href))
            .collect();
        for href in linked {
            match self.endpoint.get(href).await {
                Ok(document) => match RemoteEntity::from_document(&document) {
                    Some(entity) => loaded.push(entity),
                    None => debug!(%href, "linked document carries no resource"),
                },
                Err(e) => warn!(%href, "skipping unreachable item: {}", e),
            }
        }

        debug!(api_root = %self.api_root, count = loaded.len(), "remote entities loaded");
        loaded
    }

    /// PUTs each entity to its own path. Returns how many were stored.
    pub async fn save(
        &self,
        entities: Vec<RemoteEntity>,
    ) -> usize {
        let mut saved = 0;
        for item in entities {
            let mut body = serde_json::json!({
                "resource": item.resource,
                "entity": item.entity,
            });
            if let Some(ct) = &item.content_type {
                body["contentType"] = Value::from(ct.as_str());
            }
            match self.endpoint.put(&self.href_of(&item.resource), body).await {
                Ok(()) => saved += 1,
                Err(e) => warn!(resource = %item.resource, "could not persist entity: {}", e),
            }
        }
        saved
    }

    /// Deletes each resource from the endpoint. Returns how many were removed.
    pub async fn forget(
        &self,
        resources: Vec<String>,
    ) -> usize {
        let mut removed = 0;
        for resource in resources {
            match self.endpoint.delete(&self.href_of(&resource)).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(%resource, "could not delete persisted entity: {}", e),
            }
        }
        removed
    }
}
