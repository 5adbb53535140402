//! Descriptor fetching from the extension registry.
//!
//! The registry is reached through a [`DescriptorSource`]. The
//! [`DescriptorFetcher`] wraps a source and turns every failure into an empty
//! result, so callers only ever see "some extensions" or "no extensions".

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::config::ExtensionConfig;
use crate::descriptor::ExtensionDescriptor;
use crate::error::{ExtensionError, Result};

/// Registry path listing extension routes.
pub const ROUTES_PATH: &str = "extension-routes";

/// Source of extension descriptors.
#[async_trait]
pub trait DescriptorSource: Send + Sync {
    /// All descriptors known to the registry.
    async fn list_routes(&self) -> Result<Vec<ExtensionDescriptor>>;

    /// Descriptors belonging to one collection.
    async fn list_routes_by_collection(&self, collection_id: &str)
        -> Result<Vec<ExtensionDescriptor>>;
}

/// Per-collection route count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary {
    pub id: String,
    pub name: String,
    pub route_count: usize,
}

/// Registry client over HTTP.
pub struct HttpDescriptorSource {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpDescriptorSource {
    /// Build a client from configuration.
    pub fn new(config: &ExtensionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ExtensionError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: crate::config::normalize_base_url(&config.api_base_url),
            token: config.api_token.clone(),
        })
    }

    fn routes_url(&self, collection_id: Option<&str>) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, ROUTES_PATH))
            .map_err(|e| ExtensionError::Config(format!("Invalid API URL {}: {}", self.base_url, e)))?;
        if let Some(id) = collection_id {
            url.path_segments_mut()
                .map_err(|_| ExtensionError::Config(format!("API URL cannot be a base: {}", self.base_url)))?
                .push(id);
        }
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<Vec<ExtensionDescriptor>> {
        let mut request = self
            .client
            .get(url.clone())
            .header("Content-Type", "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExtensionError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let payload: Value = response.json().await?;
        parse_routes_payload(payload)
    }
}

#[async_trait]
impl DescriptorSource for HttpDescriptorSource {
    async fn list_routes(&self) -> Result<Vec<ExtensionDescriptor>> {
        let url = self.routes_url(None)?;
        self.get(url).await
    }

    async fn list_routes_by_collection(
        &self,
        collection_id: &str,
    ) -> Result<Vec<ExtensionDescriptor>> {
        let url = self.routes_url(Some(collection_id))?;
        self.get(url).await
    }
}

/// Accepts either `{ code, data: [...], total, timestamp }` or a bare array.
///
/// Elements that do not deserialize are skipped; a payload of any other shape
/// is a parse error.
pub fn parse_routes_payload(payload: Value) -> Result<Vec<ExtensionDescriptor>> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(ExtensionError::Parse(format!(
                    "expected `data` to be an array, got {}",
                    json_kind(&other)
                )));
            }
            None => {
                let reason = map
                    .get("message")
                    .or_else(|| map.get("error"))
                    .and_then(Value::as_str)
                    .unwrap_or("missing `data` field");
                return Err(ExtensionError::Parse(reason.to_string()));
            }
        },
        other => {
            return Err(ExtensionError::Parse(format!(
                "expected array or envelope, got {}",
                json_kind(&other)
            )));
        }
    };

    let total = items.len();
    let descriptors: Vec<ExtensionDescriptor> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(descriptor) => Some(descriptor),
            Err(e) => {
                tracing::warn!("Skipping malformed extension descriptor #{}: {}", index, e);
                None
            }
        })
        .collect();

    if descriptors.len() < total {
        tracing::warn!(
            "Registry returned {} descriptors, {} usable",
            total,
            descriptors.len()
        );
    }
    Ok(descriptors)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Fail-soft front of a [`DescriptorSource`].
#[derive(Clone)]
pub struct DescriptorFetcher {
    source: Arc<dyn DescriptorSource>,
}

impl DescriptorFetcher {
    pub fn new(source: Arc<dyn DescriptorSource>) -> Self {
        Self { source }
    }

    /// Fetcher backed by the HTTP registry client.
    pub fn from_config(config: &ExtensionConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(HttpDescriptorSource::new(config)?)))
    }

    /// Fetch every descriptor. Empty on any failure.
    pub async fn fetch_all(&self) -> Vec<ExtensionDescriptor> {
        match self.source.list_routes().await {
            Ok(descriptors) => {
                tracing::debug!("Fetched {} extension descriptors", descriptors.len());
                descriptors
            }
            Err(e) => {
                tracing::error!("Error fetching extension routes: {}", e);
                Vec::new()
            }
        }
    }

    /// Fetch descriptors of one collection. Empty on any failure.
    pub async fn fetch_by_collection(&self, collection_id: &str) -> Vec<ExtensionDescriptor> {
        match self.source.list_routes_by_collection(collection_id).await {
            Ok(descriptors) => descriptors,
            Err(e) => {
                tracing::error!(
                    "Error fetching extension routes for collection {}: {}",
                    collection_id,
                    e
                );
                Vec::new()
            }
        }
    }

    /// Fetch everything and fold it into per-collection summaries.
    pub async fn fetch_collections(&self) -> (Vec<ExtensionDescriptor>, Vec<CollectionSummary>) {
        group_by_collection(self.fetch_all().await)
    }
}

/// Fold descriptors into per-collection counts, in first-appearance order.
///
/// Descriptors without a collection id stay in the returned list but are not
/// counted under any collection.
pub fn group_by_collection(
    descriptors: Vec<ExtensionDescriptor>,
) -> (Vec<ExtensionDescriptor>, Vec<CollectionSummary>) {
    let mut collections: IndexMap<String, CollectionSummary> = IndexMap::new();

    for descriptor in &descriptors {
        let Some(id) = &descriptor.collection_id else {
            continue;
        };
        collections
            .entry(id.clone())
            .or_insert_with(|| CollectionSummary {
                id: id.clone(),
                name: descriptor
                    .collection_name
                    .clone()
                    .unwrap_or_else(|| id.clone()),
                route_count: 0,
            })
            .route_count += 1;
    }

    (descriptors, collections.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn in_collection(name: &str, id: &str, collection_name: Option<&str>) -> ExtensionDescriptor {
        ExtensionDescriptor::new(name, format!("/ext/{}/{}", id, name))
            .with_collection(id, collection_name.map(str::to_string))
    }

    #[test]
    fn test_parse_envelope() {
        let payload = json!({
            "code": 200,
            "data": [{"name": "A", "path": "/a"}, {"name": "B", "path": "/b"}],
            "total": 2,
            "timestamp": "2024-01-01T00:00:00Z"
        });
        let routes = parse_routes_payload(payload).unwrap();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[1].name, "B");
    }

    #[test]
    fn test_parse_bare_array() {
        let routes = parse_routes_payload(json!([{"name": "A", "path": "/a"}])).unwrap();
        assert_eq!(routes.len(), 1);
    }

    #[test]
    fn test_parse_rejects_other_shapes() {
        assert!(parse_routes_payload(json!("nope")).is_err());
        assert!(parse_routes_payload(json!({"data": {"name": "A"}})).is_err());
        let err = parse_routes_payload(json!({"code": 500, "error": "x", "message": "db down"}))
            .unwrap_err();
        assert_eq!(err.detail(), "db down");
    }

    #[test]
    fn test_parse_skips_malformed_elements() {
        let routes = parse_routes_payload(json!([
            {"name": "A", "path": "/a"},
            42,
            {"name": ["not", "a", "string"]}
        ]))
        .unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].name, "A");
    }

    #[test]
    fn test_parse_keeps_descriptors_with_null_fields() {
        let routes = parse_routes_payload(json!([
            {"name": "A", "path": "/a", "group": null, "meta": {"title": "A"}},
            {"name": "B", "path": "/b", "meta": {"title": null}},
            {"name": "C", "path": "/c", "meta": null},
            {"name": "D", "path": "/d", "meta": {"title": "D", "roles": null}},
            {"name": "E", "path": "/e", "group": "g", "meta": {"title": "E"}}
        ]))
        .unwrap();
        let names: Vec<&str> = routes.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C", "D", "E"]);
        assert_eq!(routes[0].group, "");
        assert_eq!(routes[1].display_title(), "B");
        assert!(routes[3].presentation.required_roles.is_empty());
    }

    #[test]
    fn test_group_by_collection() {
        let descriptors = vec![
            in_collection("a", "lib1", Some("Library One")),
            ExtensionDescriptor::new("loose", "/ext/loose"),
            in_collection("b", "lib2", None),
            in_collection("c", "lib1", Some("Library One")),
        ];

        let (all, collections) = group_by_collection(descriptors);
        assert_eq!(all.len(), 4);
        assert_eq!(
            collections,
            vec![
                CollectionSummary {
                    id: "lib1".to_string(),
                    name: "Library One".to_string(),
                    route_count: 2,
                },
                CollectionSummary {
                    id: "lib2".to_string(),
                    name: "lib2".to_string(),
                    route_count: 1,
                },
            ]
        );
    }

    #[test]
    fn test_group_by_collection_empty() {
        let (all, collections) = group_by_collection(Vec::new());
        assert!(all.is_empty());
        assert!(collections.is_empty());
    }
}
