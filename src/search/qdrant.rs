//! Qdrant vector backend over the REST API

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::backend::{CollectionMetadata, Distance, Point, ScoredPoint, VectorBackend};
use super::document::Document;
use crate::core::error::{Result, RetrievalError};

/// Standard Qdrant response wrapper
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<Document>,
}

#[derive(Debug, Deserialize)]
struct CountResult {
    count: usize,
}

/// REST client for a Qdrant server
#[derive(Debug, Clone)]
pub struct QdrantBackend {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl QdrantBackend {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| RetrievalError::config(format!("invalid qdrant url '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(RetrievalError::config(format!(
                "invalid qdrant url '{}'",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Base URL extended by `segments`, each percent-encoded as one path segment
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // `new` rejects cannot-be-a-base URLs
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    /// Send and decode `result`; 404 maps to `None`
    async fn send<T: serde::de::DeserializeOwned>(&self, req: RequestBuilder) -> Result<Option<T>> {
        let response = req.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::unavailable(format!(
                "qdrant returned {}: {}",
                status,
                body.trim()
            )));
        }

        let envelope: Envelope<T> = response.json().await?;
        Ok(Some(envelope.result))
    }

    async fn send_required<T: serde::de::DeserializeOwned>(
        &self,
        req: RequestBuilder,
        collection: &str,
    ) -> Result<T> {
        self.send(req).await?.ok_or_else(|| {
            RetrievalError::unavailable(format!("collection '{}' does not exist", collection))
        })
    }
}

/// Extract the vector size from a `GET /collections/{name}` result.
///
/// Only the single unnamed-vector layout with cosine distance is supported.
fn parse_dimension(info: &Value) -> Result<usize> {
    let vectors = info
        .pointer("/config/params/vectors")
        .ok_or_else(|| RetrievalError::unavailable("unsupported collection vector layout"))?;
    let size = vectors
        .get("size")
        .and_then(Value::as_u64)
        .ok_or_else(|| RetrievalError::unavailable("unsupported collection vector layout"))?;

    let expected = Distance::Cosine.as_str();
    match vectors.get("distance").and_then(Value::as_str) {
        Some(distance) if distance.eq_ignore_ascii_case(expected) => Ok(size as usize),
        other => Err(RetrievalError::unavailable(format!(
            "collection uses {} distance, expected {}",
            other.unwrap_or("unknown"),
            expected
        ))),
    }
}

fn render_point_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn upsert_body(points: Vec<Point>) -> Value {
    let points: Vec<Value> = points
        .into_iter()
        .map(|p| json!({ "id": p.id, "vector": p.vector, "payload": p.payload }))
        .collect();
    json!({ "points": points })
}

#[async_trait]
impl VectorBackend for QdrantBackend {
    fn name(&self) -> &str {
        "qdrant"
    }

    async fn collection_dimension(&self, collection: &str) -> Result<Option<usize>> {
        let info: Option<Value> = self
            .send(self.request(Method::GET, self.endpoint(&["collections", collection])))
            .await?;
        info.as_ref().map(parse_dimension).transpose()
    }

    async fn create_collection(&self, metadata: &CollectionMetadata) -> Result<()> {
        let body = json!({
            "vectors": {
                "size": metadata.dimension,
                "distance": metadata.distance.as_str(),
            }
        });
        let _: Value = self
            .send_required(
                self.request(Method::PUT, self.endpoint(&["collections", &metadata.name]))
                    .json(&body),
                &metadata.name,
            )
            .await?;
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()> {
        let mut url = self.endpoint(&["collections", collection, "points"]);
        url.set_query(Some("wait=true"));
        let _: Value = self
            .send_required(
                self.request(Method::PUT, url).json(&upsert_body(points)),
                collection,
            )
            .await?;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let body = json!({ "vector": vector, "limit": limit, "with_payload": true });
        let hits: Vec<SearchHit> = self
            .send_required(
                self.request(
                    Method::POST,
                    self.endpoint(&["collections", collection, "points", "search"]),
                )
                .json(&body),
                collection,
            )
            .await?;

        Ok(hits
            .into_iter()
            .map(|hit| ScoredPoint {
                id: render_point_id(&hit.id),
                score: hit.score,
                payload: hit.payload.unwrap_or_default(),
            })
            .collect())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let result: CountResult = self
            .send_required(
                self.request(
                    Method::POST,
                    self.endpoint(&["collections", collection, "points", "count"]),
                )
                .json(&json!({ "exact": true })),
                collection,
            )
            .await?;
        Ok(result.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dimension() {
        let info = json!({
            "status": "green",
            "points_count": 2,
            "config": { "params": { "vectors": { "size": 384, "distance": "Cosine" } } }
        });
        assert_eq!(parse_dimension(&info).unwrap(), 384);

        let named = json!({ "config": { "params": { "vectors": { "text": { "size": 384 } } } } });
        assert!(parse_dimension(&named).is_err());
    }

    #[test]
    fn test_parse_dimension_rejects_non_cosine() {
        for distance in ["Dot", "Euclid", "Manhattan"] {
            let info = json!({
                "config": { "params": { "vectors": { "size": 384, "distance": distance } } }
            });
            let err = parse_dimension(&info).unwrap_err();
            assert!(err.to_string().contains(distance));
        }

        let missing = json!({ "config": { "params": { "vectors": { "size": 384 } } } });
        assert!(parse_dimension(&missing).is_err());
    }

    #[test]
    fn test_search_hit_decoding() {
        let body = json!({
            "result": [
                { "id": "a1b2", "score": 0.91, "payload": { "id": "P1", "name": "Coffee Maker Deluxe" } },
                { "id": 42, "score": 0.5 }
            ],
            "status": "ok",
            "time": 0.001
        });
        let envelope: Envelope<Vec<SearchHit>> = serde_json::from_value(body).unwrap();
        assert_eq!(envelope.result.len(), 2);
        assert_eq!(render_point_id(&envelope.result[0].id), "a1b2");
        assert_eq!(render_point_id(&envelope.result[1].id), "42");
        assert_eq!(
            envelope.result[0].payload.as_ref().and_then(|p| p.name.as_deref()),
            Some("Coffee Maker Deluxe")
        );
    }

    #[test]
    fn test_upsert_body_shape() {
        let doc = Document::new("P1", "Lamp", "Home", "LED");
        let body = upsert_body(vec![Point::new(doc, vec![0.5, 0.5])]);
        let point = &body["points"][0];
        assert_eq!(point["vector"], json!([0.5, 0.5]));
        assert_eq!(point["payload"]["name"], json!("Lamp"));
        assert!(point["id"].is_string());
    }

    #[test]
    fn test_endpoint_paths() {
        for base in ["http://localhost:6333", "http://localhost:6333/"] {
            let backend = QdrantBackend::new(base, None, Duration::from_secs(1)).unwrap();
            assert_eq!(
                backend.endpoint(&["collections", "products", "points"]).as_str(),
                "http://localhost:6333/collections/products/points"
            );
        }

        let backend =
            QdrantBackend::new("http://proxy:8080/qdrant/", None, Duration::from_secs(1)).unwrap();
        assert_eq!(
            backend.endpoint(&["collections", "products"]).as_str(),
            "http://proxy:8080/qdrant/collections/products"
        );
    }

    #[test]
    fn test_collection_name_is_encoded() {
        let backend =
            QdrantBackend::new("http://localhost:6333", None, Duration::from_secs(1)).unwrap();
        let url = backend.endpoint(&["collections", "my products/v1?x#y"]);
        assert_eq!(
            url.as_str(),
            "http://localhost:6333/collections/my%20products%2Fv1%3Fx%23y"
        );
        assert_eq!(url.query(), None);
        assert_eq!(url.path_segments().map(|s| s.count()), Some(2));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(QdrantBackend::new("not a url", None, Duration::from_secs(1)).is_err());
        assert!(QdrantBackend::new("mailto:ops@example.com", None, Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        // Port 9 (discard) is not expected to run an HTTP server
        let backend =
            QdrantBackend::new("http://127.0.0.1:9", None, Duration::from_millis(500)).unwrap();
        let err = backend.collection_dimension("products").await.unwrap_err();
        assert!(matches!(err, RetrievalError::IndexUnavailable { .. }));
    }
}
