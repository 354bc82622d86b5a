//! Vector backend protocol
//!
//! The minimal surface the vector index needs from a similarity-search store:
//! collection existence/creation, point upsert, top-K query and a point count.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::Document;
use crate::core::error::Result;

/// Distance metric for a collection. Only cosine is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distance {
    Cosine,
}

impl Distance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "Cosine",
        }
    }
}

/// Name, dimensionality and metric of a collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionMetadata {
    pub name: String,
    pub dimension: usize,
    pub distance: Distance,
}

impl CollectionMetadata {
    pub fn cosine(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
            distance: Distance::Cosine,
        }
    }
}

/// A vector with its payload, keyed by a stable id
#[derive(Debug, Clone)]
pub struct Point {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Document,
}

impl Point {
    pub fn new(payload: Document, vector: Vec<f32>) -> Self {
        Self {
            id: point_id(&payload),
            vector,
            payload,
        }
    }
}

/// Search hit as reported by the backend
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: Document,
}

/// Similarity-search store holding named collections
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Short backend identifier for logs and status output
    fn name(&self) -> &str;

    /// Dimensionality of `collection`, or `None` if it does not exist
    async fn collection_dimension(&self, collection: &str) -> Result<Option<usize>>;

    async fn create_collection(&self, metadata: &CollectionMetadata) -> Result<()>;

    /// Insert or overwrite points by id
    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()>;

    /// Up to `limit` points ordered by descending similarity
    async fn search(&self, collection: &str, vector: &[f32], limit: usize)
        -> Result<Vec<ScoredPoint>>;

    async fn count(&self, collection: &str) -> Result<usize>;
}

/// Point id for a document: UUID v5 of its identifier, random when it has none.
///
/// Re-indexing a document with the same identifier therefore overwrites its
/// previous point.
pub fn point_id(doc: &Document) -> String {
    match doc.id.as_deref() {
        Some(id) => Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes()).to_string(),
        None => Uuid::new_v4().to_string(),
    }
}
