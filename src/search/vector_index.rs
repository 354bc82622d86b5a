//! Vector index: embeds documents and answers nearest-neighbor queries
//! through a [`VectorBackend`].

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::backend::{CollectionMetadata, Point, VectorBackend};
use super::document::Document;
use super::embedding::Embedder;
use crate::core::error::{Result, RetrievalError};

/// Collection summary for status output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub points_count: usize,
    pub dimension: usize,
    pub backend: String,
}

/// Outcome of a batch upsert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    pub upserted: usize,
    /// Documents dropped because their embedding failed
    pub skipped: usize,
}

pub struct VectorIndex {
    backend: Arc<dyn VectorBackend>,
    embedder: Arc<dyn Embedder>,
    collection: String,
    ready: AtomicBool,
}

impl VectorIndex {
    pub fn new(
        backend: Arc<dyn VectorBackend>,
        embedder: Arc<dyn Embedder>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            embedder,
            collection: collection.into(),
            ready: AtomicBool::new(false),
        }
    }

    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Verify the collection, creating it with the embedder's dimension and
    /// cosine distance when absent.
    pub async fn initialize(&self) -> Result<()> {
        self.ready.store(false, Ordering::Release);
        let dimension = self.dimension();

        match self.backend.collection_dimension(&self.collection).await? {
            Some(existing) if existing == dimension => {
                debug!("Collection '{}' already exists", self.collection);
            }
            Some(existing) => {
                return Err(RetrievalError::DimensionMismatch {
                    expected: dimension,
                    actual: existing,
                });
            }
            None => {
                let metadata = CollectionMetadata::cosine(self.collection.clone(), dimension);
                self.backend.create_collection(&metadata).await?;
                info!(
                    "Created collection '{}' ({} dims, cosine) on {}",
                    self.collection,
                    dimension,
                    self.backend.name()
                );
            }
        }

        self.ready.store(true, Ordering::Release);
        Ok(())
    }

    /// Embed and upsert `documents` as one batch.
    ///
    /// A document whose embedding fails is skipped; the rest are still written.
    pub async fn upsert(&self, documents: &[Document]) -> Result<UpsertSummary> {
        self.ensure_ready()?;

        let mut points = Vec::with_capacity(documents.len());
        let mut skipped = 0;
        for doc in documents {
            match self.embed(&doc.search_text()).await {
                Ok(vector) => points.push(Point::new(doc.clone().without_score(), vector)),
                Err(e) => {
                    warn!(
                        "Skipping document {}: {}",
                        doc.id.as_deref().unwrap_or("<no id>"),
                        e
                    );
                    skipped += 1;
                }
            }
        }

        let upserted = points.len();
        if upserted > 0 {
            self.backend.upsert(&self.collection, points).await?;
        }
        debug!("Upserted {} points into '{}'", upserted, self.collection);

        Ok(UpsertSummary { upserted, skipped })
    }

    /// Top-`top_k` documents by cosine similarity, annotated with the
    /// backend-reported score. A blank query yields no results.
    pub async fn query(&self, text: &str, top_k: usize) -> Result<Vec<Document>> {
        self.ensure_ready()?;
        if top_k == 0 || text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let vector = self.embed(text).await?;
        let hits = self.backend.search(&self.collection, &vector, top_k).await?;

        Ok(hits
            .into_iter()
            .map(|hit| hit.payload.with_score(hit.score))
            .collect())
    }

    /// Point count and name, `None` if not initialized or the backend fails
    pub async fn collection_info(&self) -> Option<CollectionInfo> {
        if !self.is_ready() {
            return None;
        }
        match self.backend.count(&self.collection).await {
            Ok(points_count) => Some(CollectionInfo {
                name: self.collection.clone(),
                points_count,
                dimension: self.dimension(),
                backend: self.backend.name().to_string(),
            }),
            Err(e) => {
                warn!("Could not read collection info: {}", e);
                None
            }
        }
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(RetrievalError::unavailable("vector index not initialized"))
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let vector = self
            .embedder
            .embed(text)
            .await
            .map_err(|e| match e {
                RetrievalError::EmbeddingFailure { .. } => e,
                other => RetrievalError::embedding(other),
            })?;

        if vector.len() != self.dimension() {
            return Err(RetrievalError::embedding(format!(
                "{} returned {} values, expected {}",
                self.embedder.name(),
                vector.len(),
                self.dimension()
            )));
        }
        Ok(vector)
    }
}
