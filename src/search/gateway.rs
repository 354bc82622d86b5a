//! Retrieval gateway: one seam over the vector index and the lexical fallback
//!
//! The gateway owns the active [`Mode`]. It starts `Uninitialized`, moves to
//! `Vector` when the vector backend initializes and to `Fallback` when it does
//! not. It never retries on its own; call [`RetrievalGateway::initialize`]
//! again to attempt a move back to vector mode.
//!
//! The two stores are not kept in sync: vector mode upserts
//! (same id overwrites, new ids accumulate) while fallback mode replaces the
//! whole generation. A vector-mode query failure yields an empty, degraded
//! result instead of consulting the lexical index.

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::backend::VectorBackend;
use super::document::Document;
use super::embedding::HtpEmbedder;
use super::lexical::LexicalIndex;
use super::qdrant::QdrantBackend;
use super::vector_index::{CollectionInfo, VectorIndex};
use super::vectordb::SqliteBackend;
use crate::core::config::{BackendKind, Settings};
use crate::core::error::Result;

/// Active retrieval mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Uninitialized,
    Vector,
    Fallback,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Uninitialized => "not initialized",
            Self::Vector => "semantic search",
            Self::Fallback => "keyword search",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug)]
struct ModeState {
    mode: Mode,
    fallback_reason: Option<String>,
}

/// Result of [`RetrievalGateway::index`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexReport {
    /// Documents accepted by the active store
    pub indexed: usize,
    /// Documents dropped because their embedding failed
    pub skipped: usize,
    pub mode: Mode,
    /// Batch-level failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of [`RetrievalGateway::search`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResults {
    pub documents: Vec<Document>,
    pub mode: Mode,
    /// Set when the vector backend failed and an empty result was substituted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
}

/// Snapshot returned by [`RetrievalGateway::status`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Status {
    pub mode: Mode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<CollectionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_documents: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

pub struct RetrievalGateway {
    vector: Option<VectorIndex>,
    /// Why there is no vector index, when `vector` is `None`
    disabled_reason: String,
    lexical: LexicalIndex,
    state: ArcSwap<ModeState>,
}

impl RetrievalGateway {
    pub fn new(vector: VectorIndex) -> Self {
        Self::build(Some(vector), String::new())
    }

    /// Gateway without a vector backend; initialization always lands in
    /// fallback mode with `reason`.
    pub fn fallback_only(reason: impl Into<String>) -> Self {
        Self::build(None, reason.into())
    }

    fn build(vector: Option<VectorIndex>, disabled_reason: String) -> Self {
        Self {
            vector,
            disabled_reason,
            lexical: LexicalIndex::new(),
            state: ArcSwap::from_pointee(ModeState {
                mode: Mode::Uninitialized,
                fallback_reason: None,
            }),
        }
    }

    /// Wire up the configured backend and the HTP embedder.
    ///
    /// Backend construction failures are not errors here: they leave the
    /// gateway fallback-only, exactly as a failed connection would. Only
    /// invalid settings are reported.
    pub fn from_settings(settings: &Settings, force_fallback: bool) -> Result<Self> {
        let embedder = Arc::new(HtpEmbedder::new(settings.dimension)?);
        if force_fallback {
            return Ok(Self::fallback_only("vector backend disabled by --fallback"));
        }

        let backend: Result<Arc<dyn VectorBackend>> = match settings.backend {
            BackendKind::Sqlite => SqliteBackend::open(&settings.sqlite_path)
                .map(|b| Arc::new(b) as Arc<dyn VectorBackend>),
            BackendKind::Qdrant => QdrantBackend::new(
                &settings.qdrant_url,
                settings.qdrant_api_key.clone(),
                Duration::from_secs(settings.timeout_secs),
            )
            .map(|b| Arc::new(b) as Arc<dyn VectorBackend>),
        };

        Ok(match backend {
            Ok(backend) => Self::new(VectorIndex::new(
                backend,
                embedder,
                settings.collection_name.clone(),
            )),
            Err(e) => {
                warn!("Could not open vector backend: {}", e);
                Self::fallback_only(e.to_string())
            }
        })
    }

    pub fn mode(&self) -> Mode {
        self.state.load().mode
    }

    /// Attempt vector backend initialization and record the resulting mode.
    ///
    /// Failure is an expected condition: it is logged and the gateway enters
    /// fallback mode.
    pub async fn initialize(&self) -> Mode {
        let next = match &self.vector {
            None => ModeState {
                mode: Mode::Fallback,
                fallback_reason: Some(self.disabled_reason.clone()),
            },
            Some(vector) => match vector.initialize().await {
                Ok(()) => {
                    info!(
                        "Vector index '{}' initialized, using semantic search",
                        vector.collection_name()
                    );
                    ModeState {
                        mode: Mode::Vector,
                        fallback_reason: None,
                    }
                }
                Err(e) => {
                    warn!("Could not initialize vector index: {}. Running in fallback mode.", e);
                    ModeState {
                        mode: Mode::Fallback,
                        fallback_reason: Some(e.to_string()),
                    }
                }
            },
        };

        let mode = next.mode;
        self.state.store(Arc::new(next));
        mode
    }

    async fn ensure_initialized(&self) -> Mode {
        match self.mode() {
            Mode::Uninitialized => self.initialize().await,
            mode => mode,
        }
    }

    fn active_vector(&self, mode: Mode) -> Option<&VectorIndex> {
        match mode {
            Mode::Vector => self.vector.as_ref(),
            _ => None,
        }
    }

    /// Index `documents` into the active store.
    ///
    /// Vector mode upserts; fallback mode replaces the previous generation.
    /// Backend failures are reported in the [`IndexReport`] and do not change
    /// the mode. Only contract violations are returned as errors.
    pub async fn index(&self, documents: Vec<Document>) -> Result<IndexReport> {
        let mode = self.ensure_initialized().await;

        let report = match self.active_vector(mode) {
            Some(vector) => match vector.upsert(&documents).await {
                Ok(summary) => IndexReport {
                    indexed: summary.upserted,
                    skipped: summary.skipped,
                    mode,
                    error: None,
                },
                Err(e) if e.is_contract_violation() => return Err(e),
                Err(e) => {
                    warn!("Indexing into vector backend failed: {}", e);
                    IndexReport {
                        indexed: 0,
                        skipped: 0,
                        mode,
                        error: Some(e.to_string()),
                    }
                }
            },
            None => IndexReport {
                indexed: self.lexical.replace_all(documents),
                skipped: 0,
                mode: Mode::Fallback,
                error: None,
            },
        };

        info!("Indexed {} documents ({})", report.indexed, report.mode);
        Ok(report)
    }

    /// Top-`top_k` documents for `query` from the active store.
    ///
    /// A vector-mode failure produces an empty, degraded result. Only
    /// contract violations are returned as errors.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<SearchResults> {
        let mode = self.ensure_initialized().await;

        let results = match self.active_vector(mode) {
            Some(vector) => match vector.query(query, top_k).await {
                Ok(documents) => SearchResults {
                    documents,
                    mode,
                    degraded: None,
                },
                Err(e) if e.is_contract_violation() => return Err(e),
                Err(e) => {
                    warn!("Vector search failed, returning no results: {}", e);
                    SearchResults {
                        documents: Vec::new(),
                        mode,
                        degraded: Some(e.to_string()),
                    }
                }
            },
            None => SearchResults {
                documents: self.lexical.score(query, top_k),
                mode: Mode::Fallback,
                degraded: None,
            },
        };

        debug!(
            "Search '{}' returned {} documents ({})",
            query,
            results.documents.len(),
            results.mode
        );
        Ok(results)
    }

    pub async fn status(&self) -> Status {
        let state = self.state.load_full();
        match state.mode {
            Mode::Uninitialized => Status {
                mode: state.mode,
                message: "Retrieval has not been initialized yet".to_string(),
                collection: None,
                fallback_documents: None,
                fallback_reason: None,
            },
            Mode::Vector => Status {
                mode: state.mode,
                message: "Retrieval is operational with semantic search".to_string(),
                collection: match &self.vector {
                    Some(vector) => vector.collection_info().await,
                    None => None,
                },
                fallback_documents: None,
                fallback_reason: None,
            },
            Mode::Fallback => Status {
                mode: state.mode,
                message: "Retrieval is running in fallback mode with keyword search. The vector backend is not available.".to_string(),
                collection: None,
                fallback_documents: Some(self.lexical.len()),
                fallback_reason: state.fallback_reason.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::RetrievalError;
    use crate::search::backend::{CollectionMetadata, Point, ScoredPoint};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Backend whose calls fail while `down` is set
    struct FlakyBackend {
        inner: Option<SqliteBackend>,
        down: AtomicBool,
    }

    impl FlakyBackend {
        fn healthy() -> Self {
            Self {
                inner: Some(SqliteBackend::open_in_memory().unwrap()),
                down: AtomicBool::new(false),
            }
        }

        fn unreachable() -> Self {
            Self {
                inner: None,
                down: AtomicBool::new(true),
            }
        }

        fn backend(&self) -> Result<&SqliteBackend> {
            match (&self.inner, self.down.load(Ordering::SeqCst)) {
                (Some(inner), false) => Ok(inner),
                _ => Err(RetrievalError::unavailable("connection refused")),
            }
        }
    }

    #[async_trait]
    impl VectorBackend for FlakyBackend {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn collection_dimension(&self, collection: &str) -> Result<Option<usize>> {
            self.backend()?.collection_dimension(collection).await
        }

        async fn create_collection(&self, metadata: &CollectionMetadata) -> Result<()> {
            self.backend()?.create_collection(metadata).await
        }

        async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()> {
            self.backend()?.upsert(collection, points).await
        }

        async fn search(
            &self,
            collection: &str,
            vector: &[f32],
            limit: usize,
        ) -> Result<Vec<ScoredPoint>> {
            self.backend()?.search(collection, vector, limit).await
        }

        async fn count(&self, collection: &str) -> Result<usize> {
            self.backend()?.count(collection).await
        }
    }

    fn gateway_with(backend: Arc<FlakyBackend>) -> RetrievalGateway {
        RetrievalGateway::new(VectorIndex::new(
            backend,
            Arc::new(HtpEmbedder::default()),
            "products",
        ))
    }

    fn catalog() -> Vec<Document> {
        vec![
            Document::new("P1", "Coffee Maker Deluxe", "Home & Garden", "12-cup capacity"),
            Document::new("P2", "Laptop Pro", "Electronics", "16GB RAM"),
        ]
    }

    #[tokio::test]
    async fn test_starts_uninitialized() {
        let gateway = gateway_with(Arc::new(FlakyBackend::healthy()));
        assert_eq!(gateway.mode(), Mode::Uninitialized);
        assert_eq!(gateway.status().await.mode, Mode::Uninitialized);
    }

    #[tokio::test]
    async fn test_initialize_success_enters_vector_mode() {
        let gateway = gateway_with(Arc::new(FlakyBackend::healthy()));
        assert_eq!(gateway.initialize().await, Mode::Vector);

        let report = gateway.index(catalog()).await.unwrap();
        assert_eq!(report.indexed, 2);
        assert_eq!(report.mode, Mode::Vector);

        let status = gateway.status().await;
        assert_eq!(status.mode, Mode::Vector);
        assert_eq!(status.collection.unwrap().points_count, 2);
        assert_eq!(status.fallback_documents, None);
    }

    #[tokio::test]
    async fn test_initialize_failure_enters_fallback_mode() {
        let gateway = gateway_with(Arc::new(FlakyBackend::unreachable()));
        assert_eq!(gateway.initialize().await, Mode::Fallback);

        let report = gateway.index(catalog()).await.unwrap();
        assert_eq!(report.mode, Mode::Fallback);
        assert_eq!(report.indexed, 2);

        let results = gateway.search("coffee maker", 2).await.unwrap();
        assert_eq!(results.mode, Mode::Fallback);
        assert_eq!(results.documents.len(), 1);

        let status = gateway.status().await;
        assert_eq!(status.fallback_documents, Some(2));
        assert!(status.fallback_reason.unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_fallback_only_gateway() {
        let gateway = RetrievalGateway::fallback_only("disabled");
        assert_eq!(gateway.initialize().await, Mode::Fallback);
        assert_eq!(gateway.status().await.fallback_reason.as_deref(), Some("disabled"));
    }

    #[tokio::test]
    async fn test_index_initializes_lazily() {
        let gateway = gateway_with(Arc::new(FlakyBackend::healthy()));
        let report = gateway.index(catalog()).await.unwrap();
        assert_eq!(report.mode, Mode::Vector);
        assert_eq!(gateway.mode(), Mode::Vector);
    }

    #[tokio::test]
    async fn test_vector_upsert_accumulates_fallback_replaces() {
        let gateway = gateway_with(Arc::new(FlakyBackend::healthy()));
        gateway.index(catalog()).await.unwrap();
        gateway
            .index(vec![Document::new("P3", "Desk Lamp", "Home", "LED")])
            .await
            .unwrap();
        assert_eq!(gateway.status().await.collection.unwrap().points_count, 3);

        let fallback = RetrievalGateway::fallback_only("disabled");
        fallback.index(catalog()).await.unwrap();
        fallback
            .index(vec![Document::new("P3", "Desk Lamp", "Home", "LED")])
            .await
            .unwrap();
        assert_eq!(fallback.status().await.fallback_documents, Some(1));
    }

    #[tokio::test]
    async fn test_vector_failure_after_init_degrades_without_demotion() {
        let backend = Arc::new(FlakyBackend::healthy());
        let gateway = gateway_with(Arc::clone(&backend));
        gateway.index(catalog()).await.unwrap();

        backend.down.store(true, Ordering::SeqCst);

        let results = gateway.search("coffee maker", 5).await.unwrap();
        assert!(results.documents.is_empty());
        assert_eq!(results.mode, Mode::Vector);
        assert!(results.degraded.is_some());

        let report = gateway.index(catalog()).await.unwrap();
        assert_eq!(report.indexed, 0);
        assert!(report.error.is_some());

        // No automatic demotion
        assert_eq!(gateway.mode(), Mode::Vector);

        backend.down.store(false, Ordering::SeqCst);
        let results = gateway.search("coffee maker", 5).await.unwrap();
        assert!(!results.documents.is_empty());
    }

    #[tokio::test]
    async fn test_reinitialize_recovers_vector_mode() {
        let backend = Arc::new(FlakyBackend::healthy());
        backend.down.store(true, Ordering::SeqCst);
        let gateway = gateway_with(Arc::clone(&backend));

        assert_eq!(gateway.initialize().await, Mode::Fallback);
        backend.down.store(false, Ordering::SeqCst);
        // Stays in fallback until asked
        assert_eq!(gateway.search("laptop", 5).await.unwrap().mode, Mode::Fallback);
        assert_eq!(gateway.initialize().await, Mode::Vector);
    }

    #[tokio::test]
    async fn test_from_settings_forced_fallback() {
        let settings = Settings::default();
        let gateway = RetrievalGateway::from_settings(&settings, true).unwrap();
        assert_eq!(gateway.initialize().await, Mode::Fallback);
    }

    #[tokio::test]
    async fn test_from_settings_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            sqlite_path: dir.path().join("vectors.db"),
            ..Settings::default()
        };
        let gateway = RetrievalGateway::from_settings(&settings, false).unwrap();
        assert_eq!(gateway.initialize().await, Mode::Vector);
    }

    #[tokio::test]
    async fn test_settings_collection_reopens_with_default_embedder() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            sqlite_path: dir.path().join("vectors.db"),
            ..Settings::default()
        };
        let configured = RetrievalGateway::from_settings(&settings, false).unwrap();
        assert_eq!(configured.initialize().await, Mode::Vector);
        drop(configured);

        let backend = Arc::new(SqliteBackend::open(&settings.sqlite_path).unwrap());
        let gateway = RetrievalGateway::new(VectorIndex::new(
            backend,
            Arc::new(HtpEmbedder::default()),
            settings.collection_name.clone(),
        ));
        assert_eq!(gateway.initialize().await, Mode::Vector);
        assert_eq!(gateway.status().await.fallback_reason, None);
    }

    #[test]
    fn test_mode_serialization() {
        assert_eq!(serde_json::to_string(&Mode::Fallback).unwrap(), "\"fallback\"");
        assert_eq!(Mode::Vector.to_string(), "semantic search");
    }
}
