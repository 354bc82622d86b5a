//! Retrieval engine
//!
//! - `vector_index` + a `VectorBackend` (SQLite or Qdrant) for semantic search
//! - `lexical` keyword-overlap fallback
//! - `gateway` picks between them at initialization time
//! - `orchestrator` turns results into an answer and a confidence score

pub mod backend;
pub mod document;
pub mod embedding;
pub mod gateway;
pub mod lexical;
pub mod orchestrator;
pub mod qdrant;
pub mod vector_index;
pub mod vectordb;

pub use backend::{CollectionMetadata, Distance, Point, ScoredPoint, VectorBackend};
pub use embedding::{Embedder, HtpEmbedder, EMBEDDING_DIM};
pub use lexical::LexicalIndex;
pub use qdrant::QdrantBackend;
pub use vector_index::{CollectionInfo, UpsertSummary, VectorIndex};
pub use vectordb::SqliteBackend;
