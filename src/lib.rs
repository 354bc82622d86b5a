//! catalog-rag library
//!
//! Hybrid retrieval over a product catalog: semantic vector search when a
//! vector backend is reachable, keyword-overlap scoring when it is not.
//!
//! # Modules
//!
//! - `core`: Settings, error types, catalog loading
//! - `search`: Embedding, vector backends, lexical fallback, gateway, orchestrator

pub mod core;
pub mod search;

// Re-exports for convenience
pub use crate::core::catalog::load_documents;
pub use crate::core::config::{BackendKind, Settings};
pub use crate::core::error::{Result, RetrievalError};
pub use crate::search::document::Document;
pub use crate::search::gateway::{IndexReport, Mode, RetrievalGateway, SearchResults, Status};
pub use crate::search::orchestrator::{QueryOrchestrator, RagResponse};
