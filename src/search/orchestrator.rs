//! Query orchestrator: retrieval → templated answer → confidence
//!
//! The answer is deterministic templating over the retrieved documents; no
//! text generation happens here. Confidence is the mean similarity score and
//! is not comparable across modes (cosine similarity vs. keyword overlap).

use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use super::document::Document;
use super::gateway::{Mode, RetrievalGateway};

pub const NO_RESULTS_ANSWER: &str =
    "I couldn't find any relevant products for your query. Please try a different search term.";

const BLOCK_SEPARATOR: &str = "\n---\n";

/// Upper bound for caller-supplied `top_k`
pub const MAX_TOP_K: usize = 100;

/// Resolve a requested result count: `default` when absent or zero, capped
/// at [`MAX_TOP_K`]
pub fn clamp_top_k(requested: Option<usize>, default: usize) -> usize {
    match requested {
        Some(0) | None => default,
        Some(n) => n,
    }
    .clamp(1, MAX_TOP_K)
}

/// Packaged answer for one query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RagResponse {
    pub query: String,
    pub answer: String,
    pub relevant_products: Vec<Document>,
    pub confidence: f32,
    pub mode: Mode,
}

/// Human-readable answer echoing `query`, one block per document in rank order
pub fn answer(query: &str, documents: &[Document]) -> String {
    if documents.is_empty() {
        return NO_RESULTS_ANSWER.to_string();
    }

    let context = documents
        .iter()
        .map(product_block)
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR);

    format!(
        "Based on your query '{}', I found the following relevant products:\n\n{}",
        query, context
    )
}

fn product_block(doc: &Document) -> String {
    format!(
        "Product: {}\nCategory: {}\nPrice: ${:.2}\nDescription: {}\n",
        doc.name.as_deref().unwrap_or("Unknown"),
        doc.category.as_deref().unwrap_or("Unknown"),
        doc.price.unwrap_or(0.0),
        doc.description.as_deref().unwrap_or("No description available"),
    )
}

/// Mean `similarity_score` (missing scores count as 0.0); 0.0 for no documents
pub fn confidence(documents: &[Document]) -> f32 {
    if documents.is_empty() {
        return 0.0;
    }
    let total: f64 = documents.iter().map(|d| d.score() as f64).sum();
    (total / documents.len() as f64) as f32
}

pub struct QueryOrchestrator {
    gateway: Arc<RetrievalGateway>,
}

impl QueryOrchestrator {
    pub fn new(gateway: Arc<RetrievalGateway>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Arc<RetrievalGateway> {
        &self.gateway
    }

    /// Search, answer and score. Never fails: errors become an explanatory
    /// answer with confidence 0.0.
    pub async fn query(&self, query_text: &str, top_k: usize) -> RagResponse {
        match self.gateway.search(query_text, top_k).await {
            Ok(results) => RagResponse {
                query: query_text.to_string(),
                answer: answer(query_text, &results.documents),
                confidence: confidence(&results.documents),
                relevant_products: results.documents,
                mode: results.mode,
            },
            Err(e) => {
                error!("Error processing query '{}': {}", query_text, e);
                RagResponse {
                    query: query_text.to_string(),
                    answer: format!("An error occurred while processing your query: {}", e),
                    relevant_products: Vec::new(),
                    confidence: 0.0,
                    mode: self.gateway.mode(),
                }
            }
        }
    }
}
