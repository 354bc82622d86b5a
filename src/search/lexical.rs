//! Lexical fallback index
//!
//! In-memory keyword-overlap retrieval used when no vector backend is
//! available. Holds exactly one generation of documents; `replace_all` swaps
//! the whole generation atomically, so readers see either the old or the new
//! set, never a mix.

use arc_swap::ArcSwap;
use std::collections::HashSet;
use std::sync::Arc;

use super::document::Document;

#[derive(Default)]
pub struct LexicalIndex {
    generation: ArcSwap<Vec<Document>>,
}

impl LexicalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current generation; returns the new document count
    pub fn replace_all(&self, documents: Vec<Document>) -> usize {
        let count = documents.len();
        self.generation.store(Arc::new(documents));
        count
    }

    pub fn len(&self) -> usize {
        self.generation.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rank documents by the fraction of distinct query words found in their
    /// search text.
    ///
    /// Documents with no matching word are excluded. Ties keep generation
    /// order, so repeated queries return identical sequences.
    pub fn score(&self, query: &str, top_k: usize) -> Vec<Document> {
        let words = query_words(query);
        if words.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let generation = self.generation.load_full();
        let mut scored: Vec<(f32, &Document)> = generation
            .iter()
            .filter_map(|doc| {
                let text = doc.search_text().to_lowercase();
                let matches = words.iter().filter(|w| text.contains(w.as_str())).count();
                (matches > 0).then(|| (keyword_score(matches, words.len()), doc))
            })
            .collect();

        // sort_by is stable
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        scored
            .into_iter()
            .take(top_k)
            .map(|(score, doc)| doc.clone().with_score(score))
            .collect()
    }
}

/// Lower-cased, whitespace-separated, deduplicated query words
fn query_words(query: &str) -> HashSet<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn keyword_score(matches: usize, total: usize) -> f32 {
    (matches as f32 / total as f32).min(1.0)
}
