//! Catalog source: loads document lists from JSON files
//!
//! Accepts either a bare array of product objects or an object with a
//! `products` array (the shape of a catalog export).

use serde::Deserialize;
use std::path::Path;

use super::error::{Result, RetrievalError};
use crate::search::document::Document;

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    List(Vec<Document>),
    Wrapped { products: Vec<Document> },
}

pub fn load_documents(path: &Path) -> Result<Vec<Document>> {
    let catalog_error = |reason: String| RetrievalError::Catalog {
        path: path.to_path_buf(),
        reason,
    };

    let content = std::fs::read_to_string(path).map_err(|e| catalog_error(e.to_string()))?;
    parse_documents(&content).map_err(|e| catalog_error(e.to_string()))
}

pub fn parse_documents(content: &str) -> serde_json::Result<Vec<Document>> {
    Ok(match serde_json::from_str(content)? {
        CatalogFile::List(documents) => documents,
        CatalogFile::Wrapped { products } => products,
    })
}
