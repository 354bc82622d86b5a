//! Settings for the retrieval engine
//!
//! Resolution order: built-in defaults, then an optional TOML file, then
//! `CATALOG_RAG_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::{Result, RetrievalError};
use crate::search::embedding::EMBEDDING_DIM;

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "catalog-rag.toml";

const ENV_PREFIX: &str = "CATALOG_RAG_";

/// Which vector backend to connect to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Sqlite,
    Qdrant,
}

impl std::str::FromStr for BackendKind {
    type Err = RetrievalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "qdrant" => Ok(Self::Qdrant),
            other => Err(RetrievalError::config(format!(
                "unknown backend '{}' (must be: sqlite|qdrant)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend: BackendKind,
    pub collection_name: String,
    pub dimension: usize,
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub timeout_secs: u64,
    pub sqlite_path: PathBuf,
    pub default_top_k: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: BackendKind::Sqlite,
            collection_name: "products".to_string(),
            dimension: EMBEDDING_DIM,
            qdrant_url: "http://localhost:6333".to_string(),
            qdrant_api_key: None,
            timeout_secs: 10,
            sqlite_path: PathBuf::from(".catalog-rag/vectors.db"),
            default_top_k: 5,
        }
    }
}

impl Settings {
    /// Load settings from `path` (or the default file if present) and the
    /// process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RetrievalError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
            .map_err(|e| RetrievalError::config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Override fields from `CATALOG_RAG_*` variables resolved through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(backend) = var("BACKEND") {
            self.backend = backend.parse()?;
        }
        if let Some(url) = var("QDRANT_URL") {
            self.qdrant_url = url;
        }
        if let Some(key) = var("QDRANT_API_KEY") {
            self.qdrant_api_key = Some(key).filter(|k| !k.is_empty());
        }
        if let Some(name) = var("COLLECTION") {
            self.collection_name = name;
        }
        if let Some(path) = var("SQLITE_PATH") {
            self.sqlite_path = PathBuf::from(path);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.collection_name.trim().is_empty() {
            return Err(RetrievalError::config("collection_name must not be empty"));
        }
        if self.default_top_k == 0 {
            return Err(RetrievalError::config("default_top_k must be at least 1"));
        }
        if self.timeout_secs == 0 {
            return Err(RetrievalError::config("timeout_secs must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.backend, BackendKind::Sqlite);
        assert_eq!(settings.collection_name, "products");
        assert_eq!(settings.dimension, 384);
        assert_eq!(settings.timeout_secs, 10);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml(
            r#"
            backend = "qdrant"
            qdrant_url = "http://qdrant:6333"
            collection_name = "olist_products"
            "#,
        )
        .unwrap();

        assert_eq!(settings.backend, BackendKind::Qdrant);
        assert_eq!(settings.qdrant_url, "http://qdrant:6333");
        assert_eq!(settings.collection_name, "olist_products");
        assert_eq!(settings.default_top_k, 5);
    }

    #[test]
    fn test_unknown_backend_in_toml() {
        assert!(Settings::from_toml(r#"backend = "pinecone""#).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("CATALOG_RAG_BACKEND", "Qdrant"),
            ("CATALOG_RAG_COLLECTION", "catalog"),
            ("CATALOG_RAG_QDRANT_API_KEY", ""),
            ("CATALOG_RAG_SQLITE_PATH", "/tmp/v.db"),
        ]);
        let mut settings = Settings::default();
        settings
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(settings.backend, BackendKind::Qdrant);
        assert_eq!(settings.collection_name, "catalog");
        assert_eq!(settings.qdrant_api_key, None);
        assert_eq!(settings.sqlite_path, PathBuf::from("/tmp/v.db"));
    }

    #[test]
    fn test_env_rejects_bad_backend() {
        let mut settings = Settings::default();
        let result = settings.apply_env(|key| {
            (key == "CATALOG_RAG_BACKEND").then(|| "mongo".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog-rag.toml");
        std::fs::write(&path, "default_top_k = 3\ntimeout_secs = 2\n").unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.default_top_k, 3);
        assert_eq!(settings.timeout_secs, 2);

        assert!(Settings::from_file(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_validate() {
        let mut settings = Settings::default();
        settings.default_top_k = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.collection_name = "  ".to_string();
        assert!(settings.validate().is_err());
    }
}
