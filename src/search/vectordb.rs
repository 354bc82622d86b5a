//! Vector store using SQLite
//!
//! Stores embeddings as BLOBs and computes cosine similarity in Rust.
//! Calls run on the blocking pool so a slow scan does not stall the runtime.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::backend::{CollectionMetadata, Point, ScoredPoint, VectorBackend};
use super::document::Document;
use super::embedding::cosine_similarity;
use crate::core::error::{Result, RetrievalError};

/// SQLite-backed [`VectorBackend`]
#[derive(Clone)]
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    /// Open or create database at path
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    RetrievalError::unavailable(format!(
                        "cannot create {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        Self::from_connection(Connection::open(db_path)?)
    }

    /// Open in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| RetrievalError::unavailable("sqlite connection lock poisoned"))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| RetrievalError::unavailable(format!("sqlite task failed: {}", e)))?
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS collections (
            name TEXT PRIMARY KEY,
            dimension INTEGER NOT NULL,
            distance TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS points (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            payload TEXT NOT NULL,  -- JSON document
            embedding BLOB NOT NULL,
            indexed_at INTEGER NOT NULL,
            PRIMARY KEY (collection, id),
            FOREIGN KEY (collection) REFERENCES collections(name) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_points_collection ON points(collection);
        "#,
    )?;
    Ok(())
}

fn dimension_of(conn: &Connection, collection: &str) -> Result<Option<usize>> {
    let dimension: Option<i64> = conn
        .query_row(
            "SELECT dimension FROM collections WHERE name = ?1",
            params![collection],
            |row| row.get(0),
        )
        .optional()?;
    Ok(dimension.map(|d| d as usize))
}

fn require_dimension(conn: &Connection, collection: &str) -> Result<usize> {
    dimension_of(conn, collection)?.ok_or_else(|| {
        RetrievalError::unavailable(format!("collection '{}' does not exist", collection))
    })
}

#[async_trait]
impl VectorBackend for SqliteBackend {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn collection_dimension(&self, collection: &str) -> Result<Option<usize>> {
        let collection = collection.to_string();
        self.with_conn(move |conn| dimension_of(conn, &collection))
            .await
    }

    async fn create_collection(&self, metadata: &CollectionMetadata) -> Result<()> {
        let metadata = metadata.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO collections (name, dimension, distance, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    metadata.name,
                    metadata.dimension as i64,
                    metadata.distance.as_str(),
                    chrono::Utc::now().timestamp(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()> {
        let collection = collection.to_string();
        let mut rows = Vec::with_capacity(points.len());
        for point in points {
            let payload = serde_json::to_string(&point.payload)
                .map_err(|e| RetrievalError::unavailable(format!("payload encoding: {}", e)))?;
            rows.push((point.id, payload, point.vector));
        }

        self.with_conn(move |conn| {
            let dimension = require_dimension(conn, &collection)?;
            if let Some((_, _, vector)) = rows.iter().find(|(_, _, v)| v.len() != dimension) {
                return Err(RetrievalError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }

            let now = chrono::Utc::now().timestamp();
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    r#"
                    INSERT INTO points (collection, id, payload, embedding, indexed_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ON CONFLICT(collection, id) DO UPDATE SET
                        payload = excluded.payload,
                        embedding = excluded.embedding,
                        indexed_at = excluded.indexed_at
                    "#,
                )?;
                for (id, payload, vector) in &rows {
                    stmt.execute(params![collection, id, payload, embedding_to_blob(vector), now])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let collection = collection.to_string();
        let query = vector.to_vec();

        self.with_conn(move |conn| {
            let dimension = require_dimension(conn, &collection)?;
            if query.len() != dimension {
                return Err(RetrievalError::DimensionMismatch {
                    expected: dimension,
                    actual: query.len(),
                });
            }

            // Exhaustive scan; fine for catalogs in the tens of thousands
            let mut stmt = conn.prepare(
                "SELECT id, payload, embedding FROM points WHERE collection = ?1 ORDER BY rowid",
            )?;
            let rows = stmt.query_map(params![collection], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                ))
            })?;

            let mut results = Vec::new();
            for row in rows {
                let (id, payload, blob) = row?;
                let payload: Document = serde_json::from_str(&payload).map_err(|e| {
                    RetrievalError::unavailable(format!("corrupt payload for point {}: {}", id, e))
                })?;
                let score = cosine_similarity(&query, &blob_to_embedding(&blob));
                results.push(ScoredPoint { id, score, payload });
            }

            // Stable sort keeps insertion order among equal scores
            results.sort_by(|a, b| b.score.total_cmp(&a.score));
            results.truncate(limit);
            Ok(results)
        })
        .await
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collection = collection.to_string();
        self.with_conn(move |conn| {
            require_dimension(conn, &collection)?;
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM points WHERE collection = ?1",
                params![collection],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
        .await
    }
}

/// Convert f32 embedding to BLOB
fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(embedding.len() * 4);
    for &val in embedding {
        blob.extend_from_slice(&val.to_le_bytes());
    }
    blob
}

/// Convert BLOB to f32 embedding
fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
