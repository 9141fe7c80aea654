// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-based cache for FAQ embedding vectors.
//!
//! Embedding the FAQ corpus is the slow part of start-up. Vectors are cached
//! by a blake3 hash of the model identifier and the exact text, so a changed
//! question or a different model simply misses.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// SQLite-based storage for cached embeddings.
///
/// Stored at `<user cache dir>/faqseek/embeddings.sqlite` by default.
pub struct EmbeddingCache {
    conn: Connection,
    path: PathBuf,
}

impl EmbeddingCache {
    /// Opens or creates a cache database at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        let cache = Self { conn, path };
        cache.init_schema()?;
        Ok(cache)
    }

    /// Opens the cache in the user cache directory.
    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    /// Default database location.
    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::cache_dir().context("Could not determine the user cache directory")?;
        Ok(base.join("faqseek").join("embeddings.sqlite"))
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r#"
            CREATE TABLE IF NOT EXISTS embeddings (
                key TEXT PRIMARY KEY,
                model TEXT NOT NULL,
                dimension INTEGER NOT NULL,
                embedding BLOB NOT NULL,
                created_at INTEGER NOT NULL
            );
            "#,
            )
            .context("Failed to initialize embedding cache schema")?;
        Ok(())
    }

    /// Returns the database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Looks up the cached embedding of `text` under `model`.
    pub fn get(&self, model: &str, text: &str) -> Result<Option<Vec<f32>>> {
        let blob: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT embedding FROM embeddings WHERE key = ?1",
                params![cache_key(model, text)],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query embedding cache")?;

        Ok(blob.map(|b| blob_to_embedding(&b)))
    }

    /// Stores one embedding, replacing any previous value.
    pub fn put(&self, model: &str, text: &str, embedding: &[f32]) -> Result<()> {
        self.put_many(model, &[(text, embedding)])
    }

    /// Stores several embeddings in one transaction.
    pub fn put_many(&self, model: &str, items: &[(&str, &[f32])]) -> Result<()> {
        let now = unix_now();
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO embeddings (key, model, dimension, embedding, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(key) DO UPDATE SET
                    embedding = excluded.embedding,
                    dimension = excluded.dimension,
                    created_at = excluded.created_at
                "#,
            )?;
            for (text, embedding) in items {
                stmt.execute(params![
                    cache_key(model, text),
                    model,
                    embedding.len() as i64,
                    embedding_to_blob(embedding),
                    now
                ])?;
            }
        }
        tx.commit().context("Failed to write embedding cache")?;
        Ok(())
    }

    /// Counts cached embeddings.
    pub fn count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Deletes every cached embedding.
    pub fn clear(&self) -> Result<()> {
        self.conn
            .execute("DELETE FROM embeddings", [])
            .context("Failed to clear embedding cache")?;
        Ok(())
    }
}

fn cache_key(model: &str, text: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(model.as_bytes());
    hasher.update(&[0]);
    hasher.update(text.as_bytes());
    hasher.finalize().to_hex().to_string()
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}
