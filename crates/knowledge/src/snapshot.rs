//! SQLite snapshot of a built index.
//!
//! Lets a questionnaire run reuse embeddings from an earlier `index` run when
//! the corpus, chunking parameters and embedding model are all unchanged.

use crate::embeddings::ModelIdentity;
use crate::index::{EmbeddingIndex, IndexEntry};
use crate::types::Passage;
use attest_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// What an index was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotMeta {
    pub identity: ModelIdentity,

    /// Corpus fingerprint at build time
    pub fingerprint: String,

    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub created_at: DateTime<Utc>,
}

impl SnapshotMeta {
    /// Whether a snapshot with this metadata can stand in for a fresh build.
    pub fn is_reusable_for(
        &self,
        identity: &ModelIdentity,
        fingerprint: &str,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> bool {
        self.identity == *identity
            && self.fingerprint == fingerprint
            && self.chunk_size == chunk_size
            && self.chunk_overlap == chunk_overlap
    }
}

fn knowledge_error(context: &str) -> impl Fn(rusqlite::Error) -> AppError + '_ {
    move |e| AppError::Knowledge(format!("{}: {}", context, e))
}

fn open(db_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::Knowledge(format!("Failed to create index directory: {}", e)))?;
    }

    let conn = Connection::open(db_path).map_err(knowledge_error("Failed to open SQLite index"))?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS passages (
            position INTEGER PRIMARY KEY,
            id TEXT NOT NULL,
            document TEXT NOT NULL,
            page_number INTEGER NOT NULL,
            start_offset INTEGER NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL
        );
        "#,
    )
    .map_err(knowledge_error("Failed to create tables"))?;

    Ok(conn)
}

/// Write `index` to `db_path`, replacing any previous snapshot.
pub fn save(
    db_path: &Path,
    index: &EmbeddingIndex,
    fingerprint: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> AppResult<()> {
    let mut conn = open(db_path)?;
    let tx = conn
        .transaction()
        .map_err(knowledge_error("Failed to start transaction"))?;

    tx.execute("DELETE FROM passages", [])
        .map_err(knowledge_error("Failed to clear passages"))?;
    tx.execute("DELETE FROM meta", [])
        .map_err(knowledge_error("Failed to clear metadata"))?;

    let identity = index.identity();
    let meta = [
        ("provider", identity.provider.clone()),
        ("model", identity.model.clone()),
        ("dimensions", identity.dimensions.to_string()),
        ("fingerprint", fingerprint.to_string()),
        ("chunk_size", chunk_size.to_string()),
        ("chunk_overlap", chunk_overlap.to_string()),
        ("created_at", Utc::now().to_rfc3339()),
    ];
    for (key, value) in &meta {
        tx.execute(
            "INSERT INTO meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .map_err(knowledge_error("Failed to write metadata"))?;
    }

    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO passages (position, id, document, page_number, start_offset, text, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .map_err(knowledge_error("Failed to prepare insert"))?;

        for (position, entry) in index.entries().iter().enumerate() {
            let p = &entry.passage;
            stmt.execute(params![
                position as i64,
                p.id,
                p.document,
                p.page_number as i64,
                p.start_offset as i64,
                p.text,
                embedding_to_bytes(&entry.vector),
            ])
            .map_err(knowledge_error("Failed to insert passage"))?;
        }
    }

    tx.commit()
        .map_err(knowledge_error("Failed to commit snapshot"))?;

    tracing::debug!("Saved {} passages to {:?}", index.len(), db_path);
    Ok(())
}

/// Read snapshot metadata, or `None` if no complete snapshot exists.
pub fn read_meta(db_path: &Path) -> AppResult<Option<SnapshotMeta>> {
    if !db_path.exists() {
        return Ok(None);
    }
    let conn = open(db_path)?;

    let get = |key: &str| -> AppResult<Option<String>> {
        conn.query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .map_err(knowledge_error("Failed to read metadata"))
    };

    let (
        Some(provider),
        Some(model),
        Some(dimensions),
        Some(fingerprint),
        Some(chunk_size),
        Some(chunk_overlap),
        Some(created_at),
    ) = (
        get("provider")?,
        get("model")?,
        get("dimensions")?,
        get("fingerprint")?,
        get("chunk_size")?,
        get("chunk_overlap")?,
        get("created_at")?,
    )
    else {
        return Ok(None);
    };

    let parse_usize = |name: &str, value: &str| {
        value
            .parse::<usize>()
            .map_err(|e| AppError::Knowledge(format!("Corrupt snapshot {}: {}", name, e)))
    };

    Ok(Some(SnapshotMeta {
        identity: ModelIdentity {
            provider,
            model,
            dimensions: parse_usize("dimensions", &dimensions)?,
        },
        fingerprint,
        chunk_size: parse_usize("chunk_size", &chunk_size)?,
        chunk_overlap: parse_usize("chunk_overlap", &chunk_overlap)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| AppError::Knowledge(format!("Corrupt snapshot timestamp: {}", e)))?
            .with_timezone(&Utc),
    }))
}

/// Load a snapshot into an index.
pub fn load(db_path: &Path) -> AppResult<(SnapshotMeta, EmbeddingIndex)> {
    let meta = read_meta(db_path)?
        .ok_or_else(|| AppError::Knowledge(format!("No index snapshot at {:?}", db_path)))?;
    let conn = open(db_path)?;

    let mut stmt = conn
        .prepare(
            "SELECT id, document, page_number, start_offset, text, embedding
             FROM passages ORDER BY position",
        )
        .map_err(knowledge_error("Failed to prepare query"))?;

    let rows = stmt
        .query_map([], |row| {
            let bytes: Vec<u8> = row.get(5)?;
            Ok((
                Passage {
                    id: row.get(0)?,
                    document: row.get(1)?,
                    page_number: row.get::<_, i64>(2)? as u32,
                    start_offset: row.get::<_, i64>(3)? as usize,
                    text: row.get(4)?,
                },
                bytes,
            ))
        })
        .map_err(knowledge_error("Failed to query passages"))?;

    let mut entries = Vec::new();
    for row in rows {
        let (passage, bytes) = row.map_err(knowledge_error("Failed to read passage"))?;
        entries.push(IndexEntry {
            passage,
            vector: bytes_to_embedding(&bytes)?,
        });
    }

    let index = EmbeddingIndex::from_entries(meta.identity.clone(), entries)?;
    tracing::debug!("Loaded {} passages from {:?}", index.len(), db_path);
    Ok((meta, index))
}

/// Convert embedding vector to little-endian bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
