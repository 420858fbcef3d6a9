// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! SQLite-backed document store.
//!
//! Documents are kept as JSON text in a single `documents` table keyed by
//! collection. rusqlite is blocking, so every call runs on the blocking pool
//! and the connection is guarded by a mutex.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::Value;

use super::DocumentStore;
use crate::error::StorageError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    collection TEXT NOT NULL,
    body TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents (collection);
";

#[derive(Debug, Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (creating if needed) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| StorageError::Open {
            url: format!("sqlite://{}", path.display()),
            reason: e.to_string(),
        })?;
        Self::with_connection(conn, &format!("sqlite://{}", path.display()))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(|e| StorageError::Open {
            url: "sqlite::memory:".to_string(),
            reason: e.to_string(),
        })?;
        Self::with_connection(conn, "sqlite::memory:")
    }

    fn with_connection(conn: Connection, url: &str) -> Result<Self, StorageError> {
        conn.execute_batch(SCHEMA).map_err(|e| StorageError::Open {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        tracing::debug!(url = %url, "SQLite schema ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| StorageError::Task {
                reason: "connection mutex poisoned".to_string(),
            })?;
            f(&guard)
        })
        .await
        .map_err(|e| StorageError::Task {
            reason: e.to_string(),
        })?
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn save(&self, collection: &str, document: Value) -> Result<(), StorageError> {
        let collection = collection.to_string();
        let body = serde_json::to_string(&document)?;
        self.blocking(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO documents (collection, body) VALUES (?1, ?2)",
                params![collection, body],
            );
            inserted.map(|_| ()).map_err(|e| StorageError::Write {
                collection,
                reason: e.to_string(),
            })
        })
        .await
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Value>, StorageError> {
        let collection = collection.to_string();
        self.blocking(move |conn| {
            let read_err = |e: rusqlite::Error| StorageError::Read {
                collection: collection.clone(),
                reason: e.to_string(),
            };

            let mut stmt = conn
                .prepare("SELECT body FROM documents WHERE collection = ?1 ORDER BY id")
                .map_err(read_err)?;
            let rows = stmt
                .query_map(params![collection], |row| row.get::<_, String>(0))
                .map_err(read_err)?;

            let mut documents = Vec::new();
            for row in rows {
                let body = row.map_err(read_err)?;
                documents.push(serde_json::from_str(&body)?);
            }
            Ok(documents)
        })
        .await
    }

    fn engine(&self) -> &'static str {
        "sqlite"
    }
}
