// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Persistence engine interface.
//!
//! The engine stores JSON documents grouped into named collections. It is
//! opened once per process from the configured database URL and shared as an
//! `Arc<dyn DocumentStore>`; engines handle their own internal locking.

mod memory;
mod sqlite;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::StoreLocation;
use crate::error::StorageError;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// A document-oriented persistence engine.
#[async_trait]
pub trait DocumentStore: Send + Sync + fmt::Debug {
    /// Append one document to a collection.
    async fn save(&self, collection: &str, document: Value) -> Result<(), StorageError>;

    /// Every document in a collection, in insertion order.
    async fn find_all(&self, collection: &str) -> Result<Vec<Value>, StorageError>;

    /// Short engine name for logs.
    fn engine(&self) -> &'static str;
}

/// A typed entity stored in a fixed collection.
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: &'static str;
}

/// Serialize and save a typed document.
pub async fn save_document<D: Document>(
    store: &dyn DocumentStore,
    document: &D,
) -> Result<(), StorageError> {
    let value = serde_json::to_value(document)?;
    store.save(D::COLLECTION, value).await
}

/// Load every document of a type.
pub async fn find_documents<D: Document>(store: &dyn DocumentStore) -> Result<Vec<D>, StorageError> {
    store
        .find_all(D::COLLECTION)
        .await?
        .into_iter()
        .map(|value| serde_json::from_value(value).map_err(StorageError::from))
        .collect()
}

/// Open the engine named by a parsed database URL.
pub fn open(location: &StoreLocation) -> Result<Arc<dyn DocumentStore>, StorageError> {
    let store: Arc<dyn DocumentStore> = match location {
        StoreLocation::Memory => Arc::new(MemoryStore::new()),
        StoreLocation::SqliteMemory => Arc::new(SqliteStore::open_in_memory()?),
        StoreLocation::SqliteFile(path) => Arc::new(SqliteStore::open(path)?),
    };
    tracing::info!(engine = store.engine(), "Document store opened");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
    }

    impl Document for Note {
        const COLLECTION: &'static str = "notes";
    }

    #[tokio::test]
    async fn test_typed_round_trip_through_memory_store() {
        let store = open(&StoreLocation::Memory).unwrap();
        save_document(store.as_ref(), &Note { text: "a".into() })
            .await
            .unwrap();
        save_document(store.as_ref(), &Note { text: "b".into() })
            .await
            .unwrap();

        let notes: Vec<Note> = find_documents(store.as_ref()).await.unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[1].text, "b");
    }

    #[tokio::test]
    async fn test_find_documents_rejects_foreign_shape() {
        let store = MemoryStore::new();
        store
            .save("notes", serde_json::json!({"unexpected": 1}))
            .await
            .unwrap();
        let result: Result<Vec<Note>, _> = find_documents(&store).await;
        assert!(matches!(result, Err(StorageError::Encoding(_))));
    }
}
