// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! In-process document store.
//!
//! Backed by a DashMap of collection name to documents. Contents are lost when
//! the process exits; used for `memory://` and in tests.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::DocumentStore;
use crate::error::StorageError;

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: DashMap<String, Vec<Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: DashMap::new(),
        }
    }

    /// Number of documents in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn save(&self, collection: &str, document: Value) -> Result<(), StorageError> {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(document);
        Ok(())
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Value>, StorageError> {
        Ok(self
            .collections
            .get(collection)
            .map(|docs| docs.clone())
            .unwrap_or_default())
    }

    fn engine(&self) -> &'static str {
        "memory"
    }
}
