//! Blob storage abstraction for template containers
//!
//! This module provides the core storage trait and an in-memory implementation
//! for testing and development.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Invalid key format: {0}")]
    InvalidKey(String),
}

/// Read access to a container of template blobs
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// List every key under the given prefix (`""` lists the whole container)
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Retrieve data by key
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Check if key exists
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;
}

/// In-memory storage implementation for testing
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a blob, replacing any previous content
    pub fn insert(&self, key: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.data
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.into(), data.into());
    }

    /// Remove a blob if present
    pub fn remove(&self, key: &str) {
        self.data
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(key);
    }

    /// Get number of stored items
    pub fn len(&self) -> usize {
        self.data
            .lock()
            .map(|data| data.len())
            .unwrap_or_default()
    }

    /// Check if storage is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStorage for MemoryStorage {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let storage = self
            .data
            .lock()
            .map_err(|_| StorageError::Backend("Lock poisoned".into()))?;

        Ok(storage
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let storage = self
            .data
            .lock()
            .map_err(|_| StorageError::Backend("Lock poisoned".into()))?;

        storage
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let storage = self
            .data
            .lock()
            .map_err(|_| StorageError::Backend("Lock poisoned".into()))?;

        Ok(storage.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage_basic_operations() {
        let storage = MemoryStorage::new();
        let key = "retailer/template.html";

        storage.insert(key, "<p>hi</p>");
        assert_eq!(storage.get(key).await.unwrap(), b"<p>hi</p>".to_vec());
        assert!(storage.exists(key).await.unwrap());
        assert!(!storage.exists("nonexistent").await.unwrap());

        storage.remove(key);
        assert!(!storage.exists(key).await.unwrap());
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_memory_storage_not_found() {
        let storage = MemoryStorage::new();
        let result = storage.get("nonexistent").await;

        match result {
            Err(StorageError::NotFound(key)) => assert_eq!(key, "nonexistent"),
            _ => panic!("Expected NotFound error"),
        }
    }

    #[tokio::test]
    async fn test_memory_storage_list_keys_by_prefix() {
        let storage = MemoryStorage::new();
        storage.insert("a/one.html", "1");
        storage.insert("a/two.html", "2");
        storage.insert("b/one.html", "3");

        assert_eq!(storage.len(), 3);
        assert_eq!(
            storage.list_keys("a/").await.unwrap(),
            vec!["a/one.html".to_string(), "a/two.html".to_string()]
        );
        assert_eq!(storage.list_keys("").await.unwrap().len(), 3);
    }
}
