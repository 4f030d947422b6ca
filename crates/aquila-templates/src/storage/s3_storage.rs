//! S3-compatible template container using the MinIO client
//!
//! Works with AWS S3, MinIO, and any S3-compatible object storage.

use async_trait::async_trait;
use futures_util::StreamExt;
use minio::s3::{
    client::Client,
    creds::{Provider, StaticProvider},
    http::BaseUrl,
    types::{S3Api, ToStream},
};
use std::str::FromStr;

use crate::storage::blob_storage::{BlobStorage, StorageError};

/// Connection settings for an S3-compatible container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Settings {
    pub endpoint_url: String,
    pub bucket: String,
    /// Anonymous access is used when either key is missing
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

/// S3-compatible storage implementation using MinIO client
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    /// Create a new S3 storage instance
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client for the configured endpoint
    ///
    /// No network traffic happens here; an unreachable endpoint only shows up
    /// on the first listing.
    pub fn from_settings(settings: &S3Settings) -> Result<Self, StorageError> {
        if settings.bucket.is_empty() {
            return Err(StorageError::Backend("Bucket name must not be empty".to_string()));
        }

        let base_url = BaseUrl::from_str(&settings.endpoint_url).map_err(|e| {
            StorageError::Backend(format!(
                "Invalid endpoint URL '{}': {}",
                settings.endpoint_url, e
            ))
        })?;

        let creds_provider: Option<Box<dyn Provider + Send + Sync>> =
            match (&settings.access_key_id, &settings.secret_access_key) {
                (Some(access_key), Some(secret_key)) => {
                    Some(Box::new(StaticProvider::new(access_key, secret_key, None)))
                }
                _ => None,
            };

        let client = Client::new(base_url, creds_provider, None, None)
            .map_err(|e| StorageError::Backend(format!("Failed to create S3 client: {}", e)))?;

        Ok(Self::new(client, settings.bucket.clone()))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Validate S3 key format
    fn validate_key(&self, key: &str) -> Result<(), StorageError> {
        if key.is_empty() || key.len() > 1024 {
            return Err(StorageError::InvalidKey(
                "Key must be between 1 and 1024 characters".into(),
            ));
        }

        if key.starts_with('/') || key.ends_with('/') {
            return Err(StorageError::InvalidKey(
                "Key cannot start or end with '/'".into(),
            ));
        }

        Ok(())
    }

    fn is_not_found(e: &impl std::fmt::Display) -> bool {
        let message = e.to_string();
        message.contains("NoSuchKey") || message.contains("404")
    }
}

#[async_trait]
impl BlobStorage for S3Storage {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        let mut stream = self
            .client
            .list_objects(&self.bucket)
            .prefix(Some(prefix.to_string()))
            .recursive(true)
            .to_stream()
            .await;

        while let Some(result) = stream.next().await {
            match result {
                Ok(response) => {
                    for entry in response.contents {
                        keys.push(entry.name);
                    }
                }
                Err(e) => {
                    return Err(StorageError::Backend(format!(
                        "Failed to list bucket '{}': {}",
                        self.bucket, e
                    )));
                }
            }
        }

        Ok(keys)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.validate_key(key)?;

        let response = self
            .client
            .get_object(&self.bucket, key)
            .send()
            .await
            .map_err(|e| {
                if Self::is_not_found(&e) {
                    StorageError::NotFound(key.to_string())
                } else {
                    StorageError::Backend(format!("Failed to get file '{}': {}", key, e))
                }
            })?;

        let content = response.content.to_segmented_bytes().await.map_err(|e| {
            StorageError::Backend(format!("Failed to read file '{}' content: {}", key, e))
        })?;

        Ok(content.to_bytes().to_vec())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        self.validate_key(key)?;

        match self.client.stat_object(&self.bucket, key).send().await {
            Ok(_) => Ok(true),
            Err(e) if Self::is_not_found(&e) => Ok(false),
            Err(e) => Err(StorageError::Backend(format!(
                "Failed to check existence of file '{}': {}",
                key, e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> S3Settings {
        S3Settings {
            endpoint_url: "http://localhost:9000".to_string(),
            bucket: "aquila-templates".to_string(),
            access_key_id: Some("minio".to_string()),
            secret_access_key: Some("minio123".to_string()),
        }
    }

    #[test]
    fn test_key_validation() {
        let storage = S3Storage::from_settings(&settings()).unwrap();

        assert!(storage.validate_key("retailer/template.html").is_ok());
        assert!(storage.validate_key("healthz").is_ok());

        assert!(storage.validate_key("").is_err());
        assert!(storage.validate_key("/starts-with-slash").is_err());
        assert!(storage.validate_key("ends-with-slash/").is_err());
        assert!(storage.validate_key(&"x".repeat(1025)).is_err());
    }

    #[test]
    fn test_from_settings() {
        let storage = S3Storage::from_settings(&settings()).unwrap();
        assert_eq!(storage.bucket(), "aquila-templates");

        let anonymous = S3Settings {
            access_key_id: None,
            ..settings()
        };
        assert!(S3Storage::from_settings(&anonymous).is_ok());
    }

    #[test]
    fn test_from_settings_rejects_bad_values() {
        let empty_bucket = S3Settings {
            bucket: String::new(),
            ..settings()
        };
        match S3Storage::from_settings(&empty_bucket) {
            Err(StorageError::Backend(msg)) => assert!(msg.contains("Bucket")),
            _ => panic!("Expected Backend error for empty bucket"),
        }
    }
}
