//! # Aquila Templates
//!
//! Retailer HTML templates for the aquila reward page service, loaded from a
//! blob container and cached for the lifetime of the process.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use aquila_templates::{MemoryStorage, TemplateCache};
//!
//! # async fn example() {
//! let storage = MemoryStorage::new();
//! storage.insert("test-retailer/test-template.html", "<p>{{ code }}</p>");
//!
//! let cache = TemplateCache::connect(Arc::new(storage)).await;
//! let body = cache.lookup("test-retailer", "test-template").await;
//! assert_eq!(body.as_deref(), Some("<p>{{ code }}</p>"));
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod storage;

pub use cache::{HEALTHCHECK_BLOB, ReloadSummary, TemplateCache, TemplateName};
pub use error::{CacheError, Result};
pub use storage::{BlobStorage, MemoryStorage, StorageError};

#[cfg(feature = "s3")]
pub use storage::s3_storage::{S3Settings, S3Storage};
