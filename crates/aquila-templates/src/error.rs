//! Error types for the template cache

use thiserror::Error;

use crate::storage::StorageError;

/// Template cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Template store unavailable: {0}")]
    StoreUnavailable(#[source] StorageError),

    #[error("Template cache is disabled")]
    Disabled,
}

/// Result type for template cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
