//! Error handling for the API server

use aquila::RewardError;
use aquila_templates::StorageError;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

/// Result type for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing required query params")]
    MissingParameters,

    #[error("Reward not found")]
    RewardNotFound,

    #[error("Invalid reward data for retailer '{retailer}': {source}")]
    InvalidReward {
        retailer: String,
        #[source]
        source: RewardError,
    },

    #[error("Failed to render page for retailer '{retailer}': {source}")]
    Render {
        retailer: String,
        #[source]
        source: RewardError,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingParameters => StatusCode::BAD_REQUEST,
            ApiError::RewardNotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Retailer a local failure happened for, if it got that far
    pub fn retailer(&self) -> Option<&str> {
        match self {
            ApiError::InvalidReward { retailer, .. } | ApiError::Render { retailer, .. } => {
                Some(retailer.as_str())
            }
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // internal causes stay in the logs
        let error_message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let reason = status.canonical_reason().unwrap_or("Error");
        let body = aquila::http_error_page(status.as_u16(), reason, &error_message)
            .unwrap_or_else(|_| reason.to_string());

        (status, Html(body)).into_response()
    }
}
