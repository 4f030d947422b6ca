//! Aquila turns reward payloads from the loyalty services into HTML pages.
//!
//! This crate holds the pure parts: validating provider payloads, reformatting
//! dates for display, rendering Jinja templates, and the built-in fallback
//! pages.

pub mod error;
pub mod pages;
pub mod render;
pub mod reward;

pub use error::{Result, RewardError};
pub use pages::{DEFAULT_ERROR_TEMPLATE, DEFAULT_TEMPLATE, HTTP_ERROR_TEMPLATE, http_error_page};
pub use render::render;
pub use reward::{RenderContext, RewardPayload, Scalar, display_expiry_date};

/// Get the library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
