//! Client for the external catalog, user, and auth REST API.
//!
//! # Architecture
//!
//! - The external API is the source of truth for products, categories, and
//!   users; nothing is stored locally apart from the cart and credential
//!   cookies
//! - In-memory caching via `moka` for catalog reads
//! - No request timeout is configured; a hung upstream leaves the caller
//!   waiting
//!
//! # Example
//!
//! ```rust,ignore
//! use milestone_storefront::api::ApiClient;
//!
//! let client = ApiClient::new(&config.api_url, config.cache_ttl)?;
//! let categories = client.get_categories().await?;
//! let shoes = client.get_products(Some(categories[0].id)).await?;
//! ```

mod client;
pub mod types;

pub use client::ApiClient;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when calling the external API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection refused, reset, TLS, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Credentials were rejected. Carries the server's message.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ApiError {
    /// Message suitable for showing to the visitor, if the server sent one.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized(message) | Self::Api { message, .. } if !message.is_empty() => {
                Some(message.as_str())
            }
            _ => None,
        }
    }
}
