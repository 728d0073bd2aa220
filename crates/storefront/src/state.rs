//! Application state shared across handlers.

use std::sync::Arc;

use cookie::Key;
use secrecy::ExposeSecret;

use crate::api::{ApiClient, ApiError};
use crate::config::{MIN_COOKIE_SECRET_LENGTH, StorefrontConfig};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("cookie secret must be at least {MIN_COOKIE_SECRET_LENGTH} bytes")]
    CookieSecretTooShort,
    #[error("failed to build API client: {0}")]
    Api(#[from] ApiError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the API client and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    api: ApiClient,
    cookie_key: Key,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the cookie secret is too short to derive a
    /// signing key or the HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let secret = config.cookie_secret.expose_secret().as_bytes();
        if secret.len() < MIN_COOKIE_SECRET_LENGTH {
            return Err(StateError::CookieSecretTooShort);
        }
        let cookie_key = Key::derive_from(secret);
        let api = ApiClient::new(&config.api_url, config.cache_ttl)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                cookie_key,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the external API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Get the key used to sign storage cookies.
    #[must_use]
    pub fn cookie_key(&self) -> &Key {
        &self.inner.cookie_key
    }
}
