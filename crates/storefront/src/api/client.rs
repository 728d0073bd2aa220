//! `ApiClient` implementation.
//!
//! Caches categories, product lists, single products, and user profiles
//! using `moka`. Listing products also primes the single-product entries.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use milestone_core::{Category, CategoryId, Product, ProductId, User, UserId};

use super::ApiError;
use super::types::{CreateUserRequest, ErrorBody, LoginRequest, TokenResponse};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Categories,
    Products(Option<CategoryId>),
    Product(ProductId),
    User(UserId),
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Categories(Arc<Vec<Category>>),
    Products(Arc<Vec<Product>>),
    Product(Box<Product>),
    User(Box<User>),
}

/// Client for the external REST API.
///
/// Cheap to clone; all clones share one connection pool and cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    cache: Cache<CacheKey, CacheValue>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(base_url: &Url, cache_ttl: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: base_url.as_str().trim_end_matches('/').to_string(),
                cache,
            }),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// Send a request and decode a JSON success body.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        path: &str,
    ) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        // Read the body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            let snippet = body.chars().take(500).collect::<String>();
            if status.is_server_error() {
                tracing::error!(status = %status, body = %snippet, "External API returned server error");
            } else {
                debug!(status = %status, body = %snippet, "External API rejected request");
            }

            let message = ErrorBody::message_from(&body).unwrap_or_default();
            return Err(match status {
                StatusCode::NOT_FOUND => ApiError::NotFound(path.to_string()),
                StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
                _ => ApiError::Api {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse external API response"
            );
            ApiError::Parse(e)
        })
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// List all categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_categories(&self) -> Result<Vec<Category>, ApiError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories.as_ref().clone());
        }

        let path = "/categories";
        let categories: Vec<Category> = self
            .send(self.inner.client.get(self.url(path)), path)
            .await?;

        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(Arc::new(categories.clone())),
            )
            .await;

        Ok(categories)
    }

    /// List products, optionally filtered to one category.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_products(
        &self,
        category: Option<CategoryId>,
    ) -> Result<Vec<Product>, ApiError> {
        let cache_key = CacheKey::Products(category);

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(products.as_ref().clone());
        }

        let path = "/products";
        let url = match category {
            Some(id) => format!("{}?categoryId={id}", self.url(path)),
            None => self.url(path),
        };

        let products: Vec<Product> = self.send(self.inner.client.get(url), path).await?;

        for product in &products {
            self.inner
                .cache
                .insert(
                    CacheKey::Product(product.id),
                    CacheValue::Product(Box::new(product.clone())),
                )
                .await;
        }
        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(Arc::new(products.clone())))
            .await;

        Ok(products)
    }

    /// Get a single product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the API answers 400 or 404 (it uses
    /// 400 for unknown entity IDs), or another error if the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, ApiError> {
        let cache_key = CacheKey::Product(id);

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let path = format!("/products/{id}");
        let result = self
            .send::<Product>(self.inner.client.get(self.url(&path)), &path)
            .await;
        let product = match result {
            Err(ApiError::Api { status: 400, .. }) => return Err(ApiError::NotFound(path)),
            other => other?,
        };

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    // =========================================================================
    // Users & Auth
    // =========================================================================

    /// Get a user's public profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the user does not exist or the request fails.
    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn get_user(&self, id: UserId) -> Result<User, ApiError> {
        let cache_key = CacheKey::User(id);

        if let Some(CacheValue::User(user)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for user");
            return Ok(*user);
        }

        let path = format!("/users/{id}");
        let user: User = self
            .send(self.inner.client.get(self.url(&path)), &path)
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::User(Box::new(user.clone())))
            .await;

        Ok(user)
    }

    /// Get the profile belonging to an access token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` if the token is rejected.
    #[instrument(skip_all)]
    pub async fn get_profile(&self, access_token: &str) -> Result<User, ApiError> {
        let path = "/auth/profile";
        self.send(
            self.inner
                .client
                .get(self.url(path))
                .bearer_auth(access_token),
            path,
        )
        .await
    }

    /// Exchange credentials for an access token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` carrying the server's message if the
    /// credentials are rejected, or another error if the request fails.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, ApiError> {
        let path = "/auth/login";
        self.send(
            self.inner
                .client
                .post(self.url(path))
                .json(&LoginRequest { email, password }),
            path,
        )
        .await
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the registration or the request
    /// fails.
    #[instrument(skip_all)]
    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, ApiError> {
        let path = "/users/";
        self.send(
            self.inner
                .client
                .post(self.url(path))
                .json(&CreateUserRequest {
                    name,
                    email,
                    password,
                }),
            path,
        )
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::{
        Json, Router,
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
        routing::{get, post},
    };
    use serde_json::json;

    use super::*;

    async fn spawn_upstream() -> (Url, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));

        async fn products(State(hits): State<Arc<AtomicUsize>>) -> impl IntoResponse {
            hits.fetch_add(1, Ordering::SeqCst);
            Json(json!([
                {"id": 1, "title": "Hoodie", "description": "Warm", "price": 90, "images": []},
                {"id": 2, "title": "Cap", "description": "Shady", "price": 15, "images": []}
            ]))
        }

        async fn product(
            State(hits): State<Arc<AtomicUsize>>,
            Path(id): Path<i32>,
        ) -> impl IntoResponse {
            hits.fetch_add(1, Ordering::SeqCst);
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"message": format!("Could not find product {id}"), "statusCode": 400})),
            )
        }

        async fn login() -> impl IntoResponse {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"message": "Unauthorized", "statusCode": 401})),
            )
        }

        let app = Router::new()
            .route("/products", get(products))
            .route("/products/{id}", get(product))
            .route("/auth/login", post(login))
            .with_state(Arc::clone(&hits));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (Url::parse(&format!("http://{addr}/")).unwrap(), hits)
    }

    #[tokio::test]
    async fn test_product_list_is_cached_and_primes_products() {
        let (url, hits) = spawn_upstream().await;
        let client = ApiClient::new(&url, Duration::from_secs(60)).unwrap();

        let first = client.get_products(None).await.unwrap();
        let second = client.get_products(None).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // Served from the primed entry, no upstream call
        let cap = client.get_product(ProductId::new(2)).await.unwrap();
        assert_eq!(cap.title, "Cap");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_product_is_not_found() {
        let (url, _hits) = spawn_upstream().await;
        let client = ApiClient::new(&url, Duration::from_secs(60)).unwrap();

        let err = client.get_product(ProductId::new(999)).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_login_rejection_carries_server_message() {
        let (url, _hits) = spawn_upstream().await;
        let client = ApiClient::new(&url, Duration::from_secs(60)).unwrap();

        let err = client.login("john@mail.com", "wrong").await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
        assert_eq!(err.server_message(), Some("Unauthorized"));
    }
}
