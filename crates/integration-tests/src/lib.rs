//! Integration test support for the Milestone storefront.
//!
//! Each [`TestContext`] runs a real storefront on an ephemeral port in front
//! of a [`FakeApi`]: an in-process stand-in for the external REST API that
//! counts every request it receives, so tests can assert that a page made
//! no upstream calls at all.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p milestone-integration-tests
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! #[tokio::test]
//! async fn test_storefront_health() {
//!     let ctx = TestContext::new().await;
//!     let resp = ctx.get("/health").await;
//!     assert_eq!(resp.status(), 200);
//! }
//! ```

#![allow(clippy::missing_panics_doc)]

use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    middleware::{Next, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use milestone_storefront::config::StorefrontConfig;
use milestone_storefront::routes;
use milestone_storefront::state::AppState;

/// Credentials the fake API accepts.
pub const VALID_EMAIL: &str = "john@mail.com";
pub const VALID_PASSWORD: &str = "changeme";

/// Token issued for [`VALID_EMAIL`].
pub const ACCESS_TOKEN: &str = "header.payload.signature";

/// Display name of the user behind [`ACCESS_TOKEN`].
pub const USER_NAME: &str = "John";

/// Registering with this email fails upstream.
pub const TAKEN_EMAIL: &str = "taken@mail.com";

/// Products served by ID only (never listed), each with a long
/// description and three images, for filling a cart.
pub const DETAILED_PRODUCTS: RangeInclusive<i32> = 100..=199;

const COOKIE_SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6kv8Jq";

// =============================================================================
// Fake external API
// =============================================================================

/// In-process stand-in for the external catalog/auth API.
///
/// Categories: 1 "Clothes" (products 1 and 2), 2 "Shoes" (product 3),
/// 3 "Furniture" (empty). Product `n` costs `n * 100` dollars.
/// [`DETAILED_PRODUCTS`] exist too but appear in no listing.
#[derive(Clone, Default)]
pub struct FakeApi {
    hits: Arc<AtomicUsize>,
    fail_products: Arc<AtomicBool>,
}

impl FakeApi {
    /// Requests received so far.
    #[must_use]
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Make product listings answer 500.
    pub fn fail_products(&self, fail: bool) {
        self.fail_products.store(fail, Ordering::SeqCst);
    }

    fn router(self) -> Router {
        Router::new()
            .route("/categories", get(categories))
            .route("/products", get(products))
            .route("/products/{id}", get(product))
            .route("/users/{id}", get(user))
            .route("/users/", post(create_user))
            .route("/auth/login", post(login))
            .route("/auth/profile", get(profile))
            .layer(from_fn_with_state(self.clone(), count_hits))
            .with_state(self)
    }

    /// Serve the fake API on an ephemeral port.
    pub async fn spawn(self) -> SocketAddr {
        serve(self.router()).await
    }
}

async fn count_hits(State(api): State<FakeApi>, request: Request, next: Next) -> Response {
    api.hits.fetch_add(1, Ordering::SeqCst);
    next.run(request).await
}

const CATEGORIES: [(i32, &str); 3] = [(1, "Clothes"), (2, "Shoes"), (3, "Furniture")];
const PRODUCTS: [(i32, i32); 3] = [(1, 1), (2, 1), (3, 2)];

fn product_json(id: i32, category: i32) -> Value {
    json!({
        "id": id,
        "title": format!("Product {id}"),
        "slug": format!("product-{id}"),
        "price": id * 100,
        "description": format!("Description {id}"),
        "category": {"id": category},
        "images": ["https://placehold.co/150"],
    })
}

fn detailed_product_json(id: i32) -> Value {
    json!({
        "id": id,
        "title": format!("Handmade Leather Weekender Bag {id}"),
        "slug": format!("weekender-{id}"),
        "price": 240,
        "description": "Full-grain leather, brass hardware and a padded laptop sleeve. \
                        Fits under most airline seats and ages beautifully with use. \
                        Each bag is stitched by hand and inspected before it ships out.",
        "category": {"id": 3},
        "images": (1..=3)
            .map(|n| format!("https://i.imgur.com/weekender-{id}-{n}.jpeg"))
            .collect::<Vec<_>>(),
    })
}

fn user_json() -> Value {
    json!({
        "id": 1,
        "email": VALID_EMAIL,
        "password": VALID_PASSWORD,
        "name": USER_NAME,
        "role": "customer",
        "avatar": "https://placehold.co/64",
    })
}

fn not_found(entity: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "message": format!("Could not find any entity of type \"{entity}\""),
            "statusCode": 400,
        })),
    )
        .into_response()
}

async fn categories() -> Json<Value> {
    Json(
        CATEGORIES
            .iter()
            .map(|(id, name)| json!({"id": id, "name": name}))
            .collect(),
    )
}

#[derive(Deserialize)]
struct ProductsQuery {
    #[serde(rename = "categoryId")]
    category_id: Option<i32>,
}

async fn products(State(api): State<FakeApi>, Query(query): Query<ProductsQuery>) -> Response {
    if api.fail_products.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }

    let list: Vec<Value> = PRODUCTS
        .iter()
        .filter(|(_, category)| query.category_id.is_none_or(|wanted| wanted == *category))
        .map(|&(id, category)| product_json(id, category))
        .collect();
    Json(list).into_response()
}

async fn product(Path(id): Path<i32>) -> Response {
    if DETAILED_PRODUCTS.contains(&id) {
        return Json(detailed_product_json(id)).into_response();
    }

    PRODUCTS
        .iter()
        .find(|(product_id, _)| *product_id == id)
        .map_or_else(
            || not_found("Product"),
            |&(id, category)| Json(product_json(id, category)).into_response(),
        )
}

async fn user(Path(id): Path<i32>) -> Response {
    if id == 1 {
        Json(user_json()).into_response()
    } else {
        not_found("User")
    }
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

async fn login(Json(body): Json<LoginBody>) -> Response {
    if body.email == VALID_EMAIL && body.password == VALID_PASSWORD {
        (
            StatusCode::CREATED,
            Json(json!({"access_token": ACCESS_TOKEN, "refresh_token": "refresh"})),
        )
            .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Unauthorized", "statusCode": 401})),
        )
            .into_response()
    }
}

async fn profile(headers: HeaderMap) -> Response {
    let expected = format!("Bearer {ACCESS_TOKEN}");
    let authorized = headers
        .get(AUTHORIZATION)
        .is_some_and(|value| value.as_bytes() == expected.as_bytes());

    if authorized {
        Json(user_json()).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Unauthorized", "statusCode": 401})),
        )
            .into_response()
    }
}

async fn create_user(Json(body): Json<Value>) -> Response {
    if body["email"] == TAKEN_EMAIL {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": ["email must be unique"], "statusCode": 400})),
        )
            .into_response();
    }

    (
        StatusCode::CREATED,
        Json(json!({
            "id": 2,
            "name": body["name"],
            "email": body["email"],
            "avatar": "https://placehold.co/64",
        })),
    )
        .into_response()
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server error");
    });

    addr
}

// =============================================================================
// Storefront under test
// =============================================================================

/// A running storefront wired to a fresh [`FakeApi`].
pub struct TestContext {
    /// Browser-like client: keeps cookies, does not follow redirects.
    pub client: reqwest::Client,
    pub base_url: String,
    pub api: FakeApi,
}

impl TestContext {
    pub async fn new() -> Self {
        let api = FakeApi::default();
        let api_addr = api.clone().spawn().await;

        let config = StorefrontConfig {
            host: [127, 0, 0, 1].into(),
            port: 0,
            base_url: "http://127.0.0.1".to_string(),
            cookie_secret: SecretString::from(COOKIE_SECRET),
            api_url: Url::parse(&format!("http://{api_addr}")).expect("Invalid fake API URL"),
            cache_ttl: Duration::from_secs(300),
            static_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../storefront/static")),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };

        let state = AppState::new(config).expect("Failed to build storefront state");
        let addr = serve(routes::app(state)).await;

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to build test client");

        Self {
            client,
            base_url: format!("http://{addr}"),
            api,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Plain browser navigation.
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET failed")
    }

    /// Plain HTML form post.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST failed")
    }

    /// Form post made by `storefront.js`, asking for a fragment.
    pub async fn post_fragment(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("HX-Request", "true")
            .form(form)
            .send()
            .await
            .expect("POST failed")
    }

    /// Body of a GET request.
    pub async fn page(&self, path: &str) -> String {
        self.get(path).await.text().await.expect("Unreadable body")
    }

    /// Sign in as [`VALID_EMAIL`].
    pub async fn login(&self) {
        let resp = self
            .post_form("/login", &[("email", VALID_EMAIL), ("password", VALID_PASSWORD)])
            .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER.as_u16());
    }
}

/// The `Location` header of a redirect.
#[must_use]
pub fn location(resp: &reqwest::Response) -> Option<&str> {
    resp.headers()
        .get(reqwest::header::LOCATION)
        .and_then(|value| value.to_str().ok())
}

/// Names of the cookies a response sets or clears.
#[must_use]
pub fn set_cookie_names(resp: &reqwest::Response) -> Vec<String> {
    resp.headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split('=').next())
        .map(String::from)
        .collect()
}
