//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Catalog (query: category_id, added)
//! GET  /health                 - Health check
//!
//! # Products
//! GET  /products/grid          - Product grid fragment (query: category_id)
//! GET  /product/{id}           - Product detail
//!
//! # Cart (fragments for HX requests, redirects otherwise)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add to cart (toast fragment, triggers cart-updated)
//! POST /cart/increment         - Increase quantity (returns cart_items fragment)
//! POST /cart/decrement         - Decrease quantity (returns cart_items fragment)
//! POST /cart/remove            - Remove item (returns cart_items fragment)
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Checkout
//! GET  /checkout               - Checkout hand-off page
//!
//! # Auth
//! GET  /login                  - Login page
//! POST /login                  - Login action
//! GET  /register               - Register page
//! POST /register               - Register action
//! POST /logout                 - Logout action
//! ```

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod nav;
pub mod products;

use axum::{
    Router,
    http::{HeaderValue, header::CACHE_CONTROL},
    middleware::from_fn,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::middleware::{make_request_span, request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// Asset URLs carry a content hash, so they can be cached indefinitely.
const STATIC_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/increment", post(cart::increment))
        .route("/decrement", post(cart::decrement))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create all page and fragment routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Catalog
        .route("/", get(catalog::index))
        .route("/products/grid", get(catalog::grid))
        .route("/product/{id}", get(products::show))
        // Cart routes
        .nest("/cart", cart_routes())
        .route("/checkout", get(cart::checkout))
        // Auth routes
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Build the complete application: routes, static assets, and the
/// middleware stack.
pub fn app(state: AppState) -> Router {
    let static_files = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static(STATIC_CACHE_CONTROL),
        ))
        .service(ServeDir::new(&state.config().static_dir));

    Router::new()
        .route("/health", get(health))
        .merge(routes())
        .nest_service("/static", static_files)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the external API.
async fn health() -> &'static str {
    "ok"
}
