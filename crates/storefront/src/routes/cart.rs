//! Cart route handlers.
//!
//! Every mutation goes through [`CartStore`](milestone_core::CartStore) on
//! the visitor's cookie storage and re-renders from the cart it returns.
//! Fragment requests get the updated fragment plus `HX-Trigger:
//! cart-updated`; plain form posts get a redirect.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use milestone_core::{Cart, CartLineItem, CategoryId, ProductId};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{CART_UPDATED, HX_TRIGGER, HxRequest};
use crate::routes::nav::NavView;
use crate::state::AppState;
use crate::storage::ClientStorage;

pub const ADDED_MESSAGE: &str = "Product added to cart";
pub const CART_FULL_MESSAGE: &str = "Your cart is full. Remove an item to add another.";

/// How long the add confirmation stays on screen.
pub const TOAST_DISMISS_MS: u32 = 3000;

/// Cart item display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
    pub image: Option<String>,
}

impl From<&CartLineItem> for CartItemView {
    fn from(item: &CartLineItem) -> Self {
        Self {
            id: item.id().as_i32(),
            title: item.product.title.clone(),
            description: item.product.description.clone(),
            quantity: item.quantity(),
            price: item.product.price.display_fixed(),
            line_price: item.line_total().display_fixed(),
            image: item.product.primary_image().map(String::from),
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u32,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.items().iter().map(CartItemView::from).collect(),
            subtotal: cart.subtotal().display_fixed(),
            item_count: cart.total_quantity(),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub nav: NavView,
    pub cart: CartView,
}

/// Cart items fragment template (swapped in after quantity changes).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template.
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: usize,
}

/// Transient confirmation shown after an add.
#[derive(Clone, Copy)]
pub struct Toast {
    pub message: &'static str,
    /// Removed by `storefront.js` after this delay.
    pub dismiss_ms: u32,
}

impl Toast {
    #[must_use]
    pub const fn added() -> Self {
        Self {
            message: ADDED_MESSAGE,
            dismiss_ms: TOAST_DISMISS_MS,
        }
    }

    #[must_use]
    pub const fn cart_full() -> Self {
        Self {
            message: CART_FULL_MESSAGE,
            dismiss_ms: TOAST_DISMISS_MS,
        }
    }
}

/// Add confirmation fragment template.
#[derive(Template, WebTemplate)]
#[template(path = "partials/added_toast.html")]
pub struct AddedToastTemplate {
    pub toast: Toast,
}

/// Checkout hand-off page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub nav: NavView,
    pub cart: CartView,
}

// =============================================================================
// Forms
// =============================================================================

/// Where the visitor ends up after adding a product.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AfterAdd {
    /// Stay on the catalog and show the confirmation.
    #[default]
    Stay,
    /// Go to the cart page.
    Cart,
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    #[serde(default)]
    pub then: AfterAdd,
    /// Catalog filter to return to after a plain form post.
    pub category_id: Option<String>,
}

impl AddToCartForm {
    /// Catalog URL to return to after a plain form post.
    fn return_url(&self) -> String {
        let category = self
            .category_id
            .as_deref()
            .and_then(|raw| raw.parse::<CategoryId>().ok());

        match category {
            Some(id) => format!("/?added=1&category_id={id}"),
            None => "/?added=1".to_string(),
        }
    }
}

/// Form data for increment, decrement, and remove.
#[derive(Debug, Deserialize)]
pub struct CartItemForm {
    pub product_id: String,
}

fn parse_product_id(raw: &str) -> Result<ProductId> {
    raw.parse::<ProductId>()
        .map_err(|e| AppError::BadRequest(format!("invalid product id: {e}")))
}

/// Response for a quantity change or removal.
fn mutation_response(storage: ClientStorage, hx: bool, cart: &Cart) -> Response {
    if hx {
        (
            storage,
            AppendHeaders([(HX_TRIGGER, CART_UPDATED)]),
            CartItemsTemplate { cart: cart.into() },
        )
            .into_response()
    } else {
        (storage, Redirect::to("/cart")).into_response()
    }
}

// =============================================================================
// Route Handlers
// =============================================================================

/// Display cart page.
#[instrument(skip(state, storage))]
pub async fn show(State(state): State<AppState>, mut storage: ClientStorage) -> impl IntoResponse {
    let nav = NavView::load(&state, &mut storage).await;
    let cart = storage.cart_store().load();

    CartShowTemplate {
        nav,
        cart: CartView::from(&cart),
    }
}

/// Add a product to the cart, or bump its quantity if already present.
///
/// The product snapshot comes from the API (usually cached from the
/// listing the visitor clicked in). If the browser cookies cannot hold the
/// grown cart, nothing changes and the visitor is told the cart is full.
#[instrument(skip(state, storage))]
pub async fn add(
    State(state): State<AppState>,
    HxRequest(hx): HxRequest,
    mut storage: ClientStorage,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let id = parse_product_id(&form.product_id)?;
    let product = state.api().get_product(id).await?;

    let before = storage.cart_store().load().get(id).map(CartLineItem::quantity);
    let cart = storage.cart_store().add_or_increment(product);

    if cart.get(id).map(CartLineItem::quantity) == before {
        tracing::warn!(product_id = %id, items = cart.len(), "Cart full, product not added");
        if hx {
            return Ok(AddedToastTemplate {
                toast: Toast::cart_full(),
            }
            .into_response());
        }
        return Err(AppError::CartFull);
    }

    tracing::info!(product_id = %id, items = cart.len(), "Added product to cart");
    add_breadcrumb("cart", "Added to cart", &[("product_id", id.to_string())]);

    let response = match (form.then, hx) {
        (AfterAdd::Cart, true) => {
            (storage, AppendHeaders([("HX-Redirect", "/cart")])).into_response()
        }
        (AfterAdd::Cart, false) => (storage, Redirect::to("/cart")).into_response(),
        (AfterAdd::Stay, true) => (
            storage,
            AppendHeaders([(HX_TRIGGER, CART_UPDATED)]),
            AddedToastTemplate {
                toast: Toast::added(),
            },
        )
            .into_response(),
        (AfterAdd::Stay, false) => (storage, Redirect::to(&form.return_url())).into_response(),
    };

    Ok(response)
}

/// Increase a line item's quantity by one.
#[instrument(skip(storage))]
pub async fn increment(
    HxRequest(hx): HxRequest,
    mut storage: ClientStorage,
    Form(form): Form<CartItemForm>,
) -> Result<Response> {
    let id = parse_product_id(&form.product_id)?;
    let cart = storage.cart_store().increment(id);
    Ok(mutation_response(storage, hx, &cart))
}

/// Decrease a line item's quantity by one, stopping at one.
#[instrument(skip(storage))]
pub async fn decrement(
    HxRequest(hx): HxRequest,
    mut storage: ClientStorage,
    Form(form): Form<CartItemForm>,
) -> Result<Response> {
    let id = parse_product_id(&form.product_id)?;
    let cart = storage.cart_store().decrement(id);
    Ok(mutation_response(storage, hx, &cart))
}

/// Remove a line item.
#[instrument(skip(storage))]
pub async fn remove(
    HxRequest(hx): HxRequest,
    mut storage: ClientStorage,
    Form(form): Form<CartItemForm>,
) -> Result<Response> {
    let id = parse_product_id(&form.product_id)?;
    let cart = storage.cart_store().remove(id);
    add_breadcrumb("cart", "Removed from cart", &[("product_id", id.to_string())]);
    Ok(mutation_response(storage, hx, &cart))
}

/// Get cart count badge (HTMX fragment).
#[instrument(skip(storage))]
pub async fn count(mut storage: ClientStorage) -> impl IntoResponse {
    CartCountTemplate {
        count: storage.cart_store().count(),
    }
}

/// Checkout hand-off. No payment is taken here.
#[instrument(skip(state, storage))]
pub async fn checkout(State(state): State<AppState>, mut storage: ClientStorage) -> Response {
    let cart = storage.cart_store().load();
    if cart.is_empty() {
        return Redirect::to("/cart").into_response();
    }

    let nav = NavView::load(&state, &mut storage).await;
    CheckoutTemplate {
        nav,
        cart: CartView::from(&cart),
    }
    .into_response()
}
