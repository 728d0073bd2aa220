//! Catalog route handlers.
//!
//! The catalog page lists categories and a product grid. Switching category
//! is a full navigation without JavaScript; with it, `storefront.js` swaps in
//! the grid fragment from [`grid`] and discards responses for categories the
//! visitor has already moved away from.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use milestone_core::{Category, CategoryId, Product};

use crate::filters;
use crate::models::ViewState;
use crate::routes::cart::Toast;
use crate::routes::nav::NavView;
use crate::state::AppState;
use crate::storage::ClientStorage;

pub const CATEGORIES_ERROR: &str = "Error fetching categories. Please try again later.";
pub const PRODUCTS_ERROR: &str = "Error fetching products. Please try again later.";

/// Category filter display data for templates.
#[derive(Clone)]
pub struct CategoryView {
    pub id: i32,
    pub name: String,
    pub active: bool,
}

/// Product card display data for templates.
#[derive(Clone)]
pub struct ProductCardView {
    pub id: i32,
    pub title: String,
    pub description: String,
    /// Compact price, e.g. "$100".
    pub price: String,
    pub image: Option<String>,
}

impl From<&Product> for ProductCardView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.as_i32(),
            title: product.title.clone(),
            description: product.description.clone(),
            price: product.price.display(),
            image: product.primary_image().map(String::from),
        }
    }
}

/// Catalog query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub category_id: Option<String>,
    /// Set after a no-JS add so the confirmation shows once.
    pub added: Option<String>,
}

impl CatalogQuery {
    /// The selected category. Malformed values select nothing.
    fn category(&self) -> Option<CategoryId> {
        let raw = self.category_id.as_deref().filter(|s| !s.is_empty())?;
        raw.parse::<CategoryId>()
            .inspect_err(|e| tracing::debug!(error = %e, "Ignoring malformed category filter"))
            .ok()
    }
}

/// Catalog page template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/index.html")]
pub struct CatalogTemplate {
    pub nav: NavView,
    pub categories: ViewState<Vec<CategoryView>>,
    pub category_id: Option<i32>,
    pub products: ViewState<Vec<ProductCardView>>,
    /// Confirmation after a no-JS add.
    pub toast: Option<Toast>,
}

/// Product grid fragment template (for category switching).
#[derive(Template, WebTemplate)]
#[template(path = "partials/product_grid.html")]
pub struct ProductGridTemplate {
    pub category_id: Option<i32>,
    pub products: ViewState<Vec<ProductCardView>>,
}

/// Fetch the product grid for a category.
async fn load_products(
    state: &AppState,
    category: Option<CategoryId>,
) -> ViewState<Vec<ProductCardView>> {
    ViewState::from_result(state.api().get_products(category).await, PRODUCTS_ERROR)
        .map(|products| products.iter().map(ProductCardView::from).collect())
}

fn category_views(categories: Vec<Category>, selected: Option<CategoryId>) -> Vec<CategoryView> {
    categories
        .into_iter()
        .map(|category| CategoryView {
            id: category.id.as_i32(),
            active: selected == Some(category.id),
            name: category.name,
        })
        .collect()
}

/// Display the catalog page.
#[instrument(skip(state, storage))]
pub async fn index(
    State(state): State<AppState>,
    mut storage: ClientStorage,
    Query(query): Query<CatalogQuery>,
) -> impl IntoResponse {
    let selected = query.category();

    let (nav, categories, products) = tokio::join!(
        NavView::load(&state, &mut storage),
        state.api().get_categories(),
        load_products(&state, selected),
    );

    CatalogTemplate {
        nav,
        categories: ViewState::from_result(categories, CATEGORIES_ERROR)
            .map(|categories| category_views(categories, selected)),
        category_id: selected.map(|id| id.as_i32()),
        products,
        toast: query.added.is_some().then(Toast::added),
    }
}

/// Product grid fragment.
#[instrument(skip(state))]
pub async fn grid(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> impl IntoResponse {
    let selected = query.category();

    ProductGridTemplate {
        category_id: selected.map(|id| id.as_i32()),
        products: load_products(&state, selected).await,
    }
}
