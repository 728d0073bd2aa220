//! Product detail route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::instrument;

use milestone_core::{Product, ProductId};

use crate::api::ApiError;
use crate::filters;
use crate::models::ViewState;
use crate::routes::nav::NavView;
use crate::state::AppState;
use crate::storage::ClientStorage;

pub const INVALID_ID: &str = "Invalid product ID";
pub const NOT_FOUND: &str = "Product not found";
pub const FETCH_ERROR: &str = "Error fetching product details";

/// Product detail display data for templates.
#[derive(Clone)]
pub struct ProductDetailView {
    pub id: i32,
    pub title: String,
    pub description: String,
    /// Two-decimal price, e.g. "$100.00".
    pub price: String,
    pub image: Option<String>,
}

impl From<Product> for ProductDetailView {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.as_i32(),
            price: product.price.display_fixed(),
            image: product.primary_image().map(String::from),
            title: product.title,
            description: product.description,
        }
    }
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub nav: NavView,
    pub product: ViewState<ProductDetailView>,
}

/// Resolve the detail view state and its status code.
///
/// A malformed identifier is rejected without calling the API.
async fn load_product(state: &AppState, raw_id: &str) -> (StatusCode, ViewState<ProductDetailView>) {
    let id = match raw_id.parse::<ProductId>() {
        Ok(id) => id,
        Err(e) => {
            tracing::debug!(error = %e, raw_id, "Rejecting malformed product id");
            return (StatusCode::BAD_REQUEST, ViewState::Error(INVALID_ID.to_string()));
        }
    };

    match state.api().get_product(id).await {
        Ok(product) => (StatusCode::OK, ViewState::Ready(product.into())),
        Err(ApiError::NotFound(_)) => (StatusCode::NOT_FOUND, ViewState::Error(NOT_FOUND.to_string())),
        Err(e) => {
            tracing::warn!(error = %e, product_id = %id, "Failed to fetch product");
            (StatusCode::BAD_GATEWAY, ViewState::Error(FETCH_ERROR.to_string()))
        }
    }
}

/// Display the product detail page.
#[instrument(skip(state, storage))]
pub async fn show(
    State(state): State<AppState>,
    mut storage: ClientStorage,
    Path(raw_id): Path<String>,
) -> impl IntoResponse {
    let (nav, (status, product)) = tokio::join!(
        NavView::load(&state, &mut storage),
        load_product(&state, &raw_id),
    );

    (status, ProductShowTemplate { nav, product })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn render(product: ViewState<ProductDetailView>) -> String {
        ProductShowTemplate {
            nav: NavView::default(),
            product,
        }
        .render()
        .unwrap()
    }

    #[test]
    fn test_detail_shows_fixed_price_and_add_form() {
        let html = render(ViewState::Ready(ProductDetailView {
            id: 1,
            title: "Product 1".to_string(),
            description: "Description 1".to_string(),
            price: "$100.00".to_string(),
            image: None,
        }));

        assert!(html.contains("$100.00"));
        assert!(html.contains("Description 1"));
        assert!(html.contains("name=\"then\" value=\"cart\""));
        assert!(!html.contains(INVALID_ID));
    }

    #[test]
    fn test_detail_error_hides_product() {
        let html = render(ViewState::Error(INVALID_ID.to_string()));
        assert!(html.contains(INVALID_ID));
        assert!(!html.contains("Add to Cart"));
    }
}
