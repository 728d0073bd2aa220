//! Fragment-request detection.
//!
//! `static/js/storefront.js` sends `HX-Request: true` when it wants an HTML
//! fragment to swap into the page. Requests without it are plain browser
//! navigations or form posts and get full pages or redirects.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

/// Request header marking a fragment request.
pub const HX_REQUEST: &str = "hx-request";

/// Response header naming client-side events to fire after a swap.
pub const HX_TRIGGER: &str = "HX-Trigger";

/// Event fired after any cart mutation so the badge refreshes.
pub const CART_UPDATED: &str = "cart-updated";

/// Whether the request asked for a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HxRequest(pub bool);

impl<S> FromRequestParts<S> for HxRequest
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let is_fragment = parts
            .headers
            .get(HX_REQUEST)
            .is_some_and(|value| value.as_bytes().eq_ignore_ascii_case(b"true"));

        Ok(Self(is_fragment))
    }
}
