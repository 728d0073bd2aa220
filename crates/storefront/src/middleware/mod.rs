//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span via [`make_request_span`])
//! 3. Request ID (record on span, Sentry tag, response header)
//! 4. Security headers (CSP, frame options, cache policy)
//!
//! Cookie storage is not a layer: handlers extract
//! [`ClientStorage`](crate::storage::ClientStorage) and return it with their
//! response.

pub mod hx;
pub mod request_id;
pub mod security_headers;

pub use hx::{CART_UPDATED, HX_TRIGGER, HxRequest};
pub use request_id::{RequestId, make_request_span, request_id_middleware};
pub use security_headers::security_headers_middleware;
