//! Storefront-local models.
//!
//! Catalog and cart types live in `milestone-core`; these are the pieces
//! that only make sense inside the web layer.

pub mod session;
pub mod view_state;

pub use session::{SessionCredential, keys};
pub use view_state::ViewState;
