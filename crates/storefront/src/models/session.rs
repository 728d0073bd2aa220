//! Session-related types.
//!
//! Types stored in browser cookies for authentication state.

use serde::{Deserialize, Serialize};

use milestone_core::UserId;

/// The credential held after a successful login.
///
/// Stored signed in the `auth-token` cookie. Implements `Debug` manually to
/// redact the token.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionCredential {
    /// The authenticated user, resolved from the token at login time.
    pub user_id: UserId,
    /// Bearer token issued by the external auth endpoint.
    pub access_token: String,
}

impl std::fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredential")
            .field("user_id", &self.user_id)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Browser storage keys.
pub mod keys {
    /// Key holding the serialized cart.
    pub const CART: &str = milestone_core::CART_STORAGE_KEY;

    /// Key holding the session credential.
    pub const AUTH_TOKEN: &str = "auth-token";
}
