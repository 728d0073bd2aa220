//! Navigation chrome shared by every full page.
//!
//! Shows the signed-in user (or a login link) and the cart badge.

use tracing::instrument;

use milestone_core::User;

use crate::storage::ClientStorage;
use crate::state::AppState;

/// Signed-in user display data for templates.
#[derive(Clone)]
pub struct UserView {
    pub name: String,
    pub avatar: Option<String>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            name: user.name,
            avatar: (!user.avatar.is_empty()).then_some(user.avatar),
        }
    }
}

/// Navigation display data for templates.
#[derive(Clone, Default)]
pub struct NavView {
    pub user: Option<UserView>,
    /// Distinct line items in the cart; the badge hides when zero.
    pub cart_count: usize,
}

impl NavView {
    /// Resolve the signed-in user and the cart count concurrently.
    ///
    /// A failed user lookup renders as signed out rather than failing the
    /// page.
    #[instrument(skip_all)]
    pub async fn load(state: &AppState, storage: &mut ClientStorage) -> Self {
        let credential = storage.credential();

        let user = async {
            let credential = credential?;
            state
                .api()
                .get_user(credential.user_id)
                .await
                .inspect_err(|e| {
                    tracing::warn!(error = %e, user_id = %credential.user_id, "Failed to load signed-in user");
                })
                .ok()
        };
        let count = async { storage.cart_store().count() };

        let (user, cart_count) = tokio::join!(user, count);

        Self {
            user: user.map(UserView::from),
            cart_count,
        }
    }
}
