//! Authentication route handlers.
//!
//! Login exchanges credentials for an access token with the external API
//! and keeps `{user_id, access_token}` in the signed `auth-token` cookie.
//! Registration delegates account creation to the same API.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use milestone_core::Email;

use crate::api::ApiError;
use crate::error::{add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::models::SessionCredential;
use crate::routes::nav::NavView;
use crate::state::AppState;
use crate::storage::ClientStorage;

pub const LOGIN_FAILED: &str = "Login failed. Please try again.";
pub const PASSWORD_MISMATCH: &str = "Passwords do not match";
pub const REGISTRATION_FAILED: &str = "Registration failed. Please try again.";
pub const INVALID_EMAIL: &str = "Please enter a valid email address.";
pub const NAME_REQUIRED: &str = "Please enter your name.";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
}

impl RegisterForm {
    /// Check the form before anything is sent to the API.
    ///
    /// Returns the normalized email, or the message to show.
    fn validate(&self) -> Result<Email, &'static str> {
        if self.password != self.password_confirm {
            return Err(PASSWORD_MISMATCH);
        }
        if self.name.trim().is_empty() {
            return Err(NAME_REQUIRED);
        }
        Email::parse(&self.email).map_err(|_| INVALID_EMAIL)
    }
}

/// Query parameters for the login page.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    /// Set after a successful registration.
    pub registered: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub nav: NavView,
    pub email: String,
    /// Shown in a blocking dialog.
    pub error: Option<String>,
    pub registered: bool,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub nav: NavView,
    pub name: String,
    pub email: String,
    pub error: Option<String>,
}

/// Message shown for a failed login: the server's own message when it sent
/// one.
fn login_error_message(error: &ApiError) -> String {
    error
        .server_message()
        .map_or_else(|| LOGIN_FAILED.to_string(), String::from)
}

// =============================================================================
// Route Handlers
// =============================================================================

/// Display login page.
#[instrument(skip(state, storage))]
pub async fn login_page(
    State(state): State<AppState>,
    mut storage: ClientStorage,
    Query(query): Query<LoginQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        nav: NavView::load(&state, &mut storage).await,
        email: String::new(),
        error: None,
        registered: query.registered.is_some(),
    }
}

/// Handle login form submission.
///
/// On success the credential cookie is set and the visitor is sent to the
/// catalog. On failure the page is re-rendered with the message in a dialog
/// and no navigation happens.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    mut storage: ClientStorage,
    Form(form): Form<LoginForm>,
) -> Response {
    let result = async {
        let token = state.api().login(&form.email, &form.password).await?;
        let user = state.api().get_profile(&token.access_token).await?;
        Ok::<_, ApiError>(SessionCredential {
            user_id: user.id,
            access_token: token.access_token,
        })
    }
    .await;

    match result {
        Ok(credential) => {
            tracing::info!(user_id = %credential.user_id, "User logged in");
            set_sentry_user(&credential.user_id);
            add_breadcrumb("auth", "Logged in", &[]);
            storage.set_credential(&credential);
            (storage, Redirect::to("/")).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            let status = match e {
                ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                _ => StatusCode::BAD_GATEWAY,
            };
            let page = LoginTemplate {
                nav: NavView::load(&state, &mut storage).await,
                error: Some(login_error_message(&e)),
                email: form.email,
                registered: false,
            };
            (status, page).into_response()
        }
    }
}

/// Display registration page.
#[instrument(skip(state, storage))]
pub async fn register_page(
    State(state): State<AppState>,
    mut storage: ClientStorage,
) -> impl IntoResponse {
    RegisterTemplate {
        nav: NavView::load(&state, &mut storage).await,
        name: String::new(),
        email: String::new(),
        error: None,
    }
}

/// Handle registration form submission.
///
/// Local validation failures never reach the API.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    mut storage: ClientStorage,
    Form(form): Form<RegisterForm>,
) -> Response {
    let (status, message) = match form.validate() {
        Ok(email) => match state
            .api()
            .create_user(form.name.trim(), email.as_str(), &form.password)
            .await
        {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "User registered");
                add_breadcrumb("auth", "Registered", &[("user_id", user.id.to_string())]);
                return Redirect::to("/login?registered=1").into_response();
            }
            Err(e) => {
                tracing::warn!(error = %e, "Registration failed");
                (StatusCode::BAD_GATEWAY, REGISTRATION_FAILED)
            }
        },
        Err(message) => (StatusCode::BAD_REQUEST, message),
    };

    let page = RegisterTemplate {
        nav: NavView::load(&state, &mut storage).await,
        name: form.name,
        email: form.email,
        error: Some(message.to_string()),
    };
    (status, page).into_response()
}

/// Handle logout.
#[instrument(skip(storage))]
pub async fn logout(mut storage: ClientStorage) -> Response {
    storage.clear_credential();
    clear_sentry_user();
    add_breadcrumb("auth", "Logged out", &[]);
    (storage, Redirect::to("/login")).into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn register_form(password: &str, confirm: &str) -> RegisterForm {
        RegisterForm {
            name: "Jane".to_string(),
            email: "jane@example.com".to_string(),
            password: password.to_string(),
            password_confirm: confirm.to_string(),
        }
    }

    #[test]
    fn test_mismatch_checked_first() {
        let mut form = register_form("secret1", "secret2");
        form.email = "not-an-email".to_string();
        assert_eq!(form.validate().unwrap_err(), PASSWORD_MISMATCH);
    }

    #[test]
    fn test_register_validation() {
        assert!(register_form("secret", "secret").validate().is_ok());

        let mut form = register_form("secret", "secret");
        form.name = "  ".to_string();
        assert_eq!(form.validate().unwrap_err(), NAME_REQUIRED);

        let mut form = register_form("secret", "secret");
        form.email = "jane".to_string();
        assert_eq!(form.validate().unwrap_err(), INVALID_EMAIL);
    }

    #[test]
    fn test_login_error_message() {
        let server = ApiError::Unauthorized("Invalid credentials".to_string());
        assert_eq!(login_error_message(&server), "Invalid credentials");

        let silent = ApiError::Unauthorized(String::new());
        assert_eq!(login_error_message(&silent), LOGIN_FAILED);

        let not_found = ApiError::NotFound("/auth/login".to_string());
        assert_eq!(login_error_message(&not_found), LOGIN_FAILED);
    }

    #[test]
    fn test_login_dialog_rendered_on_error() {
        let html = LoginTemplate {
            nav: NavView::default(),
            email: "jane@example.com".to_string(),
            error: Some("Invalid credentials".to_string()),
            registered: false,
        }
        .render()
        .unwrap();

        assert!(html.contains("<dialog"));
        assert!(html.contains("Invalid credentials"));
        assert!(html.contains("value=\"jane@example.com\""));
        assert!(html.contains("Sign in"));
    }

    #[test]
    fn test_login_without_error_has_no_dialog() {
        let html = LoginTemplate {
            nav: NavView::default(),
            email: String::new(),
            error: None,
            registered: false,
        }
        .render()
        .unwrap();

        assert!(!html.contains("<dialog"));
        assert!(html.contains("Email address"));
    }

    #[test]
    fn test_register_page_fields() {
        let html = RegisterTemplate {
            nav: NavView::default(),
            name: String::new(),
            email: String::new(),
            error: Some(PASSWORD_MISMATCH.to_string()),
        }
        .render()
        .unwrap();

        assert!(html.contains("Full Name"));
        assert!(html.contains("Confirm Password"));
        assert!(html.contains("Create Account"));
        assert!(html.contains(PASSWORD_MISMATCH));
    }
}
