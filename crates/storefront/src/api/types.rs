//! Request and response bodies for the external REST API.
//!
//! Catalog payloads (`Product`, `Category`, `User`) live in `milestone-core`;
//! these are the auth and error envelopes only this crate needs.

use serde::{Deserialize, Serialize};

/// Body of `POST /auth/login`.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Successful `POST /auth/login` response.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Body of `POST /users/`.
#[derive(Debug, Serialize)]
pub struct CreateUserRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Error envelope returned by the API on non-success statuses, e.g.
/// `{"message":"Unauthorized","statusCode":401}` or, for validation
/// failures, `{"message":["email must be an email"],"error":"Bad Request"}`.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub message: ErrorMessage,
}

/// A single message or a list of validation messages.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ErrorMessage {
    One(String),
    Many(Vec<String>),
}

impl ErrorBody {
    /// Extract the human-readable message from a raw response body.
    #[must_use]
    pub fn message_from(body: &str) -> Option<String> {
        let parsed: Self = serde_json::from_str(body).ok()?;
        let message = match parsed.message {
            ErrorMessage::One(message) => message,
            ErrorMessage::Many(messages) => messages.join(", "),
        };
        (!message.is_empty()).then_some(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_from_single() {
        assert_eq!(
            ErrorBody::message_from(r#"{"message":"Unauthorized","statusCode":401}"#).as_deref(),
            Some("Unauthorized")
        );
    }

    #[test]
    fn test_message_from_list() {
        let body = r#"{"message":["email must be an email","password too short"],"error":"Bad Request","statusCode":400}"#;
        assert_eq!(
            ErrorBody::message_from(body).as_deref(),
            Some("email must be an email, password too short")
        );
    }

    #[test]
    fn test_message_from_garbage() {
        assert_eq!(ErrorBody::message_from("<html>502</html>"), None);
        assert_eq!(ErrorBody::message_from(r#"{"message":""}"#), None);
    }

    #[test]
    fn test_token_debug_redacts() {
        let token = TokenResponse {
            access_token: "abc.def.ghi".to_string(),
            refresh_token: None,
        };
        assert!(!format!("{token:?}").contains("abc.def.ghi"));
    }
}
