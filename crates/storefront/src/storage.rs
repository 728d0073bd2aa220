//! Browser-cookie storage.
//!
//! `ClientStorage` is the storefront's [`PersistentStorage`]: each key holds
//! a base64url-encoded payload in signed cookies. The visitor's browser holds
//! the cart and credential; the server keeps nothing between requests.
//!
//! A payload too long for one cookie is split across `key`, `key.1`,
//! `key.2`, ... so that every `Set-Cookie` stays under the browser's
//! per-cookie limit. Each piece is signed on its own; a missing or tampered
//! piece makes the whole value unreadable. A payload that would need more
//! than [`MAX_CHUNKS`] cookies is refused and the stored value is kept.
//!
//! Extract it in a handler, mutate through [`CartStore`] or the credential
//! helpers, and return it alongside the response so the changed cookies are
//! written back:
//!
//! ```rust,ignore
//! async fn handler(mut storage: ClientStorage) -> impl IntoResponse {
//!     let cart = storage.cart_store().increment(ProductId::new(1));
//!     (storage, CartItemsTemplate::from(&cart))
//! }
//! ```

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{
        HeaderMap, HeaderValue,
        header::{COOKIE, SET_COOKIE},
        request::Parts,
    },
    response::{IntoResponseParts, ResponseParts},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use cookie::{Cookie, CookieJar, Key, SameSite, time::Duration};

use milestone_core::{CartStore, PersistentStorage, StorageError};

use crate::models::{SessionCredential, keys};
use crate::state::AppState;

/// Browsers reject cookies larger than this.
pub const MAX_COOKIE_BYTES: usize = 4096;

/// Encoded payload characters per cookie. The rest of the budget covers the
/// name, the signature and the attributes.
const CHUNK_CHARS: usize = 3800;

/// Most cookies a single key may span.
pub const MAX_CHUNKS: usize = 6;

/// Lifetime of persistent keys such as the cart.
const PERSISTENT_DAYS: i64 = 365;

/// Signed-cookie storage for one request/response cycle.
pub struct ClientStorage {
    jar: CookieJar,
    key: Key,
    secure: bool,
}

impl ClientStorage {
    /// Load every cookie sent with the request.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap, key: Key, secure: bool) -> Self {
        let mut jar = CookieJar::new();

        for header in headers.get_all(COOKIE) {
            let Ok(value) = header.to_str() else {
                continue;
            };
            for cookie in Cookie::split_parse_encoded(value.to_owned()).flatten() {
                jar.add_original(cookie.into_owned());
            }
        }

        Self { jar, key, secure }
    }

    /// The cart store backed by this storage.
    pub const fn cart_store(&mut self) -> CartStore<'_, Self> {
        CartStore::new(self)
    }

    /// The logged-in credential, if a valid one was sent.
    #[must_use]
    pub fn credential(&self) -> Option<SessionCredential> {
        let raw = self.get_item(keys::AUTH_TOKEN)?;
        serde_json::from_str(&raw)
            .inspect_err(|e| tracing::warn!(error = %e, "Ignoring unreadable credential"))
            .ok()
    }

    /// Store the credential for the rest of the browser session.
    pub fn set_credential(&mut self, credential: &SessionCredential) {
        let json = match serde_json::to_string(credential) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize credential");
                return;
            }
        };
        if let Err(e) = self.write(keys::AUTH_TOKEN, &json, false) {
            tracing::error!(error = %e, "Failed to store credential");
        }
    }

    /// Forget the credential (logout).
    pub fn clear_credential(&mut self) {
        self.remove_item(keys::AUTH_TOKEN);
    }

    fn write(&mut self, key: &str, value: &str, persistent: bool) -> Result<(), StorageError> {
        let encoded = URL_SAFE_NO_PAD.encode(value);
        // base64url is ASCII, so byte chunks are valid strings.
        let mut chunks: Vec<&str> = encoded
            .as_bytes()
            .chunks(CHUNK_CHARS)
            .filter_map(|chunk| std::str::from_utf8(chunk).ok())
            .collect();
        if chunks.is_empty() {
            chunks.push("");
        }

        if chunks.len() > MAX_CHUNKS {
            return Err(StorageError::QuotaExceeded {
                key: key.to_owned(),
                size: encoded.len(),
                limit: CHUNK_CHARS * MAX_CHUNKS,
            });
        }

        for (index, chunk) in chunks.iter().enumerate() {
            let mut builder = Cookie::build((chunk_name(key, index), (*chunk).to_owned()))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .secure(self.secure);
            if persistent {
                builder = builder.max_age(Duration::days(PERSISTENT_DAYS));
            }
            self.jar.signed_mut(&self.key).add(builder.build());
        }

        // Drop pieces left over from a longer previous value.
        self.remove_chunks(key, chunks.len());
        if chunks.len() > 1 {
            tracing::debug!(key, cookies = chunks.len(), "Stored value split across cookies");
        }
        Ok(())
    }

    fn remove_chunks(&mut self, key: &str, from: usize) {
        for index in from..MAX_CHUNKS {
            let name = chunk_name(key, index);
            if self.jar.get(&name).is_some() {
                self.jar.remove(Cookie::build((name, "")).path("/").build());
            }
        }
    }

    fn read_chunk(&self, name: &str) -> Option<String> {
        let cookie = self.jar.signed(&self.key).get(name);
        if cookie.is_none() {
            tracing::warn!(key = name, "Ignoring cookie with invalid signature");
        }
        cookie.map(|cookie| cookie.value().to_owned())
    }
}

/// Cookie name of the `index`th piece of `key`.
fn chunk_name(key: &str, index: usize) -> String {
    if index == 0 {
        key.to_owned()
    } else {
        format!("{key}.{index}")
    }
}

impl PersistentStorage for ClientStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.jar.get(key)?;

        let mut encoded = String::new();
        for index in 0..MAX_CHUNKS {
            let name = chunk_name(key, index);
            if self.jar.get(&name).is_none() {
                break;
            }
            encoded.push_str(&self.read_chunk(&name)?);
        }

        URL_SAFE_NO_PAD
            .decode(encoded)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .or_else(|| {
                tracing::warn!(key, "Ignoring cookie with undecodable value");
                None
            })
    }

    fn set_item(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.write(key, &value, true)
    }

    fn remove_item(&mut self, key: &str) {
        self.jar
            .remove(Cookie::build((key.to_owned(), "")).path("/").build());
        self.remove_chunks(key, 1);
    }
}

impl FromRequestParts<AppState> for ClientStorage {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(
            &parts.headers,
            state.cookie_key().clone(),
            state.config().secure_cookies(),
        ))
    }
}

impl IntoResponseParts for ClientStorage {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        for cookie in self.jar.delta() {
            match HeaderValue::from_str(&cookie.encoded().to_string()) {
                Ok(value) => {
                    res.headers_mut().append(SET_COOKIE, value);
                }
                Err(e) => tracing::error!(error = %e, name = cookie.name(), "Invalid Set-Cookie value"),
            }
        }
        Ok(res)
    }
}
