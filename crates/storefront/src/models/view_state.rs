//! Loading/error/content state for views backed by a remote fetch.

use std::fmt::Display;

/// Exactly one of loading, failed, or loaded.
///
/// Replaces parallel `loading`/`error` flags so a view can never be loading
/// and failed at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState<T> {
    /// Fetch in flight.
    Loading,
    /// Fetch failed; holds the message shown to the visitor.
    Error(String),
    /// Fetch succeeded.
    Ready(T),
}

impl<T> ViewState<T> {
    /// Convert a fetch result, logging the underlying error and replacing it
    /// with `message` for display.
    pub fn from_result<E: Display>(result: Result<T, E>, message: &str) -> Self {
        match result {
            Ok(value) => Self::Ready(value),
            Err(e) => {
                tracing::warn!(error = %e, "{message}");
                Self::Error(message.to_string())
            }
        }
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// The error message, if failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }

    /// The loaded value, if ready.
    #[must_use]
    pub const fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ViewState<U> {
        match self {
            Self::Loading => ViewState::Loading,
            Self::Error(message) => ViewState::Error(message),
            Self::Ready(value) => ViewState::Ready(f(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_result() {
        let ok: ViewState<u8> = ViewState::from_result(Ok::<_, String>(3), "unused");
        assert_eq!(ok, ViewState::Ready(3));

        let failed: ViewState<u8> =
            ViewState::from_result(Err("connection refused"), "Error fetching products.");
        assert_eq!(failed.error(), Some("Error fetching products."));
        assert!(failed.ready().is_none());
    }

    #[test]
    fn test_states_are_exclusive() {
        let loading: ViewState<u8> = ViewState::Loading;
        assert!(loading.is_loading());
        assert!(loading.error().is_none());
        assert!(loading.ready().is_none());
    }

    #[test]
    fn test_map_preserves_state() {
        assert_eq!(ViewState::Ready(2).map(|n| n * 2), ViewState::Ready(4));
        assert_eq!(
            ViewState::<u8>::Error("x".into()).map(|n| n * 2),
            ViewState::Error("x".into())
        );
    }
}
