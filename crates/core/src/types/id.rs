//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types.

use thiserror::Error;

/// Errors that can occur when parsing an ID from untrusted text (route
/// segments, query strings).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The input is empty.
    #[error("identifier is missing")]
    Missing,
    /// The input is not an integer.
    #[error("identifier is not a number: {0}")]
    NotANumber(String),
    /// The input is zero or negative.
    #[error("identifier must be positive, got {0}")]
    NotPositive(i64),
}

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i32` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_i32()`
/// - `From<i32>` and `Into<i32>` implementations
/// - `FromStr` accepting only well-formed positive integers
///
/// # Example
///
/// ```rust
/// # use milestone_core::define_id;
/// define_id!(OrderId);
/// define_id!(ReviewId);
///
/// let order_id = OrderId::new(1);
/// let review_id: ReviewId = "7".parse().unwrap();
///
/// // These are different types, so this won't compile:
/// // let _: OrderId = review_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Create a new ID from an i32 value.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// Get the underlying i32 value.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::types::id::IdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                $crate::types::id::parse_positive(s).map(Self)
            }
        }
    };
}

/// Parse a well-formed positive `i32`.
///
/// Leading/trailing whitespace, signs, decimal points, and anything beyond
/// `i32::MAX` are rejected.
///
/// # Errors
///
/// Returns `IdError` describing why the input is not a usable identifier.
pub fn parse_positive(s: &str) -> Result<i32, IdError> {
    if s.is_empty() {
        return Err(IdError::Missing);
    }

    if !s.bytes().all(|b| b.is_ascii_digit()) {
        // Distinguish "-3" (a number, just not positive) from "abc"
        return match s.parse::<i64>() {
            Ok(n) if n <= 0 => Err(IdError::NotPositive(n)),
            _ => Err(IdError::NotANumber(s.to_owned())),
        };
    }

    let value = s
        .parse::<i32>()
        .map_err(|_| IdError::NotANumber(s.to_owned()))?;

    if value == 0 {
        return Err(IdError::NotPositive(0));
    }

    Ok(value)
}

define_id!(ProductId);
define_id!(CategoryId);
define_id!(UserId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_id() {
        let id: ProductId = "42".parse().unwrap();
        assert_eq!(id, ProductId::new(42));
        assert_eq!(id.as_i32(), 42);
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!("".parse::<ProductId>(), Err(IdError::Missing));
    }

    #[test]
    fn test_parse_not_a_number() {
        assert!(matches!(
            "abc".parse::<ProductId>(),
            Err(IdError::NotANumber(_))
        ));
        assert!(matches!(
            "1.5".parse::<ProductId>(),
            Err(IdError::NotANumber(_))
        ));
        assert!(matches!(
            " 7".parse::<ProductId>(),
            Err(IdError::NotANumber(_))
        ));
    }

    #[test]
    fn test_parse_not_positive() {
        assert_eq!("0".parse::<ProductId>(), Err(IdError::NotPositive(0)));
        assert_eq!("-3".parse::<ProductId>(), Err(IdError::NotPositive(-3)));
    }

    #[test]
    fn test_parse_overflow() {
        assert!(matches!(
            "99999999999".parse::<ProductId>(),
            Err(IdError::NotANumber(_))
        ));
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&CategoryId::new(5)).unwrap();
        assert_eq!(json, "5");
        let parsed: UserId = serde_json::from_str("12").unwrap();
        assert_eq!(parsed, UserId::new(12));
    }

    #[test]
    fn test_display() {
        assert_eq!(UserId::new(9).to_string(), "9");
    }
}
