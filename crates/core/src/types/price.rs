//! Type-safe price representation using decimal arithmetic.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors that can occur when constructing a [`Price`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    /// Prices are never negative.
    #[error("price cannot be negative: {0}")]
    Negative(Decimal),
}

/// A non-negative price in the store's currency (dollars).
///
/// Serialized as a plain JSON number, matching the external catalog API:
/// whole amounts become integers (`100`), fractional amounts floats (`44.99`).
/// Deserialization accepts numbers or numeric strings and rejects negatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(Decimal);

impl Price {
    /// A price of zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new price.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` for amounts below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self(amount))
    }

    /// Create a price from a whole number of dollars.
    #[must_use]
    pub fn from_dollars(dollars: u32) -> Self {
        Self(Decimal::from(dollars))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Compact display without trailing zeros (e.g., "$100", "$44.9").
    #[must_use]
    pub fn display(&self) -> String {
        format!("${}", self.0.normalize())
    }

    /// Display with exactly two decimal places (e.g., "$100.00").
    #[must_use]
    pub fn display_fixed(&self) -> String {
        format!("${:.2}", self.0.round_dp(2))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let normalized = self.0.normalize();
        if normalized.fract().is_zero()
            && let Some(whole) = normalized.to_u64()
        {
            return serializer.serialize_u64(whole);
        }
        match normalized.to_f64() {
            Some(value) => serializer.serialize_f64(value),
            None => Err(serde::ser::Error::custom(format!(
                "price {normalized} is not representable as a number"
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_rejected() {
        assert!(matches!(
            Price::new(Decimal::new(-1, 0)),
            Err(PriceError::Negative(_))
        ));
        assert!(Price::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_display() {
        let price = Price::from_dollars(100);
        assert_eq!(price.display(), "$100");
        assert_eq!(price.display_fixed(), "$100.00");

        let price = Price::new(Decimal::new(4499, 2)).unwrap();
        assert_eq!(price.to_string(), "$44.99");
        assert_eq!(price.display_fixed(), "$44.99");
    }

    #[test]
    fn test_times_and_sum() {
        let price = Price::new(Decimal::new(1050, 2)).unwrap();
        assert_eq!(price.times(3).display_fixed(), "$31.50");

        let total: Price = [Price::from_dollars(1), Price::from_dollars(2)]
            .into_iter()
            .sum();
        assert_eq!(total, Price::from_dollars(3));
    }

    #[test]
    fn test_serializes_as_json_number() {
        assert_eq!(serde_json::to_string(&Price::from_dollars(100)).unwrap(), "100");
        let fractional = Price::new(Decimal::new(4499, 2)).unwrap();
        assert_eq!(serde_json::to_string(&fractional).unwrap(), "44.99");
    }

    #[test]
    fn test_deserializes_numbers_and_strings() {
        let price: Price = serde_json::from_str("100").unwrap();
        assert_eq!(price, Price::from_dollars(100));

        let price: Price = serde_json::from_str("44.99").unwrap();
        assert_eq!(price.display(), "$44.99");

        let price: Price = serde_json::from_str("\"12.50\"").unwrap();
        assert_eq!(price.display_fixed(), "$12.50");
    }

    #[test]
    fn test_deserialize_negative_fails() {
        assert!(serde_json::from_str::<Price>("-5").is_err());
    }
}
