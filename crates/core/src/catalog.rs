//! Catalog and identity payloads served by the external REST API.
//!
//! These are read-only to the storefront: they are deserialized verbatim from
//! the API and never mutated locally. Unknown fields (slugs, timestamps,
//! nested category objects) are ignored.

use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, Price, ProductId, UserId};

/// A product as listed by `GET /products` and `GET /products/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    /// Image URLs, primary image first.
    #[serde(default)]
    pub images: Vec<String>,
}

impl Product {
    /// The first image URL, if any.
    ///
    /// Some catalog entries carry their image list as a stringified JSON
    /// array (`["[\"https://...\"]"]`); the brackets and quotes are stripped.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images
            .first()
            .map(|url| url.trim_matches(|c| matches!(c, '[' | ']' | '"')))
            .filter(|url| !url.is_empty())
    }
}

/// A product category from `GET /categories`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A user profile from `GET /users/{id}` or `GET /auth/profile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_ignores_unknown_fields() {
        let json = r#"{
            "id": 4,
            "title": "Classic Grey Hoodie",
            "slug": "classic-grey-hoodie",
            "price": 90,
            "description": "Soft and warm",
            "category": {"id": 1, "name": "Clothes"},
            "images": ["https://i.imgur.com/a.jpeg", "https://i.imgur.com/b.jpeg"],
            "creationAt": "2024-01-01T00:00:00.000Z"
        }"#;

        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, ProductId::new(4));
        assert_eq!(product.price, Price::from_dollars(90));
        assert_eq!(product.primary_image(), Some("https://i.imgur.com/a.jpeg"));
    }

    #[test]
    fn test_primary_image_strips_stringified_array() {
        let product = Product {
            id: ProductId::new(1),
            title: "Cap".to_string(),
            description: String::new(),
            price: Price::from_dollars(10),
            images: vec!["[\"https://i.imgur.com/cap.jpeg\"".to_string()],
        };
        assert_eq!(product.primary_image(), Some("https://i.imgur.com/cap.jpeg"));
    }

    #[test]
    fn test_primary_image_missing() {
        let product = Product {
            id: ProductId::new(1),
            title: "Cap".to_string(),
            description: String::new(),
            price: Price::from_dollars(10),
            images: Vec::new(),
        };
        assert_eq!(product.primary_image(), None);
    }

    #[test]
    fn test_user_defaults_avatar() {
        let user: User =
            serde_json::from_str(r#"{"id": 1, "name": "John", "email": "john@mail.com"}"#)
                .unwrap();
        assert_eq!(user.avatar, "");
    }
}
