//! The cart state machine.
//!
//! A [`Cart`] is an ordered list of [`CartLineItem`]s, unique by product ID,
//! every quantity at least 1. It is persisted as one JSON value under
//! [`CART_STORAGE_KEY`] in a [`PersistentStorage`] medium (browser cookies in
//! the storefront, [`MemoryStorage`] in tests).
//!
//! [`CartStore`] is the only way to change a persisted cart. Every mutation
//! is a full read-modify-write of the stored value, so two concurrent writers
//! are last-write-wins. Unreadable stored data loads as an empty cart and is
//! overwritten by the next mutation; no store operation ever returns an error.
//! A write the medium refuses leaves the stored cart as it was, and the
//! mutation returns that stored cart.
//!
//! # Example
//!
//! ```rust
//! use milestone_core::{CartStore, MemoryStorage, Price, Product, ProductId};
//!
//! let mut storage = MemoryStorage::default();
//! let mut store = CartStore::new(&mut storage);
//!
//! let hoodie = Product {
//!     id: ProductId::new(1),
//!     title: "Hoodie".to_string(),
//!     description: String::new(),
//!     price: Price::from_dollars(90),
//!     images: Vec::new(),
//! };
//!
//! store.add_or_increment(hoodie.clone());
//! let cart = store.add_or_increment(hoodie);
//!
//! assert_eq!(cart.len(), 1);
//! assert_eq!(cart.items()[0].quantity(), 2);
//! ```

use std::collections::{HashMap, HashSet};
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::Product;
use crate::types::{Price, ProductId};

/// Storage key holding the serialized cart.
pub const CART_STORAGE_KEY: &str = "cart";

/// Reasons a stored cart could not be read.
///
/// Never returned by [`CartStore`]; surfaced only by [`Cart::from_json`] and
/// `Cart::try_from`.
#[derive(Debug, Error)]
pub enum CartError {
    /// Not valid JSON, or a line item is missing fields or has quantity 0.
    #[error("malformed cart data: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Two line items share a product ID.
    #[error("duplicate line item for product {0}")]
    DuplicateProduct(ProductId),
}

// =============================================================================
// Line Items
// =============================================================================

/// A product in the cart with its quantity.
///
/// Serialized as the product's fields followed by `quantity`:
/// `{"id":1,"title":"...","description":"...","price":100,"images":[...],"quantity":2}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    #[serde(flatten)]
    pub product: Product,
    quantity: NonZeroU32,
}

impl CartLineItem {
    /// A new line item with quantity 1.
    #[must_use]
    pub const fn new(product: Product) -> Self {
        Self {
            product,
            quantity: NonZeroU32::MIN,
        }
    }

    /// The product identifier this line item is keyed by.
    #[must_use]
    pub const fn id(&self) -> ProductId {
        self.product.id
    }

    /// Quantity, always at least 1.
    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity.get()
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price.times(self.quantity())
    }
}

// =============================================================================
// Cart
// =============================================================================

/// An ordered collection of line items, unique by product ID.
///
/// Serialized as a JSON array of line items. Parse with [`Cart::from_json`],
/// which also enforces uniqueness.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(into = "Vec<CartLineItem>")]
pub struct Cart {
    items: Vec<CartLineItem>,
}

impl TryFrom<Vec<CartLineItem>> for Cart {
    type Error = CartError;

    fn try_from(items: Vec<CartLineItem>) -> Result<Self, Self::Error> {
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if !seen.insert(item.id()) {
                return Err(CartError::DuplicateProduct(item.id()));
            }
        }
        Ok(Self { items })
    }
}

impl From<Cart> for Vec<CartLineItem> {
    fn from(cart: Cart) -> Self {
        cart.items
    }
}

impl Cart {
    /// Parse a stored cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the JSON is malformed, a quantity is below 1,
    /// or a product ID appears twice.
    pub fn from_json(raw: &str) -> Result<Self, CartError> {
        let items: Vec<CartLineItem> = serde_json::from_str(raw)?;
        Self::try_from(items)
    }

    /// Serialize for storage.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Malformed` if a price cannot be represented as a
    /// JSON number.
    pub fn to_json(&self) -> Result<String, CartError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    /// Number of distinct line items (not the sum of quantities).
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The line item for a product, if present.
    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&CartLineItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Sum of all quantities.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, item| acc.saturating_add(item.quantity()))
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items.iter().map(CartLineItem::line_total).sum()
    }

    fn get_mut(&mut self, id: ProductId) -> Option<&mut CartLineItem> {
        self.items.iter_mut().find(|item| item.id() == id)
    }

    /// Identity-merge: bump the existing line for `product.id` (other fields
    /// untouched) or append a new line with quantity 1.
    fn add_or_increment(&mut self, product: Product) {
        match self.get_mut(product.id) {
            Some(item) => item.quantity = item.quantity.saturating_add(1),
            None => self.items.push(CartLineItem::new(product)),
        }
    }

    fn increment(&mut self, id: ProductId) {
        if let Some(item) = self.get_mut(id) {
            item.quantity = item.quantity.saturating_add(1);
        }
    }

    /// Quantity floors at 1; removal is a separate action.
    fn decrement(&mut self, id: ProductId) {
        if let Some(item) = self.get_mut(id)
            && let Some(lower) = NonZeroU32::new(item.quantity.get() - 1)
        {
            item.quantity = lower;
        }
    }

    fn remove(&mut self, id: ProductId) {
        self.items.retain(|item| item.id() != id);
    }
}

// =============================================================================
// Storage
// =============================================================================

/// A write the storage medium refused.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The value does not fit the medium's quota. Nothing was written.
    #[error("{size} bytes for {key} exceed the storage quota of {limit} bytes")]
    QuotaExceeded {
        key: String,
        size: usize,
        limit: usize,
    },
}

/// A string key/value medium that survives between requests.
///
/// Like browser storage, a medium has a quota; a refused write leaves the
/// previous value in place.
pub trait PersistentStorage {
    /// Read the value stored under `key`.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::QuotaExceeded` if the value does not fit, in
    /// which case the previous value is kept.
    fn set_item(&mut self, key: &str, value: String) -> Result<(), StorageError>;

    /// Delete `key`. Deleting an absent key is a no-op.
    fn remove_item(&mut self, key: &str);
}

/// In-process [`PersistentStorage`], unlimited unless built with a quota.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStorage {
    /// Storage pre-populated with one entry.
    #[must_use]
    pub fn with_item(key: &str, value: impl Into<String>) -> Self {
        let mut storage = Self::default();
        storage.items.insert(key.to_owned(), value.into());
        storage
    }

    /// Storage refusing any single value longer than `bytes`.
    #[must_use]
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            quota: Some(bytes),
            ..Self::default()
        }
    }
}

impl PersistentStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        if let Some(limit) = self.quota
            && value.len() > limit
        {
            return Err(StorageError::QuotaExceeded {
                key: key.to_owned(),
                size: value.len(),
                limit,
            });
        }
        self.items.insert(key.to_owned(), value);
        Ok(())
    }

    fn remove_item(&mut self, key: &str) {
        self.items.remove(key);
    }
}

// =============================================================================
// CartStore
// =============================================================================

/// Sole authority for reading, merging, and persisting the cart.
///
/// Mutations return the cart exactly as persisted so views can re-render
/// from it instead of recomputing locally. When the medium refuses the
/// write, that is the cart from before the mutation.
pub struct CartStore<'s, S: PersistentStorage + ?Sized> {
    storage: &'s mut S,
}

impl<'s, S: PersistentStorage + ?Sized> CartStore<'s, S> {
    pub const fn new(storage: &'s mut S) -> Self {
        Self { storage }
    }

    /// The persisted cart, or an empty cart if nothing readable is stored.
    #[must_use]
    pub fn load(&self) -> Cart {
        let Some(raw) = self.storage.get_item(CART_STORAGE_KEY) else {
            return Cart::default();
        };

        Cart::from_json(&raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Discarding unreadable stored cart");
            Cart::default()
        })
    }

    /// Add one unit of `product`, merging by product ID.
    pub fn add_or_increment(&mut self, product: Product) -> Cart {
        self.mutate(|cart| cart.add_or_increment(product))
    }

    /// Add one unit to an existing line item. Unknown IDs are ignored.
    pub fn increment(&mut self, id: ProductId) -> Cart {
        self.mutate(|cart| cart.increment(id))
    }

    /// Remove one unit from an existing line item, never going below 1.
    pub fn decrement(&mut self, id: ProductId) -> Cart {
        self.mutate(|cart| cart.decrement(id))
    }

    /// Delete a line item regardless of quantity. Unknown IDs are ignored.
    pub fn remove(&mut self, id: ProductId) -> Cart {
        self.mutate(|cart| cart.remove(id))
    }

    /// Reset the cart to empty.
    pub fn clear(&mut self) -> Cart {
        self.storage.remove_item(CART_STORAGE_KEY);
        Cart::default()
    }

    /// Number of distinct line items persisted.
    #[must_use]
    pub fn count(&self) -> usize {
        self.load().len()
    }

    fn mutate(&mut self, apply: impl FnOnce(&mut Cart)) -> Cart {
        let mut cart = self.load();
        apply(&mut cart);

        let json = match cart.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize cart");
                return self.load();
            }
        };

        match self.storage.set_item(CART_STORAGE_KEY, json) {
            Ok(()) => cart,
            Err(e) => {
                tracing::warn!(error = %e, "Cart not saved, keeping the stored cart");
                self.load()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn product(id: i32, dollars: u32) -> Product {
        Product {
            id: ProductId::new(id),
            title: format!("Product {id}"),
            description: format!("Description {id}"),
            price: Price::from_dollars(dollars),
            images: vec!["https://via.placeholder.com/150".to_string()],
        }
    }

    fn stored(storage: &MemoryStorage) -> serde_json::Value {
        serde_json::from_str(&storage.get_item(CART_STORAGE_KEY).unwrap()).unwrap()
    }

    #[test]
    fn test_load_without_stored_value_is_empty() {
        let mut storage = MemoryStorage::default();
        let store = CartStore::new(&mut storage);
        assert!(store.load().is_empty());
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_add_new_product_persists_quantity_one() {
        let mut storage = MemoryStorage::default();
        let cart = CartStore::new(&mut storage).add_or_increment(product(1, 100));

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items()[0].quantity(), 1);
        assert_eq!(
            storage.get_item(CART_STORAGE_KEY).unwrap(),
            r#"[{"id":1,"title":"Product 1","description":"Description 1","price":100,"images":["https://via.placeholder.com/150"],"quantity":1}]"#
        );
    }

    #[test]
    fn test_add_existing_product_merges_by_id() {
        let mut storage = MemoryStorage::with_item(
            CART_STORAGE_KEY,
            r#"[{"id":1,"title":"Product 1","description":"Description 1","price":100,"images":["https://via.placeholder.com/150"],"quantity":1}]"#,
        );

        let cart = CartStore::new(&mut storage).add_or_increment(product(1, 100));

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items()[0].quantity(), 2);
        let json = stored(&storage);
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["quantity"], 2);
    }

    #[test]
    fn test_merge_matches_identity_not_structure() {
        let mut storage = MemoryStorage::default();
        let mut store = CartStore::new(&mut storage);
        store.add_or_increment(product(1, 100));

        // Same ID, different title and price: still the same line item.
        let mut changed = product(1, 250);
        changed.title = "Renamed".to_string();
        let cart = store.add_or_increment(changed);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items()[0].quantity(), 2);
        assert_eq!(cart.items()[0].product.title, "Product 1");
        assert_eq!(cart.items()[0].product.price, Price::from_dollars(100));
    }

    #[test]
    fn test_insertion_order_is_preserved() {
        let mut storage = MemoryStorage::default();
        let mut store = CartStore::new(&mut storage);
        store.add_or_increment(product(3, 1));
        store.add_or_increment(product(1, 1));
        let cart = store.add_or_increment(product(3, 1));

        let ids: Vec<i32> = cart.items().iter().map(|i| i.id().as_i32()).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn test_increment_and_decrement() {
        let mut storage = MemoryStorage::default();
        let mut store = CartStore::new(&mut storage);
        store.add_or_increment(product(1, 10));

        let cart = store.increment(ProductId::new(1));
        assert_eq!(cart.get(ProductId::new(1)).unwrap().quantity(), 2);

        let cart = store.decrement(ProductId::new(1));
        assert_eq!(cart.get(ProductId::new(1)).unwrap().quantity(), 1);
    }

    #[test]
    fn test_decrement_floors_at_one() {
        let mut storage = MemoryStorage::default();
        let mut store = CartStore::new(&mut storage);
        store.add_or_increment(product(1, 10));

        let cart = store.decrement(ProductId::new(1));
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items()[0].quantity(), 1);
        assert_eq!(stored(&storage)[0]["quantity"], 1);
    }

    #[test]
    fn test_increment_unknown_id_is_noop() {
        let mut storage = MemoryStorage::default();
        let mut store = CartStore::new(&mut storage);
        let before = store.add_or_increment(product(1, 10));
        let after = store.increment(ProductId::new(99));
        assert_eq!(before, after);
    }

    #[test]
    fn test_remove_deletes_regardless_of_quantity() {
        let mut storage = MemoryStorage::default();
        let mut store = CartStore::new(&mut storage);
        store.add_or_increment(product(1, 10));
        store.add_or_increment(product(1, 10));
        store.add_or_increment(product(2, 10));

        let cart = store.remove(ProductId::new(1));
        assert_eq!(cart.len(), 1);
        assert!(cart.get(ProductId::new(1)).is_none());
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut storage = MemoryStorage::default();
        let mut store = CartStore::new(&mut storage);
        let before = store.add_or_increment(product(1, 10));
        let after = store.remove(ProductId::new(42));
        assert_eq!(before, after);
    }

    #[test]
    fn test_count_is_distinct_items_not_quantity() {
        let mut storage = MemoryStorage::default();
        let mut store = CartStore::new(&mut storage);
        for _ in 0..3 {
            store.add_or_increment(product(1, 10));
        }
        for _ in 0..5 {
            store.add_or_increment(product(2, 10));
        }

        assert_eq!(store.count(), 2);
        assert_eq!(store.load().total_quantity(), 8);
    }

    #[test]
    fn test_clear_resets_to_empty() {
        let mut storage = MemoryStorage::default();
        let mut store = CartStore::new(&mut storage);
        store.add_or_increment(product(1, 10));

        assert!(store.clear().is_empty());
        assert_eq!(store.count(), 0);
        assert!(storage.get_item(CART_STORAGE_KEY).is_none());
    }

    #[test]
    fn test_corrupt_data_loads_empty_and_self_heals() {
        let mut storage = MemoryStorage::with_item(CART_STORAGE_KEY, "{not json");
        let mut store = CartStore::new(&mut storage);

        assert!(store.load().is_empty());
        let cart = store.add_or_increment(product(5, 10));
        assert_eq!(cart.len(), 1);
        assert_eq!(stored(&storage)[0]["id"], 5);
    }

    #[test]
    fn test_zero_quantity_is_unreadable() {
        let mut storage = MemoryStorage::with_item(
            CART_STORAGE_KEY,
            r#"[{"id":1,"title":"A","description":"","price":1,"images":[],"quantity":0}]"#,
        );
        assert!(CartStore::new(&mut storage).load().is_empty());
    }

    #[test]
    fn test_duplicate_ids_are_unreadable() {
        let raw = r#"[
            {"id":1,"title":"A","description":"","price":1,"images":[],"quantity":1},
            {"id":1,"title":"A","description":"","price":1,"images":[],"quantity":2}
        ]"#;
        assert!(matches!(
            Cart::from_json(raw),
            Err(CartError::DuplicateProduct(id)) if id == ProductId::new(1)
        ));
        assert!(matches!(
            Cart::from_json("{not json"),
            Err(CartError::Malformed(_))
        ));

        let mut storage = MemoryStorage::with_item(CART_STORAGE_KEY, raw);
        assert!(CartStore::new(&mut storage).load().is_empty());
    }

    #[test]
    fn test_refused_write_keeps_stored_cart() {
        let mut storage = MemoryStorage::with_quota(200);
        let mut store = CartStore::new(&mut storage);

        let first = store.add_or_increment(product(1, 10));
        assert_eq!(first.len(), 1);

        // A second line item no longer fits.
        let second = store.add_or_increment(product(2, 10));
        assert_eq!(second, first);
        assert_eq!(store.load(), first);
        assert_eq!(store.count(), 1);

        // Growing a quantity still fits.
        let bumped = store.increment(ProductId::new(1));
        assert_eq!(bumped.items()[0].quantity(), 2);
        assert_eq!(stored(&storage)[0]["quantity"], 2);
    }

    #[test]
    fn test_line_totals_and_subtotal() {
        let mut storage = MemoryStorage::default();
        let mut store = CartStore::new(&mut storage);
        store.add_or_increment(product(1, 10));
        store.add_or_increment(product(1, 10));
        let cart = store.add_or_increment(product(2, 5));

        assert_eq!(cart.items()[0].line_total(), Price::from_dollars(20));
        assert_eq!(cart.subtotal(), Price::from_dollars(25));
    }
}
