//! Milestone Core - Shared types and the cart state machine.
//!
//! This crate provides the domain types used by the storefront:
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, and emails
//! - [`catalog`] - Products, categories, and users as served by the external API
//! - [`cart`] - Cart line items and the [`CartStore`] that owns every cart mutation
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients.
//! Persistence is abstracted behind [`PersistentStorage`], so the cart rules
//! can be exercised against [`MemoryStorage`] in tests and against browser
//! cookies in the storefront.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod types;

pub use cart::{
    CART_STORAGE_KEY, Cart, CartError, CartLineItem, CartStore, MemoryStorage, PersistentStorage,
    StorageError,
};
pub use catalog::{Category, Product, User};
pub use types::*;
