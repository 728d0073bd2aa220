//! Milestone Storefront library.
//!
//! Server-rendered catalog, product detail, cart, and auth pages in front of
//! an external REST API. The cart lives in a signed browser cookie; see
//! [`storage`].
//!
//! This crate provides the storefront functionality as a library,
//! allowing it to be tested and reused.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod storage;
