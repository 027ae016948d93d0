//! Tienda Storefront library.
//!
//! Client-side core of the Tienda shop: catalog browsing against the store
//! backend, a persisted cart with tax and shipping totals, login and
//! registration, checkout and order history. Front ends (the `tienda` CLI,
//! tests) drive everything through [`AppState`].
//!
//! # Modules
//!
//! - [`backend`] - HTTP client for the store backend, plus a test stub
//! - [`config`] - Environment-based configuration
//! - [`db`] - Order history repositories (local store, memory, `PostgreSQL`)
//! - [`models`] - Products, cart lines, orders and the session identity
//! - [`services`] - Auth, cart, catalog, checkout and order history logic
//! - [`storage`] - Key-value persistence for user, cart and orders
//! - [`state`] - The [`AppState`] facade

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;

pub use config::StorefrontConfig;
pub use error::{AppError, Result};
pub use state::AppState;
