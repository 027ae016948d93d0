//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Login, registration and the persisted session
//! - `cart` - Cart lines and totals (subtotal, tax, shipping)
//! - `catalog` - Product listing and client-side filtering
//! - `checkout` - Form validation and order placement
//! - `orders` - Local order history

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;
