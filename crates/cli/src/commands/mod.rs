//! Command implementations.
//!
//! Each module prints to stdout; errors bubble up to `main`, which logs them
//! and prints the user-facing message.

pub mod cart;
pub mod catalog;
#[cfg(feature = "postgres")]
pub mod migrate;
pub mod orders;
pub mod session;
