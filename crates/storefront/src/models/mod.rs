//! Domain models for the storefront.
//!
//! - [`cart`] - cart lines, totals and the read-only cart view
//! - [`order`] - locally recorded orders and backend purchase records
//! - [`product`] - catalog products
//! - [`session`] - the logged-in identity

pub mod cart;
pub mod order;
pub mod product;
pub mod session;

pub use cart::{CartItem, CartTotals, CartView};
pub use order::{CustomerDetails, Order, RemotePurchase, RemotePurchaseItem, next_order_id};
pub use product::Product;
pub use session::{CurrentUser, SessionToken};
