//! Cart commands.

use tienda_core::{ItemId, ProductId, Quantity};
use tienda_storefront::backend::Backend;
use tienda_storefront::db::OrderRepository;
use tienda_storefront::models::CartView;
use tienda_storefront::services::cart::CartError;
use tienda_storefront::storage::LocalStore;
use tienda_storefront::{AppError, AppState};

use crate::error::Result;

/// Print the cart.
///
/// # Errors
///
/// Returns an error when logged out.
pub fn show<B: Backend, S: LocalStore, R: OrderRepository>(
    state: &AppState<B, S, R>,
) -> Result<()> {
    print_view(&state.cart_view()?);
    Ok(())
}

/// Add units of a catalog product.
///
/// # Errors
///
/// Returns an error for a zero quantity, an unknown product or missing stock.
pub async fn add<B: Backend, S: LocalStore, R: OrderRepository>(
    state: &mut AppState<B, S, R>,
    id: i64,
    quantity: u32,
) -> Result<()> {
    let quantity = Quantity::new(quantity).map_err(|e| AppError::from(CartError::from(e)))?;
    let view = state.add_product(ProductId::new(id), quantity).await?;
    print_view(&view);
    Ok(())
}

/// Set a line's quantity.
///
/// # Errors
///
/// Returns an error when logged out or the quantity is out of range.
pub fn set<B: Backend, S: LocalStore, R: OrderRepository>(
    state: &mut AppState<B, S, R>,
    id: &str,
    quantity: i64,
) -> Result<()> {
    let view = state.update_quantity(&ItemId::parse(id), quantity)?;
    print_view(&view);
    Ok(())
}

/// Remove a line.
///
/// # Errors
///
/// Returns an error when logged out or the cart cannot be saved.
pub fn remove<B: Backend, S: LocalStore, R: OrderRepository>(
    state: &mut AppState<B, S, R>,
    id: &str,
) -> Result<()> {
    let view = state.remove_item(&ItemId::parse(id))?;
    print_view(&view);
    Ok(())
}

/// Empty the cart.
///
/// # Errors
///
/// Returns an error when logged out or the cart cannot be saved.
pub fn clear<B: Backend, S: LocalStore, R: OrderRepository>(
    state: &mut AppState<B, S, R>,
) -> Result<()> {
    print_view(&state.clear_cart()?);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_view(view: &CartView) {
    print!("{}", render(view));
}

/// Cart lines followed by the totals block.
fn render(view: &CartView) -> String {
    use std::fmt::Write as _;

    if view.is_empty() {
        return "Cart is empty\n".to_owned();
    }

    let mut out = String::new();
    for item in &view.items {
        let _ = writeln!(
            out,
            "{:>5}  {:<32} {:>3} x {:>10} = {:>10}",
            item.id.to_string(),
            item.name,
            item.quantity.to_string(),
            item.price.to_string(),
            item.line_total().map_or_else(String::new, |total| total.to_string())
        );
    }
    let totals = &view.totals;
    let _ = writeln!(out, "{:>56} {:>10}", "Subtotal:", totals.subtotal.to_string());
    let _ = writeln!(out, "{:>56} {:>10}", "Tax:", totals.tax.to_string());
    let _ = writeln!(out, "{:>56} {:>10}", "Shipping:", totals.shipping.to_string());
    let _ = writeln!(out, "{:>56} {:>10}", "Total:", totals.total.to_string());
    let _ = writeln!(out, "{} item(s)", view.item_count);
    out
}
