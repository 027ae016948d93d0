//! Checkout and order history commands.

use secrecy::SecretString;

use tienda_storefront::AppState;
use tienda_storefront::backend::Backend;
use tienda_storefront::db::OrderRepository;
use tienda_storefront::services::checkout::CheckoutForm;
use tienda_storefront::storage::LocalStore;

use crate::error::Result;

/// Place an order for the current cart.
///
/// # Errors
///
/// Returns an error for an empty cart, an invalid form or a storage failure.
pub async fn checkout<B: Backend, S: LocalStore, R: OrderRepository>(
    state: &mut AppState<B, S, R>,
    name: String,
    address: String,
    card: String,
) -> Result<()> {
    let form = CheckoutForm {
        name,
        address,
        card_number: SecretString::from(card),
    };
    let order = state.checkout(&form).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("Order {} placed", order.id);
        println!("  items:   {}", order.item_count());
        println!("  total:   {}", order.totals.total);
        println!("  card:    {}", order.customer.card_hint);
        println!("  ship to: {}", order.customer.address);
    }
    Ok(())
}

/// List locally recorded orders.
///
/// # Errors
///
/// Returns an error when logged out or the history cannot be read.
pub async fn local<B: Backend, S: LocalStore, R: OrderRepository>(
    state: &AppState<B, S, R>,
) -> Result<()> {
    let orders = state.orders().await?;

    #[allow(clippy::print_stdout)]
    {
        if orders.is_empty() {
            println!("No orders yet");
        }
        for order in &orders {
            println!(
                "{}  {}  {:>3} item(s)  {}",
                order.id,
                order.created_at.format("%Y-%m-%d %H:%M"),
                order.item_count(),
                order.totals.total
            );
        }
    }
    Ok(())
}

/// List purchases recorded by the backend.
///
/// # Errors
///
/// Returns an error without a backend token or when the request fails.
pub async fn remote<B: Backend, S: LocalStore, R: OrderRepository>(
    state: &AppState<B, S, R>,
) -> Result<()> {
    let purchases = state.remote_purchases().await?;

    #[allow(clippy::print_stdout)]
    {
        if purchases.is_empty() {
            println!("No purchases yet");
        }
        for purchase in &purchases {
            println!(
                "#{}  {}  {}",
                purchase.id, purchase.placed_at, purchase.total
            );
            if let Some(address) = &purchase.address {
                println!("    ship to: {address}");
            }
            for item in &purchase.items {
                println!(
                    "    product {} x{} @ {}",
                    item.product_id, item.quantity, item.unit_price
                );
            }
        }
    }
    Ok(())
}
