//! End-to-end storefront flows over a file-backed data directory.
//!
//! The backend is the in-process stub; everything else (state, file store,
//! order history) is the real thing. "Restart" means building a new
//! `AppState` over the same directory.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use chrono::{TimeZone, Utc};
use secrecy::SecretString;

use tienda_core::{Category, ItemId, OrderId, Price, ProductId, Quantity};
use tienda_integration_tests::{EMAIL, TestContext, email};
use tienda_storefront::AppError;
use tienda_storefront::backend::StubBackend;
use tienda_storefront::config::CartOnLoad;
use tienda_storefront::models::{CartItem, RemotePurchase, RemotePurchaseItem};
use tienda_storefront::services::auth::AuthError;
use tienda_storefront::services::catalog::ProductFilter;
use tienda_storefront::services::checkout::{CheckoutError, CheckoutForm, Field};
use tienda_storefront::storage::{LocalStore, keys};

fn form() -> CheckoutForm {
    CheckoutForm {
        name: "Ana Pérez".to_owned(),
        address: "Av. Reforma 222, CDMX".to_owned(),
        card_number: SecretString::from("4111-1111-1111-1234".to_owned()),
    }
}

// ============================================================================
// Session
// ============================================================================

#[tokio::test]
async fn test_session_survives_restart() {
    let ctx = TestContext::new();
    let state = ctx.logged_in().await;
    assert_eq!(state.current_user().unwrap().name, EMAIL);
    drop(state);

    let restarted = ctx.state();
    let user = restarted.current_user().unwrap();
    assert_eq!(user.email, email());
    assert!(user.token.is_some());
    assert!(ctx.data_dir().join("user.json").exists());
}

#[tokio::test]
async fn test_logout_removes_session_and_gates_operations() {
    let ctx = TestContext::new();
    let mut state = ctx.logged_in().await;
    state.logout().unwrap();

    assert!(!ctx.data_dir().join("user.json").exists());
    assert!(matches!(
        state.products(&ProductFilter::new()).await,
        Err(AppError::Auth(AuthError::NotAuthenticated))
    ));
    assert!(matches!(
        state.cart_view(),
        Err(AppError::Auth(AuthError::NotAuthenticated))
    ));

    let restarted = ctx.state();
    assert!(restarted.current_user().is_none());
}

#[tokio::test]
async fn test_register_then_login() {
    let ctx = TestContext::new();
    let mut state = ctx.state();

    let user = state
        .register(
            "Luis",
            "luis@example.com",
            SecretString::from("clave".to_owned()),
        )
        .await
        .unwrap();
    assert_eq!(user.name, "Luis");
    assert!(user.token.is_none());
    assert!(matches!(
        state.remote_purchases().await,
        Err(AppError::Auth(AuthError::MissingToken))
    ));

    let err = state
        .register("Otro", EMAIL, SecretString::from("x".to_owned()))
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Registration failed");

    let user = state
        .login("luis@example.com", SecretString::from("clave".to_owned()))
        .await
        .unwrap();
    assert!(user.token.is_some());
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let ctx = TestContext::new();
    let mut state = ctx.state();
    let err = state
        .login(EMAIL, SecretString::from("nope".to_owned()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Auth(AuthError::LoginFailed(_))));
    assert_eq!(err.user_message(), "Login failed");
    assert!(state.current_user().is_none());
}

// ============================================================================
// Catalog
// ============================================================================

#[tokio::test]
async fn test_catalog_filters() {
    let ctx = TestContext::new();
    let state = ctx.logged_in().await;

    let all = state.products(&ProductFilter::new()).await.unwrap();
    assert_eq!(all.len(), 3);

    let cafe = state
        .products(&ProductFilter::new().with_query("cafe"))
        .await
        .unwrap();
    assert_eq!(cafe.len(), 1);
    assert_eq!(cafe[0].id, ProductId::new(1));

    let exact = state
        .products(&ProductFilter::new().with_query("cafe").accent_insensitive(false))
        .await
        .unwrap();
    assert!(exact.is_empty());

    let libros = state
        .products(&ProductFilter::new().with_category(Category::new("Libros").unwrap()))
        .await
        .unwrap();
    assert_eq!(libros.len(), 1);

    let categories = state.categories().await.unwrap();
    let names: Vec<&str> = categories.iter().map(Category::as_str).collect();
    assert_eq!(names, vec!["Bebidas", "Libros"]);
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let ctx = TestContext::new();
    let mut state = ctx.logged_in().await;

    let err = state.product(ProductId::new(99)).await.unwrap_err();
    assert_eq!(err.user_message(), "Not found");

    let err = state
        .add_product(ProductId::new(99), Quantity::ONE)
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Not found");
}

#[tokio::test]
async fn test_backend_outage_is_reported_generically() {
    let ctx = TestContext::new();
    let state = ctx.logged_in().await;
    ctx.backend.set_failing(true);

    let err = state.products(&ProductFilter::new()).await.unwrap_err();
    assert!(err.is_internal());
    assert_eq!(
        err.user_message(),
        "The store is unavailable, please try again later"
    );
}

// ============================================================================
// Cart
// ============================================================================

#[tokio::test]
async fn test_cart_totals_and_persistence() {
    let ctx = TestContext::new();
    let mut state = ctx.logged_in().await;

    state
        .add_product(ProductId::new(1), Quantity::ONE)
        .await
        .unwrap();
    let view = state
        .add_product(ProductId::new(1), Quantity::ONE)
        .await
        .unwrap();
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.item_count, 2);
    assert_eq!(view.totals.subtotal, Price::from_whole(200));
    assert_eq!(view.totals.tax, Price::from_whole(42));
    assert_eq!(view.totals.shipping, Price::from_whole(50));
    assert_eq!(view.totals.total, Price::from_whole(292));
    drop(state);

    let raw = ctx.store().get(keys::CART).unwrap().unwrap();
    let saved: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(saved[0]["quantity"], 2);

    let restarted = ctx.logged_in().await;
    assert_eq!(restarted.cart_view().unwrap(), view);
}

#[tokio::test]
async fn test_cart_cleared_on_load_when_configured() {
    let ctx = TestContext::new();
    let mut state = ctx.logged_in().await;
    state
        .add_product(ProductId::new(3), Quantity::ONE)
        .await
        .unwrap();
    drop(state);

    let ctx = ctx.with_cart_on_load(CartOnLoad::Clear);
    let restarted = ctx.logged_in().await;
    assert!(restarted.cart_view().unwrap().is_empty());
    assert!(!ctx.data_dir().join("cart.json").exists());
}

#[tokio::test]
async fn test_stock_limits() {
    let ctx = TestContext::new();
    let mut state = ctx.logged_in().await;

    let err = state
        .add_product(ProductId::new(2), Quantity::ONE)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::OutOfStock { available: 0, .. }));

    state
        .add_product(ProductId::new(3), Quantity::new(2).unwrap())
        .await
        .unwrap();
    let err = state
        .add_product(ProductId::new(3), Quantity::ONE)
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Not enough stock");
    assert_eq!(state.cart_view().unwrap().item_count, 2);
}

#[tokio::test]
async fn test_free_form_items_and_quantity_updates() {
    let ctx = TestContext::new();
    let mut state = ctx.logged_in().await;

    state
        .add_item(CartItem::new("gift-wrap", "Envoltura", Price::from_whole(10)))
        .unwrap();
    let id = ItemId::from("gift-wrap");
    let view = state.update_quantity(&id, 3).unwrap();
    assert_eq!(view.totals.subtotal, Price::from_whole(30));

    let view = state.update_quantity(&id, -1).unwrap();
    assert!(view.is_empty());
    assert_eq!(view.totals.total, Price::ZERO);
}

#[tokio::test]
async fn test_corrupt_files_are_discarded() {
    let ctx = TestContext::new();
    std::fs::write(ctx.data_dir().join("user.json"), "{not json").unwrap();
    std::fs::write(ctx.data_dir().join("cart.json"), "[1, 2, 3]").unwrap();

    let state = ctx.state();
    assert!(state.current_user().is_none());
    assert!(!ctx.data_dir().join("user.json").exists());

    let state = ctx.logged_in().await;
    assert!(state.cart_view().unwrap().is_empty());
}

// ============================================================================
// Checkout & History
// ============================================================================

#[tokio::test]
async fn test_checkout_records_order_and_clears_cart() {
    let ctx = TestContext::new();
    let mut state = ctx.logged_in().await;
    state
        .add_product(ProductId::new(1), Quantity::ONE)
        .await
        .unwrap();
    state
        .add_product(ProductId::new(3), Quantity::ONE)
        .await
        .unwrap();

    let now = Utc.timestamp_millis_opt(1_760_000_000_000).unwrap();
    let order = state.checkout_at(&form(), now).await.unwrap();
    assert_eq!(order.id, OrderId::new(1_760_000_000_000));
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.totals.subtotal, Price::from_whole(350));
    assert_eq!(order.customer.card_hint, "**** 1234");
    assert!(state.cart_view().unwrap().is_empty());

    // Same millisecond: the id still increases.
    state
        .add_product(ProductId::new(1), Quantity::ONE)
        .await
        .unwrap();
    let second = state.checkout_at(&form(), now).await.unwrap();
    assert_eq!(second.id, OrderId::new(1_760_000_000_001));
    drop(state);

    let restarted = ctx.logged_in().await;
    let orders = restarted.orders().await.unwrap();
    assert_eq!(orders, vec![order, second]);
    assert!(restarted.cart_view().unwrap().is_empty());

    let raw = std::fs::read_to_string(ctx.data_dir().join("orders.json")).unwrap();
    assert!(!raw.contains("4111"));
}

#[tokio::test]
async fn test_checkout_validation() {
    let ctx = TestContext::new();
    let mut state = ctx.logged_in().await;

    let err = state.checkout(&form()).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Checkout(CheckoutError::EmptyCart)
    ));

    state
        .add_product(ProductId::new(1), Quantity::ONE)
        .await
        .unwrap();
    let incomplete = CheckoutForm {
        name: " ".to_owned(),
        address: String::new(),
        card_number: SecretString::from("4111 1111 1111 1111".to_owned()),
    };
    match state.checkout(&incomplete).await.unwrap_err() {
        AppError::Checkout(CheckoutError::MissingFields(fields)) => {
            assert_eq!(fields, vec![Field::Address]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(state.cart_view().unwrap().item_count, 1);
    assert!(state.orders().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_remote_purchases() {
    let ctx = TestContext::new();
    ctx.backend.add_purchase(
        &email(),
        RemotePurchase {
            id: 7,
            placed_at: "2025-06-01T12:00:00".to_owned(),
            address: Some("Calle 1".to_owned()),
            total: Price::from_whole(171),
            items: vec![RemotePurchaseItem {
                product_id: ProductId::new(1),
                quantity: 1,
                unit_price: Price::from_whole(100),
            }],
        },
    );

    let state = ctx.logged_in().await;
    let purchases = state.remote_purchases().await.unwrap();
    assert_eq!(purchases.len(), 1);
    assert_eq!(purchases[0].id, 7);
    assert_eq!(purchases[0].items[0].product_id, ProductId::new(1));
}

#[tokio::test]
async fn test_stale_token_after_restart_with_new_backend() {
    let ctx = TestContext::new();
    drop(ctx.logged_in().await);

    // A fresh backend knows nothing about the saved token.
    let mut other = TestContext::new();
    std::fs::copy(
        ctx.data_dir().join("user.json"),
        other.data_dir().join("user.json"),
    )
    .unwrap();
    other.backend = StubBackend::new();

    let state = other.state();
    assert!(state.current_user().is_some());
    let err = state.remote_purchases().await.unwrap_err();
    assert!(matches!(err, AppError::Backend(_)));
}
