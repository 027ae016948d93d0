//! Application state owned by the front end.
//!
//! [`AppState`] bundles the session, catalog, cart and order history and is
//! the only place that mutates them. Every catalog, cart and history
//! operation requires a logged-in user. Cart mutations are written through
//! to the local store immediately; a mutation that cannot be priced or saved
//! leaves both the in-memory and the saved cart unchanged. Views get
//! [`CartView`] snapshots.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use tracing::{debug, info, instrument, warn};

use tienda_core::{Category, ItemId, ProductId, Quantity};

use crate::backend::Backend;
use crate::config::{CartOnLoad, StorefrontConfig};
use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::models::{CartItem, CartView, CurrentUser, Order, Product, RemotePurchase};
use crate::services::auth::AuthSession;
use crate::services::cart::{CartStore, Pricing};
use crate::services::catalog::{self, CatalogFetcher, ProductFilter};
use crate::services::checkout::{self, CheckoutError, CheckoutForm};
use crate::services::orders::OrderHistory;
use crate::storage::{LocalStore, StorageError, keys};

/// Storefront state: one per running front end.
#[derive(Debug)]
pub struct AppState<B, S, R> {
    backend: B,
    store: S,
    session: AuthSession<B, S>,
    catalog: CatalogFetcher<B>,
    cart: CartStore,
    history: OrderHistory<R>,
}

impl<B: Backend, S: LocalStore, R: OrderRepository> AppState<B, S, R> {
    /// Build the state, rehydrating the session and (per
    /// [`CartOnLoad`]) the cart from `store`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Storage` or `AppError::Auth` if the store cannot be
    /// read or written. Unreadable records are discarded, not reported.
    pub fn load(config: &StorefrontConfig, backend: B, store: S, history: R) -> Result<Self> {
        let session = AuthSession::restore(backend.clone(), store.clone())?;
        let cart = match config.cart_on_load {
            CartOnLoad::Restore => restore_cart(&store, config.pricing.clone())?,
            CartOnLoad::Clear => {
                store.remove(keys::CART)?;
                CartStore::new(config.pricing.clone())
            }
        };
        debug!(
            authenticated = session.is_authenticated(),
            cart_lines = cart.len(),
            "state loaded"
        );

        Ok(Self {
            catalog: CatalogFetcher::new(backend.clone()),
            backend,
            store,
            session,
            cart,
            history: OrderHistory::new(history),
        })
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Log in; see [`AuthSession::login`].
    ///
    /// # Errors
    ///
    /// Returns `AppError::Auth` on invalid input or backend refusal.
    pub async fn login(&mut self, email: &str, password: SecretString) -> Result<CurrentUser> {
        Ok(self.session.login(email, password).await?.clone())
    }

    /// Register; see [`AuthSession::register`].
    ///
    /// # Errors
    ///
    /// Returns `AppError::Auth` on invalid input or backend refusal.
    pub async fn register(
        &mut self,
        name: &str,
        email: &str,
        password: SecretString,
    ) -> Result<CurrentUser> {
        Ok(self.session.register(name, email, password).await?.clone())
    }

    /// Log out. The cart is kept.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Auth` if the session record cannot be removed.
    pub fn logout(&mut self) -> Result<()> {
        Ok(self.session.logout()?)
    }

    /// The logged-in user, if any.
    #[must_use]
    pub const fn current_user(&self) -> Option<&CurrentUser> {
        self.session.current_user()
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Products matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Auth` when logged out, `AppError::Backend` on
    /// request failure.
    pub async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        self.session.require_user()?;
        Ok(self.catalog.fetch(filter).await?)
    }

    /// One product.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Auth` when logged out, `AppError::Backend` for an
    /// unknown id or request failure.
    pub async fn product(&self, id: ProductId) -> Result<Product> {
        self.session.require_user()?;
        Ok(self.catalog.product(id).await?)
    }

    /// Categories present in the catalog.
    ///
    /// # Errors
    ///
    /// Same as [`AppState::products`].
    pub async fn categories(&self) -> Result<Vec<Category>> {
        self.session.require_user()?;
        let products = self.catalog.fetch_all().await?;
        Ok(catalog::categories(&products))
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Snapshot of the cart.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Auth` when logged out.
    pub fn cart_view(&self) -> Result<CartView> {
        self.session.require_user()?;
        Ok(self.cart.view()?)
    }

    /// Add `quantity` units of a catalog product, checking its stock.
    ///
    /// # Errors
    ///
    /// Returns `AppError::OutOfStock` if the cart would hold more than the
    /// catalog reports, `AppError::Backend` if the product cannot be fetched.
    #[instrument(skip(self))]
    pub async fn add_product(&mut self, id: ProductId, quantity: Quantity) -> Result<CartView> {
        self.session.require_user()?;
        let product = self.catalog.product(id).await?;

        let in_cart = self
            .cart
            .get(&ItemId::from(id))
            .map_or(0, |item| item.quantity.get());
        if !product.has_stock_for(in_cart, quantity) {
            return Err(AppError::OutOfStock {
                product: id,
                available: product.stock.saturating_sub(in_cart),
            });
        }

        self.update_cart(|cart| {
            cart.add(CartItem::from_product(&product, quantity));
            Ok(())
        })
    }

    /// Add an arbitrary line without a stock check.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Auth` when logged out, `AppError::Cart` if the
    /// totals would overflow, `AppError::Storage` if the cart cannot be
    /// saved.
    pub fn add_item(&mut self, item: CartItem) -> Result<CartView> {
        self.session.require_user()?;
        self.update_cart(|cart| {
            cart.add(item);
            Ok(())
        })
    }

    /// Set a line's quantity; zero or less removes it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Cart` for an out-of-range quantity.
    pub fn update_quantity(&mut self, id: &ItemId, quantity: i64) -> Result<CartView> {
        self.session.require_user()?;
        self.update_cart(|cart| Ok(cart.update_quantity(id, quantity)?))
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Auth` when logged out, `AppError::Storage` if the
    /// cart cannot be saved.
    pub fn remove_item(&mut self, id: &ItemId) -> Result<CartView> {
        self.session.require_user()?;
        self.update_cart(|cart| {
            cart.remove(id);
            Ok(())
        })
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Auth` when logged out, `AppError::Storage` if the
    /// cart cannot be saved.
    pub fn clear_cart(&mut self) -> Result<CartView> {
        self.session.require_user()?;
        self.update_cart(|cart| {
            cart.clear();
            Ok(())
        })
    }

    /// Apply `change` to a copy of the cart, price and save it, then swap it in.
    fn update_cart(
        &mut self,
        change: impl FnOnce(&mut CartStore) -> Result<()>,
    ) -> Result<CartView> {
        let mut cart = self.cart.clone();
        change(&mut cart)?;
        let view = cart.view()?;
        self.store.set_json(keys::CART, cart.items())?;
        self.cart = cart;
        Ok(view)
    }

    // =========================================================================
    // Checkout & History
    // =========================================================================

    /// Place an order for the current cart.
    ///
    /// A blank name on the form is replaced by the user's display name.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Checkout` for an empty cart, invalid form or
    /// repository failure, `AppError::Storage` if the emptied cart cannot be
    /// saved. On error no order is recorded and the cart is unchanged.
    pub async fn checkout(&mut self, form: &CheckoutForm) -> Result<Order> {
        self.checkout_at(form, Utc::now()).await
    }

    /// [`AppState::checkout`] with an explicit creation time.
    ///
    /// # Errors
    ///
    /// Same as [`AppState::checkout`].
    pub async fn checkout_at(&mut self, form: &CheckoutForm, now: DateTime<Utc>) -> Result<Order> {
        let user = self.session.require_user()?;
        let (snapshot, mut customer) = checkout::prepare(&self.cart, form)?;
        if customer.name.is_empty() {
            customer.name.clone_from(&user.name);
        }

        // The saved cart is emptied first so a recorded order never
        // coexists with its lines in the store.
        self.store.set_json(keys::CART, &[] as &[CartItem])?;
        match self.history.record_order(snapshot, customer, now).await {
            Ok(order) => {
                self.cart.clear();
                info!(order_id = %order.id, "checkout complete");
                Ok(order)
            }
            Err(e) => {
                if let Err(restore) = self.store.set_json(keys::CART, self.cart.items()) {
                    warn!(error = %restore, "Could not restore saved cart after failed checkout");
                }
                Err(CheckoutError::Repository(e).into())
            }
        }
    }

    /// Locally recorded orders, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Auth` when logged out, `AppError::Repository` if
    /// the history cannot be read.
    pub async fn orders(&self) -> Result<Vec<Order>> {
        self.session.require_user()?;
        Ok(self.history.list_orders().await?)
    }

    /// Purchases the backend holds for the logged-in user.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Auth` when logged out or without a token,
    /// `AppError::Backend` on request failure.
    pub async fn remote_purchases(&self) -> Result<Vec<RemotePurchase>> {
        let token = self.session.token()?;
        Ok(self.backend.purchase_history(token).await?)
    }
}

/// Load the saved cart, discarding it if it cannot be parsed.
fn restore_cart<S: LocalStore>(store: &S, pricing: Pricing) -> Result<CartStore> {
    match store.get_json::<Vec<CartItem>>(keys::CART) {
        Ok(items) => Ok(CartStore::from_items(items.unwrap_or_default(), pricing)),
        Err(StorageError::Json { source, .. }) => {
            warn!(error = %source, "Discarding unreadable cart record");
            store.remove(keys::CART)?;
            Ok(CartStore::new(pricing))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::TimeZone;
    use tienda_core::{Email, Price};

    use super::*;
    use crate::backend::StubBackend;
    use crate::db::{LocalOrderRepository, MemoryOrderRepository};
    use crate::services::auth::AuthError;
    use crate::services::cart::CartError;
    use crate::storage::MemoryStore;

    type TestState = AppState<StubBackend, MemoryStore, MemoryOrderRepository>;

    /// A [`MemoryStore`] whose writes to one key can be made to fail.
    #[derive(Debug, Clone, Default)]
    struct FailingStore {
        inner: MemoryStore,
        failing: Arc<Mutex<Option<&'static str>>>,
    }

    impl FailingStore {
        fn fail_writes_to(&self, key: Option<&'static str>) {
            *self.failing.lock().unwrap() = key;
        }

        fn check(&self, key: &str) -> std::result::Result<(), StorageError> {
            if *self.failing.lock().unwrap() == Some(key) {
                return Err(StorageError::Io {
                    key: key.to_owned(),
                    source: std::io::Error::other("disk full"),
                });
            }
            Ok(())
        }
    }

    impl LocalStore for FailingStore {
        fn get(&self, key: &str) -> std::result::Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> std::result::Result<(), StorageError> {
            self.check(key)?;
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> std::result::Result<(), StorageError> {
            self.check(key)?;
            self.inner.remove(key)
        }
    }

    async fn logged_in_failing(
        store: FailingStore,
    ) -> AppState<StubBackend, FailingStore, LocalOrderRepository<FailingStore>> {
        let mut state = AppState::load(
            &config(CartOnLoad::Restore),
            backend(),
            store.clone(),
            LocalOrderRepository::new(store),
        )
        .unwrap();
        state
            .login("ana@example.com", SecretString::from("secreta".to_owned()))
            .await
            .unwrap();
        state
    }

    fn config(cart_on_load: CartOnLoad) -> StorefrontConfig {
        let mut config = StorefrontConfig::from_source(|_| None).unwrap();
        config.cart_on_load = cart_on_load;
        config
    }

    fn product(id: i64, price: u32, stock: u32) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Producto {id}"),
            description: None,
            category: None,
            price: Price::from_whole(price),
            stock,
            image: None,
        }
    }

    fn backend() -> StubBackend {
        let stub = StubBackend::with_products(vec![product(1, 100, 2), product(2, 30, 10)]);
        stub.add_account(&Email::parse("ana@example.com").unwrap(), "secreta");
        stub
    }

    async fn logged_in(store: MemoryStore) -> TestState {
        let mut state = AppState::load(
            &config(CartOnLoad::Restore),
            backend(),
            store,
            MemoryOrderRepository::new(),
        )
        .unwrap();
        state
            .login("ana@example.com", SecretString::from("secreta".to_owned()))
            .await
            .unwrap();
        state
    }

    fn form() -> CheckoutForm {
        CheckoutForm {
            name: "Ana".to_owned(),
            address: "Calle 1".to_owned(),
            card_number: SecretString::from("4242 4242 4242 4242".to_owned()),
        }
    }

    #[tokio::test]
    async fn test_operations_require_login() {
        let mut state: TestState = AppState::load(
            &config(CartOnLoad::Restore),
            backend(),
            MemoryStore::new(),
            MemoryOrderRepository::new(),
        )
        .unwrap();

        let not_auth = |r: &AppError| matches!(r, AppError::Auth(AuthError::NotAuthenticated));
        assert!(not_auth(&state.products(&ProductFilter::new()).await.unwrap_err()));
        assert!(not_auth(&state.cart_view().unwrap_err()));
        assert!(not_auth(
            &state.add_product(ProductId::new(1), Quantity::ONE).await.unwrap_err()
        ));
        assert!(not_auth(&state.orders().await.unwrap_err()));
        assert!(not_auth(&state.remote_purchases().await.unwrap_err()));
    }

    #[tokio::test]
    async fn test_add_product_checks_stock() {
        let mut state = logged_in(MemoryStore::new()).await;
        state.add_product(ProductId::new(1), Quantity::ONE).await.unwrap();
        let view = state.add_product(ProductId::new(1), Quantity::ONE).await.unwrap();
        assert_eq!(view.item_count, 2);

        let err = state
            .add_product(ProductId::new(1), Quantity::ONE)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::OutOfStock { available: 0, .. }));
        assert_eq!(state.cart_view().unwrap().item_count, 2);
    }

    #[tokio::test]
    async fn test_cart_persisted_and_restored() {
        let store = MemoryStore::new();
        let mut state = logged_in(store.clone()).await;
        state.add_product(ProductId::new(2), Quantity::new(3).unwrap()).await.unwrap();
        drop(state);

        let restored = logged_in(store.clone()).await;
        assert_eq!(restored.cart_view().unwrap().item_count, 3);

        let cleared: TestState = AppState::load(
            &config(CartOnLoad::Clear),
            backend(),
            store.clone(),
            MemoryOrderRepository::new(),
        )
        .unwrap();
        assert!(cleared.cart_view().unwrap().is_empty());
        assert!(store.get(keys::CART).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_cart_discarded() {
        let store = MemoryStore::new();
        store.set(keys::CART, "[{\"id\": 1}]").unwrap();
        let state = logged_in(store).await;
        assert!(state.cart_view().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_flow() {
        let store = MemoryStore::new();
        let mut state = AppState::load(
            &config(CartOnLoad::Restore),
            backend(),
            store.clone(),
            LocalOrderRepository::new(store.clone()),
        )
        .unwrap();
        state
            .login("ana@example.com", SecretString::from("secreta".to_owned()))
            .await
            .unwrap();

        state.add_product(ProductId::new(1), Quantity::ONE).await.unwrap();
        let now = Utc.timestamp_millis_opt(1_750_000_000_000).unwrap();
        let order = state.checkout_at(&form(), now).await.unwrap();

        assert_eq!(order.totals.total, Price::from_whole(171));
        assert_eq!(order.customer.card_hint, "**** 4242");
        assert!(state.cart_view().unwrap().is_empty());
        assert_eq!(store.get(keys::CART).unwrap().as_deref(), Some("[]"));
        assert_eq!(state.orders().await.unwrap(), vec![order]);
    }

    #[tokio::test]
    async fn test_update_and_remove_persist() {
        let store = MemoryStore::new();
        let mut state = logged_in(store.clone()).await;
        state.add_product(ProductId::new(2), Quantity::ONE).await.unwrap();

        let view = state.update_quantity(&ItemId::Number(2), 4).unwrap();
        assert_eq!(view.item_count, 4);
        let view = state.update_quantity(&ItemId::Number(2), 0).unwrap();
        assert!(view.is_empty());
        assert_eq!(store.get(keys::CART).unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_remote_purchases_need_token() {
        let mut state = logged_in(MemoryStore::new()).await;
        assert!(state.remote_purchases().await.unwrap().is_empty());

        state.logout().unwrap();
        assert!(matches!(
            state.remote_purchases().await,
            Err(AppError::Auth(AuthError::NotAuthenticated))
        ));
    }

    #[tokio::test]
    async fn test_checkout_with_unwritable_cart_changes_nothing() {
        let store = FailingStore::default();
        let mut state = logged_in_failing(store.clone()).await;
        state.add_product(ProductId::new(1), Quantity::ONE).await.unwrap();

        store.fail_writes_to(Some(keys::CART));
        let now = Utc.timestamp_millis_opt(1_750_000_000_000).unwrap();
        let err = state.checkout_at(&form(), now).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert!(state.orders().await.unwrap().is_empty());
        assert_eq!(state.cart_view().unwrap().item_count, 1);

        store.fail_writes_to(None);
        let restarted = logged_in_failing(store).await;
        assert!(restarted.orders().await.unwrap().is_empty());
        assert_eq!(restarted.cart_view().unwrap().item_count, 1);
    }

    #[tokio::test]
    async fn test_checkout_with_unwritable_history_restores_cart() {
        let store = FailingStore::default();
        let mut state = logged_in_failing(store.clone()).await;
        state.add_product(ProductId::new(2), Quantity::new(2).unwrap()).await.unwrap();

        store.fail_writes_to(Some(keys::ORDERS));
        let now = Utc.timestamp_millis_opt(1_750_000_000_000).unwrap();
        let err = state.checkout_at(&form(), now).await.unwrap_err();
        assert!(matches!(err, AppError::Checkout(CheckoutError::Repository(_))));
        assert_eq!(state.cart_view().unwrap().item_count, 2);

        store.fail_writes_to(None);
        let restarted = logged_in_failing(store).await;
        assert!(restarted.orders().await.unwrap().is_empty());
        assert_eq!(restarted.cart_view().unwrap().item_count, 2);
    }

    #[tokio::test]
    async fn test_failed_cart_write_keeps_previous_cart() {
        let store = FailingStore::default();
        let mut state = logged_in_failing(store.clone()).await;
        state.add_product(ProductId::new(2), Quantity::ONE).await.unwrap();

        store.fail_writes_to(Some(keys::CART));
        assert!(state.add_product(ProductId::new(2), Quantity::ONE).await.is_err());
        assert!(state.clear_cart().is_err());
        assert_eq!(state.cart_view().unwrap().item_count, 1);
    }

    #[tokio::test]
    async fn test_overflowing_item_is_rejected() {
        let store = MemoryStore::new();
        let mut state = logged_in(store.clone()).await;
        let huge = Price::parse("50000000000000000000000000000").unwrap();
        let item = CartItem::new("lingote", "Lingote", huge).with_quantity(Quantity::new(2).unwrap());

        let err = state.add_item(item).unwrap_err();
        assert!(matches!(err, AppError::Cart(CartError::Overflow)));
        assert_eq!(err.user_message(), "Cart total is too large");
        assert!(state.cart_view().unwrap().is_empty());
        assert!(store.get(keys::CART).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blank_checkout_name_uses_display_name() {
        let mut state = logged_in(MemoryStore::new()).await;
        state.add_product(ProductId::new(1), Quantity::ONE).await.unwrap();

        let form = CheckoutForm {
            name: String::new(),
            ..form()
        };
        let now = Utc.timestamp_millis_opt(1_750_000_000_000).unwrap();
        let order = state.checkout_at(&form, now).await.unwrap();
        assert_eq!(order.customer.name, "ana@example.com");
    }
}
