//! Integration tests for Tienda.
//!
//! # Running Tests
//!
//! ```bash
//! # Everything that runs in-process (stub backend, file-backed store)
//! cargo test -p tienda-integration-tests
//!
//! # Also the tests against a running backend
//! BACKEND_BASE_URL=http://127.0.0.1:8000 cargo test -p tienda-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `storefront_flow` - login, cart, checkout and restart over a real data directory
//! - `live_backend` - HTTP client against a live backend (ignored by default)

use std::path::Path;

use secrecy::SecretString;
use tempfile::TempDir;
use url::Url;

use tienda_core::{Category, Email, Price, ProductId};
use tienda_storefront::backend::StubBackend;
use tienda_storefront::config::CartOnLoad;
use tienda_storefront::db::LocalOrderRepository;
use tienda_storefront::models::Product;
use tienda_storefront::storage::FileStore;
use tienda_storefront::{AppState, StorefrontConfig};

/// Account every [`TestContext`] backend knows.
pub const EMAIL: &str = "ana@example.com";

/// Password for [`EMAIL`].
pub const PASSWORD: &str = "secreta";

/// State type used by the in-process tests.
pub type TestState = AppState<StubBackend, FileStore, LocalOrderRepository<FileStore>>;

/// A stub backend plus a temporary data directory.
///
/// Each call to [`TestContext::state`] builds a fresh [`AppState`] over the
/// same directory, which is how a restart of the front end looks.
pub struct TestContext {
    dir: TempDir,
    /// Backend shared by every state built from this context.
    pub backend: StubBackend,
    /// Configuration passed to [`AppState::load`].
    pub config: StorefrontConfig,
}

impl TestContext {
    /// Context with the default catalog and the [`EMAIL`] account.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let backend = StubBackend::with_products(catalog());
        backend.add_account(&email(), PASSWORD);

        let mut config = StorefrontConfig::from_source(|_| None).expect("Failed to build config");
        config.data_dir = dir.path().to_path_buf();

        Self {
            dir,
            backend,
            config,
        }
    }

    /// Use `policy` for carts saved by a previous run.
    #[must_use]
    pub fn with_cart_on_load(mut self, policy: CartOnLoad) -> Self {
        self.config.cart_on_load = policy;
        self
    }

    /// Data directory backing the file store.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        self.dir.path()
    }

    /// File store over the data directory.
    #[must_use]
    pub fn store(&self) -> FileStore {
        FileStore::new(self.dir.path())
    }

    /// Load application state as a fresh run would.
    ///
    /// # Panics
    ///
    /// Panics if the state cannot be loaded.
    #[must_use]
    pub fn state(&self) -> TestState {
        let store = self.store();
        AppState::load(
            &self.config,
            self.backend.clone(),
            store.clone(),
            LocalOrderRepository::new(store),
        )
        .expect("Failed to load state")
    }

    /// Load state and log in as [`EMAIL`].
    ///
    /// # Panics
    ///
    /// Panics if loading or login fails.
    pub async fn logged_in(&self) -> TestState {
        let mut state = self.state();
        state
            .login(EMAIL, password())
            .await
            .expect("Failed to log in");
        state
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Email of the default account.
///
/// # Panics
///
/// Never; [`EMAIL`] is a valid address.
#[must_use]
pub fn email() -> Email {
    Email::parse(EMAIL).expect("valid email")
}

/// Password of the default account.
#[must_use]
pub fn password() -> SecretString {
    SecretString::from(PASSWORD.to_owned())
}

/// Three products: two beverages and one book, with limited stock.
///
/// # Panics
///
/// Never; the category names are valid.
#[must_use]
pub fn catalog() -> Vec<Product> {
    let bebidas = Category::new("Bebidas").expect("valid category");
    let libros = Category::new("Libros").expect("valid category");
    vec![
        Product {
            id: ProductId::new(1),
            name: "Café de Olla".to_owned(),
            description: Some("Café con canela y piloncillo".to_owned()),
            category: Some(bebidas.clone()),
            price: Price::from_whole(100),
            stock: 5,
            image: None,
        },
        Product {
            id: ProductId::new(2),
            name: "Té verde".to_owned(),
            description: None,
            category: Some(bebidas),
            price: Price::from_whole(40),
            stock: 0,
            image: None,
        },
        Product {
            id: ProductId::new(3),
            name: "Cien años de soledad".to_owned(),
            description: Some("Novela".to_owned()),
            category: Some(libros),
            price: Price::from_whole(250),
            stock: 2,
            image: Some("https://img.example.com/cien.jpg".to_owned()),
        },
    ]
}

/// Base URL of a live backend, from `BACKEND_BASE_URL`.
///
/// # Panics
///
/// Panics if the variable is set to something that is not a URL.
#[must_use]
pub fn live_base_url() -> Option<Url> {
    std::env::var("BACKEND_BASE_URL")
        .ok()
        .map(|raw| Url::parse(&raw).expect("BACKEND_BASE_URL must be a URL"))
}
