//! In-process [`Backend`] for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use secrecy::{ExposeSecret, SecretString};

use tienda_core::{Email, ProductId};

use crate::models::{Product, RemotePurchase, SessionToken};

use super::{Backend, BackendError, Credentials, LoginOutcome, Registration};

/// Fake backend holding products, accounts and purchases in memory.
///
/// Behaves like the real one where the storefront can tell the difference:
/// bad credentials are a 401, a duplicate registration is a 400 with
/// `detail`, and an unknown product is [`BackendError::NotFound`].
#[derive(Debug, Clone, Default)]
pub struct StubBackend {
    state: Arc<Mutex<StubState>>,
}

#[derive(Debug, Default)]
struct StubState {
    products: Vec<Product>,
    accounts: HashMap<String, Account>,
    tokens: HashMap<String, String>,
    purchases: HashMap<String, Vec<RemotePurchase>>,
    withhold_tokens: bool,
    failing: bool,
    issued: u64,
}

#[derive(Debug)]
struct Account {
    password: SecretString,
}

impl StubBackend {
    /// An empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend listing `products`.
    #[must_use]
    pub fn with_products(products: Vec<Product>) -> Self {
        let stub = Self::new();
        stub.lock().products = products;
        stub
    }

    /// Add or replace a product.
    pub fn put_product(&self, product: Product) {
        let mut state = self.lock();
        state.products.retain(|p| p.id != product.id);
        state.products.push(product);
    }

    /// Register an account directly.
    pub fn add_account(&self, email: &Email, password: &str) {
        self.lock().accounts.insert(
            email.as_str().to_owned(),
            Account {
                password: SecretString::from(password.to_owned()),
            },
        );
    }

    /// Attach a purchase to an account's history.
    pub fn add_purchase(&self, email: &Email, purchase: RemotePurchase) {
        self.lock()
            .purchases
            .entry(email.as_str().to_owned())
            .or_default()
            .push(purchase);
    }

    /// Answer logins without a token, like deployments that only return a message.
    pub fn withhold_tokens(&self) {
        self.lock().withhold_tokens = true;
    }

    /// Make every call fail with a 503.
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    fn lock(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(state: &StubState) -> Result<(), BackendError> {
        if state.failing {
            Err(status(503, "Servicio no disponible"))
        } else {
            Ok(())
        }
    }
}

fn status(code: u16, detail: &str) -> BackendError {
    BackendError::Status {
        status: code,
        detail: Some(detail.to_owned()),
    }
}

impl Backend for StubBackend {
    async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome, BackendError> {
        let mut state = self.lock();
        Self::check_available(&state)?;

        let email = credentials.email.as_str();
        let valid = state.accounts.get(email).is_some_and(|account| {
            account.password.expose_secret() == credentials.password.expose_secret()
        });
        if !valid {
            return Err(status(401, "Credenciales inválidas"));
        }
        if state.withhold_tokens {
            return Ok(LoginOutcome::default());
        }

        state.issued += 1;
        let token = format!("stub-token-{}", state.issued);
        state.tokens.insert(token.clone(), email.to_owned());
        Ok(LoginOutcome {
            token: Some(SessionToken::new(token)),
        })
    }

    async fn register(&self, registration: &Registration) -> Result<(), BackendError> {
        let mut state = self.lock();
        Self::check_available(&state)?;

        let email = registration.email.as_str();
        if state.accounts.contains_key(email) {
            return Err(status(400, "Email ya registrado"));
        }
        state.accounts.insert(
            email.to_owned(),
            Account {
                password: registration.password.clone(),
            },
        );
        Ok(())
    }

    async fn list_products(&self) -> Result<Vec<Product>, BackendError> {
        let state = self.lock();
        Self::check_available(&state)?;
        Ok(state.products.clone())
    }

    async fn get_product(&self, id: ProductId) -> Result<Product, BackendError> {
        let state = self.lock();
        Self::check_available(&state)?;
        state
            .products
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("product {id}")))
    }

    async fn purchase_history(
        &self,
        token: &SessionToken,
    ) -> Result<Vec<RemotePurchase>, BackendError> {
        let state = self.lock();
        Self::check_available(&state)?;
        let email = state
            .tokens
            .get(token.expose())
            .ok_or_else(|| status(401, "Token inválido"))?;
        Ok(state.purchases.get(email).cloned().unwrap_or_default())
    }
}
