//! `reqwest` implementation of [`Backend`].
//!
//! Product listings and single products are cached with `moka` for the
//! configured TTL. Auth and purchase history are never cached.

use std::sync::Arc;

use moka::future::Cache;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use tienda_core::ProductId;

use crate::config::BackendConfig;
use crate::models::{Product, RemotePurchase, SessionToken};

use super::cache::{CacheKey, CacheValue};
use super::types::{
    ErrorBody, LoginRequest, LoginResponse, ProductRecord, PurchaseRecord, RegisterRequest,
};
use super::{Backend, BackendError, Credentials, LoginOutcome, Registration};

/// Maximum body length included in error logs.
const LOG_BODY_CHARS: usize = 500;

/// Client for the storefront REST backend.
#[derive(Clone)]
pub struct HttpBackend {
    inner: Arc<HttpBackendInner>,
}

struct HttpBackendInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpBackend {
    /// Create a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        // `Url::join` drops the last path segment unless it ends in '/'.
        let mut base_url = config.base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(HttpBackendInner {
                client,
                base_url,
                cache,
            }),
        })
    }

    /// The backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Drop every cached catalog response.
    pub fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
    }

    fn url(&self, path: &str) -> Result<Url, BackendError> {
        Ok(self.inner.base_url.join(path)?)
    }

    /// Send a request and return the raw body of a success response.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        let detail = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(ErrorBody::into_detail);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(LOG_BODY_CHARS).collect::<String>(),
                "Backend returned server error"
            );
        } else {
            debug!(status = %status, detail = ?detail, "Backend rejected request");
        }

        Err(BackendError::Status {
            status: status.as_u16(),
            detail,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, BackendError> {
        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(LOG_BODY_CHARS).collect::<String>(),
                "Failed to parse backend response"
            );
            BackendError::Parse(e)
        })
    }

    fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::RequestBuilder, BackendError> {
        Ok(self.inner.client.post(self.url(path)?).json(body))
    }
}

impl Backend for HttpBackend {
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome, BackendError> {
        let request = self.post(
            "auth/iniciar-sesion",
            &LoginRequest {
                email: credentials.email.as_str(),
                password: credentials.password.expose_secret(),
            },
        )?;
        let body = self.send(request).await?;

        // Some deployments answer with a bare message and no token.
        let response = serde_json::from_str::<LoginResponse>(&body).unwrap_or_default();
        Ok(LoginOutcome {
            token: response.token.map(SessionToken::new),
        })
    }

    #[instrument(skip(self, registration), fields(email = %registration.email))]
    async fn register(&self, registration: &Registration) -> Result<(), BackendError> {
        let request = self.post(
            "auth/registrar",
            &RegisterRequest {
                nombre: &registration.name,
                email: registration.email.as_str(),
                password: registration.password.expose_secret(),
            },
        )?;
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<Product>, BackendError> {
        if let Some(CacheValue::Products(products)) =
            self.inner.cache.get(&CacheKey::Products).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let request = self.inner.client.get(self.url("productos")?);
        let records: Vec<ProductRecord> = self.get_json(request).await?;

        let products: Vec<Product> = records
            .into_iter()
            .filter_map(|record| match Product::try_from(record) {
                Ok(product) => Some(product),
                Err(e) => {
                    warn!(error = %e, "Skipping invalid product record");
                    None
                }
            })
            .collect();

        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_product(&self, id: ProductId) -> Result<Product, BackendError> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let request = self.inner.client.get(self.url(&format!("productos/{id}"))?);
        let record: ProductRecord = match self.get_json(request).await {
            Err(BackendError::Status { status: 404, .. }) => {
                return Err(BackendError::NotFound(format!("product {id}")));
            }
            other => other?,
        };
        let product = Product::try_from(record)?;

        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    #[instrument(skip(self, token))]
    async fn purchase_history(
        &self,
        token: &SessionToken,
    ) -> Result<Vec<RemotePurchase>, BackendError> {
        let request = self
            .inner
            .client
            .get(self.url("compras")?)
            .bearer_auth(token.expose());
        let records: Vec<PurchaseRecord> = self.get_json(request).await?;

        Ok(records
            .into_iter()
            .filter_map(|record| match RemotePurchase::try_from(record) {
                Ok(purchase) => Some(purchase),
                Err(e) => {
                    warn!(error = %e, "Skipping invalid purchase record");
                    None
                }
            })
            .collect())
    }
}
