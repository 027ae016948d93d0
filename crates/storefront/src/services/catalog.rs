//! Catalog fetching and client-side filtering.

use tracing::{debug, instrument};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use tienda_core::{Category, ProductId};

use crate::backend::{Backend, BackendError};
use crate::models::Product;

/// Filter applied to a product listing.
///
/// An empty query and no category match everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFilter {
    /// Substring searched in name and description, case-insensitively.
    pub query: Option<String>,
    /// Exact category.
    pub category: Option<Category>,
    /// Also ignore accents, so `electronica` finds `Electrónica`.
    pub accent_insensitive: bool,
}

impl ProductFilter {
    /// Match everything, accent-insensitively once a query is set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            query: None,
            category: None,
            accent_insensitive: true,
        }
    }

    /// Set the search text. Blank text clears it.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.query = (!query.trim().is_empty()).then_some(query);
        self
    }

    /// Restrict to one category.
    #[must_use]
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Toggle accent folding.
    #[must_use]
    pub const fn accent_insensitive(mut self, enabled: bool) -> Self {
        self.accent_insensitive = enabled;
        self
    }

    /// Whether `product` passes the filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = &self.category
            && product.category.as_ref() != Some(category)
        {
            return false;
        }

        let Some(query) = self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) else {
            return true;
        };
        let needle = self.normalize(query);
        std::iter::once(product.name.as_str())
            .chain(product.description.as_deref())
            .any(|text| self.normalize(text).contains(&needle))
    }

    /// Keep the matching products, preserving order.
    #[must_use]
    pub fn apply(&self, products: Vec<Product>) -> Vec<Product> {
        products.into_iter().filter(|p| self.matches(p)).collect()
    }

    fn normalize(&self, text: &str) -> String {
        if self.accent_insensitive {
            fold_text(text)
        } else {
            text.to_lowercase()
        }
    }
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercase `text` and drop combining marks after canonical decomposition.
#[must_use]
pub fn fold_text(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Distinct categories in first-appearance order.
#[must_use]
pub fn categories(products: &[Product]) -> Vec<Category> {
    let mut seen: Vec<Category> = Vec::new();
    for category in products.iter().filter_map(|p| p.category.as_ref()) {
        if !seen.contains(category) {
            seen.push(category.clone());
        }
    }
    seen
}

/// Reads products from the backend.
#[derive(Debug, Clone)]
pub struct CatalogFetcher<B> {
    backend: B,
}

impl<B: Backend> CatalogFetcher<B> {
    /// Create a fetcher over `backend`.
    pub const fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Full listing, unfiltered.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the backend request fails.
    pub async fn fetch_all(&self) -> Result<Vec<Product>, BackendError> {
        self.backend.list_products().await
    }

    /// Listing narrowed by `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the backend request fails.
    #[instrument(skip(self))]
    pub async fn fetch(&self, filter: &ProductFilter) -> Result<Vec<Product>, BackendError> {
        let all = self.fetch_all().await?;
        let total = all.len();
        let matched = filter.apply(all);
        debug!(total, matched = matched.len(), "catalog filtered");
        Ok(matched)
    }

    /// One product by id.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] for an unknown id.
    pub async fn product(&self, id: ProductId) -> Result<Product, BackendError> {
        self.backend.get_product(id).await
    }
}
