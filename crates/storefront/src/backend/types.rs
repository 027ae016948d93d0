//! Wire types for the backend's JSON.
//!
//! Field names follow the backend (`nombre`, `precio`, ...). Each record type
//! converts into its domain counterpart in [`crate::models`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tienda_core::{Category, Price, PriceError, ProductId};

use crate::models::{Product, RemotePurchase, RemotePurchaseItem};

/// A backend record that cannot become a domain value.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Price or total is not a valid amount.
    #[error("record {id}: {source}")]
    Price {
        /// Record id.
        id: i64,
        /// Underlying error.
        #[source]
        source: PriceError,
    },

    /// Quantity is negative or too large.
    #[error("record {id}: invalid quantity {quantity}")]
    Quantity {
        /// Record id.
        id: i64,
        /// Offending value.
        quantity: i64,
    },

    /// Name is empty.
    #[error("record {0}: empty name")]
    EmptyName(i64),
}

// =============================================================================
// Requests
// =============================================================================

/// Body of `POST /auth/iniciar-sesion`.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Body of `POST /auth/registrar`.
#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub nombre: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

// =============================================================================
// Responses
// =============================================================================

/// Body of a successful login.
#[derive(Debug, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default, alias = "access_token")]
    pub token: Option<String>,
}

/// Error body. FastAPI sends either a string or a list of validation errors.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Human-readable detail, if one can be extracted.
    #[must_use]
    pub fn into_detail(self) -> Option<String> {
        match self.detail? {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s),
            serde_json::Value::Array(errors) => errors
                .iter()
                .find_map(|e| e.get("msg").and_then(serde_json::Value::as_str))
                .map(str::to_owned),
            _ => None,
        }
    }
}

/// Product as listed by `/productos`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: i64,
    #[serde(alias = "titulo")]
    pub nombre: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub categoria: Option<String>,
    pub precio: Decimal,
    #[serde(default, alias = "existencia")]
    pub stock: Option<i64>,
    #[serde(default)]
    pub imagen: Option<String>,
}

impl TryFrom<ProductRecord> for Product {
    type Error = ConversionError;

    fn try_from(record: ProductRecord) -> Result<Self, Self::Error> {
        let id = record.id;
        let name = record.nombre.trim();
        if name.is_empty() {
            return Err(ConversionError::EmptyName(id));
        }
        let price = Price::new(record.precio).map_err(|source| ConversionError::Price { id, source })?;
        // Missing or negative stock reads as sold out.
        let stock = record
            .stock
            .map_or(0, |s| u32::try_from(s.max(0)).unwrap_or(u32::MAX));

        Ok(Self {
            id: ProductId::new(id),
            name: name.to_owned(),
            description: non_empty(record.descripcion),
            category: record
                .categoria
                .as_deref()
                .and_then(|c| Category::new(c).ok()),
            price,
            stock,
            image: non_empty(record.imagen),
        })
    }
}

/// One line of a `/compras` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseItemRecord {
    pub producto_id: i64,
    pub cantidad: i64,
    pub precio_unitario: Decimal,
}

/// Purchase as listed by `/compras`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub id: i64,
    #[serde(default)]
    pub fecha: String,
    #[serde(default)]
    pub direccion: Option<String>,
    pub total: Decimal,
    #[serde(default)]
    pub items: Vec<PurchaseItemRecord>,
}

impl TryFrom<PurchaseRecord> for RemotePurchase {
    type Error = ConversionError;

    fn try_from(record: PurchaseRecord) -> Result<Self, Self::Error> {
        let id = record.id;
        let items = record
            .items
            .into_iter()
            .map(|item| {
                let quantity = u32::try_from(item.cantidad).map_err(|_| {
                    ConversionError::Quantity {
                        id,
                        quantity: item.cantidad,
                    }
                })?;
                Ok(RemotePurchaseItem {
                    product_id: ProductId::new(item.producto_id),
                    quantity,
                    unit_price: Price::new(item.precio_unitario)
                        .map_err(|source| ConversionError::Price { id, source })?,
                })
            })
            .collect::<Result<Vec<_>, ConversionError>>()?;

        Ok(Self {
            id,
            placed_at: record.fecha,
            address: non_empty(record.direccion),
            total: Price::new(record.total).map_err(|source| ConversionError::Price { id, source })?,
            items,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
