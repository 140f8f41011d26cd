use service_core::error::AppError;
use thiserror::Error;

use crate::models::InvoiceStatus;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum InvoiceError {
    #[error("Invalid invoice: {0}")]
    Validation(String),

    #[error("Client {0} not found")]
    ClientNotFound(String),

    #[error("Invoice {0} not found")]
    InvoiceNotFound(String),

    #[error("Product {0} not found")]
    ProductNotFound(String),

    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        requested: i64,
        available: i64,
    },

    #[error("Status cannot change from {from} to {to}")]
    InvalidTransition {
        from: InvoiceStatus,
        to: InvoiceStatus,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl InvoiceError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            InvoiceError::Validation(_) => "validation",
            InvoiceError::ClientNotFound(_) => "client_not_found",
            InvoiceError::InvoiceNotFound(_) => "invoice_not_found",
            InvoiceError::ProductNotFound(_) => "product_not_found",
            InvoiceError::InsufficientStock { .. } => "insufficient_stock",
            InvoiceError::InvalidTransition { .. } => "invalid_transition",
            InvoiceError::Store(_) => "store",
        }
    }
}

impl From<validator::ValidationErrors> for InvoiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        InvoiceError::Validation(err.to_string())
    }
}

impl From<InvoiceError> for AppError {
    fn from(err: InvoiceError) -> Self {
        match err {
            InvoiceError::Validation(_) | InvoiceError::ClientNotFound(_) => {
                AppError::BadRequest(anyhow::anyhow!(err.to_string()))
            }
            InvoiceError::InvoiceNotFound(_) => AppError::NotFound(anyhow::anyhow!(err.to_string())),
            InvoiceError::ProductNotFound(_)
            | InvoiceError::InsufficientStock { .. }
            | InvoiceError::InvalidTransition { .. } => {
                AppError::Conflict(anyhow::anyhow!(err.to_string()))
            }
            InvoiceError::Store(e) => AppError::from(e),
        }
    }
}
