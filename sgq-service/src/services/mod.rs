pub mod catalog;
pub mod composer;
pub mod credentials;
pub mod error;
pub mod invoicing;
pub mod stock;

pub use composer::{CatalogEntry, ComposerError, LineItemComposer};
pub use error::InvoiceError;
pub use invoicing::{InvoiceDocument, InvoiceFormData, InvoiceService, UpcomingPickup};
pub use stock::StockReconciler;
