use secrecy::Secret;
use serde::Deserialize;
use service_core::config::{ConfigLoader, ServerConfig};
use service_core::error::AppError;

pub const ENV_PREFIX: &str = "SGQ";

#[derive(Debug, Clone, Deserialize)]
pub struct SgqConfig {
    pub service_name: String,
    pub log_level: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub inventory: InventoryPolicy,
    #[serde(default)]
    pub invoicing: InvoicingPolicy,
    #[serde(default)]
    pub pagination: PaginationConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub uri: Secret<String>,
    pub name: String,
}

/// How invoice writes affect product stock.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InventoryPolicy {
    /// Let invoices take a product below zero instead of refusing the invoice.
    pub allow_negative_stock: bool,
    /// Give product quantities back when an invoice is deleted.
    pub restore_stock_on_delete: bool,
    /// Apply item quantity differences to stock when an invoice is edited.
    pub adjust_stock_on_edit: bool,
    /// Products below this quantity are reported as low stock.
    pub low_stock_threshold: i64,
}

impl Default for InventoryPolicy {
    fn default() -> Self {
        Self {
            allow_negative_stock: false,
            restore_stock_on_delete: false,
            adjust_stock_on_edit: false,
            low_stock_threshold: 11,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InvoicingPolicy {
    /// Only allow proforma -> invoice -> paid.
    pub enforce_forward_status: bool,
    pub pickup_window_days: i64,
}

impl Default for InvoicingPolicy {
    fn default() -> Self {
        Self {
            enforce_forward_status: false,
            pickup_window_days: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_limit: u64,
    pub max_limit: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

impl PaginationConfig {
    /// Requested page size, defaulted and clamped to `1..=max_limit`.
    pub fn limit(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1))
    }
}

impl SgqConfig {
    /// Defaults, then `configuration.*`, then `SGQ__*` environment variables.
    pub fn load() -> Result<Self, AppError> {
        ConfigLoader::new(ENV_PREFIX)
            .with_default("service_name", "sgq-service")?
            .with_default("log_level", "info")?
            .with_default("database.backend", "mongo")?
            .with_default("database.uri", "mongodb://localhost:27017/?replicaSet=rs0")?
            .with_default("database.name", "sgq")?
            .load()
    }

    /// In-memory datastore on a random local port.
    pub fn in_memory() -> Self {
        Self {
            service_name: "sgq-service".to_string(),
            log_level: "info".to_string(),
            otlp_endpoint: None,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            database: DatabaseConfig {
                backend: DatabaseBackend::Memory,
                uri: Secret::new(String::new()),
                name: "sgq".to_string(),
            },
            inventory: InventoryPolicy::default(),
            invoicing: InvoicingPolicy::default(),
            pagination: PaginationConfig::default(),
        }
    }
}
