//! Persistence: one generic repository per collection plus an explicit unit of
//! work for multi-document writes. Two backends implement both: MongoDB for
//! deployments and an in-memory store for tests and local runs.

mod memory;
mod mongo;
mod query;

pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use query::{escape_regex, Condition, ListQuery, Page, SortOrder};

use crate::config::{DatabaseBackend, DatabaseConfig};
use crate::models::{Client, CompanyProfile, Employee, Invoice, Product, Service};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{de::DeserializeOwned, Serialize};
use service_core::error::AppError;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Document encoding error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) => AppError::from(e),
            StoreError::Codec(e) => AppError::DatabaseError(anyhow::Error::new(e)),
        }
    }
}

/// A document type stored in its own collection.
pub trait Entity: Serialize + DeserializeOwned + Clone + Unpin + Send + Sync + 'static {
    const COLLECTION: &'static str;
    /// Human readable name used in error messages.
    const LABEL: &'static str;
    /// Fields matched (case-insensitive substring) by free-text search. Dotted
    /// paths reach into embedded arrays.
    const SEARCH_FIELDS: &'static [&'static str];
    const SORT: SortOrder;
    /// Field targeted by `startDate` / `endDate` list filters, if any.
    const DATE_FIELD: Option<&'static str> = None;

    fn id(&self) -> &str;
}

#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    async fn insert(&self, entity: &E) -> Result<(), StoreError>;

    async fn find(&self, id: &str) -> Result<Option<E>, StoreError>;

    /// First document whose `field` equals `value` exactly.
    async fn find_one_by(&self, field: &str, value: &str) -> Result<Option<E>, StoreError>;

    async fn list(&self, query: &ListQuery) -> Result<Page<E>, StoreError>;

    /// Replaces the stored document with the same id. Returns `false` if none existed.
    async fn replace(&self, entity: &E) -> Result<bool, StoreError>;

    /// Returns `false` if nothing was deleted.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

/// Result of a conditional stock adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockOutcome {
    Applied { remaining: i64 },
    Missing,
    Insufficient { available: i64 },
}

/// Entry point for atomic multi-document writes.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError>;
}

/// Writes staged here become visible together on `commit`, or not at all.
/// Dropping a transaction without committing rolls it back.
///
/// Do not touch a `Repository` of the same datastore while a transaction is
/// open: the in-memory backend serialises access and would wait on itself.
#[async_trait]
pub trait Transaction: Send {
    async fn find_invoice(&mut self, id: &str) -> Result<Option<Invoice>, StoreError>;

    async fn insert_invoice(&mut self, invoice: &Invoice) -> Result<(), StoreError>;

    async fn replace_invoice(&mut self, invoice: &Invoice) -> Result<bool, StoreError>;

    async fn delete_invoice(&mut self, id: &str) -> Result<bool, StoreError>;

    /// Adds `delta` (negative to take stock out) to one product's quantity.
    /// Unless `allow_negative`, a decrement that would go below zero is refused
    /// without changing anything.
    async fn adjust_stock(
        &mut self,
        product_id: &str,
        delta: i64,
        allow_negative: bool,
    ) -> Result<StockOutcome, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// One repository per collection, shared by handlers and services.
#[derive(Clone)]
pub struct Repositories {
    pub clients: Arc<dyn Repository<Client>>,
    pub products: Arc<dyn Repository<Product>>,
    pub services: Arc<dyn Repository<Service>>,
    pub employees: Arc<dyn Repository<Employee>>,
    pub company: Arc<dyn Repository<CompanyProfile>>,
    pub invoices: Arc<dyn Repository<Invoice>>,
}

/// The configured storage backend.
#[derive(Clone)]
pub enum Datastore {
    Mongo(MongoStore),
    Memory(MemoryStore),
}

impl Datastore {
    /// Opens the configured backend. MongoDB indexes are created on connect.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        match config.backend {
            DatabaseBackend::Mongo => {
                let store = MongoStore::connect(config.uri.expose_secret(), &config.name).await?;
                store.initialize_indexes().await?;
                Ok(Datastore::Mongo(store))
            }
            DatabaseBackend::Memory => {
                tracing::info!("Using in-memory datastore");
                Ok(Datastore::Memory(MemoryStore::new()))
            }
        }
    }

    pub fn repositories(&self) -> Repositories {
        match self {
            Datastore::Mongo(store) => store.repositories(),
            Datastore::Memory(store) => store.repositories(),
        }
    }

    pub fn unit_of_work(&self) -> Arc<dyn UnitOfWork> {
        match self {
            Datastore::Mongo(store) => Arc::new(store.clone()),
            Datastore::Memory(store) => Arc::new(store.clone()),
        }
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        match self {
            Datastore::Mongo(store) => store.health_check().await,
            Datastore::Memory(_) => Ok(()),
        }
    }
}
