use super::{
    escape_regex, Condition, Entity, ListQuery, Page, Repositories, Repository, SortOrder,
    StockOutcome, StoreError, Transaction, UnitOfWork,
};
use crate::models::{Client, CompanyProfile, Employee, Invoice, Product, Service};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument},
    Client as MongoClient, ClientSession, Collection, Database, IndexModel,
};
use service_core::error::AppError;
use std::sync::Arc;

#[derive(Clone)]
pub struct MongoStore {
    client: MongoClient,
    db: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(database = %database, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for sgq-service");

        let indexes: [(&str, Document, &str, bool); 6] = [
            (Invoice::COLLECTION, doc! { "data": -1, "_id": 1 }, "delivery_date_idx", false),
            (Invoice::COLLECTION, doc! { "cliente_id": 1 }, "client_idx", false),
            (Product::COLLECTION, doc! { "nome": 1 }, "product_name_idx", false),
            (Product::COLLECTION, doc! { "quantidade": 1 }, "product_stock_idx", false),
            (Client::COLLECTION, doc! { "nome": 1 }, "client_name_idx", false),
            (Employee::COLLECTION, doc! { "email": 1 }, "employee_email_idx", true),
        ];

        for (collection, keys, name, unique) in indexes {
            let index = IndexModel::builder()
                .keys(keys)
                .options(
                    IndexOptions::builder()
                        .name(name.to_string())
                        .unique(unique)
                        .build(),
                )
                .build();

            self.db
                .collection::<Document>(collection)
                .create_index(index, None)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to create index {} on {}: {}", name, collection, e);
                    AppError::from(e)
                })?;
            tracing::info!("Created index {} on {}", name, collection);
        }

        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    pub fn client(&self) -> &MongoClient {
        &self.client
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn repositories(&self) -> Repositories {
        Repositories {
            clients: Arc::new(MongoRepository::<Client>::new(&self.db)),
            products: Arc::new(MongoRepository::<Product>::new(&self.db)),
            services: Arc::new(MongoRepository::<Service>::new(&self.db)),
            employees: Arc::new(MongoRepository::<Employee>::new(&self.db)),
            company: Arc::new(MongoRepository::<CompanyProfile>::new(&self.db)),
            invoices: Arc::new(MongoRepository::<Invoice>::new(&self.db)),
        }
    }
}

pub struct MongoRepository<E: Entity> {
    collection: Collection<E>,
}

impl<E: Entity> MongoRepository<E> {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(E::COLLECTION),
        }
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for MongoRepository<E> {
    async fn insert(&self, entity: &E) -> Result<(), StoreError> {
        self.collection.insert_one(entity, None).await?;
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Option<E>, StoreError> {
        Ok(self.collection.find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_one_by(&self, field: &str, value: &str) -> Result<Option<E>, StoreError> {
        let mut filter = Document::new();
        filter.insert(field, value);
        Ok(self.collection.find_one(filter, None).await?)
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<E>, StoreError> {
        let filter = filter_for(query, E::SEARCH_FIELDS);

        let total = self
            .collection
            .count_documents(filter.clone(), None)
            .await?;

        let mut options = FindOptions::builder()
            .sort(sort_for(E::SORT))
            .skip(query.offset())
            .build();
        options.limit = query.limit.map(|limit| limit as i64);

        let items: Vec<E> = self
            .collection
            .find(filter, options)
            .await?
            .try_collect()
            .await?;

        Ok(Page {
            items,
            total,
            page: query.page,
            limit: query.limit,
        })
    }

    async fn replace(&self, entity: &E) -> Result<bool, StoreError> {
        let result = self
            .collection
            .replace_one(doc! { "_id": entity.id() }, entity, None)
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let result = self.collection.delete_one(doc! { "_id": id }, None).await?;
        Ok(result.deleted_count > 0)
    }
}

/// Translates a listing query into a MongoDB filter document.
pub(crate) fn filter_for(query: &ListQuery, search_fields: &[&str]) -> Document {
    let mut clauses: Vec<Document> = Vec::new();

    if let Some(search) = query.search.as_deref() {
        if !search_fields.is_empty() {
            let pattern = escape_regex(search);
            let alternatives: Vec<Document> = search_fields
                .iter()
                .map(|field| {
                    let mut clause = Document::new();
                    clause.insert(*field, doc! { "$regex": pattern.clone(), "$options": "i" });
                    clause
                })
                .collect();
            clauses.push(doc! { "$or": alternatives });
        }
    }

    for condition in &query.conditions {
        match condition {
            Condition::LessThan { field, value } => {
                let mut clause = Document::new();
                clause.insert(*field, doc! { "$lt": *value });
                clauses.push(clause);
            }
            Condition::DateBetween { field, from, to } => {
                let mut range = Document::new();
                if let Some(from) = from {
                    range.insert("$gte", from.to_string());
                }
                if let Some(to) = to {
                    range.insert("$lte", to.to_string());
                }
                if !range.is_empty() {
                    let mut clause = Document::new();
                    clause.insert(*field, range);
                    clauses.push(clause);
                }
            }
        }
    }

    match clauses.len() {
        0 => Document::new(),
        1 => clauses.remove(0),
        _ => doc! { "$and": clauses },
    }
}

fn sort_for(order: SortOrder) -> Document {
    let mut sort = Document::new();
    sort.insert(order.field, if order.descending { -1 } else { 1 });
    if order.field != "_id" {
        sort.insert("_id", 1);
    }
    sort
}

#[async_trait]
impl UnitOfWork for MongoStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        Ok(Box::new(MongoTransaction {
            session,
            invoices: self.db.collection(Invoice::COLLECTION),
            products: self.db.collection(Product::COLLECTION),
        }))
    }
}

/// A client session with an open multi-document transaction. The driver aborts
/// the transaction if the session is dropped before commit.
pub struct MongoTransaction {
    session: ClientSession,
    invoices: Collection<Invoice>,
    products: Collection<Product>,
}

#[async_trait]
impl Transaction for MongoTransaction {
    async fn find_invoice(&mut self, id: &str) -> Result<Option<Invoice>, StoreError> {
        Ok(self
            .invoices
            .find_one_with_session(doc! { "_id": id }, None, &mut self.session)
            .await?)
    }

    async fn insert_invoice(&mut self, invoice: &Invoice) -> Result<(), StoreError> {
        self.invoices
            .insert_one_with_session(invoice, None, &mut self.session)
            .await?;
        Ok(())
    }

    async fn replace_invoice(&mut self, invoice: &Invoice) -> Result<bool, StoreError> {
        let result = self
            .invoices
            .replace_one_with_session(
                doc! { "_id": invoice.id.as_str() },
                invoice,
                None,
                &mut self.session,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete_invoice(&mut self, id: &str) -> Result<bool, StoreError> {
        let result = self
            .invoices
            .delete_one_with_session(doc! { "_id": id }, None, &mut self.session)
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn adjust_stock(
        &mut self,
        product_id: &str,
        delta: i64,
        allow_negative: bool,
    ) -> Result<StockOutcome, StoreError> {
        let mut filter = doc! { "_id": product_id };
        if delta < 0 && !allow_negative {
            let required = -delta;
            filter.insert("quantidade", doc! { "$gte": required });
        }

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let updated = self
            .products
            .find_one_and_update_with_session(
                filter,
                doc! { "$inc": { "quantidade": delta } },
                options,
                &mut self.session,
            )
            .await?;

        if let Some(product) = updated {
            return Ok(StockOutcome::Applied {
                remaining: product.quantity,
            });
        }

        // Nothing matched: tell a missing product apart from a short one.
        let current = self
            .products
            .find_one_with_session(doc! { "_id": product_id }, None, &mut self.session)
            .await?;

        Ok(match current {
            Some(product) => StockOutcome::Insufficient {
                available: product.quantity,
            },
            None => StockOutcome::Missing,
        })
    }

    async fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        self.session.commit_transaction().await?;
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), StoreError> {
        self.session.abort_transaction().await?;
        Ok(())
    }
}
