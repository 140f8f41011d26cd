use super::{
    Condition, Entity, ListQuery, Page, Repositories, Repository, StockOutcome, StoreError,
    Transaction, UnitOfWork,
};
use crate::models::{Client, CompanyProfile, Employee, Invoice, Product, Service};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Documents = BTreeMap<String, Value>;
type Collections = HashMap<&'static str, Documents>;

const STOCK_FIELD: &str = "quantidade";

/// Process-local datastore holding every collection as JSON documents keyed by id.
/// Units of work take the lock for their whole lifetime and publish a staged copy
/// on commit.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<Mutex<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repositories(&self) -> Repositories {
        Repositories {
            clients: Arc::new(self.repository::<Client>()),
            products: Arc::new(self.repository::<Product>()),
            services: Arc::new(self.repository::<Service>()),
            employees: Arc::new(self.repository::<Employee>()),
            company: Arc::new(self.repository::<CompanyProfile>()),
            invoices: Arc::new(self.repository::<Invoice>()),
        }
    }

    pub fn repository<E: Entity>(&self) -> MemoryRepository<E> {
        MemoryRepository {
            collections: self.collections.clone(),
            _entity: PhantomData,
        }
    }
}

pub struct MemoryRepository<E> {
    collections: Arc<Mutex<Collections>>,
    _entity: PhantomData<fn() -> E>,
}

#[async_trait]
impl<E: Entity> Repository<E> for MemoryRepository<E> {
    async fn insert(&self, entity: &E) -> Result<(), StoreError> {
        let document = serde_json::to_value(entity)?;
        let mut collections = self.collections.lock().await;
        collections
            .entry(E::COLLECTION)
            .or_default()
            .insert(entity.id().to_string(), document);
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Option<E>, StoreError> {
        let collections = self.collections.lock().await;
        let document = collections
            .get(E::COLLECTION)
            .and_then(|documents| documents.get(id))
            .cloned();
        Ok(document.map(serde_json::from_value).transpose()?)
    }

    async fn find_one_by(&self, field: &str, value: &str) -> Result<Option<E>, StoreError> {
        let path: Vec<&str> = field.split('.').collect();
        let collections = self.collections.lock().await;
        let document = collections
            .get(E::COLLECTION)
            .into_iter()
            .flat_map(|documents| documents.values())
            .find(|document| {
                values_at(document, &path)
                    .iter()
                    .any(|found| found.as_str() == Some(value))
            })
            .cloned();
        Ok(document.map(serde_json::from_value).transpose()?)
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<E>, StoreError> {
        let collections = self.collections.lock().await;

        let mut matching: Vec<(&String, &Value)> = collections
            .get(E::COLLECTION)
            .into_iter()
            .flat_map(|documents| documents.iter())
            .filter(|(_, document)| matches(document, query, E::SEARCH_FIELDS))
            .collect();

        let sort_path: Vec<&str> = E::SORT.field.split('.').collect();
        matching.sort_by(|(a_id, a), (b_id, b)| {
            let by_field = compare_values(
                values_at(a, &sort_path).first().copied(),
                values_at(b, &sort_path).first().copied(),
            );
            let by_field = if E::SORT.descending {
                by_field.reverse()
            } else {
                by_field
            };
            by_field.then_with(|| a_id.cmp(b_id))
        });

        let total = matching.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let take = query
            .limit
            .map(|limit| usize::try_from(limit).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        let items = matching
            .into_iter()
            .skip(offset)
            .take(take)
            .map(|(_, document)| serde_json::from_value(document.clone()))
            .collect::<Result<Vec<E>, _>>()?;

        Ok(Page {
            items,
            total,
            page: query.page,
            limit: query.limit,
        })
    }

    async fn replace(&self, entity: &E) -> Result<bool, StoreError> {
        let document = serde_json::to_value(entity)?;
        let mut collections = self.collections.lock().await;
        match collections
            .get_mut(E::COLLECTION)
            .and_then(|documents| documents.get_mut(entity.id()))
        {
            Some(existing) => {
                *existing = document;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut collections = self.collections.lock().await;
        Ok(collections
            .get_mut(E::COLLECTION)
            .and_then(|documents| documents.remove(id))
            .is_some())
    }
}

/// Collects every value reachable through a dotted path. Arrays met along the way
/// are searched element by element.
fn values_at<'a>(value: &'a Value, path: &[&str]) -> Vec<&'a Value> {
    let mut found = Vec::new();
    collect_at(value, path, &mut found);
    found
}

fn collect_at<'a>(value: &'a Value, path: &[&str], found: &mut Vec<&'a Value>) {
    if let Value::Array(items) = value {
        for item in items {
            collect_at(item, path, found);
        }
        return;
    }
    match path.split_first() {
        None => found.push(value),
        Some((head, rest)) => {
            if let Some(next) = value.get(*head) {
                collect_at(next, rest, found);
            }
        }
    }
}

fn matches(document: &Value, query: &ListQuery, search_fields: &[&str]) -> bool {
    if let Some(search) = query.search.as_deref() {
        if !search_fields.is_empty() {
            let needle = search.to_lowercase();
            let hit = search_fields.iter().any(|field| {
                let path: Vec<&str> = field.split('.').collect();
                values_at(document, &path).iter().any(|value| {
                    value
                        .as_str()
                        .map(|text| text.to_lowercase().contains(&needle))
                        .unwrap_or(false)
                })
            });
            if !hit {
                return false;
            }
        }
    }

    query.conditions.iter().all(|condition| match condition {
        Condition::LessThan { field, value } => {
            let path: Vec<&str> = field.split('.').collect();
            values_at(document, &path)
                .iter()
                .any(|found| found.as_i64().map(|n| n < *value).unwrap_or(false))
        }
        Condition::DateBetween { field, from, to } => {
            if from.is_none() && to.is_none() {
                return true;
            }
            let path: Vec<&str> = field.split('.').collect();
            values_at(document, &path).iter().any(|found| {
                let Some(date) = found.as_str() else {
                    return false;
                };
                let after_start = from.map_or(true, |from| date >= from.to_string().as_str());
                let before_end = to.map_or(true, |to| date <= to.to_string().as_str());
                after_start && before_end
            })
        }
    })
}

/// Orders missing values first, then numbers, then strings.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => a
                .as_f64()
                .partial_cmp(&b.as_f64())
                .unwrap_or(Ordering::Equal),
            (Value::Number(_), _) => Ordering::Less,
            (_, Value::Number(_)) => Ordering::Greater,
            _ => a.to_string().cmp(&b.to_string()),
        },
    }
}

#[async_trait]
impl UnitOfWork for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError> {
        let guard = self.collections.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, staged }))
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<Collections>,
    staged: Collections,
}

impl MemoryTransaction {
    fn invoices(&mut self) -> &mut Documents {
        self.staged.entry(Invoice::COLLECTION).or_default()
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn find_invoice(&mut self, id: &str) -> Result<Option<Invoice>, StoreError> {
        let document = self.invoices().get(id).cloned();
        Ok(document.map(serde_json::from_value).transpose()?)
    }

    async fn insert_invoice(&mut self, invoice: &Invoice) -> Result<(), StoreError> {
        let document = serde_json::to_value(invoice)?;
        self.invoices().insert(invoice.id.clone(), document);
        Ok(())
    }

    async fn replace_invoice(&mut self, invoice: &Invoice) -> Result<bool, StoreError> {
        let document = serde_json::to_value(invoice)?;
        match self.invoices().get_mut(&invoice.id) {
            Some(existing) => {
                *existing = document;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_invoice(&mut self, id: &str) -> Result<bool, StoreError> {
        Ok(self.invoices().remove(id).is_some())
    }

    async fn adjust_stock(
        &mut self,
        product_id: &str,
        delta: i64,
        allow_negative: bool,
    ) -> Result<StockOutcome, StoreError> {
        let Some(product) = self
            .staged
            .get_mut(Product::COLLECTION)
            .and_then(|products| products.get_mut(product_id))
        else {
            return Ok(StockOutcome::Missing);
        };

        let available = product
            .get(STOCK_FIELD)
            .and_then(Value::as_i64)
            .unwrap_or(0);
        let Some(remaining) = available.checked_add(delta) else {
            return Ok(StockOutcome::Insufficient { available });
        };
        if delta < 0 && remaining < 0 && !allow_negative {
            return Ok(StockOutcome::Insufficient { available });
        }

        product[STOCK_FIELD] = Value::from(remaining);
        Ok(StockOutcome::Applied { remaining })
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
