//! Product stock adjustments driven by invoice writes.
//!
//! Every method runs inside a caller-owned [`Transaction`]; an error means the
//! caller must roll the whole unit of work back.

use metrics::counter;
use std::collections::BTreeMap;

use super::InvoiceError;
use crate::config::InventoryPolicy;
use crate::models::LineItem;
use crate::store::{StockOutcome, Transaction};

#[derive(Debug, Clone)]
pub struct StockReconciler {
    allow_negative: bool,
}

impl StockReconciler {
    pub fn new(policy: &InventoryPolicy) -> Self {
        Self {
            allow_negative: policy.allow_negative_stock,
        }
    }

    /// Takes `quantity` units out of one product. Returns the remaining stock.
    pub async fn decrement(
        &self,
        tx: &mut dyn Transaction,
        product_id: &str,
        quantity: i64,
    ) -> Result<i64, InvoiceError> {
        if quantity <= 0 {
            return Err(InvoiceError::Validation(format!(
                "stock decrement for product {} must be positive, got {}",
                product_id, quantity
            )));
        }

        match tx
            .adjust_stock(product_id, -quantity, self.allow_negative)
            .await?
        {
            StockOutcome::Applied { remaining } => {
                counter!("sgq_stock_adjustments_total", "direction" => "decrement").increment(1);
                tracing::debug!(
                    product_id = %product_id,
                    quantity = quantity,
                    remaining = remaining,
                    "Stock decremented"
                );
                Ok(remaining)
            }
            StockOutcome::Missing => {
                tracing::warn!(product_id = %product_id, "Stock decrement on missing product");
                Err(InvoiceError::ProductNotFound(product_id.to_string()))
            }
            StockOutcome::Insufficient { available } => {
                tracing::warn!(
                    product_id = %product_id,
                    requested = quantity,
                    available = available,
                    "Insufficient stock"
                );
                Err(InvoiceError::InsufficientStock {
                    product_id: product_id.to_string(),
                    requested: quantity,
                    available,
                })
            }
        }
    }

    /// Puts `quantity` units back. A product that no longer exists is skipped
    /// and `None` returned.
    pub async fn restore(
        &self,
        tx: &mut dyn Transaction,
        product_id: &str,
        quantity: i64,
    ) -> Result<Option<i64>, InvoiceError> {
        if quantity <= 0 {
            return Ok(None);
        }

        match tx.adjust_stock(product_id, quantity, true).await? {
            StockOutcome::Applied { remaining } => {
                counter!("sgq_stock_adjustments_total", "direction" => "restore").increment(1);
                tracing::debug!(
                    product_id = %product_id,
                    quantity = quantity,
                    remaining = remaining,
                    "Stock restored"
                );
                Ok(Some(remaining))
            }
            StockOutcome::Missing => {
                tracing::warn!(
                    product_id = %product_id,
                    quantity = quantity,
                    "Product no longer exists, stock not restored"
                );
                Ok(None)
            }
            StockOutcome::Insufficient { available } => {
                tracing::warn!(
                    product_id = %product_id,
                    quantity = quantity,
                    available = available,
                    "Restoring would overflow the stock level, stock not restored"
                );
                Ok(None)
            }
        }
    }

    /// Decrements stock for every product item. Service items are skipped.
    /// Returns the number of decrements applied.
    pub async fn apply_items(
        &self,
        tx: &mut dyn Transaction,
        items: &[LineItem],
    ) -> Result<usize, InvoiceError> {
        let mut applied = 0;
        for item in items.iter().filter(|item| item.is_stock_bearing()) {
            self.decrement(tx, &item.catalog_id, item.quantity).await?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Gives back the stock taken by `items`. Returns the number of products
    /// actually restored.
    pub async fn restore_items(
        &self,
        tx: &mut dyn Transaction,
        items: &[LineItem],
    ) -> Result<usize, InvoiceError> {
        let mut restored = 0;
        for (product_id, quantity) in demand(items) {
            if self.restore(tx, &product_id, quantity).await?.is_some() {
                restored += 1;
            }
        }
        Ok(restored)
    }

    /// Applies the per-product difference between the items of an invoice
    /// before and after an edit. Returns the number of products adjusted.
    pub async fn reconcile_edit(
        &self,
        tx: &mut dyn Transaction,
        before: &[LineItem],
        after: &[LineItem],
    ) -> Result<usize, InvoiceError> {
        let mut adjusted = 0;
        for (product_id, change) in net_change(before, after) {
            if change > 0 {
                self.decrement(tx, &product_id, change).await?;
                adjusted += 1;
            } else if self.restore(tx, &product_id, -change).await?.is_some() {
                adjusted += 1;
            }
        }
        Ok(adjusted)
    }
}

/// Units of each product taken by `items`.
fn demand(items: &[LineItem]) -> BTreeMap<String, i64> {
    let mut totals = BTreeMap::new();
    for item in items.iter().filter(|item| item.is_stock_bearing()) {
        let total = totals.entry(item.catalog_id.clone()).or_insert(0i64);
        *total = total.saturating_add(item.quantity);
    }
    totals
}

/// Additional units each product must give up going from `before` to `after`.
/// Negative values are units to give back. Unchanged products are left out.
fn net_change(before: &[LineItem], after: &[LineItem]) -> BTreeMap<String, i64> {
    let mut change = demand(after);
    for (product_id, quantity) in demand(before) {
        let delta = change.entry(product_id).or_insert(0i64);
        *delta = delta.saturating_sub(quantity);
    }
    change.retain(|_, delta| *delta != 0);
    change
}
