//! In-memory composition of invoice line items.
//!
//! A [`LineItemComposer`] is what an invoice form holds while the operator
//! adds rows, picks catalog entries and edits quantities. Nothing is persisted;
//! [`LineItemComposer::into_draft`] produces the payload for create or update.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use service_core::error::AppError;
use thiserror::Error;

use crate::models::{InvoiceDraft, InvoiceStatus, ItemKind, LineItem, Product, Service};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComposerError {
    #[error("No line item at position {index} (have {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invoice has no line items")]
    Empty,

    #[error("Line item {index} has no product or service selected")]
    Unselected { index: usize },

    #[error("Line item {index} must have a positive quantity")]
    NonPositiveQuantity { index: usize },

    #[error("Line item {index} has a negative price")]
    NegativePrice { index: usize },

    #[error("Line item {index} pushes the total past the supported range")]
    TotalOverflow { index: usize },
}

impl From<ComposerError> for AppError {
    fn from(err: ComposerError) -> Self {
        AppError::BadRequest(anyhow::anyhow!(err))
    }
}

/// A product or service taken from the loaded catalog lists.
#[derive(Debug, Clone, Copy)]
pub enum CatalogEntry<'a> {
    Product(&'a Product),
    Service(&'a Service),
}

impl CatalogEntry<'_> {
    /// Products are recognised by their sale price, services by their price.
    pub fn kind(&self) -> ItemKind {
        match self {
            CatalogEntry::Product(_) => ItemKind::Product,
            CatalogEntry::Service(_) => ItemKind::Service,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            CatalogEntry::Product(product) => &product.id,
            CatalogEntry::Service(service) => &service.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CatalogEntry::Product(product) => &product.name,
            CatalogEntry::Service(service) => &service.title,
        }
    }

    pub fn price(&self) -> Decimal {
        match self {
            CatalogEntry::Product(product) => product.sale_price,
            CatalogEntry::Service(service) => service.price,
        }
    }
}

impl<'a> From<&'a Product> for CatalogEntry<'a> {
    fn from(product: &'a Product) -> Self {
        CatalogEntry::Product(product)
    }
}

impl<'a> From<&'a Service> for CatalogEntry<'a> {
    fn from(service: &'a Service) -> Self {
        CatalogEntry::Service(service)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ComposedLine {
    kind: ItemKind,
    catalog_id: Option<String>,
    name: String,
    quantity: i64,
    unit_price: Decimal,
}

impl Default for ComposedLine {
    fn default() -> Self {
        Self {
            kind: ItemKind::Product,
            catalog_id: None,
            name: String::new(),
            quantity: 1,
            unit_price: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineItemComposer {
    lines: Vec<ComposedLine>,
}

impl LineItemComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from the items of an existing invoice, for editing.
    pub fn from_items(items: &[LineItem]) -> Self {
        Self {
            lines: items
                .iter()
                .map(|item| ComposedLine {
                    kind: item.kind,
                    catalog_id: Some(item.catalog_id.clone()),
                    name: item.name.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Appends an empty row (nothing selected, quantity 1, price 0) and returns
    /// its index.
    pub fn add_line_item(&mut self) -> usize {
        self.lines.push(ComposedLine::default());
        self.lines.len() - 1
    }

    /// Points a row at a catalog entry, snapshotting its name and price.
    pub fn select_catalog_entry<'a>(
        &mut self,
        index: usize,
        entry: impl Into<CatalogEntry<'a>>,
    ) -> Result<(), ComposerError> {
        let entry = entry.into();
        let line = self.line_mut(index)?;
        line.kind = entry.kind();
        line.catalog_id = Some(entry.id().to_string());
        line.name = entry.name().to_string();
        line.unit_price = entry.price();
        Ok(())
    }

    pub fn update_quantity(&mut self, index: usize, quantity: i64) -> Result<(), ComposerError> {
        self.line_mut(index)?.quantity = quantity;
        Ok(())
    }

    pub fn update_price(&mut self, index: usize, price: Decimal) -> Result<(), ComposerError> {
        self.line_mut(index)?.unit_price = price;
        Ok(())
    }

    pub fn remove_line_item(&mut self, index: usize) -> Result<(), ComposerError> {
        self.check_index(index)?;
        self.lines.remove(index);
        Ok(())
    }

    /// Σ quantity × price over the current rows. Recomputed on every call;
    /// fails with the first row whose amount overflows.
    pub fn compute_total(&self) -> Result<Decimal, ComposerError> {
        self.lines
            .iter()
            .enumerate()
            .try_fold(Decimal::ZERO, |total, (index, line)| {
                Decimal::from(line.quantity)
                    .checked_mul(line.unit_price)
                    .and_then(|subtotal| total.checked_add(subtotal))
                    .ok_or(ComposerError::TotalOverflow { index })
            })
    }

    /// Checks every row and builds the submission payload with a fresh total.
    pub fn into_draft(
        self,
        client_id: impl Into<String>,
        delivery_date: NaiveDate,
        status: InvoiceStatus,
    ) -> Result<InvoiceDraft, ComposerError> {
        if self.lines.is_empty() {
            return Err(ComposerError::Empty);
        }

        let total = self.compute_total();
        let items = self
            .lines
            .into_iter()
            .enumerate()
            .map(|(index, line)| {
                let catalog_id = line
                    .catalog_id
                    .ok_or(ComposerError::Unselected { index })?;
                if line.quantity <= 0 {
                    return Err(ComposerError::NonPositiveQuantity { index });
                }
                if line.unit_price < Decimal::ZERO {
                    return Err(ComposerError::NegativePrice { index });
                }
                Ok(LineItem {
                    kind: line.kind,
                    catalog_id,
                    name: line.name,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(InvoiceDraft {
            client_id: client_id.into(),
            delivery_date,
            status,
            items,
            total: total?,
        })
    }

    fn check_index(&self, index: usize) -> Result<(), ComposerError> {
        if index < self.lines.len() {
            Ok(())
        } else {
            Err(ComposerError::IndexOutOfRange {
                index,
                len: self.lines.len(),
            })
        }
    }

    fn line_mut(&mut self, index: usize) -> Result<&mut ComposedLine, ComposerError> {
        self.check_index(index)?;
        Ok(&mut self.lines[index])
    }
}
