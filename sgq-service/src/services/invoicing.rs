//! Invoice lifecycle: validation, atomic writes with stock reconciliation,
//! listing and the read models built on top of invoices.

use chrono::NaiveDate;
use metrics::counter;
use serde::Serialize;
use std::sync::Arc;
use validator::Validate;

use super::{InvoiceError, StockReconciler};
use crate::config::{InventoryPolicy, InvoicingPolicy};
use crate::middleware::OperatorContext;
use crate::models::{
    Client, CompanyProfile, Invoice, InvoiceDraft, InvoiceStatus, Product, Service,
};
use crate::store::{Condition, ListQuery, Page, Repositories, Transaction, UnitOfWork};

/// An invoice due for pickup soon, with the client's contact details.
#[derive(Debug, Clone, Serialize)]
pub struct UpcomingPickup {
    pub invoice: Invoice,
    pub client_name: String,
    pub client_phone: Option<String>,
    pub days_until_pickup: i64,
}

/// Everything needed to render an invoice as a printable document.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDocument {
    pub invoice: Invoice,
    pub client: Option<Client>,
    pub company: CompanyProfile,
}

/// Lookup lists for an invoice form.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceFormData {
    pub company: CompanyProfile,
    pub products: Vec<Product>,
    pub services: Vec<Service>,
    pub clients: Vec<Client>,
}

#[derive(Clone)]
pub struct InvoiceService {
    repos: Repositories,
    unit_of_work: Arc<dyn UnitOfWork>,
    stock: StockReconciler,
    inventory: InventoryPolicy,
    invoicing: InvoicingPolicy,
}

impl InvoiceService {
    pub fn new(
        repos: Repositories,
        unit_of_work: Arc<dyn UnitOfWork>,
        inventory: InventoryPolicy,
        invoicing: InvoicingPolicy,
    ) -> Self {
        Self {
            repos,
            unit_of_work,
            stock: StockReconciler::new(&inventory),
            inventory,
            invoicing,
        }
    }

    /// Inserts the invoice and takes its products out of stock in one unit of
    /// work. Any failure leaves both invoices and stock untouched. New invoices
    /// start as proforma or invoice, never paid.
    #[tracing::instrument(skip(self, draft, operator), fields(operator_id = %operator.operator_id))]
    pub async fn create(
        &self,
        draft: InvoiceDraft,
        operator: &OperatorContext,
    ) -> Result<Invoice, InvoiceError> {
        validate_draft(&draft)?;
        if draft.status == InvoiceStatus::Paid {
            return Err(InvoiceError::Validation(
                "a new invoice cannot start as paid".to_string(),
            ));
        }
        let client = self.resolve_client(&draft.client_id).await?;

        let invoice = Invoice::new(draft, client.name, Some(operator.operator_id.clone()));

        let mut tx = self.unit_of_work.begin().await?;
        match self.write_new(tx.as_mut(), &invoice).await {
            Ok(decrements) => {
                tx.commit().await?;
                counter!("sgq_invoices_created_total", "status" => invoice.status.as_str())
                    .increment(1);
                tracing::info!(
                    invoice_id = %invoice.id,
                    client_id = %invoice.client_id,
                    total = %invoice.total,
                    stock_decrements = decrements,
                    "Invoice created"
                );
                Ok(invoice)
            }
            Err(err) => Err(abort(tx, "create", err).await),
        }
    }

    async fn write_new(
        &self,
        tx: &mut dyn Transaction,
        invoice: &Invoice,
    ) -> Result<usize, InvoiceError> {
        tx.insert_invoice(invoice).await?;
        self.stock.apply_items(tx, &invoice.items).await
    }

    /// Replaces the editable content of an invoice. Stock follows the edit only
    /// when the inventory policy asks for it.
    #[tracing::instrument(skip(self, draft, operator), fields(operator_id = %operator.operator_id))]
    pub async fn update(
        &self,
        id: &str,
        draft: InvoiceDraft,
        operator: &OperatorContext,
    ) -> Result<Invoice, InvoiceError> {
        validate_draft(&draft)?;
        let client = self.resolve_client(&draft.client_id).await?;

        let mut tx = self.unit_of_work.begin().await?;
        match self
            .write_revision(tx.as_mut(), id, draft, client.name, operator)
            .await
        {
            Ok(invoice) => {
                tx.commit().await?;
                tracing::info!(
                    invoice_id = %invoice.id,
                    status = %invoice.status,
                    total = %invoice.total,
                    "Invoice updated"
                );
                Ok(invoice)
            }
            Err(err) => Err(abort(tx, "update", err).await),
        }
    }

    async fn write_revision(
        &self,
        tx: &mut dyn Transaction,
        id: &str,
        draft: InvoiceDraft,
        client_name: String,
        operator: &OperatorContext,
    ) -> Result<Invoice, InvoiceError> {
        let existing = tx
            .find_invoice(id)
            .await?
            .ok_or_else(|| InvoiceError::InvoiceNotFound(id.to_string()))?;

        if !existing
            .status
            .can_transition_to(draft.status, self.invoicing.enforce_forward_status)
        {
            return Err(InvoiceError::InvalidTransition {
                from: existing.status,
                to: draft.status,
            });
        }

        let revised = existing.revised(draft, client_name, Some(operator.operator_id.clone()));
        if !tx.replace_invoice(&revised).await? {
            return Err(InvoiceError::InvoiceNotFound(id.to_string()));
        }

        if self.inventory.adjust_stock_on_edit {
            self.stock
                .reconcile_edit(tx, &existing.items, &revised.items)
                .await?;
        }

        Ok(revised)
    }

    /// Removes an invoice. Stock is given back only when the inventory policy
    /// asks for it.
    #[tracing::instrument(skip(self, operator), fields(operator_id = %operator.operator_id))]
    pub async fn delete(
        &self,
        id: &str,
        operator: &OperatorContext,
    ) -> Result<Invoice, InvoiceError> {
        let mut tx = self.unit_of_work.begin().await?;
        match self.write_removal(tx.as_mut(), id).await {
            Ok(invoice) => {
                tx.commit().await?;
                tracing::info!(invoice_id = %invoice.id, "Invoice deleted");
                Ok(invoice)
            }
            Err(err) => Err(abort(tx, "delete", err).await),
        }
    }

    async fn write_removal(
        &self,
        tx: &mut dyn Transaction,
        id: &str,
    ) -> Result<Invoice, InvoiceError> {
        let invoice = tx
            .find_invoice(id)
            .await?
            .ok_or_else(|| InvoiceError::InvoiceNotFound(id.to_string()))?;

        if !tx.delete_invoice(id).await? {
            return Err(InvoiceError::InvoiceNotFound(id.to_string()));
        }

        if self.inventory.restore_stock_on_delete {
            self.stock.restore_items(tx, &invoice.items).await?;
        }

        Ok(invoice)
    }

    pub async fn get(&self, id: &str) -> Result<Invoice, InvoiceError> {
        self.repos
            .invoices
            .find(id)
            .await?
            .ok_or_else(|| InvoiceError::InvoiceNotFound(id.to_string()))
    }

    /// Newest delivery date first.
    pub async fn list(&self, query: &ListQuery) -> Result<Page<Invoice>, InvoiceError> {
        Ok(self.repos.invoices.list(query).await?)
    }

    /// Invoices with a delivery date in `[today, today + pickup_window_days)`,
    /// soonest first. Invoices whose client is gone are left out.
    pub async fn upcoming_pickups(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<UpcomingPickup>, InvoiceError> {
        let window = self.invoicing.pickup_window_days;
        if window <= 0 {
            return Ok(Vec::new());
        }
        let last_day = today + chrono::Duration::days(window - 1);

        let query = ListQuery::default().with_condition(Condition::DateBetween {
            field: "data",
            from: Some(today),
            to: Some(last_day),
        });
        let invoices = self.repos.invoices.list(&query).await?.items;

        let mut pickups = Vec::with_capacity(invoices.len());
        for invoice in invoices {
            let Some(client) = self.repos.clients.find(&invoice.client_id).await? else {
                tracing::warn!(
                    invoice_id = %invoice.id,
                    client_id = %invoice.client_id,
                    "Skipping pickup for missing client"
                );
                continue;
            };
            pickups.push(UpcomingPickup {
                days_until_pickup: (invoice.delivery_date - today).num_days(),
                client_name: client.name,
                client_phone: client.phone,
                invoice,
            });
        }

        pickups.sort_by(|a, b| {
            a.days_until_pickup
                .cmp(&b.days_until_pickup)
                .then_with(|| a.invoice.id.cmp(&b.invoice.id))
        });
        Ok(pickups)
    }

    /// The invoice with its client and the company profile, for printing.
    pub async fn export(&self, id: &str) -> Result<InvoiceDocument, InvoiceError> {
        let invoice = self.get(id).await?;
        let client = self.repos.clients.find(&invoice.client_id).await?;
        if client.is_none() {
            tracing::warn!(
                invoice_id = %invoice.id,
                client_id = %invoice.client_id,
                "Exporting invoice whose client no longer exists"
            );
        }
        let company = self.company_profile().await?;

        Ok(InvoiceDocument {
            invoice,
            client,
            company,
        })
    }

    pub async fn form_data(&self) -> Result<InvoiceFormData, InvoiceError> {
        let everything = ListQuery::default();
        Ok(InvoiceFormData {
            company: self.company_profile().await?,
            products: self.repos.products.list(&everything).await?.items,
            services: self.repos.services.list(&everything).await?.items,
            clients: self.repos.clients.list(&everything).await?.items,
        })
    }

    async fn company_profile(&self) -> Result<CompanyProfile, InvoiceError> {
        Ok(self
            .repos
            .company
            .find(CompanyProfile::SINGLETON_ID)
            .await?
            .unwrap_or_default())
    }

    async fn resolve_client(&self, client_id: &str) -> Result<Client, InvoiceError> {
        self.repos
            .clients
            .find(client_id)
            .await?
            .ok_or_else(|| InvoiceError::ClientNotFound(client_id.to_string()))
    }
}

/// Field rules plus the total-equals-items invariant.
fn validate_draft(draft: &InvoiceDraft) -> Result<(), InvoiceError> {
    draft.validate()?;
    let computed = draft.computed_total().ok_or_else(|| {
        InvoiceError::Validation("line item amounts are too large".to_string())
    })?;
    if draft.total != computed {
        return Err(InvoiceError::Validation(format!(
            "total {} does not match line items ({})",
            draft.total, computed
        )));
    }
    Ok(())
}

async fn abort(tx: Box<dyn Transaction>, operation: &'static str, err: InvoiceError) -> InvoiceError {
    if let Err(rollback_err) = tx.rollback().await {
        tracing::error!(
            operation = operation,
            error = %rollback_err,
            "Failed to roll back unit of work"
        );
    }
    counter!("sgq_invoice_rollbacks_total", "operation" => operation, "reason" => err.kind())
        .increment(1);
    tracing::warn!(operation = operation, error = %err, "Invoice write rolled back");
    err
}
