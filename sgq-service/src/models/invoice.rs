//! Invoice ("factura") documents and their status policy.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::line_item::{total_of, LineItem};
use super::non_negative;
use crate::store::{Entity, SortOrder};

/// Document status. Ordered proforma < invoice < paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Proforma,
    Invoice,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Proforma => "proforma",
            InvoiceStatus::Invoice => "invoice",
            InvoiceStatus::Paid => "paid",
        }
    }

    /// With `forward_only`, a document may keep its status or move towards paid,
    /// never back. Without it any transition is allowed.
    pub fn can_transition_to(&self, next: InvoiceStatus, forward_only: bool) -> bool {
        !forward_only || next >= *self
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "cliente_id")]
    pub client_id: String,
    /// Client name at the time of the last write.
    #[serde(rename = "cliente_nome", default)]
    pub client_name: String,
    /// Delivery (pickup) date.
    #[serde(rename = "data")]
    pub delivery_date: NaiveDate,
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(rename = "itens")]
    pub items: Vec<LineItem>,
    pub total: Decimal,
    /// Operator who last wrote the document.
    #[serde(
        rename = "funcionario_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub operator_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Invoice {
    const COLLECTION: &'static str = "facturas";
    const LABEL: &'static str = "Invoice";
    const SEARCH_FIELDS: &'static [&'static str] = &["cliente_nome", "itens.nome"];
    const SORT: SortOrder = SortOrder::descending("data");
    const DATE_FIELD: Option<&'static str> = Some("data");

    fn id(&self) -> &str {
        &self.id
    }
}

impl Invoice {
    pub fn new(draft: InvoiceDraft, client_name: String, operator_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: super::new_id(),
            client_id: draft.client_id,
            client_name,
            delivery_date: draft.delivery_date,
            status: draft.status,
            items: draft.items,
            total: draft.total,
            operator_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces every editable field, keeping identity and creation time.
    pub fn revised(
        &self,
        draft: InvoiceDraft,
        client_name: String,
        operator_id: Option<String>,
    ) -> Self {
        Self {
            id: self.id.clone(),
            client_id: draft.client_id,
            client_name,
            delivery_date: draft.delivery_date,
            status: draft.status,
            items: draft.items,
            total: draft.total,
            operator_id,
            created_at: self.created_at,
            updated_at: Utc::now(),
        }
    }
}

/// Invoice content as submitted for create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct InvoiceDraft {
    #[serde(rename = "cliente_id")]
    #[validate(length(min = 1, message = "client is required"))]
    pub client_id: String,
    #[serde(rename = "data")]
    pub delivery_date: NaiveDate,
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(rename = "itens")]
    #[validate(length(min = 1, message = "invoice has no line items"), nested)]
    pub items: Vec<LineItem>,
    #[validate(custom(function = "non_negative"))]
    pub total: Decimal,
}

impl InvoiceDraft {
    /// The total recomputed from the items, `None` if it overflows.
    pub fn computed_total(&self) -> Option<Decimal> {
        total_of(&self.items)
    }

    pub fn total_matches_items(&self) -> bool {
        self.computed_total() == Some(self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemKind;

    fn draft(total: i64) -> InvoiceDraft {
        InvoiceDraft {
            client_id: "c1".to_string(),
            delivery_date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            status: InvoiceStatus::default(),
            items: vec![LineItem {
                kind: ItemKind::Product,
                catalog_id: "p1".to_string(),
                name: "Bolo".to_string(),
                quantity: 3,
                unit_price: Decimal::from(1000),
            }],
            total: Decimal::from(total),
        }
    }

    #[test]
    fn test_status_defaults_to_proforma() {
        assert_eq!(InvoiceStatus::default(), InvoiceStatus::Proforma);
        assert_eq!(
            serde_json::to_value(InvoiceStatus::Paid).unwrap(),
            serde_json::json!("paid")
        );
    }

    #[test]
    fn test_transitions() {
        use InvoiceStatus::*;

        for from in [Proforma, Invoice, Paid] {
            for to in [Proforma, Invoice, Paid] {
                assert!(from.can_transition_to(to, false));
            }
        }

        assert!(Proforma.can_transition_to(Invoice, true));
        assert!(Invoice.can_transition_to(Paid, true));
        assert!(Proforma.can_transition_to(Paid, true));
        assert!(Invoice.can_transition_to(Invoice, true));
        assert!(!Paid.can_transition_to(Invoice, true));
        assert!(!Invoice.can_transition_to(Proforma, true));
    }

    #[test]
    fn test_draft_validation() {
        assert!(draft(3000).validate().is_ok());
        assert!(draft(-1).validate().is_err());

        let mut empty = draft(0);
        empty.items.clear();
        assert!(empty.validate().is_err());

        let mut bad_item = draft(0);
        bad_item.items[0].quantity = 0;
        assert!(bad_item.validate().is_err());
    }

    #[test]
    fn test_total_must_match_items() {
        assert!(draft(3000).total_matches_items());
        assert!(!draft(2999).total_matches_items());
    }

    #[test]
    fn test_overflowing_items_have_no_total() {
        let mut huge = draft(0);
        huge.items[0].quantity = i64::MAX;
        huge.items[0].unit_price = Decimal::from(10_000_000_000i64);
        assert_eq!(huge.computed_total(), None);
        assert!(!huge.total_matches_items());
    }

    #[test]
    fn test_revised_keeps_identity() {
        let original = Invoice::new(draft(3000), "Ana".to_string(), Some("op".to_string()));
        let mut changed = draft(2000);
        changed.items[0].quantity = 2;
        changed.status = InvoiceStatus::Paid;

        let revised = original.revised(changed, "Ana Silva".to_string(), None);
        assert_eq!(revised.id, original.id);
        assert_eq!(revised.created_at, original.created_at);
        assert_eq!(revised.status, InvoiceStatus::Paid);
        assert_eq!(revised.client_name, "Ana Silva");
        assert_eq!(revised.total, Decimal::from(2000));
    }

    #[test]
    fn test_persisted_field_names() {
        let invoice = Invoice::new(draft(3000), "Ana".to_string(), None);
        let value = serde_json::to_value(&invoice).unwrap();
        assert_eq!(value["_id"], serde_json::json!(invoice.id));
        assert_eq!(value["cliente_id"], "c1");
        assert_eq!(value["data"], "2024-05-10");
        assert_eq!(value["status"], "proforma");
        assert_eq!(value["itens"][0]["produto_id"], "p1");
        assert!(value.get("funcionario_id").is_none());
    }
}
