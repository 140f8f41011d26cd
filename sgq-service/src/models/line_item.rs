//! Line items embedded in an invoice.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::non_negative;

/// What a line item refers to. Only products carry stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ItemKind {
    #[default]
    #[serde(rename = "produto")]
    Product,
    #[serde(rename = "servico", alias = "serviço")]
    Service,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Product => "produto",
            ItemKind::Service => "servico",
        }
    }
}

/// One product or service sold on an invoice. Name and unit price are
/// snapshots taken when the catalog entry was chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct LineItem {
    #[serde(rename = "tipo", default)]
    pub kind: ItemKind,
    #[serde(rename = "produto_id")]
    #[validate(length(min = 1, message = "line item has no catalog entry"))]
    pub catalog_id: String,
    #[serde(rename = "nome", default)]
    pub name: String,
    #[serde(rename = "quantidade")]
    #[validate(range(min = 1, message = "quantity must be positive"))]
    pub quantity: i64,
    #[serde(rename = "preco")]
    #[validate(custom(function = "non_negative"))]
    pub unit_price: Decimal,
}

impl LineItem {
    /// Quantity × unit price, `None` if it does not fit a `Decimal`.
    pub fn subtotal(&self) -> Option<Decimal> {
        Decimal::from(self.quantity).checked_mul(self.unit_price)
    }

    pub fn is_stock_bearing(&self) -> bool {
        self.kind == ItemKind::Product
    }
}

/// Sum of quantity × unit price over `items`, `None` on overflow.
pub fn total_of(items: &[LineItem]) -> Option<Decimal> {
    items
        .iter()
        .try_fold(Decimal::ZERO, |total, item| total.checked_add(item.subtotal()?))
}
