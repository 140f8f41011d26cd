//! Product and service catalog entries.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use validator::Validate;

use super::{new_id, non_negative, Editable};
use crate::store::{Entity, SortOrder};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    /// On-hand quantity.
    #[serde(rename = "quantidade")]
    pub quantity: i64,
    #[serde(rename = "preco_custo", default)]
    pub cost_price: Decimal,
    #[serde(rename = "preco_venda")]
    pub sale_price: Decimal,
}

impl Entity for Product {
    const COLLECTION: &'static str = "produtos";
    const LABEL: &'static str = "Product";
    const SEARCH_FIELDS: &'static [&'static str] = &["nome", "sku"];
    const SORT: SortOrder = SortOrder::ascending("nome");

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProductInput {
    #[serde(rename = "nome")]
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(rename = "quantidade", default)]
    #[validate(range(min = 0, message = "quantity must not be negative"))]
    pub quantity: i64,
    #[serde(rename = "preco_custo", default)]
    #[validate(custom(function = "non_negative"))]
    pub cost_price: Decimal,
    #[serde(rename = "preco_venda")]
    #[validate(custom(function = "non_negative"))]
    pub sale_price: Decimal,
}

impl Editable for Product {
    type Input = ProductInput;
    type View = Product;

    fn create(input: ProductInput) -> Result<Self, AppError> {
        Ok(Self {
            id: new_id(),
            name: input.name,
            sku: input.sku,
            quantity: input.quantity,
            cost_price: input.cost_price,
            sale_price: input.sale_price,
        })
    }

    fn revise(self, input: ProductInput) -> Result<Self, AppError> {
        Ok(Self {
            id: self.id,
            ..Self::create(input)?
        })
    }

    fn view(self) -> Product {
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "descricao", default)]
    pub description: String,
    #[serde(rename = "preco")]
    pub price: Decimal,
    #[serde(rename = "categoria", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Entity for Service {
    const COLLECTION: &'static str = "servicos";
    const LABEL: &'static str = "Service";
    const SEARCH_FIELDS: &'static [&'static str] = &["titulo", "categoria"];
    const SORT: SortOrder = SortOrder::ascending("titulo");

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ServiceInput {
    #[serde(rename = "titulo")]
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[serde(rename = "descricao", default)]
    pub description: String,
    #[serde(rename = "preco")]
    #[validate(custom(function = "non_negative"))]
    pub price: Decimal,
    #[serde(rename = "categoria", default)]
    pub category: Option<String>,
}

impl Editable for Service {
    type Input = ServiceInput;
    type View = Service;

    fn create(input: ServiceInput) -> Result<Self, AppError> {
        Ok(Self {
            id: new_id(),
            title: input.title,
            description: input.description,
            price: input.price,
            category: input.category,
        })
    }

    fn revise(self, input: ServiceInput) -> Result<Self, AppError> {
        Ok(Self {
            id: self.id,
            ..Self::create(input)?
        })
    }

    fn view(self) -> Service {
        self
    }
}
