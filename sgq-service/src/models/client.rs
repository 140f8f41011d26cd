use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use validator::Validate;

use super::{new_id, Editable};
use crate::store::{Entity, SortOrder};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    /// Tax number.
    #[serde(default)]
    pub nif: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "telefone", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "endereco", default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Entity for Client {
    const COLLECTION: &'static str = "clientes";
    const LABEL: &'static str = "Client";
    const SEARCH_FIELDS: &'static [&'static str] = &["nome", "email", "nif"];
    const SORT: SortOrder = SortOrder::ascending("nome");

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ClientInput {
    #[serde(rename = "nome")]
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[serde(default)]
    pub nif: String,
    #[serde(default)]
    #[validate(email(message = "invalid email"))]
    pub email: Option<String>,
    #[serde(rename = "telefone", default)]
    pub phone: Option<String>,
    #[serde(rename = "endereco", default)]
    pub address: Option<String>,
}

impl Editable for Client {
    type Input = ClientInput;
    type View = Client;

    fn create(input: ClientInput) -> Result<Self, AppError> {
        Ok(Self {
            id: new_id(),
            name: input.name,
            nif: input.nif,
            email: input.email,
            phone: input.phone,
            address: input.address,
        })
    }

    fn revise(self, input: ClientInput) -> Result<Self, AppError> {
        Ok(Self {
            id: self.id,
            ..Self::create(input)?
        })
    }

    fn view(self) -> Client {
        self
    }
}
