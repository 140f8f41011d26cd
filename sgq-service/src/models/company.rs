use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::store::{Entity, SortOrder};

/// The business's own details, printed on exported documents. Stored as a single
/// document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "nome", default)]
    pub name: String,
    #[serde(rename = "endereco", default)]
    pub address: String,
    #[serde(rename = "telefone", default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "banco_nome", default)]
    pub bank_name: String,
    #[serde(rename = "banco_iban", default)]
    pub bank_iban: String,
    #[serde(rename = "banco_bic", default)]
    pub bank_bic: String,
}

impl CompanyProfile {
    pub const SINGLETON_ID: &'static str = "empresa";

    pub fn from_input(input: CompanyProfileInput) -> Self {
        Self {
            id: Self::SINGLETON_ID.to_string(),
            name: input.name,
            address: input.address,
            phone: input.phone,
            email: input.email,
            bank_name: input.bank_name,
            bank_iban: input.bank_iban,
            bank_bic: input.bank_bic,
        }
    }
}

impl Default for CompanyProfile {
    fn default() -> Self {
        Self::from_input(CompanyProfileInput::default())
    }
}

impl Entity for CompanyProfile {
    const COLLECTION: &'static str = "empresa";
    const LABEL: &'static str = "Company profile";
    const SEARCH_FIELDS: &'static [&'static str] = &[];
    const SORT: SortOrder = SortOrder::ascending("_id");

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CompanyProfileInput {
    #[serde(rename = "nome")]
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[serde(rename = "endereco", default)]
    pub address: String,
    #[serde(rename = "telefone", default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "banco_nome", default)]
    pub bank_name: String,
    #[serde(rename = "banco_iban", default)]
    pub bank_iban: String,
    #[serde(rename = "banco_bic", default)]
    pub bank_bic: String,
}
