//! Employee accounts. The password hash never leaves the service.

use secrecy::Secret;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use validator::Validate;

use super::{new_id, Editable};
use crate::store::{Entity, SortOrder};
use crate::utils::password::{hash_password, password_strength};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Admin,
    #[default]
    #[serde(rename = "funcionario")]
    Staff,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Admin => "admin",
            AccessLevel::Staff => "funcionario",
        }
    }
}

impl std::str::FromStr for AccessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(AccessLevel::Admin),
            "funcionario" | "funcionário" => Ok(AccessLevel::Staff),
            other => Err(format!("Unknown access level: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    pub password_hash: String,
    #[serde(rename = "telefone", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "endereco", default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(rename = "nivel_acesso", default)]
    pub access_level: AccessLevel,
}

impl Entity for Employee {
    const COLLECTION: &'static str = "funcionarios";
    const LABEL: &'static str = "Employee";
    const SEARCH_FIELDS: &'static [&'static str] = &["nome", "email"];
    const SORT: SortOrder = SortOrder::ascending("nome");

    fn id(&self) -> &str {
        &self.id
    }
}

/// Employee as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeView {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    #[serde(rename = "telefone", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "endereco", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(rename = "nivel_acesso")]
    pub access_level: AccessLevel,
}

impl From<Employee> for EmployeeView {
    fn from(employee: Employee) -> Self {
        Self {
            id: employee.id,
            name: employee.name,
            email: employee.email,
            phone: employee.phone,
            address: employee.address,
            access_level: employee.access_level,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct EmployeeInput {
    #[serde(rename = "nome")]
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "invalid email"))]
    pub email: String,
    /// Required on create. On update, omitting it keeps the current password.
    #[serde(default)]
    pub password: Option<Secret<String>>,
    #[serde(rename = "telefone", default)]
    pub phone: Option<String>,
    #[serde(rename = "endereco", default)]
    pub address: Option<String>,
    #[serde(rename = "nivel_acesso", default)]
    pub access_level: AccessLevel,
}

fn check_strength(password: &Secret<String>) -> Result<(), AppError> {
    password_strength(password).map_err(|error| {
        let mut errors = validator::ValidationErrors::new();
        errors.add("password", error);
        AppError::ValidationError(errors)
    })
}

impl Editable for Employee {
    type Input = EmployeeInput;
    type View = EmployeeView;

    const ADMIN_WRITES: bool = true;

    fn create(input: EmployeeInput) -> Result<Self, AppError> {
        let password = input
            .password
            .as_ref()
            .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Password is required")))?;
        check_strength(password)?;
        let password_hash = hash_password(password)?;

        Ok(Self {
            id: new_id(),
            name: input.name,
            email: input.email.to_lowercase(),
            password_hash,
            phone: input.phone,
            address: input.address,
            access_level: input.access_level,
        })
    }

    fn revise(self, input: EmployeeInput) -> Result<Self, AppError> {
        let password_hash = match input.password.as_ref() {
            Some(password) => {
                check_strength(password)?;
                hash_password(password)?
            }
            None => self.password_hash,
        };

        Ok(Self {
            id: self.id,
            name: input.name,
            email: input.email.to_lowercase(),
            password_hash,
            phone: input.phone,
            address: input.address,
            access_level: input.access_level,
        })
    }

    fn view(self) -> EmployeeView {
        EmployeeView::from(self)
    }

    fn unique_key(&self) -> Option<(&'static str, &str)> {
        Some(("email", &self.email))
    }
}
