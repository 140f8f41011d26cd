pub mod catalog;
pub mod client;
pub mod company;
pub mod employee;
pub mod invoice;
pub mod line_item;

pub use catalog::{Product, ProductInput, Service, ServiceInput};
pub use client::{Client, ClientInput};
pub use company::{CompanyProfile, CompanyProfileInput};
pub use employee::{AccessLevel, Employee, EmployeeInput, EmployeeView};
pub use invoice::{Invoice, InvoiceDraft, InvoiceStatus};
pub use line_item::{total_of, ItemKind, LineItem};

use crate::store::Entity;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Serialize};
use service_core::error::AppError;
use validator::{Validate, ValidationError};

/// An entity managed through the generic create/update handlers.
pub trait Editable: Entity {
    /// Request body accepted by create and update.
    type Input: DeserializeOwned + Validate + Send + 'static;
    /// Response shape.
    type View: Serialize + Send + 'static;

    /// Creating or updating requires an admin operator.
    const ADMIN_WRITES: bool = false;

    fn create(input: Self::Input) -> Result<Self, AppError>;

    /// Applies a whole-document update, keeping the id.
    fn revise(self, input: Self::Input) -> Result<Self, AppError>;

    fn view(self) -> Self::View;

    /// A field that must not repeat across documents, with this document's value.
    fn unique_key(&self) -> Option<(&'static str, &str)> {
        None
    }
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut error = ValidationError::new("negative_amount");
        error.message = Some("amount must not be negative".into());
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_negative() {
        assert!(non_negative(&Decimal::ZERO).is_ok());
        assert!(non_negative(&Decimal::new(-0, 2)).is_ok());
        assert!(non_negative(&Decimal::new(1050, 2)).is_ok());
        assert!(non_negative(&Decimal::new(-1, 2)).is_err());
    }
}
