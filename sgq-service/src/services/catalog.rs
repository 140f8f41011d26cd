//! Catalog reads and the company profile.

use service_core::error::AppError;

use crate::models::{CompanyProfile, CompanyProfileInput, Product};
use crate::store::{Condition, ListQuery, Page, Repository};

/// Products with fewer than `threshold` units on hand.
pub async fn low_stock(
    products: &dyn Repository<Product>,
    threshold: i64,
    query: ListQuery,
) -> Result<Page<Product>, AppError> {
    let query = query.with_condition(Condition::LessThan {
        field: "quantidade",
        value: threshold,
    });
    Ok(products.list(&query).await?)
}

/// The saved profile, or an empty one if none was saved yet.
pub async fn company_profile(
    company: &dyn Repository<CompanyProfile>,
) -> Result<CompanyProfile, AppError> {
    Ok(company
        .find(CompanyProfile::SINGLETON_ID)
        .await?
        .unwrap_or_default())
}

pub async fn save_company_profile(
    company: &dyn Repository<CompanyProfile>,
    input: CompanyProfileInput,
) -> Result<CompanyProfile, AppError> {
    let profile = CompanyProfile::from_input(input);
    if !company.replace(&profile).await? {
        company.insert(&profile).await?;
    }
    tracing::info!("Company profile saved");
    Ok(profile)
}
