use axum::{extract::State, Json};
use service_core::error::AppError;
use validator::Validate;

use crate::middleware::OperatorContext;
use crate::models::{CompanyProfile, CompanyProfileInput};
use crate::services::catalog;
use crate::startup::AppState;

pub async fn get_company(
    State(state): State<AppState>,
    _operator: OperatorContext,
) -> Result<Json<CompanyProfile>, AppError> {
    let profile = catalog::company_profile(state.repos.company.as_ref()).await?;
    Ok(Json(profile))
}

pub async fn update_company(
    State(state): State<AppState>,
    operator: OperatorContext,
    Json(input): Json<CompanyProfileInput>,
) -> Result<Json<CompanyProfile>, AppError> {
    operator.require_admin("update the company profile")?;
    input.validate()?;
    let profile = catalog::save_company_profile(state.repos.company.as_ref(), input).await?;
    Ok(Json(profile))
}
