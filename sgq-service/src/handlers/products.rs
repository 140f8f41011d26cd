use axum::{
    extract::{Query, State},
    Json,
};
use service_core::error::AppError;

use crate::dtos::{ListParams, PageResponse};
use crate::middleware::OperatorContext;
use crate::models::Product;
use crate::services::catalog;
use crate::startup::AppState;

pub async fn low_stock(
    State(state): State<AppState>,
    _operator: OperatorContext,
    Query(params): Query<ListParams>,
) -> Result<Json<PageResponse<Product>>, AppError> {
    let query = params.into_query::<Product>(&state.config.pagination)?;
    let page = catalog::low_stock(
        state.repos.products.as_ref(),
        state.config.inventory.low_stock_threshold,
        query,
    )
    .await?;
    Ok(Json(page.into()))
}
