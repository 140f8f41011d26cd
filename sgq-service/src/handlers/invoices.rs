use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use service_core::error::AppError;

use crate::dtos::{ListParams, PageResponse};
use crate::middleware::OperatorContext;
use crate::models::{Invoice, InvoiceDraft};
use crate::services::{InvoiceDocument, InvoiceFormData, UpcomingPickup};
use crate::startup::AppState;

#[derive(Debug, Deserialize)]
pub struct PickupParams {
    /// Reference day, defaults to the current UTC date.
    pub today: Option<NaiveDate>,
}

pub async fn list_invoices(
    State(state): State<AppState>,
    _operator: OperatorContext,
    Query(params): Query<ListParams>,
) -> Result<Json<PageResponse<Invoice>>, AppError> {
    let query = params.into_query::<Invoice>(&state.config.pagination)?;
    let page = state.invoices.list(&query).await?;
    Ok(Json(page.into()))
}

pub async fn create_invoice(
    State(state): State<AppState>,
    operator: OperatorContext,
    Json(draft): Json<InvoiceDraft>,
) -> Result<(StatusCode, Json<Invoice>), AppError> {
    let invoice = state.invoices.create(draft, &operator).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    _operator: OperatorContext,
    Path(id): Path<String>,
) -> Result<Json<Invoice>, AppError> {
    Ok(Json(state.invoices.get(&id).await?))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    operator: OperatorContext,
    Path(id): Path<String>,
    Json(draft): Json<InvoiceDraft>,
) -> Result<Json<Invoice>, AppError> {
    operator.require_admin("edit invoices")?;
    let invoice = state.invoices.update(&id, draft, &operator).await?;
    Ok(Json(invoice))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    operator: OperatorContext,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    operator.require_admin("delete invoices")?;
    state.invoices.delete(&id, &operator).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn upcoming_pickups(
    State(state): State<AppState>,
    _operator: OperatorContext,
    Query(params): Query<PickupParams>,
) -> Result<Json<Vec<UpcomingPickup>>, AppError> {
    let today = params.today.unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(state.invoices.upcoming_pickups(today).await?))
}

pub async fn form_data(
    State(state): State<AppState>,
    _operator: OperatorContext,
) -> Result<Json<InvoiceFormData>, AppError> {
    Ok(Json(state.invoices.form_data().await?))
}

pub async fn invoice_document(
    State(state): State<AppState>,
    _operator: OperatorContext,
    Path(id): Path<String>,
) -> Result<Json<InvoiceDocument>, AppError> {
    Ok(Json(state.invoices.export(&id).await?))
}
