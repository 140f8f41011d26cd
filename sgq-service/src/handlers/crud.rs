//! Generic list/get/create/update/delete handlers shared by the client,
//! product, service and employee collections.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use std::sync::Arc;
use validator::Validate;

use crate::dtos::{ListParams, PageResponse};
use crate::middleware::OperatorContext;
use crate::models::{Client, Editable, Employee, Product, Service};
use crate::startup::AppState;
use crate::store::{Entity, Repository};

/// An [`Editable`] entity exposed over HTTP.
pub trait Resource: Editable {
    fn repository(state: &AppState) -> Arc<dyn Repository<Self>>;
}

impl Resource for Client {
    fn repository(state: &AppState) -> Arc<dyn Repository<Self>> {
        state.repos.clients.clone()
    }
}

impl Resource for Product {
    fn repository(state: &AppState) -> Arc<dyn Repository<Self>> {
        state.repos.products.clone()
    }
}

impl Resource for Service {
    fn repository(state: &AppState) -> Arc<dyn Repository<Self>> {
        state.repos.services.clone()
    }
}

impl Resource for Employee {
    fn repository(state: &AppState) -> Arc<dyn Repository<Self>> {
        state.repos.employees.clone()
    }
}

fn not_found<E: Entity>(id: &str) -> AppError {
    AppError::NotFound(anyhow::anyhow!("{} {} not found", E::LABEL, id))
}

async fn ensure_unique<E: Resource>(
    repo: &dyn Repository<E>,
    entity: &E,
) -> Result<(), AppError> {
    if let Some((field, value)) = entity.unique_key() {
        if let Some(existing) = repo.find_one_by(field, value).await? {
            if existing.id() != entity.id() {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "{} with this {} already exists",
                    E::LABEL,
                    field
                )));
            }
        }
    }
    Ok(())
}

pub async fn list<E: Resource>(
    State(state): State<AppState>,
    _operator: OperatorContext,
    Query(params): Query<ListParams>,
) -> Result<Json<PageResponse<E::View>>, AppError> {
    let query = params.into_query::<E>(&state.config.pagination)?;
    let page = E::repository(&state).list(&query).await?;
    Ok(Json(page.map(E::view).into()))
}

pub async fn get<E: Resource>(
    State(state): State<AppState>,
    _operator: OperatorContext,
    Path(id): Path<String>,
) -> Result<Json<E::View>, AppError> {
    let entity = E::repository(&state)
        .find(&id)
        .await?
        .ok_or_else(|| not_found::<E>(&id))?;
    Ok(Json(entity.view()))
}

pub async fn create<E: Resource>(
    State(state): State<AppState>,
    operator: OperatorContext,
    Json(input): Json<E::Input>,
) -> Result<(StatusCode, Json<E::View>), AppError> {
    if E::ADMIN_WRITES {
        operator.require_admin(&format!("create {}", E::LABEL.to_lowercase()))?;
    }
    input.validate()?;

    let repo = E::repository(&state);
    let entity = E::create(input)?;
    ensure_unique(repo.as_ref(), &entity).await?;
    repo.insert(&entity).await?;

    tracing::info!(
        collection = E::COLLECTION,
        id = %entity.id(),
        operator_id = %operator.operator_id,
        "Document created"
    );
    Ok((StatusCode::CREATED, Json(entity.view())))
}

pub async fn update<E: Resource>(
    State(state): State<AppState>,
    operator: OperatorContext,
    Path(id): Path<String>,
    Json(input): Json<E::Input>,
) -> Result<Json<E::View>, AppError> {
    if E::ADMIN_WRITES {
        operator.require_admin(&format!("update {}", E::LABEL.to_lowercase()))?;
    }
    input.validate()?;

    let repo = E::repository(&state);
    let existing = repo.find(&id).await?.ok_or_else(|| not_found::<E>(&id))?;
    let entity = existing.revise(input)?;
    ensure_unique(repo.as_ref(), &entity).await?;

    if !repo.replace(&entity).await? {
        return Err(not_found::<E>(&id));
    }

    tracing::info!(
        collection = E::COLLECTION,
        id = %id,
        operator_id = %operator.operator_id,
        "Document updated"
    );
    Ok(Json(entity.view()))
}

pub async fn delete<E: Resource>(
    State(state): State<AppState>,
    operator: OperatorContext,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    operator.require_admin(&format!("delete {}", E::LABEL.to_lowercase()))?;

    if !E::repository(&state).delete(&id).await? {
        return Err(not_found::<E>(&id));
    }

    tracing::info!(
        collection = E::COLLECTION,
        id = %id,
        operator_id = %operator.operator_id,
        "Document deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}
