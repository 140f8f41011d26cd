use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::dtos::LoginRequest;
use crate::models::EmployeeView;
use crate::services::credentials::authenticate;
use crate::startup::AppState;

/// Checks an employee's credentials and returns their profile. No token or
/// session is issued; callers send the identity back in operator headers.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<EmployeeView>, AppError> {
    let employee = authenticate(
        state.repos.employees.as_ref(),
        &request.email,
        &request.password,
    )
    .await?;
    Ok(Json(EmployeeView::from(employee)))
}
