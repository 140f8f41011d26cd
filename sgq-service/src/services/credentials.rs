use secrecy::Secret;
use service_core::error::AppError;

use crate::models::Employee;
use crate::store::Repository;
use crate::utils::verify_password;

/// Looks the employee up by email and checks the password. Unknown email and
/// wrong password fail the same way.
pub async fn authenticate(
    employees: &dyn Repository<Employee>,
    email: &str,
    password: &Secret<String>,
) -> Result<Employee, AppError> {
    let email = email.trim().to_lowercase();
    let invalid = || AppError::Unauthorized(anyhow::anyhow!("Invalid credentials"));

    let Some(employee) = employees.find_one_by("email", &email).await? else {
        tracing::warn!("Login attempt for unknown email");
        return Err(invalid());
    };

    if verify_password(password, &employee.password_hash).is_err() {
        tracing::warn!(employee_id = %employee.id, "Login attempt with wrong password");
        return Err(invalid());
    }

    tracing::info!(employee_id = %employee.id, "Employee credentials verified");
    Ok(employee)
}
