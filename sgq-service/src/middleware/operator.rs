//! Request-scoped operator identity.
//!
//! Every business route takes an [`OperatorContext`] extracted from request
//! headers. Nothing about the caller is kept between requests.

use service_core::{
    axum::{async_trait, extract::FromRequestParts, http::request::Parts},
    error::AppError,
};

use crate::models::AccessLevel;

pub const OPERATOR_ID_HEADER: &str = "x-operator-id";
pub const ACCESS_LEVEL_HEADER: &str = "x-access-level";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorContext {
    pub operator_id: String,
    pub access_level: AccessLevel,
}

impl OperatorContext {
    pub fn new(operator_id: impl Into<String>, access_level: AccessLevel) -> Self {
        Self {
            operator_id: operator_id.into(),
            access_level,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.access_level == AccessLevel::Admin
    }

    /// Fails with 403 unless the operator is an admin.
    pub fn require_admin(&self, action: &str) -> Result<(), AppError> {
        if self.is_admin() {
            return Ok(());
        }
        tracing::warn!(
            operator_id = %self.operator_id,
            action = %action,
            "Admin access required"
        );
        Err(AppError::Forbidden(anyhow::anyhow!(
            "Admin access required to {}",
            action
        )))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for OperatorContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let operator_id = parts
            .headers
            .get(OPERATOR_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                AppError::Unauthorized(anyhow::anyhow!("Missing X-Operator-ID header"))
            })?;

        let access_level = match parts.headers.get(ACCESS_LEVEL_HEADER) {
            None => AccessLevel::default(),
            Some(value) => value
                .to_str()
                .map_err(|_| AppError::BadRequest(anyhow::anyhow!("Invalid X-Access-Level header")))?
                .parse::<AccessLevel>()
                .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?,
        };

        Ok(OperatorContext::new(operator_id, access_level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use service_core::axum::http::Request;

    async fn extract(headers: &[(&str, &str)]) -> Result<OperatorContext, AppError> {
        let mut builder = Request::builder().uri("/invoices");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        OperatorContext::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_defaults_to_staff() {
        let context = extract(&[(OPERATOR_ID_HEADER, "emp-1")]).await.unwrap();
        assert_eq!(context.operator_id, "emp-1");
        assert_eq!(context.access_level, AccessLevel::Staff);
        assert!(context.require_admin("delete invoices").is_err());
    }

    #[tokio::test]
    async fn test_admin_header() {
        let context = extract(&[(OPERATOR_ID_HEADER, "emp-1"), (ACCESS_LEVEL_HEADER, "admin")])
            .await
            .unwrap();
        assert!(context.is_admin());
        assert!(context.require_admin("delete invoices").is_ok());
    }

    #[tokio::test]
    async fn test_missing_or_invalid_headers_are_rejected() {
        assert!(matches!(
            extract(&[]).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            extract(&[(OPERATOR_ID_HEADER, "  ")]).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            extract(&[(OPERATOR_ID_HEADER, "emp-1"), (ACCESS_LEVEL_HEADER, "root")]).await,
            Err(AppError::BadRequest(_))
        ));
    }
}
