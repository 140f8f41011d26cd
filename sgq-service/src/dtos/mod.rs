use chrono::NaiveDate;
use secrecy::Secret;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

use crate::config::PaginationConfig;
use crate::store::{Condition, Entity, ListQuery, Page};

/// Query string accepted by every list endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    #[serde(rename = "startDate")]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "endDate")]
    pub end_date: Option<NaiveDate>,
}

impl ListParams {
    /// Builds the store query for `E`. Date bounds apply only to entities with
    /// a date field.
    pub fn into_query<E: Entity>(self, pagination: &PaginationConfig) -> Result<ListQuery, AppError> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "startDate must not be after endDate"
                )));
            }
        }

        let mut query = ListQuery::paged(self.page.unwrap_or(1), pagination.limit(self.limit))
            .with_search(self.search);

        if let Some(field) = E::DATE_FIELD {
            if self.start_date.is_some() || self.end_date.is_some() {
                query = query.with_condition(Condition::DateBetween {
                    field,
                    from: self.start_date,
                    to: self.end_date,
                });
            }
        }

        Ok(query)
    }
}

#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> From<Page<T>> for PageResponse<T> {
    fn from(page: Page<T>) -> Self {
        let total_pages = page.total_pages();
        Self {
            total_pages,
            limit: page.limit.unwrap_or(page.total),
            page: page.page,
            total: page.total,
            items: page.items,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: Secret<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Client, Invoice};

    #[test]
    fn test_defaults_and_clamping() {
        let pagination = PaginationConfig::default();
        let query = ListParams::default().into_query::<Invoice>(&pagination).unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, Some(10));
        assert!(query.conditions.is_empty());

        let query = ListParams {
            page: Some(3),
            limit: Some(500),
            ..Default::default()
        }
        .into_query::<Invoice>(&pagination)
        .unwrap();
        assert_eq!(query.limit, Some(100));
        assert_eq!(query.offset(), 200);
    }

    #[test]
    fn test_date_range_only_for_dated_entities() {
        let pagination = PaginationConfig::default();
        let params = || ListParams {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 31),
            ..Default::default()
        };

        let invoices = params().into_query::<Invoice>(&pagination).unwrap();
        assert_eq!(invoices.conditions.len(), 1);

        let clients = params().into_query::<Client>(&pagination).unwrap();
        assert!(clients.conditions.is_empty());
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let params = ListParams {
            start_date: NaiveDate::from_ymd_opt(2024, 2, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            ..Default::default()
        };
        assert!(params
            .into_query::<Invoice>(&PaginationConfig::default())
            .is_err());
    }

    #[test]
    fn test_page_response_reports_total_pages() {
        let response = PageResponse::from(Page {
            items: vec![1, 2, 3],
            total: 23,
            page: 1,
            limit: Some(10),
        });
        assert_eq!(response.total_pages, 3);
        assert_eq!(response.limit, 10);
    }
}
