//! Backend-neutral listing queries.

use chrono::NaiveDate;
use serde::Serialize;

/// Default ordering of a collection. Ties are always broken by `_id` ascending so
/// that offset pagination is stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub field: &'static str,
    pub descending: bool,
}

impl SortOrder {
    pub const fn ascending(field: &'static str) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    pub const fn descending(field: &'static str) -> Self {
        Self {
            field,
            descending: true,
        }
    }
}

/// Extra field predicates combined (AND) with the free-text search.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Integer field strictly below `value`.
    LessThan { field: &'static str, value: i64 },
    /// Date field (stored as `YYYY-MM-DD`) within the inclusive bounds.
    DateBetween {
        field: &'static str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    /// 1-based.
    pub page: u64,
    /// `None` returns every matching document.
    pub limit: Option<u64>,
    pub search: Option<String>,
    pub conditions: Vec<Condition>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: None,
            search: None,
            conditions: Vec::new(),
        }
    }
}

impl ListQuery {
    pub fn paged(page: u64, limit: u64) -> Self {
        Self {
            page: page.max(1),
            limit: Some(limit.max(1)),
            ..Self::default()
        }
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Number of documents skipped before the requested page. Saturates, so a
    /// page far past the end is simply empty.
    pub fn offset(&self) -> u64 {
        match self.limit {
            Some(limit) => (self.page.max(1) - 1).saturating_mul(limit),
            None => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Count of the whole filtered set, not just this page.
    pub total: u64,
    pub page: u64,
    pub limit: Option<u64>,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        match self.limit {
            Some(limit) if limit > 0 => self.total.div_ceil(limit),
            _ if self.total > 0 => 1,
            _ => 0,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }
}

/// Escapes regex metacharacters so user search text matches literally.
pub fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if "\\.+*?()|[]{}^$#&-~".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
