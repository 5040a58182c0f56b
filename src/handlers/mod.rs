pub mod addresses;
pub mod carts;
pub mod categories;
pub mod orders;
pub mod payment_methods;
pub mod products;
pub mod reviews;
pub mod tables;
pub mod users;
pub mod vendors;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{Page, PageRequest, DEFAULT_PAGE_LIMIT};

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl PageParams {
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

pub(crate) fn default_page() -> i64 {
    1
}

pub(crate) fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

impl<T> PageResponse<T> {
    pub fn from_page<U>(page: Page<U>, f: impl FnMut(U) -> T) -> Self {
        let page = page.map(f);
        Self {
            items: page.items,
            total: page.total,
            page: page.page,
            limit: page.limit,
        }
    }
}

// ── Wire formats ─────────────────────────────────────────────────────────────

/// Amounts travel as decimal strings with two places, e.g. "9.90".
pub(crate) fn money(amount: &BigDecimal) -> String {
    amount.with_scale(2).to_string()
}

pub(crate) fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339()
}
