//! Response envelopes.

use mockbase_engine::Paginated;
use serde::Serialize;

/// `{ "data": ... }` wrapper for single results.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Navigation totals for a list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationMeta {
    pub total: usize,
    pub current_page: usize,
    pub per_page: usize,
    pub total_pages: usize,
}

/// `{ "data": [...], "pagination": {...} }` wrapper for list results.
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> From<Paginated<T>> for ListResponse<T> {
    fn from(page: Paginated<T>) -> Self {
        Self {
            pagination: PaginationMeta {
                total: page.total,
                current_page: page.page,
                per_page: page.page_size,
                total_pages: page.total_pages,
            },
            data: page.items,
        }
    }
}
