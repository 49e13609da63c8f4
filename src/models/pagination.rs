//! Page request and paginated response envelope

use serde::{Deserialize, Serialize};

use crate::utils::helpers::calculate_offset;

/// One page of items together with the total count across all pages
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub count: i64,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(count: i64, items: Vec<T>) -> Self {
        Self { count, items }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

/// 1-based page number and page size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    /// Rows to skip; saturates for pages past any reachable row
    pub fn offset(&self) -> i64 {
        calculate_offset(self.page, self.page_size).unwrap_or(i64::MAX)
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }
}

/// Paginated list body: `{count, next, previous, results}`
///
/// `next` and `previous` are page numbers, or null at either end.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Paginated<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    pub fn from_page(page: Page<T>, request: PageRequest) -> Self {
        let seen = request.offset().saturating_add(page.items.len() as i64);
        let next = (seen < page.count).then_some(request.page + 1);
        let previous = (request.page > 1).then_some(request.page - 1);
        Self {
            count: page.count,
            next,
            previous,
            results: page.items,
        }
    }
}
