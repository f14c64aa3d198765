//! Grid-select inputs and results shared by the services.

use serde::{Deserialize, Serialize};

/// Pagination parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// 1-based page index
    pub page: u32,
    /// items per page
    pub per_page: u32,
}

impl Pagination {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }

    /// Clamp to sane values: page 0 becomes 1, per-page is kept within `1..=100`.
    pub fn normalize(self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, 100),
        }
    }

    /// `(limit, offset)` for SQL, after normalizing.
    pub fn limit_offset(self) -> (u64, u64) {
        let p = self.normalize();
        let limit = p.per_page as u64;
        (limit, (p.page as u64 - 1) * limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, per_page: 20 }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridQuery {
    pub pagination: Pagination,
    /// Free-text filter, matched against the entity's display name.
    pub search: Option<String>,
}

impl GridQuery {
    pub fn page(page: u32, per_page: u32) -> Self {
        Self {
            pagination: Pagination::new(page, per_page),
            search: None,
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Search term, ignoring blank input.
    pub(crate) fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// One page of a grid plus the total number of matching rows.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Page<T> {
    pub(crate) fn new(items: Vec<T>, total: i64, pagination: Pagination) -> Self {
        let p = pagination.normalize();
        Self {
            items,
            total,
            page: p.page,
            per_page: p.per_page,
        }
    }

    pub fn pages(&self) -> i64 {
        let per_page = self.per_page.max(1) as i64;
        (self.total + per_page - 1) / per_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_clamps_zero_to_defaults() {
        let p = Pagination::new(0, 0).normalize();
        assert_eq!(p, Pagination::new(1, 1));
        assert_eq!(Pagination::new(0, 0).limit_offset(), (1, 0));
    }

    #[test]
    fn normalize_clamps_upper_bound() {
        assert_eq!(Pagination::new(5, 1000).limit_offset(), (100, 400));
    }

    #[test]
    fn page_count_rounds_up() {
        let page: Page<u8> = Page::new(vec![], 41, Pagination::new(1, 20));
        assert_eq!(page.pages(), 3);
    }

    #[test]
    fn blank_search_is_ignored() {
        assert_eq!(GridQuery::default().with_search("  ").search_term(), None);
        assert_eq!(GridQuery::default().with_search(" ann ").search_term(), Some("ann"));
    }
}
