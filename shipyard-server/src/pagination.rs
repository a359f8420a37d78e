//! Pagination utilities
//!
//! List endpoints accept `?page=&per_page=` and answer with a [`Page`]
//! envelope. Out-of-range pages are clamped rather than rejected.

use serde::{Deserialize, Serialize};
use shipyard_common::config::ServerSection;

/// `?page=&per_page=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    /// Page number (1-indexed)
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PageParams {
    /// Page size after applying the configured default and maximum
    pub fn per_page(&self, server: &ServerSection) -> i64 {
        let max = i64::from(server.max_page_size).max(1);
        self.per_page
            .unwrap_or_else(|| i64::from(server.default_page_size))
            .clamp(1, max)
    }

    pub fn paginate(&self, server: &ServerSection, total_results: i64) -> Pagination {
        calculate_pagination(total_results, self.page.unwrap_or(1), self.per_page(server))
    }
}

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    pub per_page: i64,
    /// Total number of pages
    pub total_pages: i64,
    /// Offset for SQL LIMIT/OFFSET query
    pub offset: i64,
}

/// Calculate pagination metadata from total results and requested page
///
/// Ensures page is within valid bounds [1, total_pages]
///
/// # Examples
/// ```
/// use shipyard_server::pagination::calculate_pagination;
///
/// // 250 total results at 100 per page = 3 pages (100 + 100 + 50)
/// let p = calculate_pagination(250, 2, 100);
/// assert_eq!(p.page, 2);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 100);
///
/// // Requesting out-of-bounds page gets clamped
/// let p = calculate_pagination(250, 99, 100);
/// assert_eq!(p.page, 3);
/// assert_eq!(p.offset, 200);
/// ```
pub fn calculate_pagination(total_results: i64, requested_page: i64, per_page: i64) -> Pagination {
    let per_page = per_page.max(1);
    let total_results = total_results.max(0);
    let total_pages = (total_results + per_page - 1) / per_page;
    let page = requested_page.max(1).min(total_pages.max(1));
    let offset = (page - 1) * per_page;

    Pagination {
        page,
        per_page,
        total_pages,
        offset,
    }
}

/// List response envelope
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, pagination: Pagination, total: i64) -> Self {
        Self {
            items,
            page: pagination.page,
            per_page: pagination.per_page,
            total,
            total_pages: pagination.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_normal() {
        let p = calculate_pagination(250, 2, 100);
        assert_eq!(p.page, 2);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.offset, 100);
    }

    #[test]
    fn test_pagination_out_of_bounds_high() {
        let p = calculate_pagination(150, 99, 100);
        assert_eq!(p.page, 2); // Clamped to last page
        assert_eq!(p.total_pages, 2);
        assert_eq!(p.offset, 100);
    }

    #[test]
    fn test_pagination_out_of_bounds_low() {
        let p = calculate_pagination(150, -3, 100);
        assert_eq!(p.page, 1);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_pagination_empty() {
        let p = calculate_pagination(0, 1, 25);
        assert_eq!(p.page, 1);
        assert_eq!(p.total_pages, 0);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_pagination_exact_page_boundary() {
        let p = calculate_pagination(50, 2, 25);
        assert_eq!(p.page, 2);
        assert_eq!(p.total_pages, 2);
        assert_eq!(p.offset, 25);
    }

    #[test]
    fn test_per_page_defaults_and_limits() {
        let server = ServerSection::default();

        let params = PageParams::default();
        assert_eq!(params.per_page(&server), 25);

        let params = PageParams { page: None, per_page: Some(1000) };
        assert_eq!(params.per_page(&server), 100);

        let params = PageParams { page: None, per_page: Some(0) };
        assert_eq!(params.per_page(&server), 1);
    }

    #[test]
    fn test_page_envelope() {
        let pagination = calculate_pagination(3, 1, 2);
        let page = Page::new(vec!["a", "b"], pagination, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.per_page, 2);
        assert_eq!(page.items.len(), 2);
    }
}
