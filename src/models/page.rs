use serde::{Deserialize, Serialize};

/// Page size used when the requested size is missing or out of range
pub const DEFAULT_PAGE_SIZE: i64 = 10;
/// Largest page size a caller may request
pub const MAX_PAGE_SIZE: i64 = 100;

/// Normalized pagination parameters
///
/// Queries built from a `PageRequest` fetch one row more than the page size;
/// the extra row only tells [`Page::from_overfetch`] whether a next page exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    page: i64,
    page_size: i64,
}

impl PageRequest {
    /// Normalizes raw caller input: `page >= 1`, `page_size` in `[1, 100]`
    /// with anything else falling back to the default of 10
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let page_size = match page_size {
            Some(size) if (1..=MAX_PAGE_SIZE).contains(&size) => size,
            _ => DEFAULT_PAGE_SIZE,
        };
        Self { page, page_size }
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    /// Rows to skip
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    /// Rows to request from the store: one past the page size
    pub fn fetch_limit(&self) -> i64 {
        self.page_size + 1
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of an ordered result set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl<T> Page<T> {
    /// Builds a page from rows fetched with [`PageRequest::fetch_limit`]
    pub fn from_overfetch(mut rows: Vec<T>, total_count: i64, request: PageRequest) -> Self {
        let page_size = request.page_size() as usize;
        let has_next_page = rows.len() > page_size;
        rows.truncate(page_size);

        Self {
            items: rows,
            total_count,
            has_next_page,
            has_previous_page: request.page() > 1,
        }
    }

    /// Slices an already ordered, fully materialized result set
    pub fn from_ordered(all: Vec<T>, total_count: i64, request: PageRequest) -> Self {
        let rows = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.fetch_limit() as usize)
            .collect();
        Self::from_overfetch(rows, total_count, request)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            has_next_page: self.has_next_page,
            has_previous_page: self.has_previous_page,
        }
    }
}
