//! Page requests and result pages

use serde::{Deserialize, Serialize};

use crate::query::error::{QueryError, QueryResult};

/// A validated request for one page of results
///
/// # Example
///
/// ```rust
/// use food_service::query::PageRequest;
///
/// let page = PageRequest::new(2, 10).unwrap();
/// assert_eq!(page.offset(), 20);
/// assert!(PageRequest::new(-1, 10).is_err());
/// assert!(PageRequest::new(0, 0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    index: u64,
    size: u64,
}

impl PageRequest {
    /// Validate a zero-based page index and a page size
    ///
    /// # Errors
    ///
    /// `InvalidPage` when `index < 0` or `size < 1`.
    pub fn new(index: i64, size: i64) -> QueryResult<Self> {
        let index = u64::try_from(index)
            .map_err(|_| QueryError::invalid_page(format!("Page index {index} is negative")))?;
        let size = u64::try_from(size)
            .ok()
            .filter(|size| *size >= 1)
            .ok_or_else(|| QueryError::invalid_page(format!("Page size {size} is below 1")))?;
        Ok(Self { index, size })
    }

    /// A request for the first page
    ///
    /// # Errors
    ///
    /// `InvalidPage` when `size < 1`.
    pub fn first(size: i64) -> QueryResult<Self> {
        Self::new(0, size)
    }

    /// Zero-based page index
    #[must_use]
    pub const fn index(&self) -> u64 {
        self.index
    }

    /// Maximum number of items on the page
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Number of rows to skip
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.index.saturating_mul(self.size)
    }
}

/// One page of results with paging metadata
///
/// # Example
///
/// ```rust
/// use food_service::query::{Page, PageRequest};
///
/// let request = PageRequest::new(1, 10).unwrap();
/// let page = Page::new(vec![1; 10], 25, request);
/// assert_eq!(page.total_pages, 3);
/// assert!(page.has_next);
/// assert!(page.has_previous);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Items on this page, at most `page_size`
    pub items: Vec<T>,
    /// Rows matching the query across all pages
    pub total_elements: u64,
    /// Zero-based index of this page
    pub page_index: u64,
    /// Requested page size
    pub page_size: u64,
    /// Number of pages needed for `total_elements`
    pub total_pages: u64,
    /// Whether a later page has items
    pub has_next: bool,
    /// Whether this is not the first page
    pub has_previous: bool,
}

impl<T> Page<T> {
    /// Assemble a page, deriving the paging metadata
    #[must_use]
    pub fn new(items: Vec<T>, total_elements: u64, request: PageRequest) -> Self {
        let total_pages = calculate_total_pages(total_elements, request.size);
        Self {
            items,
            total_elements,
            page_index: request.index,
            page_size: request.size,
            total_pages,
            has_next: request.index.saturating_add(1) < total_pages,
            has_previous: request.index > 0,
        }
    }

    /// Transform the items, keeping the metadata
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_elements: self.total_elements,
            page_index: self.page_index,
            page_size: self.page_size,
            total_pages: self.total_pages,
            has_next: self.has_next,
            has_previous: self.has_previous,
        }
    }

    /// Number of items on this page
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether this page holds no items
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Calculate total pages, rounding up
fn calculate_total_pages(total: u64, size: u64) -> u64 {
    let size = size.max(1);
    total.saturating_add(size).saturating_sub(1) / size
}
