//! The paginator and page result types.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Page requested when none is given.
pub const DEFAULT_PAGE: usize = 1;

/// Page size used when none is given.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Page metadata, computed from a total count without touching any items.
///
/// # Invariants
///
/// - `page >= 1` and `page_size >= 1`
/// - `total_pages == max(1, ceil(total_items / page_size))`
/// - `page <= total_pages` (requests past the end land on the last page)
/// - `has_next == page < total_pages`, `has_prev == page > 1`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageInfo {
    /// Effective (clamped) 1-based page number.
    pub page: usize,
    /// Effective (clamped) page size.
    pub page_size: usize,
    /// Number of items after filtering, before pagination.
    pub total_items: usize,
    /// Number of pages, at least 1.
    pub total_pages: usize,
    /// Whether a later page exists.
    pub has_next: bool,
    /// Whether an earlier page exists.
    pub has_prev: bool,
}

impl PageInfo {
    /// Computes page metadata for `total_items` items.
    ///
    /// Never fails: a zero page or page size is raised to 1 and a page past
    /// the end is lowered to the last page.
    #[must_use]
    pub fn compute(total_items: usize, page: usize, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let total_pages = total_items.div_ceil(page_size).max(1);
        let page = page.clamp(1, total_pages);

        Self {
            page,
            page_size,
            total_items,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }

    /// Index of the first item of this page.
    #[must_use]
    pub fn offset(&self) -> usize {
        (self.page - 1) * self.page_size
    }

    /// Index range of this page's items, bounded by `total_items`.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        let start = self.offset().min(self.total_items);
        let end = start.saturating_add(self.page_size).min(self.total_items);
        start..end
    }

    /// Number of items this page holds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.range().len()
    }

    /// Returns true if this page holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One page of entities plus its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult<T> {
    /// Entities on this page, in query order.
    pub items: Vec<T>,
    /// Effective (clamped) 1-based page number.
    pub page: usize,
    /// Effective page size.
    pub page_size: usize,
    /// Number of items after filtering, before pagination.
    pub total_items: usize,
    /// Number of pages, at least 1.
    pub total_pages: usize,
    /// Whether a later page exists.
    pub has_next: bool,
    /// Whether an earlier page exists.
    pub has_prev: bool,
}

impl<T> PageResult<T> {
    /// Assembles a page from already-sliced items and their metadata.
    #[must_use]
    pub fn from_parts(items: Vec<T>, info: PageInfo) -> Self {
        Self {
            items,
            page: info.page,
            page_size: info.page_size,
            total_items: info.total_items,
            total_pages: info.total_pages,
            has_next: info.has_next,
            has_prev: info.has_prev,
        }
    }

    /// An empty first page.
    #[must_use]
    pub fn empty(page_size: usize) -> Self {
        Self::from_parts(Vec::new(), PageInfo::compute(0, DEFAULT_PAGE, page_size))
    }

    /// Returns the metadata of this page.
    #[must_use]
    pub fn info(&self) -> PageInfo {
        PageInfo {
            page: self.page,
            page_size: self.page_size,
            total_items: self.total_items,
            total_pages: self.total_pages,
            has_next: self.has_next,
            has_prev: self.has_prev,
        }
    }

    /// Maps the items, keeping the metadata.
    pub fn map<U, F>(self, f: F) -> PageResult<U>
    where
        F: FnMut(T) -> U,
    {
        let info = self.info();
        PageResult::from_parts(self.items.into_iter().map(f).collect(), info)
    }
}

/// Slices an owned sequence into one page.
///
/// See [`PageInfo::compute`] for the clamping rules. Always returns a valid,
/// possibly empty page.
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> PageResult<T> {
    let info = PageInfo::compute(items.len(), page, page_size);
    let range = info.range();
    let items = items
        .into_iter()
        .skip(range.start)
        .take(range.len())
        .collect();
    PageResult::from_parts(items, info)
}

/// Slices a borrowed sequence into one page, cloning only the page's items.
pub fn paginate_slice<T: Clone>(items: &[T], page: usize, page_size: usize) -> PageResult<T> {
    let info = PageInfo::compute(items.len(), page, page_size);
    PageResult::from_parts(items[info.range()].to_vec(), info)
}
