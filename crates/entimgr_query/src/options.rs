//! Query options shared by the filter engine, the paginator and strategies.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// A shared, side-effect free entity test.
///
/// Predicates are reference counted so the same options can be handed to a
/// native strategy and to the in-process fallback without re-boxing.
pub type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// A shared total-order comparator used for stable sorting.
pub type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// Options for a filtered and optionally paginated query.
///
/// All fields are optional. An empty `QueryOptions` matches every entity,
/// keeps strategy order and leaves paging to the caller's defaults.
///
/// # Semantics
///
/// - an entity passes when `predicate` (true if absent) and every entry of
///   `filters` return true
/// - `sort_by` is applied with a stable sort after filtering
/// - `page` is 1-based; `page` and `page_size` of `None` are resolved by the
///   consumer (see [`QueryOptions::resolved`])
///
/// # Example
///
/// ```rust
/// use entimgr_query::QueryOptions;
///
/// let options = QueryOptions::new()
///     .with_predicate(|n: &i32| *n > 0)
///     .with_filter(|n: &i32| n % 3 == 0)
///     .with_page(2)
///     .with_page_size(5);
///
/// assert!(options.matches(&9));
/// assert!(!options.matches(&4));
/// assert_eq!(options.page, Some(2));
/// ```
pub struct QueryOptions<T> {
    /// Primary filter.
    pub predicate: Option<Predicate<T>>,
    /// Auxiliary filters, ANDed with the predicate and each other.
    pub filters: Vec<Predicate<T>>,
    /// Total-order comparator for a stable sort.
    pub sort_by: Option<Comparator<T>>,
    /// Requested 1-based page.
    pub page: Option<usize>,
    /// Requested page size.
    pub page_size: Option<usize>,
}

impl<T> QueryOptions<T> {
    /// Creates options that match everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the primary predicate.
    #[must_use]
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Appends an auxiliary filter.
    #[must_use]
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Sets the sort comparator.
    #[must_use]
    pub fn with_sort_by<F>(mut self, compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        self.sort_by = Some(Arc::new(compare));
        self
    }

    /// Sets the requested page.
    #[must_use]
    pub const fn with_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    /// Sets the requested page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Returns true if `entity` passes the predicate and every filter.
    pub fn matches(&self, entity: &T) -> bool {
        self.predicate.as_ref().is_none_or(|p| p(entity))
            && self.filters.iter().all(|f| f(entity))
    }

    /// Returns true if the options carry any in-process refinement
    /// (predicate, filters or sort) that a remote backend cannot evaluate.
    pub fn has_refinement(&self) -> bool {
        self.predicate.is_some() || !self.filters.is_empty() || self.sort_by.is_some()
    }

    /// Returns a copy with unset `page`/`page_size` filled from the defaults.
    #[must_use]
    pub fn resolved(&self, default_page: usize, default_page_size: usize) -> Self {
        let mut resolved = self.clone();
        resolved.page.get_or_insert(default_page);
        resolved.page_size.get_or_insert(default_page_size);
        resolved
    }

    /// Returns a copy without paging fields.
    ///
    /// Used when a paged request is served through a plain find.
    #[must_use]
    pub fn without_paging(&self) -> Self {
        Self {
            page: None,
            page_size: None,
            ..self.clone()
        }
    }
}

impl<T> Default for QueryOptions<T> {
    fn default() -> Self {
        Self {
            predicate: None,
            filters: Vec::new(),
            sort_by: None,
            page: None,
            page_size: None,
        }
    }
}

impl<T> Clone for QueryOptions<T> {
    fn clone(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
            filters: self.filters.clone(),
            sort_by: self.sort_by.clone(),
            page: self.page,
            page_size: self.page_size,
        }
    }
}

impl<T> fmt::Debug for QueryOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOptions")
            .field("predicate", &self.predicate.is_some())
            .field("filters", &self.filters.len())
            .field("sort_by", &self.sort_by.is_some())
            .field("page", &self.page)
            .field("page_size", &self.page_size)
            .finish()
    }
}
