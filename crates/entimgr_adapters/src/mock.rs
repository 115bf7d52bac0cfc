//! In-memory adapters for tests and local development.
//!
//! Both mocks can be switched offline, after which every call fails with
//! [`AdapterError::Connection`], or closed for good, after which every call
//! fails with [`AdapterError::Closed`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use entimgr_core::{position_of, EqualityPolicy};
use entimgr_query::{Comparator, Predicate};
use parking_lot::RwLock;

use crate::error::{AdapterError, AdapterResult};
use crate::relational::{FilteredSelect, PagedSelect, RelationalAdapter};
use crate::repository::{KeyedOutcome, NativeQuery, RepositoryAdapter, RepositoryClear};

#[derive(Default)]
struct Availability {
    offline: AtomicBool,
    closed: AtomicBool,
}

impl Availability {
    fn check(&self) -> AdapterResult<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(AdapterError::Closed)
        } else if self.offline.load(Ordering::Acquire) {
            Err(AdapterError::connection("backend offline"))
        } else {
            Ok(())
        }
    }

    fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Release);
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

impl fmt::Debug for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Availability")
            .field("offline", &self.offline.load(Ordering::Relaxed))
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

/// A relational table kept in a `Vec`.
///
/// Created without optional selects; enable them with
/// [`MemoryTable::with_filtered_select`] and [`MemoryTable::with_paged_select`].
pub struct MemoryTable<T> {
    rows: RwLock<Vec<T>>,
    filtered_select: bool,
    paged_select: bool,
    availability: Availability,
}

impl<T> MemoryTable<T> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rows(Vec::new())
    }

    /// Creates a table holding `rows`.
    #[must_use]
    pub fn with_rows(rows: Vec<T>) -> Self {
        Self {
            rows: RwLock::new(rows),
            filtered_select: false,
            paged_select: false,
            availability: Availability::default(),
        }
    }

    /// Enables the native filtered select.
    #[must_use]
    pub fn with_filtered_select(mut self) -> Self {
        self.filtered_select = true;
        self
    }

    /// Enables the native paged select.
    #[must_use]
    pub fn with_paged_select(mut self) -> Self {
        self.paged_select = true;
        self
    }

    /// Makes every subsequent call fail (or succeed again).
    pub fn set_offline(&self, offline: bool) {
        self.availability.set_offline(offline);
    }

    /// Closes the connection for good; later calls fail with
    /// [`AdapterError::Closed`].
    pub fn close(&self) {
        self.availability.close();
    }

    /// Returns the number of rows, bypassing the offline switch.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

impl<T> Default for MemoryTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for MemoryTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryTable")
            .field("rows", &self.len())
            .field("filtered_select", &self.filtered_select)
            .field("paged_select", &self.paged_select)
            .field("availability", &self.availability)
            .finish()
    }
}

#[async_trait]
impl<T> RelationalAdapter<T> for MemoryTable<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn insert(&self, entity: T) -> AdapterResult<()> {
        self.availability.check()?;
        self.rows.write().push(entity);
        Ok(())
    }

    async fn update_matching(
        &self,
        old: &T,
        new: T,
        equality: &dyn EqualityPolicy<T>,
    ) -> AdapterResult<bool> {
        self.availability.check()?;
        let mut rows = self.rows.write();
        match position_of(&rows, old, equality) {
            Some(index) => {
                rows[index] = new;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_matching(
        &self,
        entity: &T,
        equality: &dyn EqualityPolicy<T>,
    ) -> AdapterResult<bool> {
        self.availability.check()?;
        let mut rows = self.rows.write();
        match position_of(&rows, entity, equality) {
            Some(index) => {
                rows.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn select_all(&self) -> AdapterResult<Vec<T>> {
        self.availability.check()?;
        Ok(self.rows.read().clone())
    }

    async fn count_all(&self) -> AdapterResult<usize> {
        self.availability.check()?;
        Ok(self.rows.read().len())
    }

    fn as_filtered_select(&self) -> Option<&dyn FilteredSelect<T>> {
        if self.filtered_select {
            Some(self)
        } else {
            None
        }
    }

    fn as_paged_select(&self) -> Option<&dyn PagedSelect<T>> {
        if self.paged_select {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl<T> FilteredSelect<T> for MemoryTable<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn select_where(
        &self,
        predicate: &(dyn for<'a> Fn(&'a T) -> bool + Send + Sync),
    ) -> AdapterResult<Vec<T>> {
        self.availability.check()?;
        Ok(self
            .rows
            .read()
            .iter()
            .filter(|row| predicate(row))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl<T> PagedSelect<T> for MemoryTable<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn select_page(&self, offset: usize, limit: usize) -> AdapterResult<(Vec<T>, usize)> {
        self.availability.check()?;
        let rows = self.rows.read();
        let page = rows.iter().skip(offset).take(limit).cloned().collect();
        Ok((page, rows.len()))
    }
}

/// Criteria understood by [`MemoryRepository`]: an optional row filter and
/// an optional ordering, applied before the window.
pub struct MemoryQuery<T> {
    filter: Option<Predicate<T>>,
    order: Option<Comparator<T>>,
}

impl<T> MemoryQuery<T> {
    /// Criteria matching every row in insertion order.
    #[must_use]
    pub fn new() -> Self {
        Self {
            filter: None,
            order: None,
        }
    }

    /// Restricts rows to those passing `filter`.
    #[must_use]
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Orders rows with `order`.
    #[must_use]
    pub fn with_order<F>(mut self, order: F) -> Self
    where
        F: Fn(&T, &T) -> std::cmp::Ordering + Send + Sync + 'static,
    {
        self.order = Some(Arc::new(order));
        self
    }

    fn admits(&self, row: &T) -> bool {
        self.filter.as_ref().is_none_or(|filter| filter(row))
    }

    fn apply(&self, rows: &[T]) -> Vec<T>
    where
        T: Clone,
    {
        let mut selected: Vec<T> = rows.iter().filter(|row| self.admits(row)).cloned().collect();
        if let Some(order) = &self.order {
            selected.sort_by(|a, b| order(a, b));
        }
        selected
    }
}

impl<T> Default for MemoryQuery<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for MemoryQuery<T> {
    fn clone(&self) -> Self {
        Self {
            filter: self.filter.clone(),
            order: self.order.clone(),
        }
    }
}

impl<T> fmt::Debug for MemoryQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryQuery")
            .field("filter", &self.filter.is_some())
            .field("order", &self.order.is_some())
            .finish()
    }
}

type KeyFn<T, K> = Arc<dyn Fn(&T) -> Option<K> + Send + Sync>;

/// A keyed repository kept in a `Vec`.
///
/// Keys come from an extractor; an entity for which it returns `None` is
/// unkeyed and cannot be saved. `save` replaces the row with the same key,
/// or appends. Keyed operations only address rows admitted by the criteria
/// they are given.
pub struct MemoryRepository<T, K> {
    rows: RwLock<Vec<T>>,
    key: KeyFn<T, K>,
    clear: bool,
    availability: Availability,
}

impl<T, K> MemoryRepository<T, K>
where
    K: PartialEq,
{
    /// Creates an empty repository keyed by `key`, without bulk delete.
    pub fn new<F>(key: F) -> Self
    where
        F: Fn(&T) -> Option<K> + Send + Sync + 'static,
    {
        Self {
            rows: RwLock::new(Vec::new()),
            key: Arc::new(key),
            clear: false,
            availability: Availability::default(),
        }
    }

    /// Enables bulk delete.
    #[must_use]
    pub fn with_clear(mut self) -> Self {
        self.clear = true;
        self
    }

    /// Appends `rows` as stored, without upserting.
    ///
    /// Fails without storing anything if a row is unkeyed.
    pub fn seed(&self, rows: impl IntoIterator<Item = T>) -> AdapterResult<()> {
        let rows: Vec<T> = rows.into_iter().collect();
        if rows.iter().any(|row| (self.key)(row).is_none()) {
            return Err(unkeyed());
        }
        self.rows.write().extend(rows);
        Ok(())
    }

    /// Makes every subsequent call fail (or succeed again).
    pub fn set_offline(&self, offline: bool) {
        self.availability.set_offline(offline);
    }

    /// Closes the connection for good; later calls fail with
    /// [`AdapterError::Closed`].
    pub fn close(&self) {
        self.availability.close();
    }

    /// Returns the number of rows, bypassing the offline switch.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Returns true if the repository has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    fn index_of(&self, rows: &[T], key: &K) -> Option<usize> {
        rows.iter()
            .position(|row| (self.key)(row).as_ref() == Some(key))
    }

    fn index_within(&self, rows: &[T], criteria: &MemoryQuery<T>, key: &K) -> Option<usize> {
        rows.iter()
            .position(|row| criteria.admits(row) && (self.key)(row).as_ref() == Some(key))
    }
}

fn unkeyed() -> AdapterError {
    AdapterError::constraint("entity has no primary key")
}

impl<T, K> fmt::Debug for MemoryRepository<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryRepository")
            .field("rows", &self.rows.read().len())
            .field("clear", &self.clear)
            .field("availability", &self.availability)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<T, K> RepositoryAdapter<T> for MemoryRepository<T, K>
where
    T: Clone + Send + Sync + 'static,
    K: PartialEq + Send + Sync + 'static,
{
    type Query = MemoryQuery<T>;

    async fn save(&self, entity: T) -> AdapterResult<()> {
        self.availability.check()?;
        let key = (self.key)(&entity).ok_or_else(unkeyed)?;
        let mut rows = self.rows.write();
        match self.index_of(&rows, &key) {
            Some(index) => rows[index] = entity,
            None => rows.push(entity),
        }
        Ok(())
    }

    async fn remove_by_key(
        &self,
        criteria: &Self::Query,
        entity: &T,
    ) -> AdapterResult<KeyedOutcome> {
        self.availability.check()?;
        let Some(key) = (self.key)(entity) else {
            return Ok(KeyedOutcome::Unkeyed);
        };
        let mut rows = self.rows.write();
        match self.index_within(&rows, criteria, &key) {
            Some(index) => {
                rows.remove(index);
                Ok(KeyedOutcome::Applied)
            }
            None => Ok(KeyedOutcome::Missing),
        }
    }

    async fn merge_by_key(
        &self,
        criteria: &Self::Query,
        target: &T,
        replacement: &T,
    ) -> AdapterResult<KeyedOutcome> {
        self.availability.check()?;
        let Some(key) = (self.key)(target) else {
            return Ok(KeyedOutcome::Unkeyed);
        };
        let mut rows = self.rows.write();
        match self.index_within(&rows, criteria, &key) {
            Some(index) => {
                rows[index] = replacement.clone();
                Ok(KeyedOutcome::Applied)
            }
            None => Ok(KeyedOutcome::Missing),
        }
    }

    async fn find(&self, query: &NativeQuery<Self::Query>) -> AdapterResult<Vec<T>> {
        Ok(self.find_and_count(query).await?.0)
    }

    async fn count(&self, criteria: &Self::Query) -> AdapterResult<usize> {
        self.availability.check()?;
        Ok(criteria.apply(&self.rows.read()).len())
    }

    async fn find_and_count(
        &self,
        query: &NativeQuery<Self::Query>,
    ) -> AdapterResult<(Vec<T>, usize)> {
        self.availability.check()?;
        let matched = query.criteria.apply(&self.rows.read());
        let total = matched.len();
        let window = matched
            .into_iter()
            .skip(query.skip)
            .take(query.take.unwrap_or(usize::MAX))
            .collect();
        Ok((window, total))
    }

    fn as_clear(&self) -> Option<&dyn RepositoryClear> {
        if self.clear {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl<T, K> RepositoryClear for MemoryRepository<T, K>
where
    T: Send + Sync + 'static,
    K: Send + Sync + 'static,
{
    async fn clear(&self) -> AdapterResult<()> {
        self.availability.check()?;
        self.rows.write().clear();
        Ok(())
    }
}
