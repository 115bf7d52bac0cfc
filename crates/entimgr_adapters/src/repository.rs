//! Repository-style adapter contract and its strategy.
//!
//! A repository addresses rows by primary key and answers its own opaque
//! query type. [`RepositoryStrategy`] bridges that into the strategy
//! contract:
//!
//! - `remove`/`update` first try the primary key of the given entity within
//!   the strategy's scope; if the repository reports the key missing (or the
//!   entity has none) the scoped rows are scanned with the manager's equality
//!   policy and the matching row is addressed by its own key
//! - predicates, filters and sorts are applied in-process on whatever the
//!   repository returns
//!
//! Backend faults are never mistaken for a missing key.

use async_trait::async_trait;
use entimgr_core::{
    position_of, ClearCapability, EqualityPolicy, PagedQueryCapability, QueryCapability,
    Strategy, StrategyResult,
};
use entimgr_query::{select_owned, PageInfo, PageResult, QueryOptions};
use entimgr_query::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE};

use crate::error::AdapterResult;

/// Outcome of a primary-key operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyedOutcome {
    /// The row was found by key and the operation applied.
    Applied,
    /// The entity carries a key but no stored row has it.
    Missing,
    /// The entity carries no usable key.
    Unkeyed,
}

impl KeyedOutcome {
    /// Returns true if the operation applied.
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// A repository query: backend criteria plus a row window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NativeQuery<Q> {
    /// Backend-specific criteria (where/order/relations), opaque here.
    pub criteria: Q,
    /// Rows to skip.
    pub skip: usize,
    /// Maximum rows to return; `None` for all.
    pub take: Option<usize>,
}

impl<Q> NativeQuery<Q> {
    /// Every row matching `criteria`.
    pub fn all(criteria: Q) -> Self {
        Self {
            criteria,
            skip: 0,
            take: None,
        }
    }

    /// A window of `take` rows after `skip`.
    pub fn window(criteria: Q, skip: usize, take: usize) -> Self {
        Self {
            criteria,
            skip,
            take: Some(take),
        }
    }
}

/// An object-relational repository.
#[async_trait]
pub trait RepositoryAdapter<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    /// Backend query criteria.
    type Query: Clone + Default + Send + Sync + 'static;

    /// Inserts or upserts an entity.
    ///
    /// An entity without a primary key is rejected with
    /// [`AdapterError::Constraint`](crate::AdapterError::Constraint), since
    /// nothing could address it afterwards.
    async fn save(&self, entity: T) -> AdapterResult<()>;

    /// Removes the row matching `criteria` whose key is that of `entity`.
    ///
    /// A key held only by rows outside `criteria` is [`KeyedOutcome::Missing`].
    async fn remove_by_key(
        &self,
        criteria: &Self::Query,
        entity: &T,
    ) -> AdapterResult<KeyedOutcome>;

    /// Replaces the row matching `criteria` whose key is that of `target`
    /// with `replacement`.
    async fn merge_by_key(
        &self,
        criteria: &Self::Query,
        target: &T,
        replacement: &T,
    ) -> AdapterResult<KeyedOutcome>;

    /// Returns the rows matching `query`, in repository order.
    async fn find(&self, query: &NativeQuery<Self::Query>) -> AdapterResult<Vec<T>>;

    /// Counts the rows matching `criteria`.
    async fn count(&self, criteria: &Self::Query) -> AdapterResult<usize>;

    /// Returns a window of rows with the count of all rows matching the
    /// query's criteria.
    async fn find_and_count(&self, query: &NativeQuery<Self::Query>)
        -> AdapterResult<(Vec<T>, usize)>;

    /// Bulk delete, if supported.
    fn as_clear(&self) -> Option<&dyn RepositoryClear> {
        None
    }
}

/// Repository bulk delete.
#[async_trait]
pub trait RepositoryClear: Send + Sync {
    /// Deletes every row.
    async fn clear(&self) -> AdapterResult<()>;
}

/// Bridges a [`RepositoryAdapter`] into the strategy contract.
///
/// Every query starts from `scope`, the criteria this strategy is bound to
/// (for example a tenant filter), and keyed writes never reach rows outside
/// it. `find` and `find_page` are always native.
///
/// When a paged query also carries a predicate, filters or a sort, the
/// window is cut by the repository first and refined afterwards: the page
/// can come back shorter than `page_size`, its order is the sort applied
/// within the window, and totals are the repository's unrefined count.
/// Bind a manager with a masked strategy if exact paging is required.
pub struct RepositoryStrategy<T, R>
where
    T: Send + Sync + 'static,
    R: RepositoryAdapter<T>,
{
    repository: R,
    scope: R::Query,
}

impl<T, R> RepositoryStrategy<T, R>
where
    T: Clone + Send + Sync + 'static,
    R: RepositoryAdapter<T>,
{
    /// Wraps `repository` with the default criteria.
    pub fn new(repository: R) -> Self {
        Self::scoped(repository, R::Query::default())
    }

    /// Wraps `repository`, restricting every query to `scope`.
    pub fn scoped(repository: R, scope: R::Query) -> Self {
        Self { repository, scope }
    }

    /// Returns the repository.
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Returns the stored row equal to `entity`, if any.
    async fn scan_for(&self, entity: &T, equality: &dyn EqualityPolicy<T>) -> AdapterResult<Option<T>> {
        let mut rows = self
            .repository
            .find(&NativeQuery::all(self.scope.clone()))
            .await?;
        Ok(position_of(&rows, entity, equality).map(|index| rows.swap_remove(index)))
    }
}

#[async_trait]
impl<T, R> Strategy<T> for RepositoryStrategy<T, R>
where
    T: Clone + Send + Sync + 'static,
    R: RepositoryAdapter<T>,
{
    async fn add(&self, entity: T) -> StrategyResult<()> {
        Ok(self.repository.save(entity).await?)
    }

    async fn remove(&self, entity: &T, equality: &dyn EqualityPolicy<T>) -> StrategyResult<bool> {
        let outcome = self.repository.remove_by_key(&self.scope, entity).await?;
        if outcome.is_applied() {
            return Ok(true);
        }

        tracing::debug!(?outcome, "remove by key did not apply, scanning by equality");
        let Some(stored) = self.scan_for(entity, equality).await? else {
            return Ok(false);
        };
        let outcome = self.repository.remove_by_key(&self.scope, &stored).await?;
        if !outcome.is_applied() {
            tracing::warn!(?outcome, "matched row could not be removed by its own key");
        }
        Ok(outcome.is_applied())
    }

    async fn get_all(&self) -> StrategyResult<Vec<T>> {
        Ok(self
            .repository
            .find(&NativeQuery::all(self.scope.clone()))
            .await?)
    }

    async fn update(
        &self,
        old: &T,
        new: T,
        equality: &dyn EqualityPolicy<T>,
    ) -> StrategyResult<bool> {
        let outcome = self.repository.merge_by_key(&self.scope, old, &new).await?;
        if outcome.is_applied() {
            return Ok(true);
        }

        tracing::debug!(?outcome, "merge by key did not apply, scanning by equality");
        let Some(stored) = self.scan_for(old, equality).await? else {
            return Ok(false);
        };
        let outcome = self.repository.merge_by_key(&self.scope, &stored, &new).await?;
        if !outcome.is_applied() {
            tracing::warn!(?outcome, "matched row could not be merged by its own key");
        }
        Ok(outcome.is_applied())
    }

    async fn count(&self) -> StrategyResult<usize> {
        Ok(self.repository.count(&self.scope).await?)
    }

    async fn get_one(
        &self,
        predicate: &(dyn for<'a> Fn(&'a T) -> bool + Send + Sync),
    ) -> StrategyResult<Option<T>> {
        let rows = self
            .repository
            .find(&NativeQuery::all(self.scope.clone()))
            .await?;
        Ok(rows.into_iter().find(|row| predicate(row)))
    }

    fn as_query(&self) -> Option<&dyn QueryCapability<T>> {
        Some(self)
    }

    fn as_paged_query(&self) -> Option<&dyn PagedQueryCapability<T>> {
        Some(self)
    }

    fn as_clear(&self) -> Option<&dyn ClearCapability> {
        match self.repository.as_clear() {
            Some(_) => Some(self),
            None => None,
        }
    }
}

#[async_trait]
impl<T, R> QueryCapability<T> for RepositoryStrategy<T, R>
where
    T: Clone + Send + Sync + 'static,
    R: RepositoryAdapter<T>,
{
    async fn find(&self, options: &QueryOptions<T>) -> StrategyResult<Vec<T>> {
        let rows = self
            .repository
            .find(&NativeQuery::all(self.scope.clone()))
            .await?;
        Ok(select_owned(rows, options))
    }
}

#[async_trait]
impl<T, R> PagedQueryCapability<T> for RepositoryStrategy<T, R>
where
    T: Clone + Send + Sync + 'static,
    R: RepositoryAdapter<T>,
{
    async fn find_page(&self, options: &QueryOptions<T>) -> StrategyResult<PageResult<T>> {
        let page = options.page.unwrap_or(DEFAULT_PAGE);
        let page_size = options.page_size.unwrap_or(DEFAULT_PAGE_SIZE);

        let requested = PageInfo::compute(usize::MAX, page, page_size);
        let query = NativeQuery::window(self.scope.clone(), requested.offset(), requested.page_size);
        let (mut rows, total) = self.repository.find_and_count(&query).await?;
        let info = PageInfo::compute(total, page, page_size);

        if info.offset() != requested.offset() {
            // Requested page was past the end; fetch the last page instead
            let query = NativeQuery::window(self.scope.clone(), info.offset(), info.page_size);
            rows = self.repository.find_and_count(&query).await?.0;
        }

        if options.has_refinement() {
            rows = select_owned(rows, options);
        }
        Ok(PageResult::from_parts(rows, info))
    }
}

#[async_trait]
impl<T, R> ClearCapability for RepositoryStrategy<T, R>
where
    T: Clone + Send + Sync + 'static,
    R: RepositoryAdapter<T>,
{
    async fn clear(&self) -> StrategyResult<()> {
        match self.repository.as_clear() {
            Some(clear) => Ok(clear.clear().await?),
            None => Ok(()),
        }
    }
}

impl<T, R> std::fmt::Debug for RepositoryStrategy<T, R>
where
    T: Send + Sync + 'static,
    R: RepositoryAdapter<T> + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryStrategy")
            .field("repository", &self.repository)
            .finish_non_exhaustive()
    }
}
