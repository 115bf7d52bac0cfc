//! Relational-style adapter contract and its strategy.

use std::marker::PhantomData;

use async_trait::async_trait;
use entimgr_core::{
    EqualityPolicy, PagedQueryCapability, QueryCapability, Strategy, StrategyResult,
};
use entimgr_query::{paginate, select_owned, PageInfo, PageResult, QueryOptions};
use entimgr_query::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE};

use crate::error::AdapterResult;

/// A table-like backend: rows in, rows out.
///
/// Integrations implement this over a driver (insert/update/delete/select
/// statements); [`RelationalStrategy`] turns it into a [`Strategy`].
#[async_trait]
pub trait RelationalAdapter<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    /// Inserts a row.
    async fn insert(&self, entity: T) -> AdapterResult<()>;

    /// Replaces the first row equal to `old` with `new`.
    async fn update_matching(
        &self,
        old: &T,
        new: T,
        equality: &dyn EqualityPolicy<T>,
    ) -> AdapterResult<bool>;

    /// Deletes the first row equal to `entity`.
    async fn delete_matching(
        &self,
        entity: &T,
        equality: &dyn EqualityPolicy<T>,
    ) -> AdapterResult<bool>;

    /// Selects every row in table order.
    async fn select_all(&self) -> AdapterResult<Vec<T>>;

    /// Counts every row.
    async fn count_all(&self) -> AdapterResult<usize>;

    /// Row-by-row filtered select, if the driver can stream rows.
    fn as_filtered_select(&self) -> Option<&dyn FilteredSelect<T>> {
        None
    }

    /// `LIMIT`/`OFFSET` select with a total count, if supported.
    fn as_paged_select(&self) -> Option<&dyn PagedSelect<T>> {
        None
    }
}

/// Native filtered select.
///
/// The predicate runs in-process against each row as the driver produces it;
/// it is never translated into the backend's query language.
#[async_trait]
pub trait FilteredSelect<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    /// Returns the rows, in table order, for which `predicate` holds.
    async fn select_where(
        &self,
        predicate: &(dyn for<'a> Fn(&'a T) -> bool + Send + Sync),
    ) -> AdapterResult<Vec<T>>;
}

/// Native paginated select.
#[async_trait]
pub trait PagedSelect<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    /// Returns at most `limit` rows starting at `offset`, in table order,
    /// together with the total row count.
    async fn select_page(&self, offset: usize, limit: usize) -> AdapterResult<(Vec<T>, usize)>;
}

/// Bridges a [`RelationalAdapter`] into the strategy contract.
///
/// - `find` is native when the adapter has a filtered select
/// - `find_page` is native when the adapter has a paged select; requests
///   carrying a predicate, filters or a sort cannot be pushed down and are
///   answered through the filter engine and paginator instead, so results
///   always match the reference backend
/// - there is no clear capability
#[derive(Debug)]
pub struct RelationalStrategy<T, A> {
    adapter: A,
    _marker: PhantomData<fn() -> T>,
}

impl<T, A> RelationalStrategy<T, A>
where
    T: Send + Sync + 'static,
    A: RelationalAdapter<T>,
{
    /// Wraps `adapter`.
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            _marker: PhantomData,
        }
    }

    /// Returns the adapter.
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    async fn select_matching(&self, options: &QueryOptions<T>) -> AdapterResult<Vec<T>> {
        match self.adapter.as_filtered_select() {
            Some(select) => {
                let mut rows = select.select_where(&|row: &T| options.matches(row)).await?;
                if let Some(compare) = &options.sort_by {
                    rows.sort_by(|a, b| compare(a, b));
                }
                Ok(rows)
            }
            None => Ok(select_owned(self.adapter.select_all().await?, options)),
        }
    }
}

#[async_trait]
impl<T, A> Strategy<T> for RelationalStrategy<T, A>
where
    T: Send + Sync + 'static,
    A: RelationalAdapter<T>,
{
    async fn add(&self, entity: T) -> StrategyResult<()> {
        Ok(self.adapter.insert(entity).await?)
    }

    async fn remove(&self, entity: &T, equality: &dyn EqualityPolicy<T>) -> StrategyResult<bool> {
        Ok(self.adapter.delete_matching(entity, equality).await?)
    }

    async fn get_all(&self) -> StrategyResult<Vec<T>> {
        Ok(self.adapter.select_all().await?)
    }

    async fn update(
        &self,
        old: &T,
        new: T,
        equality: &dyn EqualityPolicy<T>,
    ) -> StrategyResult<bool> {
        Ok(self.adapter.update_matching(old, new, equality).await?)
    }

    async fn count(&self) -> StrategyResult<usize> {
        Ok(self.adapter.count_all().await?)
    }

    async fn get_one(
        &self,
        predicate: &(dyn for<'a> Fn(&'a T) -> bool + Send + Sync),
    ) -> StrategyResult<Option<T>> {
        let rows = match self.adapter.as_filtered_select() {
            Some(select) => select.select_where(predicate).await?,
            None => self.adapter.select_all().await?,
        };
        Ok(rows.into_iter().find(|row| predicate(row)))
    }

    fn as_query(&self) -> Option<&dyn QueryCapability<T>> {
        match self.adapter.as_filtered_select() {
            Some(_) => Some(self),
            None => None,
        }
    }

    fn as_paged_query(&self) -> Option<&dyn PagedQueryCapability<T>> {
        match self.adapter.as_paged_select() {
            Some(_) => Some(self),
            None => None,
        }
    }
}

#[async_trait]
impl<T, A> QueryCapability<T> for RelationalStrategy<T, A>
where
    T: Send + Sync + 'static,
    A: RelationalAdapter<T>,
{
    async fn find(&self, options: &QueryOptions<T>) -> StrategyResult<Vec<T>> {
        Ok(self.select_matching(options).await?)
    }
}

#[async_trait]
impl<T, A> PagedQueryCapability<T> for RelationalStrategy<T, A>
where
    T: Send + Sync + 'static,
    A: RelationalAdapter<T>,
{
    async fn find_page(&self, options: &QueryOptions<T>) -> StrategyResult<PageResult<T>> {
        let page = options.page.unwrap_or(DEFAULT_PAGE);
        let page_size = options.page_size.unwrap_or(DEFAULT_PAGE_SIZE);

        let paged = match self.adapter.as_paged_select() {
            Some(paged) if !options.has_refinement() => paged,
            _ => {
                tracing::trace!("query carries in-process refinement, paging after select");
                let rows = self.select_matching(options).await?;
                return Ok(paginate(rows, page, page_size));
            }
        };

        let requested = PageInfo::compute(usize::MAX, page, page_size);
        let (mut rows, total) = paged.select_page(requested.offset(), requested.page_size).await?;
        let info = PageInfo::compute(total, page, page_size);

        if info.offset() != requested.offset() {
            // Requested page was past the end; fetch the last page instead
            rows = paged.select_page(info.offset(), info.page_size).await?.0;
        }
        rows.truncate(info.len());

        Ok(PageResult::from_parts(rows, info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdapterError;
    use crate::mock::MemoryTable;
    use entimgr_core::{by_key, EntityManager, InMemoryStrategy, Masked, StrategyError};

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: u32,
        tag: &'static str,
    }

    fn rows(n: u32) -> Vec<Row> {
        (1..=n)
            .map(|id| Row {
                id,
                tag: if id % 3 == 0 { "fizz" } else { "plain" },
            })
            .collect()
    }

    fn manager<A: RelationalAdapter<Row> + 'static>(adapter: A) -> EntityManager<Row> {
        EntityManager::with_equality(RelationalStrategy::new(adapter), by_key(|r: &Row| r.id))
    }

    #[tokio::test]
    async fn capabilities_follow_adapter() {
        let bare = manager(MemoryTable::with_rows(rows(3)));
        assert!(!bare.capabilities().find);
        assert!(!bare.capabilities().find_page);
        assert!(!bare.capabilities().clear);

        let full = manager(
            MemoryTable::with_rows(rows(3))
                .with_filtered_select()
                .with_paged_select(),
        );
        assert!(full.capabilities().find);
        assert!(full.capabilities().find_page);
        assert!(!full.capabilities().clear);
    }

    #[tokio::test]
    async fn crud_through_adapter() {
        let manager = manager(MemoryTable::new());
        manager.add_many(rows(3)).await.unwrap();

        let updated = manager
            .update(&Row { id: 2, tag: "" }, Row { id: 2, tag: "x" })
            .await
            .unwrap();
        assert!(updated);
        assert!(manager.remove(&Row { id: 1, tag: "" }).await.unwrap());
        assert!(!manager.remove(&Row { id: 1, tag: "" }).await.unwrap());

        assert_eq!(manager.count().await.unwrap(), 2);
        assert_eq!(
            manager.get_one(|r| r.id == 2).await.unwrap(),
            Some(Row { id: 2, tag: "x" })
        );
    }

    #[tokio::test]
    async fn native_paged_select_clamps_past_end() {
        let table = MemoryTable::with_rows(rows(12)).with_paged_select();
        let manager = manager(table);

        let page = manager
            .find_page(&QueryOptions::new().with_page(7).with_page_size(5))
            .await
            .unwrap();

        assert_eq!(page.page, 3);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.iter().map(|r| r.id).collect::<Vec<_>>(), vec![11, 12]);
        assert!(!page.has_next);
        assert!(page.has_prev);
    }

    #[tokio::test]
    async fn native_paths_match_reference() {
        let reference = EntityManager::with_equality(
            InMemoryStrategy::with_entities(rows(23)),
            by_key(|r: &Row| r.id),
        );
        let fallback = EntityManager::with_equality(
            Masked::mandatory_only(InMemoryStrategy::with_entities(rows(23))),
            by_key(|r: &Row| r.id),
        );
        let native = manager(
            MemoryTable::with_rows(rows(23))
                .with_filtered_select()
                .with_paged_select(),
        );

        let queries = vec![
            QueryOptions::new().with_page(2).with_page_size(6),
            QueryOptions::new().with_page(0).with_page_size(0),
            QueryOptions::new().with_page(40),
            QueryOptions::new()
                .with_predicate(|r: &Row| r.tag == "fizz")
                .with_page_size(3)
                .with_page(2),
            QueryOptions::new()
                .with_sort_by(|a: &Row, b: &Row| b.id.cmp(&a.id))
                .with_page(3)
                .with_page_size(4),
        ];

        for options in &queries {
            let expected = reference.find_page(options).await.unwrap();
            assert_eq!(fallback.find_page(options).await.unwrap(), expected);
            assert_eq!(native.find_page(options).await.unwrap(), expected);
            assert_eq!(
                native.find(options).await.unwrap(),
                reference.find(options).await.unwrap()
            );
        }
    }

    #[tokio::test]
    async fn faults_are_not_turned_into_not_found() {
        let table = MemoryTable::with_rows(rows(2));
        table.set_offline(true);
        let manager = manager(table);

        let err = manager.remove(&Row { id: 1, tag: "" }).await.unwrap_err();
        assert!(matches!(err, StrategyError::Adapter(_)));
        assert!(manager.get_all().await.is_err());
    }

    #[tokio::test]
    async fn offline_paged_select_propagates() {
        let table = MemoryTable::with_rows(rows(2)).with_paged_select();
        table.set_offline(true);
        let strategy = RelationalStrategy::new(table);

        let result = strategy.find_page(&QueryOptions::new()).await;
        let Err(StrategyError::Adapter(source)) = result else {
            panic!("expected adapter fault");
        };
        assert!(matches!(
            source.downcast_ref::<AdapterError>(),
            Some(AdapterError::Connection { .. })
        ));
    }
}
