//! In-memory reference strategy.

use async_trait::async_trait;
use entimgr_query::{paginate_slice, select, PageInfo, PageResult, QueryOptions};
use entimgr_query::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE};
use parking_lot::RwLock;

use crate::equality::{position_of, EqualityPolicy};
use crate::error::StrategyResult;
use crate::strategy::{ClearCapability, PagedQueryCapability, QueryCapability, Strategy};

/// An in-memory strategy holding entities in insertion order.
///
/// This is the reference backend: its semantics for every operation are the
/// ones the manager's in-process fallback reproduces, and the ones any native
/// `find`/`find_page` must match.
///
/// - `add` appends
/// - `remove`/`update` scan in insertion order; the first match wins
/// - `find` runs the filter engine over the whole collection
/// - `find_page` runs the filter engine, then the paginator
/// - every read returns clones
///
/// # Thread Safety
///
/// The collection sits behind a `parking_lot::RwLock`. Each operation is
/// atomic on its own; sequences of operations are not.
///
/// # Example
///
/// ```rust
/// use entimgr_core::{InMemoryStrategy, Strategy, ValueEquality};
///
/// # let runtime = tokio::runtime::Runtime::new().unwrap();
/// # runtime.block_on(async {
/// let strategy = InMemoryStrategy::new();
/// strategy.add("a").await.unwrap();
/// strategy.add("b").await.unwrap();
/// assert!(strategy.remove(&"a", &ValueEquality).await.unwrap());
/// assert_eq!(strategy.get_all().await.unwrap(), vec!["b"]);
/// # });
/// ```
#[derive(Debug)]
pub struct InMemoryStrategy<T> {
    entities: RwLock<Vec<T>>,
}

impl<T> InMemoryStrategy<T> {
    /// Creates an empty strategy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_entities(Vec::new())
    }

    /// Creates a strategy seeded with `entities`, kept in the given order.
    #[must_use]
    pub fn with_entities(entities: Vec<T>) -> Self {
        Self {
            entities: RwLock::new(entities),
        }
    }

    /// Returns the number of stored entities without going through the
    /// async contract.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }
}

impl<T: Clone> InMemoryStrategy<T> {
    /// Returns a copy of all stored entities.
    ///
    /// Useful for testing and debugging.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.entities.read().clone()
    }
}

impl<T> Default for InMemoryStrategy<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> Strategy<T> for InMemoryStrategy<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn add(&self, entity: T) -> StrategyResult<()> {
        self.entities.write().push(entity);
        Ok(())
    }

    async fn remove(&self, entity: &T, equality: &dyn EqualityPolicy<T>) -> StrategyResult<bool> {
        let mut entities = self.entities.write();
        match position_of(&entities, entity, equality) {
            Some(index) => {
                // Vec::remove keeps the remaining order
                entities.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_all(&self) -> StrategyResult<Vec<T>> {
        Ok(self.entities.read().clone())
    }

    async fn update(
        &self,
        old: &T,
        new: T,
        equality: &dyn EqualityPolicy<T>,
    ) -> StrategyResult<bool> {
        let mut entities = self.entities.write();
        match position_of(&entities, old, equality) {
            Some(index) => {
                entities[index] = new;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count(&self) -> StrategyResult<usize> {
        Ok(self.entities.read().len())
    }

    async fn get_one(
        &self,
        predicate: &(dyn for<'a> Fn(&'a T) -> bool + Send + Sync),
    ) -> StrategyResult<Option<T>> {
        Ok(self.entities.read().iter().find(|e| predicate(*e)).cloned())
    }

    fn as_query(&self) -> Option<&dyn QueryCapability<T>> {
        Some(self)
    }

    fn as_paged_query(&self) -> Option<&dyn PagedQueryCapability<T>> {
        Some(self)
    }

    fn as_clear(&self) -> Option<&dyn ClearCapability> {
        Some(self)
    }
}

#[async_trait]
impl<T> QueryCapability<T> for InMemoryStrategy<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn find(&self, options: &QueryOptions<T>) -> StrategyResult<Vec<T>> {
        Ok(select(&self.entities.read(), options))
    }
}

#[async_trait]
impl<T> PagedQueryCapability<T> for InMemoryStrategy<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn find_page(&self, options: &QueryOptions<T>) -> StrategyResult<PageResult<T>> {
        let page = options.page.unwrap_or(DEFAULT_PAGE);
        let page_size = options.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        let entities = self.entities.read();

        if !options.has_refinement() {
            // Nothing to filter or sort: slice the collection directly
            return Ok(paginate_slice(&entities, page, page_size));
        }

        let selected = select(&entities, options);
        let info = PageInfo::compute(selected.len(), page, page_size);
        let items = selected[info.range()].to_vec();
        Ok(PageResult::from_parts(items, info))
    }
}

#[async_trait]
impl<T> ClearCapability for InMemoryStrategy<T>
where
    T: Send + Sync + 'static,
{
    async fn clear(&self) -> StrategyResult<()> {
        self.entities.write().clear();
        Ok(())
    }
}
