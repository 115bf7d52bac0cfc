//! The entity manager façade.

use std::fmt;
use std::sync::Arc;

use entimgr_query::{paginate, select_owned, PageResult, QueryOptions};

use crate::config::Config;
use crate::equality::{EqualityPolicy, ValueEquality};
use crate::error::StrategyResult;
use crate::strategy::{Capabilities, Strategy};

/// CRUD and query operations over one bound strategy.
///
/// The manager holds no entity state. Mandatory operations are forwarded to
/// the strategy as-is. For `find`, `find_page` and `clear` it uses the
/// strategy's native capability when there is one and otherwise emulates the
/// operation in-process with the filter engine and the paginator, so callers
/// observe the same results on either path.
///
/// There is no locking or transaction coordination here; concurrent calls
/// race at whatever granularity the strategy provides.
///
/// # Example
///
/// ```rust
/// use entimgr_core::{by_key, EntityManager, InMemoryStrategy, QueryOptions};
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Task { id: u32, done: bool }
///
/// # let runtime = tokio::runtime::Runtime::new().unwrap();
/// # runtime.block_on(async {
/// let tasks = EntityManager::with_equality(InMemoryStrategy::new(), by_key(|t: &Task| t.id));
///
/// for id in 1..=12 {
///     tasks.add(Task { id, done: id % 3 == 0 }).await.unwrap();
/// }
/// tasks.update(&Task { id: 1, done: false }, Task { id: 1, done: true }).await.unwrap();
///
/// let done = QueryOptions::new().with_predicate(|t: &Task| t.done).with_page_size(2);
/// let page = tasks.find_page(&done).await.unwrap();
/// assert_eq!(page.total_items, 5);
/// assert_eq!(page.total_pages, 3);
/// assert_eq!(page.items[0].id, 1);
/// # });
/// ```
pub struct EntityManager<T>
where
    T: Send + Sync + 'static,
{
    strategy: Arc<dyn Strategy<T>>,
    equality: Arc<dyn EqualityPolicy<T>>,
    capabilities: Capabilities,
    config: Config,
}

impl<T> EntityManager<T>
where
    T: Send + Sync + 'static,
{
    /// Binds a strategy with structural equality.
    pub fn new<S>(strategy: S) -> Self
    where
        S: Strategy<T> + 'static,
        T: PartialEq,
    {
        Self::with_equality(strategy, ValueEquality)
    }

    /// Binds a strategy with a caller-supplied equality policy.
    pub fn with_equality<S, E>(strategy: S, equality: E) -> Self
    where
        S: Strategy<T> + 'static,
        E: EqualityPolicy<T> + 'static,
    {
        Self::from_parts(Arc::new(strategy), Arc::new(equality), Config::default())
    }

    /// Binds an already shared strategy and policy.
    ///
    /// Capabilities are read once here; the strategy must keep answering
    /// the same way for the manager's lifetime.
    pub fn from_parts(
        strategy: Arc<dyn Strategy<T>>,
        equality: Arc<dyn EqualityPolicy<T>>,
        config: Config,
    ) -> Self {
        let capabilities = strategy.capabilities();
        tracing::debug!(
            find = capabilities.find,
            find_page = capabilities.find_page,
            clear = capabilities.clear,
            "entity manager bound to strategy"
        );

        Self {
            strategy,
            equality,
            capabilities,
            config,
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Returns the bound strategy.
    pub fn strategy(&self) -> &Arc<dyn Strategy<T>> {
        &self.strategy
    }

    /// Returns the capabilities recorded when the strategy was bound.
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Adds an entity. No deduplication.
    pub async fn add(&self, entity: T) -> StrategyResult<()> {
        self.strategy.add(entity).await
    }

    /// Adds entities in order, stopping at the first fault.
    ///
    /// Entities added before the fault stay added.
    pub async fn add_many<I>(&self, entities: I) -> StrategyResult<usize>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send,
    {
        let mut added = 0;
        for entity in entities {
            self.strategy.add(entity).await?;
            added += 1;
        }
        Ok(added)
    }

    /// Removes the first entity equal to `entity` under the manager's policy.
    ///
    /// Returns `false` when nothing matched.
    pub async fn remove(&self, entity: &T) -> StrategyResult<bool> {
        self.strategy.remove(entity, self.equality.as_ref()).await
    }

    /// Returns an independent snapshot of every entity.
    pub async fn get_all(&self) -> StrategyResult<Vec<T>> {
        self.strategy.get_all().await
    }

    /// Replaces the first entity equal to `old` with `new`.
    ///
    /// Returns `false` when nothing matched.
    pub async fn update(&self, old: &T, new: T) -> StrategyResult<bool> {
        self.strategy.update(old, new, self.equality.as_ref()).await
    }

    /// Returns the number of entities.
    pub async fn count(&self) -> StrategyResult<usize> {
        self.strategy.count().await
    }

    /// Returns the first entity satisfying `predicate`, or `None`.
    pub async fn get_one<P>(&self, predicate: P) -> StrategyResult<Option<T>>
    where
        P: Fn(&T) -> bool + Send + Sync,
    {
        self.strategy.get_one(&predicate).await
    }

    /// Returns every entity passing `options`, sorted if requested.
    ///
    /// A native result is returned unmodified. Without a native find the
    /// filter engine runs over `get_all`. Paging fields are ignored.
    pub async fn find(&self, options: &QueryOptions<T>) -> StrategyResult<Vec<T>> {
        if let Some(native) = self.strategy.as_query() {
            return native.find(options).await;
        }

        self.trace_fallback("find");
        let all = self.strategy.get_all().await?;
        Ok(select_owned(all, options))
    }

    /// Returns one page of the entities passing `options`.
    ///
    /// Unset `page`/`page_size` come from the [`Config`]. A native result is
    /// returned unmodified with its totals. Without a native paged find the
    /// page is cut from [`EntityManager::find`], which may itself be native.
    pub async fn find_page(&self, options: &QueryOptions<T>) -> StrategyResult<PageResult<T>> {
        let options = options.resolved(self.config.default_page, self.config.default_page_size);

        if let Some(native) = self.strategy.as_paged_query() {
            return native.find_page(&options).await;
        }

        self.trace_fallback("find_page");
        let page = options.page.unwrap_or(self.config.default_page);
        let page_size = options.page_size.unwrap_or(self.config.default_page_size);
        let items = self.find(&options.without_paging()).await?;
        Ok(paginate(items, page, page_size))
    }

    /// Removes every entity if the strategy can; otherwise does nothing.
    pub async fn clear(&self) -> StrategyResult<()> {
        match self.strategy.as_clear() {
            Some(native) => native.clear().await,
            None => {
                self.trace_fallback("clear");
                Ok(())
            }
        }
    }

    fn trace_fallback(&self, operation: &'static str) {
        if self.config.trace_fallbacks {
            tracing::trace!(operation, "no native capability, emulating in-process");
        }
    }
}

impl<T> Clone for EntityManager<T>
where
    T: Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            strategy: Arc::clone(&self.strategy),
            equality: Arc::clone(&self.equality),
            capabilities: self.capabilities,
            config: self.config.clone(),
        }
    }
}

impl<T> fmt::Debug for EntityManager<T>
where
    T: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityManager")
            .field("capabilities", &self.capabilities)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equality::by_key;
    use crate::error::StrategyError;
    use crate::memory::InMemoryStrategy;
    use crate::strategy::{Masked, QueryCapability};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    struct Record {
        id: u32,
        name: Option<String>,
    }

    fn record(id: u32) -> Record {
        Record { id, name: None }
    }

    fn named(id: u32, name: &str) -> Record {
        Record {
            id,
            name: Some(name.to_string()),
        }
    }

    fn by_id_manager<S: Strategy<Record> + 'static>(strategy: S) -> EntityManager<Record> {
        EntityManager::with_equality(strategy, by_key(|r: &Record| r.id))
    }

    /// Mandatory operations only, with a call counter on `get_all`.
    #[derive(Default)]
    struct CountingStrategy {
        inner: InMemoryStrategy<Record>,
        get_all_calls: AtomicUsize,
    }

    #[async_trait]
    impl Strategy<Record> for CountingStrategy {
        async fn add(&self, entity: Record) -> StrategyResult<()> {
            self.inner.add(entity).await
        }

        async fn remove(
            &self,
            entity: &Record,
            equality: &dyn EqualityPolicy<Record>,
        ) -> StrategyResult<bool> {
            self.inner.remove(entity, equality).await
        }

        async fn get_all(&self) -> StrategyResult<Vec<Record>> {
            self.get_all_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get_all().await
        }

        async fn update(
            &self,
            old: &Record,
            new: Record,
            equality: &dyn EqualityPolicy<Record>,
        ) -> StrategyResult<bool> {
            self.inner.update(old, new, equality).await
        }

        async fn count(&self) -> StrategyResult<usize> {
            self.inner.count().await
        }

        async fn get_one(
            &self,
            predicate: &(dyn for<'a> Fn(&'a Record) -> bool + Send + Sync),
        ) -> StrategyResult<Option<Record>> {
            self.inner.get_one(predicate).await
        }
    }

    /// Native find that ignores its options and returns a canned answer.
    struct CannedFind {
        answer: Vec<Record>,
    }

    #[async_trait]
    impl Strategy<Record> for CannedFind {
        async fn add(&self, _entity: Record) -> StrategyResult<()> {
            Ok(())
        }

        async fn remove(
            &self,
            _entity: &Record,
            _equality: &dyn EqualityPolicy<Record>,
        ) -> StrategyResult<bool> {
            Ok(false)
        }

        async fn get_all(&self) -> StrategyResult<Vec<Record>> {
            Err(StrategyError::backend("get_all must not be called"))
        }

        async fn update(
            &self,
            _old: &Record,
            _new: Record,
            _equality: &dyn EqualityPolicy<Record>,
        ) -> StrategyResult<bool> {
            Ok(false)
        }

        async fn count(&self) -> StrategyResult<usize> {
            Ok(self.answer.len())
        }

        async fn get_one(
            &self,
            _predicate: &(dyn for<'a> Fn(&'a Record) -> bool + Send + Sync),
        ) -> StrategyResult<Option<Record>> {
            Ok(None)
        }

        fn as_query(&self) -> Option<&dyn QueryCapability<Record>> {
            Some(self)
        }
    }

    #[async_trait]
    impl QueryCapability<Record> for CannedFind {
        async fn find(&self, _options: &QueryOptions<Record>) -> StrategyResult<Vec<Record>> {
            Ok(self.answer.clone())
        }
    }

    /// Every operation fails.
    struct Offline;

    #[async_trait]
    impl Strategy<Record> for Offline {
        async fn add(&self, _entity: Record) -> StrategyResult<()> {
            Err(StrategyError::unavailable("offline"))
        }

        async fn remove(
            &self,
            _entity: &Record,
            _equality: &dyn EqualityPolicy<Record>,
        ) -> StrategyResult<bool> {
            Err(StrategyError::unavailable("offline"))
        }

        async fn get_all(&self) -> StrategyResult<Vec<Record>> {
            Err(StrategyError::unavailable("offline"))
        }

        async fn update(
            &self,
            _old: &Record,
            _new: Record,
            _equality: &dyn EqualityPolicy<Record>,
        ) -> StrategyResult<bool> {
            Err(StrategyError::unavailable("offline"))
        }

        async fn count(&self) -> StrategyResult<usize> {
            Err(StrategyError::timeout(30))
        }

        async fn get_one(
            &self,
            _predicate: &(dyn for<'a> Fn(&'a Record) -> bool + Send + Sync),
        ) -> StrategyResult<Option<Record>> {
            Err(StrategyError::unavailable("offline"))
        }
    }

    #[tokio::test]
    async fn update_by_id_then_get_one() {
        let manager = by_id_manager(InMemoryStrategy::new());
        manager.add(record(1)).await.unwrap();
        manager.add(record(2)).await.unwrap();
        manager.add(record(3)).await.unwrap();

        let updated = manager.update(&record(2), named(2, "x")).await.unwrap();
        assert!(updated);

        let found = manager.get_one(|r| r.id == 2).await.unwrap();
        assert_eq!(found, Some(named(2, "x")));
        assert_eq!(manager.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn update_missing_is_false() {
        let manager = by_id_manager(InMemoryStrategy::with_entities(vec![record(1)]));
        assert!(!manager.update(&record(5), named(5, "y")).await.unwrap());
        assert_eq!(manager.get_all().await.unwrap(), vec![record(1)]);
    }

    #[tokio::test]
    async fn remove_without_match_leaves_collection() {
        let manager = EntityManager::new(InMemoryStrategy::with_entities(vec![
            record(1),
            named(2, "b"),
        ]));

        // Structural equality: same id, different name, no match
        assert!(!manager.remove(&named(2, "other")).await.unwrap());
        assert_eq!(manager.count().await.unwrap(), 2);

        assert!(manager.remove(&named(2, "b")).await.unwrap());
        assert_eq!(manager.get_all().await.unwrap(), vec![record(1)]);
    }

    #[tokio::test]
    async fn get_one_absent_is_none() {
        let manager = by_id_manager(InMemoryStrategy::with_entities(vec![record(1)]));
        assert_eq!(manager.get_one(|r| r.id == 42).await.unwrap(), None);
    }

    #[tokio::test]
    async fn get_all_snapshot_is_independent() {
        let manager = by_id_manager(InMemoryStrategy::new());
        manager.add_many(vec![record(1), record(2)]).await.unwrap();

        let mut snapshot = manager.get_all().await.unwrap();
        snapshot.clear();
        snapshot.push(record(99));

        assert_eq!(manager.count().await.unwrap(), 2);
        assert_eq!(manager.get_all().await.unwrap(), vec![record(1), record(2)]);
    }

    #[tokio::test]
    async fn add_many_reports_count() {
        let manager = by_id_manager(InMemoryStrategy::new());
        let added = manager.add_many((1..=4).map(record)).await.unwrap();
        assert_eq!(added, 4);
        assert_eq!(manager.count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn capabilities_are_recorded_at_bind() {
        let native = by_id_manager(InMemoryStrategy::new());
        assert_eq!(native.capabilities(), Capabilities::ALL);

        let bare = by_id_manager(Masked::mandatory_only(InMemoryStrategy::new()));
        assert_eq!(bare.capabilities(), Capabilities::NONE);
    }

    #[tokio::test]
    async fn find_falls_back_to_get_all() {
        let strategy = CountingStrategy::default();
        for id in 1..=6 {
            strategy.inner.add(record(id)).await.unwrap();
        }
        let manager = by_id_manager(strategy);

        let options = QueryOptions::new()
            .with_predicate(|r: &Record| r.id % 2 == 0)
            .with_sort_by(|a: &Record, b: &Record| b.id.cmp(&a.id));
        let found = manager.find(&options).await.unwrap();

        assert_eq!(found, vec![record(6), record(4), record(2)]);
    }

    #[tokio::test]
    async fn find_page_fallback_fetches_once() {
        let strategy = Arc::new(CountingStrategy::default());
        for id in 1..=12 {
            strategy.inner.add(record(id)).await.unwrap();
        }
        let manager: EntityManager<Record> = EntityManager::from_parts(
            Arc::clone(&strategy) as Arc<dyn Strategy<Record>>,
            Arc::new(by_key(|r: &Record| r.id)),
            Config::default(),
        );

        let page = manager
            .find_page(&QueryOptions::new().with_page(3).with_page_size(5))
            .await
            .unwrap();

        assert_eq!(page.items, vec![record(11), record(12)]);
        assert_eq!(page.page, 3);
        assert_eq!(page.total_pages, 3);
        assert!(!page.has_next);
        assert!(page.has_prev);
        assert_eq!(strategy.get_all_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn native_find_is_returned_unmodified() {
        let answer = vec![record(7), record(3)];
        let manager = by_id_manager(CannedFind {
            answer: answer.clone(),
        });

        // Would reject every record if the manager filtered again
        let options = QueryOptions::new().with_predicate(|_: &Record| false);
        assert_eq!(manager.find(&options).await.unwrap(), answer);
    }

    #[tokio::test]
    async fn find_page_uses_native_find_without_native_paging() {
        let manager = by_id_manager(CannedFind {
            answer: (1..=7).map(record).collect(),
        });

        let options = QueryOptions::new()
            .with_predicate(|_: &Record| false)
            .with_page(2)
            .with_page_size(4);
        let page = manager.find_page(&options).await.unwrap();

        assert_eq!(page.items, vec![record(5), record(6), record(7)]);
        assert_eq!(page.total_items, 7);
        assert_eq!(page.total_pages, 2);
    }

    #[tokio::test]
    async fn find_page_empty_collection() {
        for manager in [
            by_id_manager(InMemoryStrategy::new()),
            by_id_manager(Masked::mandatory_only(InMemoryStrategy::new())),
        ] {
            let page = manager
                .find_page(&QueryOptions::new().with_page(4))
                .await
                .unwrap();
            assert!(page.items.is_empty());
            assert_eq!(page.page, 1);
            assert_eq!(page.total_pages, 1);
            assert!(!page.has_next);
            assert!(!page.has_prev);
        }
    }

    #[tokio::test]
    async fn find_page_uses_configured_defaults() {
        let manager = by_id_manager(Masked::mandatory_only(InMemoryStrategy::with_entities(
            (1..=9).map(record).collect(),
        )))
        .with_config(Config::new().default_page_size(4).default_page(2));

        let page = manager.find_page(&QueryOptions::new()).await.unwrap();
        assert_eq!(page.page, 2);
        assert_eq!(page.page_size, 4);
        assert_eq!(page.items, vec![record(5), record(6), record(7), record(8)]);

        let native = by_id_manager(InMemoryStrategy::with_entities((1..=9).map(record).collect()))
            .with_config(Config::new().default_page_size(4).default_page(2));
        assert_eq!(native.find_page(&QueryOptions::new()).await.unwrap(), page);
    }

    #[tokio::test]
    async fn clear_without_capability_is_noop() {
        let manager = by_id_manager(Masked::mandatory_only(InMemoryStrategy::with_entities(
            vec![record(1), record(2)],
        )));

        manager.clear().await.unwrap();
        assert_eq!(manager.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn clear_with_capability_empties() {
        let manager = by_id_manager(InMemoryStrategy::with_entities(vec![record(1), record(2)]));
        manager.clear().await.unwrap();
        assert_eq!(manager.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn backend_faults_propagate() {
        let manager = by_id_manager(Offline);

        assert!(matches!(
            manager.add(record(1)).await,
            Err(StrategyError::Unavailable { .. })
        ));
        assert!(matches!(
            manager.count().await,
            Err(StrategyError::Timeout { duration_ms: 30 })
        ));
        assert!(manager.remove(&record(1)).await.is_err());
        assert!(manager.find(&QueryOptions::new()).await.is_err());
        assert!(manager.find_page(&QueryOptions::new()).await.is_err());
        // No clear capability: nothing to fail
        assert!(manager.clear().await.is_ok());
    }

    #[tokio::test]
    async fn add_many_stops_at_first_fault() {
        let manager = by_id_manager(Offline);
        let result = manager.add_many(vec![record(1), record(2)]).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn clones_share_the_strategy() {
        let manager = by_id_manager(InMemoryStrategy::new());
        let other = manager.clone();

        other.add(record(1)).await.unwrap();
        assert_eq!(manager.count().await.unwrap(), 1);
        assert!(format!("{manager:?}").contains("EntityManager"));
    }
}
