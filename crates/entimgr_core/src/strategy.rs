//! The strategy contract every storage backend implements.

use async_trait::async_trait;
use entimgr_query::{PageResult, QueryOptions};

use crate::equality::EqualityPolicy;
use crate::error::StrategyResult;

/// A pluggable persistence backend for entities of type `T`.
///
/// Strategies own their collection. The six mandatory operations are plain
/// request/response calls; the optional ones (`find`, `find_page`, `clear`)
/// are exposed through the capability accessors, which return `None` unless
/// the backend answers them natively.
///
/// # Invariants
///
/// - `get_all`, `get_one` and native finds return owned snapshots, never
///   views of internal state
/// - `remove` and `update` locate the target with the supplied equality
///   policy; not finding it is `Ok(false)`, not an error
/// - capability accessors answer the same way for the strategy's lifetime
/// - a native `find`/`find_page` produces what the in-process fallback would
///   produce over `get_all` for the same options
///
/// # Implementors
///
/// - [`crate::InMemoryStrategy`] - reference backend, all capabilities
/// - [`crate::Masked`] - hides capabilities of an inner strategy
#[async_trait]
pub trait Strategy<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    /// Stores an entity. No deduplication.
    async fn add(&self, entity: T) -> StrategyResult<()>;

    /// Removes the first entity equal to `entity`.
    ///
    /// Returns `true` if one was removed.
    async fn remove(&self, entity: &T, equality: &dyn EqualityPolicy<T>) -> StrategyResult<bool>;

    /// Returns a snapshot of every stored entity.
    async fn get_all(&self) -> StrategyResult<Vec<T>>;

    /// Replaces the first entity equal to `old` with `new`.
    ///
    /// Returns `true` if a replacement happened.
    async fn update(
        &self,
        old: &T,
        new: T,
        equality: &dyn EqualityPolicy<T>,
    ) -> StrategyResult<bool>;

    /// Returns the number of stored entities.
    async fn count(&self) -> StrategyResult<usize>;

    /// Returns the first entity, in strategy order, satisfying `predicate`.
    async fn get_one(
        &self,
        predicate: &(dyn for<'a> Fn(&'a T) -> bool + Send + Sync),
    ) -> StrategyResult<Option<T>>;

    /// Native filtered find, if supported.
    fn as_query(&self) -> Option<&dyn QueryCapability<T>> {
        None
    }

    /// Native paginated find, if supported.
    fn as_paged_query(&self) -> Option<&dyn PagedQueryCapability<T>> {
        None
    }

    /// Native clear, if supported.
    fn as_clear(&self) -> Option<&dyn ClearCapability> {
        None
    }

    /// Summarizes which optional operations this strategy answers natively.
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            find: self.as_query().is_some(),
            find_page: self.as_paged_query().is_some(),
            clear: self.as_clear().is_some(),
        }
    }
}

/// Native filtered find.
#[async_trait]
pub trait QueryCapability<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    /// Returns every entity passing `options`, sorted if requested.
    ///
    /// Paging fields are ignored.
    async fn find(&self, options: &QueryOptions<T>) -> StrategyResult<Vec<T>>;
}

/// Native paginated find.
#[async_trait]
pub trait PagedQueryCapability<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    /// Returns one page of the entities passing `options`, with totals
    /// counted after filtering.
    async fn find_page(&self, options: &QueryOptions<T>) -> StrategyResult<PageResult<T>>;
}

/// Native removal of every entity.
#[async_trait]
pub trait ClearCapability: Send + Sync {
    /// Removes every stored entity.
    async fn clear(&self) -> StrategyResult<()>;
}

/// Which optional operations a strategy answers natively.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities {
    /// Native filtered find.
    pub find: bool,
    /// Native paginated find.
    pub find_page: bool,
    /// Native clear.
    pub clear: bool,
}

impl Capabilities {
    /// No optional capability.
    pub const NONE: Self = Self {
        find: false,
        find_page: false,
        clear: false,
    };

    /// Every optional capability.
    pub const ALL: Self = Self {
        find: true,
        find_page: true,
        clear: true,
    };

    /// Returns the capabilities present in both `self` and `other`.
    #[must_use]
    pub const fn intersect(self, other: Self) -> Self {
        Self {
            find: self.find && other.find,
            find_page: self.find_page && other.find_page,
            clear: self.clear && other.clear,
        }
    }
}

/// Wraps a strategy and hides the optional capabilities outside `mask`.
///
/// Mandatory operations pass straight through. Useful to force the manager
/// onto its in-process fallback against a backend that would otherwise answer
/// natively, e.g. to compare both paths.
#[derive(Debug)]
pub struct Masked<S> {
    inner: S,
    mask: Capabilities,
}

impl<S> Masked<S> {
    /// Exposes only the capabilities in `mask`.
    pub fn new(inner: S, mask: Capabilities) -> Self {
        Self { inner, mask }
    }

    /// Exposes no optional capability.
    pub fn mandatory_only(inner: S) -> Self {
        Self::new(inner, Capabilities::NONE)
    }

    /// Returns the wrapped strategy.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Unwraps the strategy.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<T, S> Strategy<T> for Masked<S>
where
    T: Send + Sync + 'static,
    S: Strategy<T>,
{
    async fn add(&self, entity: T) -> StrategyResult<()> {
        self.inner.add(entity).await
    }

    async fn remove(&self, entity: &T, equality: &dyn EqualityPolicy<T>) -> StrategyResult<bool> {
        self.inner.remove(entity, equality).await
    }

    async fn get_all(&self) -> StrategyResult<Vec<T>> {
        self.inner.get_all().await
    }

    async fn update(
        &self,
        old: &T,
        new: T,
        equality: &dyn EqualityPolicy<T>,
    ) -> StrategyResult<bool> {
        self.inner.update(old, new, equality).await
    }

    async fn count(&self) -> StrategyResult<usize> {
        self.inner.count().await
    }

    async fn get_one(
        &self,
        predicate: &(dyn for<'a> Fn(&'a T) -> bool + Send + Sync),
    ) -> StrategyResult<Option<T>> {
        self.inner.get_one(predicate).await
    }

    fn as_query(&self) -> Option<&dyn QueryCapability<T>> {
        self.inner.as_query().filter(|_| self.mask.find)
    }

    fn as_paged_query(&self) -> Option<&dyn PagedQueryCapability<T>> {
        self.inner.as_paged_query().filter(|_| self.mask.find_page)
    }

    fn as_clear(&self) -> Option<&dyn ClearCapability> {
        self.inner.as_clear().filter(|_| self.mask.clear)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStrategy;

    #[test]
    fn capability_constants() {
        assert_eq!(Capabilities::default(), Capabilities::NONE);
        assert_eq!(Capabilities::ALL.intersect(Capabilities::NONE), Capabilities::NONE);
        let only_find = Capabilities {
            find: true,
            ..Capabilities::NONE
        };
        assert_eq!(Capabilities::ALL.intersect(only_find), only_find);
    }

    #[test]
    fn masked_hides_capabilities() {
        let inner: InMemoryStrategy<u32> = InMemoryStrategy::new();
        assert_eq!(Strategy::<u32>::capabilities(&inner), Capabilities::ALL);

        let bare = Masked::mandatory_only(inner);
        assert_eq!(Strategy::<u32>::capabilities(&bare), Capabilities::NONE);
    }

    #[test]
    fn masked_never_adds_capabilities() {
        let inner: InMemoryStrategy<u32> = InMemoryStrategy::new();
        let only_clear = Capabilities {
            clear: true,
            ..Capabilities::NONE
        };
        let masked = Masked::new(Masked::new(inner, only_clear), Capabilities::ALL);
        assert_eq!(Strategy::<u32>::capabilities(&masked), only_clear);
    }

    #[tokio::test]
    async fn masked_passes_mandatory_operations_through() {
        let masked = Masked::mandatory_only(InMemoryStrategy::with_entities(vec![1u32, 2, 3]));

        masked.add(4).await.unwrap();
        assert_eq!(masked.count().await.unwrap(), 4);
        assert!(masked.remove(&2, &crate::ValueEquality).await.unwrap());
        assert_eq!(masked.get_all().await.unwrap(), vec![1, 3, 4]);
        assert_eq!(masked.inner().snapshot(), vec![1, 3, 4]);
    }

    #[tokio::test]
    async fn get_one_through_trait_object_with_capturing_predicate() {
        let strategies: Vec<Box<dyn Strategy<String>>> = vec![
            Box::new(InMemoryStrategy::with_entities(vec!["ab".into(), "abc".into()])),
            Box::new(Masked::mandatory_only(InMemoryStrategy::with_entities(vec![
                "ab".into(),
                "abc".into(),
            ]))),
        ];
        let wanted = String::from("abc");

        for strategy in &strategies {
            let found = strategy.get_one(&|s: &String| *s == wanted).await.unwrap();
            assert_eq!(found.as_deref(), Some("abc"));

            let len = 5;
            let missing = strategy.get_one(&|s: &String| s.len() == len).await.unwrap();
            assert_eq!(missing, None);
        }
    }
}
