//! Test fixtures and manager helpers.
//!
//! Provides a sample entity type and convenience constructors for managers
//! bound to each kind of backend, so one scenario can be run against all
//! of them.

use std::sync::Once;

use entimgr_adapters::{MemoryRepository, MemoryTable, RelationalStrategy, RepositoryStrategy};
use entimgr_core::{by_key, EntityManager, EqualityPolicy, InMemoryStrategy, Masked};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// A sample entity with an identifying `id` and two payload fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestEntity {
    /// Identifier, unique within [`sample_entities`].
    pub id: u32,
    /// Display name.
    pub name: String,
    /// Score used for filtering and sorting.
    pub score: i64,
}

impl TestEntity {
    /// Creates an entity.
    pub fn new(id: u32, name: impl Into<String>, score: i64) -> Self {
        Self {
            id,
            name: name.into(),
            score,
        }
    }

    /// Returns a copy with a different name.
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

/// Equality on [`TestEntity::id`].
pub fn by_id() -> impl EqualityPolicy<TestEntity> + 'static {
    by_key(|e: &TestEntity| e.id)
}

/// Returns `n` entities with ids `1..=n`.
///
/// Scores cycle through `0..7`, so several entities share a score and sorts
/// by score exercise stability.
pub fn sample_entities(n: u32) -> Vec<TestEntity> {
    (1..=n)
        .map(|id| TestEntity::new(id, format!("entity-{id}"), i64::from(id % 7)))
        .collect()
}

/// The backends a scenario can be run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// The in-memory reference backend with every capability.
    Reference,
    /// The reference backend with every optional capability hidden.
    Fallback,
    /// A relational table with native filtered and paged select.
    Relational,
    /// A relational table with mandatory operations only.
    RelationalBare,
    /// A keyed repository with bulk delete. Adds upsert by id.
    Repository,
}

impl Backend {
    /// Every backend.
    pub const ALL: [Backend; 5] = [
        Backend::Reference,
        Backend::Fallback,
        Backend::Relational,
        Backend::RelationalBare,
        Backend::Repository,
    ];

    /// Backends whose paged queries match the reference for every query,
    /// refined or not.
    pub const EXACT_PAGING: [Backend; 4] = [
        Backend::Reference,
        Backend::Fallback,
        Backend::Relational,
        Backend::RelationalBare,
    ];

    /// Returns true if `add` appends even when an equal entity is stored.
    pub const fn appends(self) -> bool {
        !matches!(self, Backend::Repository)
    }
}

/// Creates a manager over `backend` holding `entities`, with [`by_id`]
/// equality.
pub fn manager_for(backend: Backend, entities: Vec<TestEntity>) -> EntityManager<TestEntity> {
    match backend {
        Backend::Reference => {
            EntityManager::with_equality(InMemoryStrategy::with_entities(entities), by_id())
        }
        Backend::Fallback => EntityManager::with_equality(
            Masked::mandatory_only(InMemoryStrategy::with_entities(entities)),
            by_id(),
        ),
        Backend::Relational => EntityManager::with_equality(
            RelationalStrategy::new(
                MemoryTable::with_rows(entities)
                    .with_filtered_select()
                    .with_paged_select(),
            ),
            by_id(),
        ),
        Backend::RelationalBare => EntityManager::with_equality(
            RelationalStrategy::new(MemoryTable::with_rows(entities)),
            by_id(),
        ),
        Backend::Repository => {
            let repository = MemoryRepository::new(|e: &TestEntity| Some(e.id)).with_clear();
            repository.seed(entities).expect("fixture rows are keyed");
            EntityManager::with_equality(RepositoryStrategy::new(repository), by_id())
        }
    }
}

/// Installs a test subscriber honouring `RUST_LOG`, once per process.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Runs `future` to completion on a fresh current-thread runtime.
///
/// For property tests, whose bodies are synchronous.
pub fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime")
        .block_on(future)
}
