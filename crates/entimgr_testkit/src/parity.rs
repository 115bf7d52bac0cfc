//! Cross-backend parity helpers.
//!
//! Provides a plain `Vec` model of the manager under [`by_id`] equality and
//! assertions comparing managers against each other.
//!
//! [`by_id`]: crate::fixtures::by_id

use std::fmt::Debug;

use entimgr_core::{EntityManager, QueryOptions, StrategyResult};

use crate::fixtures::{Backend, TestEntity};
use crate::generators::EntityOp;

/// A model of a backend under id equality.
///
/// Appends on add by default; an upserting model replaces the first entity
/// with the same id instead, as a keyed repository does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    entities: Vec<TestEntity>,
    upsert: bool,
}

impl Model {
    /// Creates an appending model holding `entities`.
    pub fn new(entities: Vec<TestEntity>) -> Self {
        Self {
            entities,
            upsert: false,
        }
    }

    /// Creates an upserting model holding `entities`.
    pub fn upserting(entities: Vec<TestEntity>) -> Self {
        Self {
            entities,
            upsert: true,
        }
    }

    /// Creates the model matching how `backend` adds.
    pub fn for_backend(backend: Backend, entities: Vec<TestEntity>) -> Self {
        if backend.appends() {
            Self::new(entities)
        } else {
            Self::upserting(entities)
        }
    }

    /// Returns the live entities in order.
    pub fn entities(&self) -> &[TestEntity] {
        &self.entities
    }

    /// Applies `op` and returns what the manager should report: `None` for
    /// an add, otherwise whether a target was found.
    pub fn apply(&mut self, op: &EntityOp) -> Option<bool> {
        match op {
            EntityOp::Add(entity) => {
                let upsert = self.upsert;
                let stored = self
                    .entities
                    .iter_mut()
                    .find(|e| upsert && e.id == entity.id);
                match stored {
                    Some(stored) => *stored = entity.clone(),
                    None => self.entities.push(entity.clone()),
                }
                None
            }
            EntityOp::Remove { id } => {
                let index = self.entities.iter().position(|e| e.id == *id);
                Some(index.map(|i| self.entities.remove(i)).is_some())
            }
            EntityOp::Update { id, name } => {
                let entity = self.entities.iter_mut().find(|e| e.id == *id);
                Some(entity.map(|e| e.name.clone_from(name)).is_some())
            }
        }
    }
}

/// Applies `op` through `manager`, mirroring [`Model::apply`].
///
/// Remove and update address the target by id only; the other fields of
/// the entity handed to the manager are placeholders.
pub async fn apply_op(manager: &EntityManager<TestEntity>, op: &EntityOp) -> StrategyResult<Option<bool>> {
    match op {
        EntityOp::Add(entity) => {
            manager.add(entity.clone()).await?;
            Ok(None)
        }
        EntityOp::Remove { id } => {
            let target = TestEntity::new(*id, "", 0);
            manager.remove(&target).await.map(Some)
        }
        EntityOp::Update { id, name } => {
            let Some(current) = manager.get_one(|e| e.id == *id).await? else {
                let target = TestEntity::new(*id, name.clone(), 0);
                return manager.update(&target, target.clone()).await.map(Some);
            };
            manager.update(&current, current.renamed(name.clone())).await.map(Some)
        }
    }
}

/// Asserts two managers return the same page for `options`.
///
/// Compares items and every metadata field.
pub async fn assert_page_parity<T>(
    expected: &EntityManager<T>,
    actual: &EntityManager<T>,
    options: &QueryOptions<T>,
) where
    T: Debug + PartialEq + Send + Sync + 'static,
{
    let want = expected
        .find_page(options)
        .await
        .expect("expected manager failed");
    let got = actual.find_page(options).await.expect("actual manager failed");

    tracing::debug!(
        expected = ?expected.capabilities(),
        actual = ?actual.capabilities(),
        page = want.page,
        total_items = want.total_items,
        "comparing pages"
    );
    assert_eq!(got.info(), want.info(), "page metadata differs");
    assert_eq!(got.items, want.items, "page items differ");
}

/// Asserts two managers return the same sequence from `find`.
pub async fn assert_find_parity<T>(
    expected: &EntityManager<T>,
    actual: &EntityManager<T>,
    options: &QueryOptions<T>,
) where
    T: Debug + PartialEq + Send + Sync + 'static,
{
    let want = expected.find(options).await.expect("expected manager failed");
    let got = actual.find(options).await.expect("actual manager failed");
    assert_eq!(got, want, "find results differ");
}
