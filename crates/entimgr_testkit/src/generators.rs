//! Property-based test generators using proptest.
//!
//! Ids are drawn from a small range so generated operations regularly hit
//! existing entities.

use entimgr_query::QueryOptions;
use proptest::prelude::*;

use crate::fixtures::TestEntity;

/// Largest id produced by the generators.
pub const MAX_ID: u32 = 8;

/// Strategy for generating entities with ids in `1..=MAX_ID`.
pub fn entity_strategy() -> impl Strategy<Value = TestEntity> {
    (1..=MAX_ID, "[a-z]{1,6}", -3i64..10)
        .prop_map(|(id, name, score)| TestEntity::new(id, name, score))
}

/// Strategy for generating a stored collection, duplicates included.
pub fn entities_strategy(max_len: usize) -> impl Strategy<Value = Vec<TestEntity>> {
    prop::collection::vec(entity_strategy(), 0..=max_len)
}

/// One mutating manager operation.
#[derive(Debug, Clone)]
pub enum EntityOp {
    /// Add an entity.
    Add(TestEntity),
    /// Remove the first entity with this id.
    Remove {
        /// Target id.
        id: u32,
    },
    /// Rename the first entity with this id.
    Update {
        /// Target id.
        id: u32,
        /// New name.
        name: String,
    },
}

/// Strategy for generating a sequence of operations.
pub fn op_sequence_strategy(max_len: usize) -> impl Strategy<Value = Vec<EntityOp>> {
    let op = prop_oneof![
        3 => entity_strategy().prop_map(EntityOp::Add),
        2 => (1..=MAX_ID).prop_map(|id| EntityOp::Remove { id }),
        2 => (1..=MAX_ID, "[a-z]{1,6}").prop_map(|(id, name)| EntityOp::Update { id, name }),
    ];
    prop::collection::vec(op, 0..=max_len)
}

/// Sort key for a generated query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Ascending score; ties keep strategy order.
    ScoreAsc,
    /// Descending id.
    IdDesc,
}

/// A plain-data description of a query, convertible into [`QueryOptions`].
///
/// Closures do not implement `Debug`, so proptest shrinks this instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    /// Keep entities with `score >= min_score`.
    pub min_score: Option<i64>,
    /// Keep entities whose id is even.
    pub even_ids: bool,
    /// Sort to apply.
    pub sort: Option<SortKey>,
    /// Requested page, possibly zero or past the end.
    pub page: Option<usize>,
    /// Requested page size, possibly zero.
    pub page_size: Option<usize>,
}

impl QuerySpec {
    /// Returns true if the query filters or sorts.
    pub fn is_refined(&self) -> bool {
        self.min_score.is_some() || self.even_ids || self.sort.is_some()
    }

    /// Builds the query options.
    pub fn to_options(&self) -> QueryOptions<TestEntity> {
        let mut options = QueryOptions::new();
        if let Some(min) = self.min_score {
            options = options.with_predicate(move |e: &TestEntity| e.score >= min);
        }
        if self.even_ids {
            options = options.with_filter(|e: &TestEntity| e.id % 2 == 0);
        }
        match self.sort {
            Some(SortKey::ScoreAsc) => {
                options = options.with_sort_by(|a: &TestEntity, b: &TestEntity| a.score.cmp(&b.score));
            }
            Some(SortKey::IdDesc) => {
                options = options.with_sort_by(|a: &TestEntity, b: &TestEntity| b.id.cmp(&a.id));
            }
            None => {}
        }
        options.page = self.page;
        options.page_size = self.page_size;
        options
    }

    /// The same query without filters or sort.
    #[must_use]
    pub fn unrefined(&self) -> Self {
        Self {
            min_score: None,
            even_ids: false,
            sort: None,
            ..self.clone()
        }
    }
}

/// Strategy for generating queries, including out-of-range paging.
pub fn query_spec_strategy() -> impl Strategy<Value = QuerySpec> {
    (
        prop::option::of(-2i64..8),
        any::<bool>(),
        prop::option::of(prop_oneof![Just(SortKey::ScoreAsc), Just(SortKey::IdDesc)]),
        prop::option::of(0usize..8),
        prop::option::of(0usize..6),
    )
        .prop_map(|(min_score, even_ids, sort, page, page_size)| QuerySpec {
            min_score,
            even_ids,
            sort,
            page,
            page_size,
        })
}
