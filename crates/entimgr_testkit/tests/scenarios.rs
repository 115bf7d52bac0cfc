//! End-to-end scenarios across backends.

use entimgr_adapters::{MemoryRepository, RepositoryStrategy};
use entimgr_core::{EntityManager, QueryOptions, StrategyError};
use entimgr_testkit::prelude::*;

#[tokio::test]
async fn update_then_get_one_on_every_backend() {
    init_tracing();
    for backend in Backend::ALL {
        let manager = manager_for(backend, Vec::new());
        for id in 1..=3 {
            manager.add(TestEntity::new(id, "", 0)).await.unwrap();
        }

        let old = TestEntity::new(2, "", 0);
        assert!(manager.update(&old, old.renamed("x")).await.unwrap(), "{backend:?}");

        let found = manager.get_one(|e| e.id == 2).await.unwrap();
        assert_eq!(found.map(|e| e.name), Some("x".to_string()), "{backend:?}");
        assert_eq!(manager.count().await.unwrap(), 3, "{backend:?}");
    }
}

#[tokio::test]
async fn third_page_of_twelve() {
    for backend in Backend::ALL {
        let manager = manager_for(backend, sample_entities(12));
        let page = manager
            .find_page(&QueryOptions::new().with_page(3).with_page_size(5))
            .await
            .unwrap();

        let ids: Vec<_> = page.items.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![11, 12], "{backend:?}");
        assert_eq!(page.page, 3);
        assert_eq!(page.total_pages, 3);
        assert!(!page.has_next);
        assert!(page.has_prev);
    }
}

#[tokio::test]
async fn empty_collection_pages() {
    for backend in Backend::ALL {
        let manager = manager_for(backend, Vec::new());
        let page = manager.find_page(&QueryOptions::new()).await.unwrap();

        assert!(page.items.is_empty(), "{backend:?}");
        assert_eq!(page.page, 1);
        assert_eq!(page.total_items, 0);
        assert_eq!(page.total_pages, 1);
        assert!(!page.has_next);
        assert!(!page.has_prev);
    }
}

#[tokio::test]
async fn filtered_sorted_find() {
    let options = QueryOptions::new()
        .with_predicate(|e: &TestEntity| e.score >= 4)
        .with_filter(|e: &TestEntity| e.id > 5)
        .with_sort_by(|a: &TestEntity, b: &TestEntity| b.score.cmp(&a.score));

    for backend in Backend::ALL {
        let manager = manager_for(backend, sample_entities(14));
        let ids: Vec<_> = manager
            .find(&options)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        // scores: 6 -> 6, 13 -> 6, 12 -> 5, 11 -> 4; ties keep insertion order
        assert_eq!(ids, vec![6, 13, 12, 11], "{backend:?}");
    }
}

#[tokio::test]
async fn clear_depends_on_capability() {
    for backend in Backend::ALL {
        let manager = manager_for(backend, sample_entities(3));
        manager.clear().await.unwrap();

        let expected = if manager.capabilities().clear { 0 } else { 3 };
        assert_eq!(manager.count().await.unwrap(), expected, "{backend:?}");
    }
}

#[tokio::test]
async fn page_serializes_flat() {
    let manager = manager_for(Backend::Reference, sample_entities(3));
    let page = manager
        .find_page(&QueryOptions::new().with_page_size(2))
        .await
        .unwrap();

    let json = serde_json::to_value(&page).unwrap();
    assert_eq!(json["page"], 1);
    assert_eq!(json["total_pages"], 2);
    assert_eq!(json["has_next"], true);
    assert_eq!(json["items"][1]["name"], "entity-2");
}

#[tokio::test]
async fn concurrent_adds_through_clones() {
    let manager = manager_for(Backend::Reference, Vec::new());

    let handles: Vec<_> = (0..8u32)
        .map(|worker| {
            let manager = manager.clone();
            tokio::spawn(async move {
                for i in 0..25 {
                    let id = worker * 100 + i;
                    manager.add(TestEntity::new(id, "w", 0)).await.unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(manager.count().await.unwrap(), 200);
}

#[tokio::test]
async fn repository_faults_reach_the_caller() {
    let repository = MemoryRepository::new(|e: &TestEntity| Some(e.id));
    repository.seed(sample_entities(2)).unwrap();
    repository.set_offline(true);
    let manager = EntityManager::with_equality(RepositoryStrategy::new(repository), by_id());

    let err = manager.remove(&TestEntity::new(1, "", 0)).await.unwrap_err();
    assert!(matches!(err, StrategyError::Adapter(_)));
    assert!(!err.is_transient());
    assert!(manager.find_page(&QueryOptions::new()).await.is_err());
}
