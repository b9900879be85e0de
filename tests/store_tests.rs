//! Integration tests for the search record store and the seeded admin user.

use askarr::db::Store;
use askarr::domain::events::StoreEvent;
use askarr::domain::search::Source;
use askarr::domain::{Identity, StoreError};

/// Default API key seeded by migration (must match m20240101_initial.rs)
const DEFAULT_API_KEY: &str = "askarr_default_api_key_please_regenerate";

async fn spawn_store() -> Store {
    Store::new("sqlite::memory:")
        .await
        .expect("failed to open in-memory store")
}

fn sources(count: usize) -> Vec<Source> {
    (1..=count)
        .map(|i| Source {
            title: format!("Source {i}"),
            url: format!("https://example.com/{i}"),
        })
        .collect()
}

#[tokio::test]
async fn insert_requires_identity() {
    let store = spawn_store().await;

    let result = store.insert_search(None, "query", "answer", &[]).await;

    assert!(matches!(result, Err(StoreError::Unauthenticated)));
}

#[tokio::test]
async fn delete_requires_identity() {
    let store = spawn_store().await;

    let result = store.delete_search(None, 1).await;

    assert!(matches!(result, Err(StoreError::Unauthenticated)));
}

#[tokio::test]
async fn listing_without_identity_is_empty() {
    let store = spawn_store().await;

    assert!(store.list_recent(None, 5).await.unwrap().is_empty());
    assert!(store.list_all(None, 20).await.unwrap().is_empty());
}

#[tokio::test]
async fn records_are_scoped_to_owner() {
    let store = spawn_store().await;
    let alice = Some(Identity::new(1));
    let bob = Some(Identity::new(2));

    store
        .insert_search(alice, "alice question", "alice answer", &[])
        .await
        .unwrap();

    let alice_records = store.list_all(alice, 20).await.unwrap();
    assert_eq!(alice_records.len(), 1);
    assert_eq!(alice_records[0].query, "alice question");

    assert!(store.list_all(bob, 20).await.unwrap().is_empty());
}

#[tokio::test]
async fn listing_is_newest_first() {
    let store = spawn_store().await;
    let identity = Some(Identity::new(1));

    for query in ["first", "second", "third"] {
        store
            .insert_search(identity, query, "answer", &[])
            .await
            .unwrap();
    }

    let records = store.list_all(identity, 20).await.unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].query, "third");
    assert_eq!(records[1].query, "second");
    assert_eq!(records[2].query, "first");
}

#[tokio::test]
async fn limit_bounds_results() {
    let store = spawn_store().await;
    let identity = Some(Identity::new(1));

    for i in 0..4 {
        store
            .insert_search(identity, &format!("query {i}"), "answer", &[])
            .await
            .unwrap();
    }

    let records = store.list_recent(identity, 2).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].query, "query 3");
}

#[tokio::test]
async fn sources_are_preserved_in_order() {
    let store = spawn_store().await;
    let identity = Some(Identity::new(1));
    let expected = sources(3);

    store
        .insert_search(identity, "query", "answer", &expected)
        .await
        .unwrap();

    let records = store.list_all(identity, 20).await.unwrap();
    assert_eq!(records[0].sources, expected);
}

#[tokio::test]
async fn delete_hides_foreign_records() {
    let store = spawn_store().await;
    let alice = Some(Identity::new(1));
    let bob = Some(Identity::new(2));

    let record_id = store
        .insert_search(alice, "query", "answer", &[])
        .await
        .unwrap();

    let result = store.delete_search(bob, record_id).await;
    assert!(matches!(result, Err(StoreError::NotFound)));

    // Alice's record is untouched
    assert_eq!(store.list_all(alice, 20).await.unwrap().len(), 1);
}

#[tokio::test]
async fn delete_removes_own_record() {
    let store = spawn_store().await;
    let identity = Some(Identity::new(1));

    let record_id = store
        .insert_search(identity, "query", "answer", &[])
        .await
        .unwrap();

    store.delete_search(identity, record_id).await.unwrap();

    assert!(store.list_all(identity, 20).await.unwrap().is_empty());

    let result = store.delete_search(identity, record_id).await;
    assert!(matches!(result, Err(StoreError::NotFound)));
}

#[tokio::test]
async fn mutations_publish_events() {
    let store = spawn_store().await;
    let mut events = store.subscribe();
    let identity = Some(Identity::new(7));

    let record_id = store
        .insert_search(identity, "query", "answer", &[])
        .await
        .unwrap();

    match events.recv().await.unwrap() {
        StoreEvent::SearchSaved {
            owner_id,
            record_id: saved_id,
        } => {
            assert_eq!(owner_id, 7);
            assert_eq!(saved_id, record_id);
        }
        other => panic!("expected SearchSaved, got {other:?}"),
    }

    store.delete_search(identity, record_id).await.unwrap();

    match events.recv().await.unwrap() {
        StoreEvent::SearchDeleted {
            owner_id,
            record_id: deleted_id,
        } => {
            assert_eq!(owner_id, 7);
            assert_eq!(deleted_id, record_id);
        }
        other => panic!("expected SearchDeleted, got {other:?}"),
    }
}

#[tokio::test]
async fn admin_user_is_seeded() {
    let store = spawn_store().await;

    let admin = store
        .get_user_by_username("admin")
        .await
        .unwrap()
        .expect("admin user missing");

    assert!(admin.must_change_password);
    assert_eq!(admin.api_key, DEFAULT_API_KEY);

    assert!(
        store
            .verify_user_password("admin", "password")
            .await
            .unwrap()
    );
    assert!(
        !store
            .verify_user_password("admin", "wrong-password")
            .await
            .unwrap()
    );

    let by_key = store
        .verify_api_key(DEFAULT_API_KEY)
        .await
        .unwrap()
        .expect("api key lookup failed");
    assert_eq!(by_key.username, "admin");
}

#[tokio::test]
async fn password_change_clears_forced_flag() {
    let store = spawn_store().await;
    let security = askarr::config::SecurityConfig::default();

    store
        .update_user_password("admin", "a-new-password", &security)
        .await
        .unwrap();

    let admin = store.get_user_by_username("admin").await.unwrap().unwrap();
    assert!(!admin.must_change_password);

    assert!(
        store
            .verify_user_password("admin", "a-new-password")
            .await
            .unwrap()
    );
    assert!(!store.verify_user_password("admin", "password").await.unwrap());
}

#[tokio::test]
async fn api_key_regeneration_invalidates_old_key() {
    let store = spawn_store().await;

    let new_key = store.regenerate_user_api_key("admin").await.unwrap();
    assert_eq!(new_key.len(), 64);
    assert_ne!(new_key, DEFAULT_API_KEY);

    assert!(store.verify_api_key(DEFAULT_API_KEY).await.unwrap().is_none());
    assert!(store.verify_api_key(&new_key).await.unwrap().is_some());
}
