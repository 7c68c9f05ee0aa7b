//! Store behavior against the scripted backend: pagination, guards,
//! reconciliation, derived views, and failure propagation.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use teledesk_client::testing::{TestDirectoryApi, sample_address, sample_user};
use teledesk_client::{
    ChangeType, EntityKind, StoreChangeEvent, StoreSubscriber, UserStore,
};
use teledesk_model::{NewAddress, NewUser, UserId, UserRole};

fn store_over(api: &TestDirectoryApi) -> UserStore {
    UserStore::new(Arc::new(api.clone()))
}

/// Thirteen users, newest first, ids 13 down to 1.
fn seed_thirteen(api: &TestDirectoryApi) {
    api.seed_users((1..=13).rev().map(|id| sample_user(id, "Иван", "Иванов")));
}

fn new_user(telegram_uid: i64, first_name: &str, last_name: &str) -> NewUser {
    NewUser {
        telegram_uid,
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        tg_username: None,
        photo_url: None,
        role_id: None,
        created_at: None,
        extra_fields: HashMap::new(),
    }
}

fn new_address(user_id: i64) -> NewAddress {
    NewAddress {
        user_id: UserId(user_id),
        country: "Россия".to_string(),
        city: "Казань".to_string(),
        street: "Баумана".to_string(),
        building: "7".to_string(),
        appartment: Some("12".to_string()),
        postal_code: "420111".to_string(),
        is_deleted: None,
    }
}

#[derive(Default)]
struct RecordingSubscriber {
    events: Mutex<Vec<StoreChangeEvent>>,
}

impl RecordingSubscriber {
    fn events(&self) -> Vec<StoreChangeEvent> {
        self.events.lock().clone()
    }
}

impl StoreSubscriber for RecordingSubscriber {
    fn on_store_changed(&self, event: StoreChangeEvent) {
        self.events.lock().push(event);
    }
}

#[tokio::test]
async fn pages_grow_monotonically_and_preserve_order() {
    let api = TestDirectoryApi::new();
    seed_thirteen(&api);
    let store = store_over(&api);

    let first_page = store.fetch_users().await.unwrap();
    assert_eq!(first_page.len(), 10);
    let after_first = store.users();
    assert_eq!(after_first.len(), 10);

    let second_page = store.fetch_users().await.unwrap();
    assert_eq!(second_page.len(), 3);
    let after_second = store.users();
    assert_eq!(after_second.len(), 13);

    // Previously fetched entries keep their positions.
    assert_eq!(&after_second[..10], &after_first[..]);
    let ids: Vec<i64> = after_second.iter().map(|user| user.id.value()).collect();
    assert_eq!(ids, (1..=13).rev().collect::<Vec<i64>>());

    assert_eq!(api.fetch_users_calls(), vec![(0, 10), (10, 10)]);
}

#[tokio::test]
async fn short_page_without_total_count_exhausts_pagination() {
    let api = TestDirectoryApi::new();
    seed_thirteen(&api);
    let store = store_over(&api);

    store.fetch_users().await.unwrap();
    assert!(store.has_more_users());

    store.fetch_users().await.unwrap();
    assert!(!store.has_more_users());
    assert_eq!(store.users().len(), 13);

    // Exhausted: no further network call is made.
    let empty = store.fetch_users().await.unwrap();
    assert!(empty.is_empty());
    assert_eq!(api.fetch_users_calls().len(), 2);
}

#[tokio::test]
async fn total_count_header_drives_exhaustion_exactly() {
    let api = TestDirectoryApi::new();
    api.seed_users((1..=20).rev().map(|id| sample_user(id, "Иван", "Иванов")));
    api.expose_total_count(true);
    let store = store_over(&api);

    store.fetch_users().await.unwrap();
    // 10 of 20 cached: more remains even though the page was full.
    assert!(store.has_more_users());

    store.fetch_users().await.unwrap();
    // 20 of 20 cached: exhausted even though the page was full.
    assert!(!store.has_more_users());
}

#[tokio::test]
async fn total_count_of_one_exhausts_after_single_record() {
    let api = TestDirectoryApi::new();
    api.seed_users([sample_user(1, "Иван", "Иванов")]);
    api.expose_total_count(true);
    let store = store_over(&api);

    let page = store.fetch_users().await.unwrap();
    assert_eq!(page.len(), 1);
    assert!(!store.has_more_users());
}

#[tokio::test]
async fn concurrent_fetch_is_a_guarded_no_op() {
    let api = TestDirectoryApi::new();
    seed_thirteen(&api);
    api.set_latency(Duration::from_millis(50));
    let store = Arc::new(store_over(&api));

    let background = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.fetch_users().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(store.is_loading_users());

    // Second call while the first is in flight: empty result, no network call.
    let empty = store.fetch_users().await.unwrap();
    assert!(empty.is_empty());
    assert_eq!(api.fetch_users_calls().len(), 1);

    let first = background.await.unwrap().unwrap();
    assert_eq!(first.len(), 10);
    assert!(!store.is_loading_users());
}

#[tokio::test]
async fn add_user_prepends_server_record() {
    let api = TestDirectoryApi::new();
    api.seed_users([sample_user(1, "Иван", "Иванов")]);
    let store = store_over(&api);

    let created = store
        .add_user(new_user(200, "Пётр", "Петров"))
        .await
        .unwrap();

    assert_eq!(created.id, UserId(2));
    assert_eq!(created.role_id, UserRole::User);
    let users = store.users();
    assert_eq!(users[0].id, UserId(2));
    assert_eq!(users[0].first_name, "Пётр");
    assert!(!store.is_loading_users());
}

#[tokio::test]
async fn reset_reloads_exactly_one_first_page() {
    let api = TestDirectoryApi::new();
    api.seed_users((1..=3).rev().map(|id| sample_user(id, "Иван", "Иванов")));
    let store = store_over(&api);

    store.fetch_users().await.unwrap();
    assert!(!store.has_more_users());

    // Reset must lift the exhaustion flag before refetching, or this would
    // no-op.
    let reloaded = store.reset_users().await.unwrap();
    assert_eq!(reloaded.len(), 3);
    assert_eq!(store.users().len(), 3);
    assert_eq!(api.fetch_users_calls(), vec![(0, 10), (0, 10)]);
}

#[tokio::test]
async fn failed_fetch_keeps_state_and_clears_loading() {
    let api = TestDirectoryApi::new();
    seed_thirteen(&api);
    api.fail_next_fetch_users();
    let store = store_over(&api);

    let err = store.fetch_users().await.unwrap_err();
    assert!(err.to_string().contains("scripted"));
    assert!(store.users().is_empty());
    assert!(store.has_more_users());
    assert!(!store.is_loading_users());

    // No automatic retry happened, and the store accepts a new fetch.
    assert_eq!(api.fetch_users_calls().len(), 1);
    assert_eq!(store.fetch_users().await.unwrap().len(), 10);
}

#[tokio::test]
async fn failed_add_user_leaves_cache_untouched() {
    let api = TestDirectoryApi::new();
    api.fail_next_add_user();
    let store = store_over(&api);

    let result = store.add_user(new_user(300, "Анна", "Каренина")).await;
    assert!(result.is_err());
    assert!(store.users().is_empty());
    assert!(!store.is_loading_users());
    assert_eq!(api.add_user_calls(), 1);
}

#[tokio::test]
async fn dynamic_field_keys_union_without_duplicates() {
    let api = TestDirectoryApi::new();
    let mut ivan = sample_user(2, "Иван", "Иванов");
    ivan.extra_fields = HashMap::from([
        ("hobby".to_string(), "видеоигры".to_string()),
        ("pet".to_string(), "кот".to_string()),
    ]);
    let mut petr = sample_user(1, "Пётр", "Петров");
    petr.extra_fields = HashMap::from([
        ("car".to_string(), "ВАЗ-2101".to_string()),
        ("hobby".to_string(), "шахматы".to_string()),
    ]);
    api.seed_users([ivan, petr]);
    let store = store_over(&api);

    store.fetch_users().await.unwrap();
    assert_eq!(store.dynamic_field_keys(), vec!["hobby", "pet", "car"]);
}

#[tokio::test]
async fn addresses_group_by_user_and_hide_soft_deleted() {
    let api = TestDirectoryApi::new();
    api.seed_addresses([
        sample_address(1, 1),
        sample_address(2, 2),
        sample_address(3, 1),
    ]);
    let store = store_over(&api);

    store.fetch_all_addresses().await.unwrap();
    assert!(!store.is_loading_addresses());

    // Soft-deleted rows may enter the cache but never the grouped view.
    let mut tombstone = new_address(1);
    tombstone.is_deleted = Some(true);
    store.add_address(tombstone).await.unwrap();

    assert_eq!(store.addresses().len(), 4);
    let grouped = store.addresses_for_user();
    assert_eq!(grouped[&UserId(1)].len(), 2);
    assert_eq!(grouped[&UserId(2)].len(), 1);
    assert_eq!(
        grouped[&UserId(1)]
            .iter()
            .map(|addr| addr.id.value())
            .collect::<Vec<i64>>(),
        vec![1, 3]
    );
}

#[tokio::test]
async fn add_address_prepends_and_defaults_live() {
    let api = TestDirectoryApi::new();
    api.seed_addresses([sample_address(1, 1)]);
    let store = store_over(&api);

    store.fetch_all_addresses().await.unwrap();
    let created = store.add_address(new_address(1)).await.unwrap();

    assert!(!created.is_deleted);
    assert_eq!(store.addresses()[0].id, created.id);
    assert!(!store.is_loading_addresses());
}

#[tokio::test]
async fn fetch_all_addresses_replaces_wholesale() {
    let api = TestDirectoryApi::new();
    api.seed_addresses([sample_address(1, 1), sample_address(2, 1)]);
    let store = store_over(&api);

    store.fetch_all_addresses().await.unwrap();
    assert_eq!(store.addresses().len(), 2);

    api.seed_addresses([sample_address(9, 2)]);
    store.fetch_all_addresses().await.unwrap();
    assert_eq!(store.addresses().len(), 1);
    assert_eq!(store.addresses()[0].user_id, UserId(2));
    assert_eq!(api.fetch_addresses_calls(), 2);
}

#[tokio::test]
async fn subscribers_observe_changes_until_dropped() {
    let api = TestDirectoryApi::new();
    seed_thirteen(&api);
    let store = store_over(&api);

    let subscriber = Arc::new(RecordingSubscriber::default());
    let weak_subscriber = Arc::downgrade(&subscriber);
    let weak_subscriber: Weak<dyn StoreSubscriber> = weak_subscriber;
    store.subscribe(weak_subscriber);

    store.fetch_users().await.unwrap();
    store.add_user(new_user(400, "Ольга", "Ларина")).await.unwrap();
    store.reset_users().await.unwrap();

    let observed: Vec<(EntityKind, ChangeType)> = subscriber
        .events()
        .iter()
        .map(|event| (event.entity, event.change))
        .collect();
    assert_eq!(
        observed,
        vec![
            (EntityKind::Users, ChangeType::Appended),
            (EntityKind::Users, ChangeType::Prepended),
            (EntityKind::Users, ChangeType::Cleared),
            (EntityKind::Users, ChangeType::Appended),
        ]
    );

    let seen_before_drop = subscriber.events().len();
    let weak = Arc::downgrade(&subscriber);
    drop(subscriber);
    store.fetch_users().await.unwrap();
    assert!(weak.upgrade().is_none());
    assert_eq!(seen_before_drop, 4);
}
