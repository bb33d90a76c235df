//! Integration tests for [`storage::ChatListRepository`].

use chrono::Utc;
use storage::{ChatListRecord, ChatListStatus, Store, StorageError};

async fn open_store() -> Store {
    Store::open("sqlite::memory:")
        .await
        .expect("Failed to open store")
}

fn pair_record(appointment_id: Option<&str>) -> ChatListRecord {
    ChatListRecord::new(
        ("d-1".into(), "Doctor".into()),
        ("c-1".into(), "Citizen".into()),
        "Halo".into(),
        Utc::now(),
        appointment_id.map(str::to_string),
    )
}

/// **Test: A conversation is found regardless of participant order.**
///
/// **Setup:** Create a chat list for (d-1, c-1) with counters d-1=0, c-1=1.
/// **Action:** `find_by_pair("c-1", "d-1")`.
/// **Expected:** Returns the same row; counters are as created.
#[tokio::test]
async fn test_find_by_pair_is_unordered() {
    let store = open_store().await;
    let record = pair_record(None);
    store
        .chat_lists
        .create(&record, &[("d-1", 0), ("c-1", 1)])
        .await
        .expect("Failed to create chat list");

    let found = store
        .chat_lists
        .find_by_pair("c-1", "d-1")
        .await
        .expect("Failed to query")
        .expect("Chat list should exist");

    assert_eq!(found.id, record.id);
    let counts = store
        .chat_lists
        .unread_counts(&record.id)
        .await
        .expect("Failed to read counters");
    assert_eq!(counts.get("d-1"), Some(&0));
    assert_eq!(counts.get("c-1"), Some(&1));
}

/// **Test: Activity overwrites the preview and increments only the receiver.**
///
/// **Setup:** Chat list with counters d-1=0, c-1=1.
/// **Action:** `record_activity(.., receiver = "c-1")` twice, then once for "d-1".
/// **Expected:** c-1=3, d-1=1, last_message is the latest text.
#[tokio::test]
async fn test_record_activity_increments_receiver() {
    let store = open_store().await;
    let record = pair_record(None);
    store
        .chat_lists
        .create(&record, &[("d-1", 0), ("c-1", 1)])
        .await
        .expect("Failed to create chat list");

    for (text, receiver) in [("a", "c-1"), ("b", "c-1"), ("c", "d-1")] {
        store
            .chat_lists
            .record_activity(&record.id, text, Utc::now(), receiver, None)
            .await
            .expect("Failed to record activity");
    }

    let repo = &store.chat_lists;
    assert_eq!(repo.unread_for(&record.id, "c-1").await.unwrap(), 3);
    assert_eq!(repo.unread_for(&record.id, "d-1").await.unwrap(), 1);
    let updated = repo.find_by_id(&record.id).await.unwrap().unwrap();
    assert_eq!(updated.last_message, "c");
}

/// **Test: Activity on an unknown conversation is NotFound.**
#[tokio::test]
async fn test_record_activity_unknown_id() {
    let store = open_store().await;

    let result = store
        .chat_lists
        .record_activity("missing", "x", Utc::now(), "c-1", None)
        .await;

    assert!(matches!(result, Err(StorageError::NotFound(_))));
}

/// **Test: One conversation per appointment.**
///
/// **Setup:** Chat list tied to appointment "a-1".
/// **Action:** Create a second chat list with the same appointment id.
/// **Expected:** `AlreadyExists`; still exactly one row.
#[tokio::test]
async fn test_create_duplicate_appointment_conflicts() {
    let store = open_store().await;
    store
        .chat_lists
        .create(&pair_record(Some("a-1")), &[])
        .await
        .expect("Failed to create chat list");

    let second = store.chat_lists.create(&pair_record(Some("a-1")), &[]).await;

    assert!(matches!(second, Err(StorageError::AlreadyExists(_))));
    assert_eq!(store.chat_lists.count().await.unwrap(), 1);
}

/// **Test: Reset, listing and closing.**
///
/// **Setup:** Chat list for appointment "a-1" with c-1=1.
/// **Action:** `reset_unread`, `list_for_user`, `set_status_for_appointment(Done)`.
/// **Expected:** Counter 0, listed for both participants, status "done".
#[tokio::test]
async fn test_reset_list_and_close() {
    let store = open_store().await;
    let record = pair_record(Some("a-1"));
    store
        .chat_lists
        .create(&record, &[("d-1", 0), ("c-1", 1)])
        .await
        .expect("Failed to create chat list");

    store
        .chat_lists
        .reset_unread(&record.id, "c-1")
        .await
        .expect("Failed to reset");
    assert_eq!(store.chat_lists.unread_for(&record.id, "c-1").await.unwrap(), 0);

    assert_eq!(store.chat_lists.list_for_user("d-1").await.unwrap().len(), 1);
    assert_eq!(store.chat_lists.list_for_user("c-1").await.unwrap().len(), 1);
    assert!(store.chat_lists.list_for_user("x").await.unwrap().is_empty());

    let changed = store
        .chat_lists
        .set_status_for_appointment("a-1", ChatListStatus::Done)
        .await
        .expect("Failed to close");
    assert_eq!(changed, 1);
    let closed = store.chat_lists.find_by_id(&record.id).await.unwrap().unwrap();
    assert_eq!(closed.status, "done");
}

/// **Test: Pair lookup ignores appointment ids held by other pairs.**
///
/// **Setup:** Chat list (d-1, c-1) tied to appointment "a-1".
/// **Action:** `find_by_pair("c-2", "d-2")` and `find_by_appointment("a-1")`.
/// **Expected:** No conversation for the unrelated pair; the appointment resolves to (d-1, c-1).
#[tokio::test]
async fn test_find_by_pair_ignores_foreign_appointment() {
    let store = open_store().await;
    let record = pair_record(Some("a-1"));
    store
        .chat_lists
        .create(&record, &[("d-1", 0), ("c-1", 1)])
        .await
        .expect("Failed to create chat list");

    let other = store
        .chat_lists
        .find_by_pair("c-2", "d-2")
        .await
        .expect("Failed to query");
    assert!(other.is_none());

    let by_appointment = store
        .chat_lists
        .find_by_appointment("a-1")
        .await
        .expect("Failed to query")
        .expect("Appointment should be linked");
    assert_eq!(by_appointment.id, record.id);
}

/// **Test: Reassigning activity reopens the conversation under the new appointment.**
///
/// **Setup:** Chat list for "a-1", closed as done.
/// **Action:** `record_activity(.., reassign = Some("a-2"))`.
/// **Expected:** Status "ongoing", appointment "a-2"; closing "a-2" now changes one row.
#[tokio::test]
async fn test_record_activity_reassigns_appointment() {
    let store = open_store().await;
    let record = pair_record(Some("a-1"));
    let repo = &store.chat_lists;
    repo.create(&record, &[("d-1", 0), ("c-1", 1)])
        .await
        .expect("Failed to create chat list");
    repo.set_status_for_appointment("a-1", ChatListStatus::Done)
        .await
        .expect("Failed to close");

    repo.record_activity(&record.id, "Halo lagi", Utc::now(), "c-1", Some("a-2"))
        .await
        .expect("Failed to record activity");

    let updated = repo.find_by_id(&record.id).await.unwrap().unwrap();
    assert_eq!(updated.status, "ongoing");
    assert_eq!(updated.appointment_id.as_deref(), Some("a-2"));
    assert_eq!(updated.last_message, "Halo lagi");
    assert_eq!(
        repo.set_status_for_appointment("a-2", ChatListStatus::Done).await.unwrap(),
        1
    );
}
