//! Integration tests for [`auto_message::AutoMessageScheduler`].
//!
//! The scheduler submits greetings through a real chain (persistence + chat list) over an
//! in-memory SQLite store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use auto_message::{
    accepted_channel, AutoMessageScheduler, SchedulerConfig, TickReport, DEFAULT_GREETING,
};
use chat_list::{ChatListAggregator, ChatListHandler};
use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};
use handler_chain::{ChainSink, HandlerChain};
use keyed_lock::LockManager;
use konsul_core::{ChatMessage, Inbound, KonsulError, MessageSink};
use middleware::PersistenceMiddleware;
use storage::{AppointmentRecord, AppointmentStatus, ProfileKind, ProfileRecord, Store};

async fn seeded_store() -> Store {
    let store = Store::open("sqlite::memory:")
        .await
        .expect("Failed to open store");
    store
        .directory
        .upsert(ProfileKind::Doctor, &ProfileRecord::new("d-1", "dr. Sari"))
        .await
        .expect("Failed to seed doctor");
    store
        .directory
        .upsert(ProfileKind::Citizen, &ProfileRecord::new("c-1", "Budi"))
        .await
        .expect("Failed to seed citizen");
    store
}

fn chain_sink(store: &Store) -> Arc<ChainSink> {
    let chain = HandlerChain::new()
        .add_middleware(Arc::new(PersistenceMiddleware::new(store.messages.clone())))
        .add_handler(Arc::new(ChatListHandler::new(ChatListAggregator::new(store))));
    Arc::new(ChainSink::new(chain))
}

fn utc_config() -> SchedulerConfig {
    SchedulerConfig {
        offset: FixedOffset::east_opt(0).unwrap(),
        ..SchedulerConfig::default()
    }
}

fn scheduler(store: &Store, sink: Arc<dyn MessageSink>) -> AutoMessageScheduler {
    AutoMessageScheduler::new(
        store.appointments.clone(),
        sink,
        Arc::new(LockManager::new()),
        utc_config(),
    )
}

async fn accepted_appointment(store: &Store, citizen: &str, time: &str) -> AppointmentRecord {
    let record = AppointmentRecord::new(
        "d-1",
        citizen,
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        time,
        "Demam",
    )
    .with_status(AppointmentStatus::Accepted);
    store
        .appointments
        .insert(&record)
        .await
        .expect("Failed to save appointment");
    record
}

/// **Test: A due appointment is greeted exactly once.**
///
/// **Setup:** Accepted appointment on 2024-01-01 at 09:00 (UTC), flag unset.
/// **Action:** `tick(2024-01-01T09:05Z)`, then tick again.
/// **Expected:** First tick sends one greeting from doctor to citizen, chat list unread for the
/// citizen is 1, the flag is set. Second tick sends nothing.
#[tokio::test]
async fn test_due_appointment_greeted_once() {
    let store = seeded_store().await;
    let appointment = accepted_appointment(&store, "c-1", "09:00").await;
    let scheduler = scheduler(&store, chain_sink(&store));
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 9, 5, 0).unwrap();

    let first = scheduler.tick(now).await.expect("Tick failed");

    assert_eq!(first.sent, 1);
    assert_eq!(store.messages.count().await.unwrap(), 1);
    let history = store.messages.between("d-1", "c-1").await.unwrap();
    assert_eq!(history[0].sender_id, "d-1");
    assert_eq!(history[0].receiver_id, "c-1");
    assert_eq!(history[0].text.as_deref(), Some(DEFAULT_GREETING));
    assert_eq!(history[0].role, "doctor");

    let chat_list = store
        .chat_lists
        .find_by_appointment(&appointment.id)
        .await
        .unwrap()
        .expect("Chat list should exist");
    assert_eq!(store.chat_lists.unread_for(&chat_list.id, "c-1").await.unwrap(), 1);
    assert_eq!(store.chat_lists.unread_for(&chat_list.id, "d-1").await.unwrap(), 0);
    assert!(store.appointments.is_auto_message_sent(&appointment.id).await.unwrap());

    let second = scheduler.tick(now).await.expect("Tick failed");
    assert_eq!(second.sent, 0);
    assert_eq!(
        store
            .messages
            .count_for_appointment(&appointment.id)
            .await
            .unwrap(),
        1
    );
}

/// **Test: Appointments in the future are left alone.**
#[tokio::test]
async fn test_not_due_yet() {
    let store = seeded_store().await;
    let appointment = accepted_appointment(&store, "c-1", "10:00").await;
    let scheduler = scheduler(&store, chain_sink(&store));

    let report = scheduler
        .tick(Utc.with_ymd_and_hms(2024, 1, 1, 9, 59, 0).unwrap())
        .await
        .unwrap();

    assert_eq!(
        report,
        TickReport {
            examined: 1,
            not_due: 1,
            ..TickReport::default()
        }
    );
    assert!(!store.appointments.is_auto_message_sent(&appointment.id).await.unwrap());
}

/// **Test: The configured offset decides when the consultation starts.**
///
/// **Setup:** 09:00 appointment, scheduler at +07:00.
/// **Action:** tick at 01:59Z and at 02:00Z.
/// **Expected:** Not due, then sent.
#[tokio::test]
async fn test_offset_applies() {
    let store = seeded_store().await;
    accepted_appointment(&store, "c-1", "09:00").await;
    let scheduler = AutoMessageScheduler::new(
        store.appointments.clone(),
        chain_sink(&store),
        Arc::new(LockManager::new()),
        SchedulerConfig::default(),
    );

    let early = scheduler
        .tick(Utc.with_ymd_and_hms(2024, 1, 1, 1, 59, 0).unwrap())
        .await
        .unwrap();
    let on_time = scheduler
        .tick(Utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 0).unwrap())
        .await
        .unwrap();

    assert_eq!(early.sent, 0);
    assert_eq!(on_time.sent, 1);
}

/// **Test: Missing participants and bad times are skipped, not fatal.**
///
/// **Setup:** One appointment with an unknown citizen, one with time "nanti", one valid.
/// **Action:** `tick` after all start times.
/// **Expected:** skipped=2, sent=1; skipped ones keep their flag unset.
#[tokio::test]
async fn test_incomplete_appointments_skipped() {
    let store = seeded_store().await;
    let ghost = accepted_appointment(&store, "ghost", "08:00").await;
    let garbled = accepted_appointment(&store, "c-1", "nanti").await;
    accepted_appointment(&store, "c-1", "08:30").await;
    let scheduler = scheduler(&store, chain_sink(&store));

    let report = scheduler
        .tick(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap())
        .await
        .unwrap();

    assert_eq!(report.examined, 3);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.sent, 1);
    assert!(!store.appointments.is_auto_message_sent(&ghost.id).await.unwrap());
    assert!(!store.appointments.is_auto_message_sent(&garbled.id).await.unwrap());
}

/// **Test: One failing greeting does not stop the others.**
///
/// **Setup:** Two due appointments; the sink rejects greetings for the first.
/// **Action:** `tick`.
/// **Expected:** failed=1, sent=1; only the second is flagged. A later tick retries the first.
#[tokio::test]
async fn test_failures_are_isolated() {
    struct RejectingSink {
        inner: Arc<ChainSink>,
        reject_appointment: String,
    }

    #[async_trait]
    impl MessageSink for RejectingSink {
        async fn submit(&self, inbound: Inbound) -> konsul_core::Result<ChatMessage> {
            if inbound.message.appointment_id.as_deref() == Some(self.reject_appointment.as_str()) {
                return Err(KonsulError::Database("disk full".into()));
            }
            self.inner.submit(inbound).await
        }
    }

    let store = seeded_store().await;
    store
        .directory
        .upsert(ProfileKind::Citizen, &ProfileRecord::new("c-2", "Ani"))
        .await
        .unwrap();
    let broken = accepted_appointment(&store, "c-1", "08:00").await;
    let fine = accepted_appointment(&store, "c-2", "08:00").await;
    let sink = Arc::new(RejectingSink {
        inner: chain_sink(&store),
        reject_appointment: broken.id.clone(),
    });
    let scheduler = scheduler(&store, sink);
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();

    let report = scheduler.tick(now).await.unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.sent, 1);
    assert!(!store.appointments.is_auto_message_sent(&broken.id).await.unwrap());
    assert!(store.appointments.is_auto_message_sent(&fine.id).await.unwrap());

    let retry = scheduler.tick(now).await.unwrap();
    assert_eq!(retry.examined, 1);
    assert_eq!(retry.failed, 1);
}

/// **Test: Concurrent ticks greet once.**
///
/// **Setup:** One due appointment; two schedulers sharing a LockManager and sink.
/// **Action:** Run both ticks concurrently.
/// **Expected:** One greeting in total.
#[tokio::test]
async fn test_concurrent_ticks_greet_once() {
    let store = seeded_store().await;
    accepted_appointment(&store, "c-1", "09:00").await;
    let sink = chain_sink(&store);
    let locks = Arc::new(LockManager::new());
    let a = AutoMessageScheduler::new(store.appointments.clone(), sink.clone(), locks.clone(), utc_config());
    let b = AutoMessageScheduler::new(store.appointments.clone(), sink, locks, utc_config());
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 9, 5, 0).unwrap();

    let (ra, rb) = tokio::join!(a.tick(now), b.tick(now));

    assert_eq!(ra.unwrap().sent + rb.unwrap().sent, 1);
    assert_eq!(store.messages.count().await.unwrap(), 1);
}

/// **Test: The event loop greets an appointment announced as accepted.**
///
/// **Setup:** Scheduler loop running with a long refresh interval; appointment already due.
/// **Action:** Notify its id on the accepted channel.
/// **Expected:** The greeting is sent shortly after; closing the channel stops the loop.
#[tokio::test]
async fn test_run_loop_handles_accept_notifications() {
    let store = seeded_store().await;
    let scheduler = Arc::new(AutoMessageScheduler::new(
        store.appointments.clone(),
        chain_sink(&store),
        Arc::new(LockManager::new()),
        SchedulerConfig {
            refresh_interval: Duration::from_secs(3600),
            ..utc_config()
        },
    ));
    let (notifier, rx) = accepted_channel(16);
    let handle = tokio::spawn(scheduler.clone().run(rx));

    // Let the initial refresh run on an empty table.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let appointment = accepted_appointment(&store, "c-1", "09:00").await;
    notifier.notify(&appointment.id);

    let mut sent = false;
    for _ in 0..100 {
        if store.appointments.is_auto_message_sent(&appointment.id).await.unwrap() {
            sent = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(sent, "greeting should have been sent");

    drop(notifier);
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("Scheduler loop should stop")
        .expect("Scheduler task failed");
}
