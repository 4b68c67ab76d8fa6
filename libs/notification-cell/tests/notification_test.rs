use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use uuid::Uuid;

use notification_cell::models::{
    AppointmentSnapshot, ChannelResult, EventContext, NotificationEvent, NotificationKind,
};
use notification_cell::{
    AuditChannel, InAppChannel, InMemoryNoticeStore, NotificationChannel,
    NotificationContentResolver, NotificationDispatcher, NoticeStore, StatsChannel,
};
use shared_models::User;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

struct Parties {
    patient: Uuid,
    doctor: Uuid,
}

fn parties() -> Parties {
    Parties {
        patient: Uuid::new_v4(),
        doctor: Uuid::new_v4(),
    }
}

fn event(kind: NotificationKind, parties: &Parties, actor: User, locale: Option<&str>) -> NotificationEvent {
    NotificationEvent {
        kind,
        appointment: AppointmentSnapshot {
            appointment_id: Uuid::new_v4(),
            patient_id: parties.patient,
            doctor_id: parties.doctor,
            date: date(2030, 9, 1),
            time_slot: "09:00".to_string(),
            status: "pending".to_string(),
            snapshot: serde_json::json!({"status": "pending"}),
        },
        context: EventContext {
            actor,
            patient_name: "Alice Chen".to_string(),
            doctor_name: "Bob Li".to_string(),
            locale: locale.map(|l| l.to_string()),
            reason: Some("moved house".to_string()),
        },
    }
}

/// Test double that records every event it sees.
#[derive(Default)]
struct RecordingChannel {
    seen: RwLock<Vec<NotificationKind>>,
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn handle(&self, event: &NotificationEvent) -> ChannelResult {
        self.seen.write().await.push(event.kind);
        ChannelResult::success("recorded")
    }
}

struct FailingChannel;

#[async_trait]
impl NotificationChannel for FailingChannel {
    fn name(&self) -> &str {
        "failing"
    }

    async fn handle(&self, _event: &NotificationEvent) -> ChannelResult {
        ChannelResult::failure("sink unavailable")
    }
}

struct SlowChannel;

#[async_trait]
impl NotificationChannel for SlowChannel {
    fn name(&self) -> &str {
        "slow"
    }

    async fn handle(&self, _event: &NotificationEvent) -> ChannelResult {
        tokio::time::sleep(Duration::from_millis(250)).await;
        ChannelResult::success("eventually")
    }
}

// ==============================================================================
// CONTENT RESOLVER
// ==============================================================================

#[test]
fn resolver_renders_zh_template_with_substitution() {
    let resolver = NotificationContentResolver::default();
    let content = resolver.resolve(
        NotificationKind::Confirmed,
        "zh",
        &[("doctor", "李强"), ("date", "2030-09-01"), ("slot", "09:00")],
    );

    assert_eq!(content.title, "预约已确认");
    assert_eq!(content.body, "李强 医生已确认您 2030-09-01 09:00 的预约。");
}

#[test]
fn resolver_falls_back_to_default_locale() {
    let resolver = NotificationContentResolver::default();
    let content = resolver.resolve(
        NotificationKind::Created,
        "fr",
        &[("patient", "Alice"), ("date", "2030-09-01"), ("slot", "09:00")],
    );

    assert_eq!(content.title, "New appointment request");
    assert_eq!(content.body, "Alice requested the 09:00 slot on 2030-09-01.");
}

#[test]
fn resolver_leaves_unresolved_placeholders_verbatim() {
    let resolver = NotificationContentResolver::default();
    let content = resolver.resolve(NotificationKind::Created, "en", &[("patient", "Alice")]);

    assert_eq!(content.body, "Alice requested the {slot} slot on {date}.");
}

// ==============================================================================
// DISPATCHER
// ==============================================================================

#[tokio::test]
async fn dispatch_reaches_every_registered_channel() {
    let dispatcher = NotificationDispatcher::new(500);
    let a = Arc::new(RecordingChannel::default());
    let b = Arc::new(RecordingChannel::default());
    dispatcher.register(a.clone()).await;
    dispatcher.register(b.clone()).await;

    let p = parties();
    let report = dispatcher
        .dispatch(&event(NotificationKind::Created, &p, User::patient(p.patient), None))
        .await;

    assert!(report.all_ok());
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(a.seen.read().await.len(), 1);
    assert_eq!(b.seen.read().await.len(), 1);
}

#[tokio::test]
async fn failing_channel_does_not_block_the_rest() {
    let dispatcher = NotificationDispatcher::new(500);
    let recording = Arc::new(RecordingChannel::default());
    dispatcher.register(Arc::new(FailingChannel)).await;
    dispatcher.register(recording.clone()).await;

    let p = parties();
    let report = dispatcher
        .dispatch(&event(NotificationKind::Created, &p, User::patient(p.patient), None))
        .await;

    assert!(!report.all_ok());
    assert_eq!(report.failed_channels(), vec!["failing"]);
    // The channel after the failure still ran.
    assert_eq!(recording.seen.read().await.len(), 1);
}

#[tokio::test]
async fn slow_channel_is_bounded_by_timeout() {
    let dispatcher = NotificationDispatcher::new(50);
    let recording = Arc::new(RecordingChannel::default());
    dispatcher.register(Arc::new(SlowChannel)).await;
    dispatcher.register(recording.clone()).await;

    let p = parties();
    let report = dispatcher
        .dispatch(&event(NotificationKind::Created, &p, User::patient(p.patient), None))
        .await;

    assert_eq!(report.failed_channels(), vec!["slow"]);
    assert_eq!(recording.seen.read().await.len(), 1);
}

#[tokio::test]
async fn channels_can_be_removed_at_runtime() {
    let dispatcher = NotificationDispatcher::new(500);
    let recording = Arc::new(RecordingChannel::default());
    dispatcher.register(recording.clone()).await;
    assert_eq!(dispatcher.channel_names().await, vec!["recording"]);

    dispatcher.unregister("recording").await;
    assert!(dispatcher.channel_names().await.is_empty());

    let p = parties();
    let report = dispatcher
        .dispatch(&event(NotificationKind::Created, &p, User::patient(p.patient), None))
        .await;
    assert!(report.outcomes.is_empty());
    assert!(recording.seen.read().await.is_empty());
}

// ==============================================================================
// BUILT-IN CHANNELS
// ==============================================================================

#[tokio::test]
async fn in_app_channel_addresses_the_right_party() {
    let store = InMemoryNoticeStore::shared();
    let channel = InAppChannel::new(store.clone(), Arc::new(NotificationContentResolver::default()));
    let p = parties();

    // Booking request: the doctor gets the notice.
    let result = channel
        .handle(&event(NotificationKind::Created, &p, User::patient(p.patient), None))
        .await;
    assert!(result.ok);

    // Patient cancels: again the doctor gets the notice.
    channel
        .handle(&event(NotificationKind::Cancelled, &p, User::patient(p.patient), None))
        .await;

    // Doctor confirms: the patient gets the notice.
    channel
        .handle(&event(NotificationKind::Confirmed, &p, User::doctor(p.doctor), None))
        .await;

    assert_eq!(store.list_for(p.doctor).await.len(), 2);
    let patient_notices = store.list_for(p.patient).await;
    assert_eq!(patient_notices.len(), 1);
    assert_eq!(patient_notices[0].kind, NotificationKind::Confirmed);
    assert_eq!(patient_notices[0].related_type, "appointment");
    assert!(!patient_notices[0].is_read);
}

#[tokio::test]
async fn in_app_channel_renders_locale_from_context() {
    let store = InMemoryNoticeStore::shared();
    let channel = InAppChannel::new(store.clone(), Arc::new(NotificationContentResolver::default()));
    let p = parties();

    channel
        .handle(&event(NotificationKind::Confirmed, &p, User::doctor(p.doctor), Some("zh")))
        .await;

    let notices = store.list_for(p.patient).await;
    assert_eq!(notices[0].title, "预约已确认");
    assert!(notices[0].content.contains("Bob Li"));
    assert!(notices[0].content.contains("09:00"));
}

#[tokio::test]
async fn audit_channel_appends_snapshot_entries() {
    let audit = AuditChannel::shared();
    let p = parties();
    let e = event(NotificationKind::Cancelled, &p, User::doctor(p.doctor), None);

    audit.handle(&e).await;
    audit.handle(&e).await;

    let entries = audit.entries_for(e.appointment.appointment_id).await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].kind, NotificationKind::Cancelled);
    assert_eq!(entries[0].actor_id, p.doctor);
    assert_eq!(entries[0].snapshot["status"], "pending");
}

#[tokio::test]
async fn stats_channel_counts_per_kind_and_per_day() {
    let stats = StatsChannel::shared();
    let p = parties();

    stats
        .handle(&event(NotificationKind::Created, &p, User::patient(p.patient), None))
        .await;
    stats
        .handle(&event(NotificationKind::Created, &p, User::patient(p.patient), None))
        .await;
    stats
        .handle(&event(NotificationKind::Confirmed, &p, User::doctor(p.doctor), None))
        .await;

    assert_eq!(stats.count_for_kind(NotificationKind::Created).await, 2);
    assert_eq!(stats.count_for_kind(NotificationKind::Confirmed).await, 1);
    assert_eq!(stats.count_for_kind(NotificationKind::Completed).await, 0);
    assert_eq!(stats.count_for_day(date(2030, 9, 1)).await, 3);
}
