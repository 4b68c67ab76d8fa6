// libs/notification-cell/src/services/channels.rs
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    AuditEntry, ChannelResult, Notice, NotificationEvent, NotificationKind,
};
use crate::services::content::NotificationContentResolver;
use crate::services::dispatcher::NotificationChannel;

// ==============================================================================
// NOTICE STORE
// ==============================================================================

/// Persistence seam for in-app notices. The core only appends; reads serve the
/// recipient-facing surfaces outside this crate.
#[async_trait]
pub trait NoticeStore: Send + Sync {
    async fn insert(&self, notice: Notice) -> Result<(), String>;

    async fn list_for(&self, recipient_id: Uuid) -> Vec<Notice>;
}

#[derive(Default)]
pub struct InMemoryNoticeStore {
    notices: RwLock<Vec<Notice>>,
}

impl InMemoryNoticeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl NoticeStore for InMemoryNoticeStore {
    async fn insert(&self, notice: Notice) -> Result<(), String> {
        let mut notices = self.notices.write().await;
        notices.push(notice);
        Ok(())
    }

    async fn list_for(&self, recipient_id: Uuid) -> Vec<Notice> {
        let notices = self.notices.read().await;
        notices
            .iter()
            .filter(|n| n.recipient_id == recipient_id && n.is_active)
            .cloned()
            .collect()
    }
}

// ==============================================================================
// IN-APP CHANNEL
// ==============================================================================

/// Writes an in-app `Notice` for the party on the other side of the event.
/// Re-delivery of the same event produces a duplicate notice; dedup is a
/// documented non-feature of this channel.
pub struct InAppChannel {
    store: Arc<dyn NoticeStore>,
    resolver: Arc<NotificationContentResolver>,
}

impl InAppChannel {
    pub fn new(store: Arc<dyn NoticeStore>, resolver: Arc<NotificationContentResolver>) -> Self {
        Self { store, resolver }
    }
}

#[async_trait]
impl NotificationChannel for InAppChannel {
    fn name(&self) -> &str {
        "in_app"
    }

    async fn handle(&self, event: &NotificationEvent) -> ChannelResult {
        let appointment = &event.appointment;
        let context = &event.context;

        let locale = context.locale.as_deref().unwrap_or("en");
        let date = appointment.date.to_string();
        let actor_name = if context.actor.id == appointment.patient_id {
            context.patient_name.clone()
        } else {
            context.doctor_name.clone()
        };
        let reason = context.reason.clone().unwrap_or_else(|| "-".to_string());

        let params: Vec<(&str, &str)> = vec![
            ("patient", context.patient_name.as_str()),
            ("doctor", context.doctor_name.as_str()),
            ("date", date.as_str()),
            ("slot", appointment.time_slot.as_str()),
            ("actor", actor_name.as_str()),
            ("reason", reason.as_str()),
        ];
        let content = self.resolver.resolve(event.kind, locale, &params);

        let notice = Notice {
            id: Uuid::new_v4(),
            recipient_id: event.recipient_id(),
            sender_id: Some(context.actor.id),
            kind: event.kind,
            title: content.title,
            content: content.body,
            related_id: appointment.appointment_id,
            related_type: "appointment".to_string(),
            is_read: false,
            is_active: true,
            created_at: Utc::now(),
        };

        debug!(
            "Writing {} notice for recipient {}",
            event.kind, notice.recipient_id
        );

        match self.store.insert(notice).await {
            Ok(()) => ChannelResult::success("notice written"),
            Err(e) => ChannelResult::failure(format!("notice store rejected write: {}", e)),
        }
    }
}

// ==============================================================================
// AUDIT CHANNEL
// ==============================================================================

/// Append-only audit trail with a full snapshot of the appointment per event.
#[derive(Default)]
pub struct AuditChannel {
    entries: RwLock<Vec<AuditEntry>>,
}

impl AuditChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().await.clone()
    }

    pub async fn entries_for(&self, appointment_id: Uuid) -> Vec<AuditEntry> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| e.appointment_id == appointment_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NotificationChannel for AuditChannel {
    fn name(&self) -> &str {
        "audit"
    }

    async fn handle(&self, event: &NotificationEvent) -> ChannelResult {
        let entry = AuditEntry {
            id: Uuid::new_v4(),
            kind: event.kind,
            appointment_id: event.appointment.appointment_id,
            actor_id: event.context.actor.id,
            snapshot: event.appointment.snapshot.clone(),
            recorded_at: Utc::now(),
        };

        let mut entries = self.entries.write().await;
        entries.push(entry);
        ChannelResult::success("audit entry appended")
    }
}

// ==============================================================================
// STATS CHANNEL
// ==============================================================================

/// In-memory per-kind and per-day counters. Feeds dashboards only, so loss on
/// process restart is acceptable.
#[derive(Default)]
pub struct StatsChannel {
    by_kind: RwLock<HashMap<NotificationKind, u64>>,
    by_day: RwLock<HashMap<NaiveDate, u64>>,
}

impl StatsChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub async fn count_for_kind(&self, kind: NotificationKind) -> u64 {
        *self.by_kind.read().await.get(&kind).unwrap_or(&0)
    }

    pub async fn count_for_day(&self, day: NaiveDate) -> u64 {
        *self.by_day.read().await.get(&day).unwrap_or(&0)
    }
}

#[async_trait]
impl NotificationChannel for StatsChannel {
    fn name(&self) -> &str {
        "stats"
    }

    async fn handle(&self, event: &NotificationEvent) -> ChannelResult {
        {
            let mut by_kind = self.by_kind.write().await;
            *by_kind.entry(event.kind).or_insert(0) += 1;
        }
        {
            let mut by_day = self.by_day.write().await;
            *by_day.entry(event.appointment.date).or_insert(0) += 1;
        }
        ChannelResult::success("counters incremented")
    }
}
