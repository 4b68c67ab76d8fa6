// libs/notification-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use shared_models::User;

// ==============================================================================
// EVENT MODELS
// ==============================================================================

/// Appointment lifecycle events that fan out to notification channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Created,
    Confirmed,
    Cancelled,
    Completed,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::Created => write!(f, "created"),
            NotificationKind::Confirmed => write!(f, "confirmed"),
            NotificationKind::Cancelled => write!(f, "cancelled"),
            NotificationKind::Completed => write!(f, "completed"),
        }
    }
}

/// What the channels need to know about the appointment, decoupled from the
/// appointment cell's own record type. `snapshot` carries the full serialized
/// record for the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentSnapshot {
    pub appointment_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time_slot: String,
    pub status: String,
    pub snapshot: serde_json::Value,
}

/// Rendering context for a single event: who acted and how to address the
/// recipients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventContext {
    pub actor: User,
    pub patient_name: String,
    pub doctor_name: String,
    pub locale: Option<String>,
    pub reason: Option<String>,
}

/// Transient event handed to every registered channel. Not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    pub appointment: AppointmentSnapshot,
    pub context: EventContext,
}

impl NotificationEvent {
    /// Who the in-app notice for this event is addressed to: a new request
    /// goes to the doctor, confirmations and completions to the patient, and
    /// a cancellation to the counterparty of whoever cancelled.
    pub fn recipient_id(&self) -> Uuid {
        recipient_for(
            self.kind,
            self.context.actor.id,
            self.appointment.patient_id,
            self.appointment.doctor_id,
        )
    }
}

pub fn recipient_for(
    kind: NotificationKind,
    actor_id: Uuid,
    patient_id: Uuid,
    doctor_id: Uuid,
) -> Uuid {
    match kind {
        NotificationKind::Created => doctor_id,
        NotificationKind::Confirmed | NotificationKind::Completed => patient_id,
        NotificationKind::Cancelled => {
            if actor_id == patient_id {
                doctor_id
            } else {
                patient_id
            }
        }
    }
}

// ==============================================================================
// CHANNEL RESULT
// ==============================================================================

/// Outcome of one channel handling one event. A channel never aborts the
/// dispatch of its peers; it reports here instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelResult {
    pub ok: bool,
    pub detail: String,
}

impl ChannelResult {
    pub fn success(detail: impl Into<String>) -> Self {
        Self { ok: true, detail: detail.into() }
    }

    pub fn failure(detail: impl Into<String>) -> Self {
        Self { ok: false, detail: detail.into() }
    }
}

// ==============================================================================
// NOTICE MODELS
// ==============================================================================

/// In-app notice written by the in-app channel. Read/delete mutations belong
/// to the recipient and happen outside this core's write path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub title: String,
    pub content: String,
    pub related_id: Uuid,
    pub related_type: String,
    pub is_read: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// ==============================================================================
// AUDIT MODELS
// ==============================================================================

/// Immutable audit record of one dispatched event, snapshot included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub appointment_id: Uuid,
    pub actor_id: Uuid,
    pub snapshot: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}
