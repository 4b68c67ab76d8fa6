// libs/schedule-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// SCHEDULE MODELS
// ==============================================================================

/// One bookable interval inside a doctor's daily schedule.
///
/// Invariant: a slot bound to an appointment always has `is_available == false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Slot label in "HH:MM" form, e.g. "09:00".
    pub time: String,
    pub is_available: bool,
    /// Back-reference to the appointment holding this slot. The schedule never
    /// owns the appointment record itself.
    pub appointment_id: Option<Uuid>,
}

impl TimeSlot {
    pub fn open(time: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            is_available: true,
            appointment_id: None,
        }
    }
}

/// Per-doctor, per-day slot table. Created lazily when a doctor first sets
/// availability for a date; mutated only through the store's claim/bind/release
/// operations; never physically deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSchedule {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    /// Ordered by slot label.
    pub slots: Vec<TimeSlot>,
    pub is_working_day: bool,
    pub max_appointments: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DoctorSchedule {
    pub fn slot(&self, time: &str) -> Option<&TimeSlot> {
        self.slots.iter().find(|s| s.time == time)
    }

    pub fn slot_mut(&mut self, time: &str) -> Option<&mut TimeSlot> {
        self.slots.iter_mut().find(|s| s.time == time)
    }

    pub fn available_times(&self) -> Vec<String> {
        if !self.is_working_day {
            return Vec::new();
        }
        self.slots
            .iter()
            .filter(|s| s.is_available)
            .map(|s| s.time.clone())
            .collect()
    }

    /// Number of slots currently bound to an appointment.
    pub fn booked_count(&self) -> usize {
        self.slots.iter().filter(|s| s.appointment_id.is_some()).count()
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetAvailabilityRequest {
    /// Slot labels in "HH:MM" form.
    pub slots: Vec<String>,
    pub is_working_day: bool,
    pub max_appointments: Option<i32>,
}

// ==============================================================================
// CLAIM OUTCOME
// ==============================================================================

/// Result of the store's conditional claim write. Anything other than
/// `Claimed` means the slot state was left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed,
    ScheduleMissing,
    NotWorkingDay,
    UnknownSlot,
    SlotTaken,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum ScheduleError {
    #[error("Schedule not found for doctor {doctor_id} on {date}")]
    NotFound { doctor_id: Uuid, date: NaiveDate },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}
