// libs/schedule-cell/src/store.rs
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{ClaimOutcome, DoctorSchedule, ScheduleError};

/// Storage contract for per-doctor, per-day slot tables.
///
/// `claim_slot` is the one operation with concurrency teeth: implementations
/// must check the "slot available" precondition and flip it in a single
/// conditional write. A rejected claim is reported through `ClaimOutcome`,
/// never by letting the caller re-read and race.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn find(&self, doctor_id: Uuid, date: NaiveDate)
        -> Result<Option<DoctorSchedule>, ScheduleError>;

    async fn upsert(&self, schedule: DoctorSchedule) -> Result<(), ScheduleError>;

    /// Conditionally mark a slot unavailable. Succeeds only when the schedule
    /// exists, the date is a working day and the slot is currently open.
    async fn claim_slot(&self, doctor_id: Uuid, date: NaiveDate, time: &str)
        -> Result<ClaimOutcome, ScheduleError>;

    /// Record the appointment back-reference on an already-claimed slot.
    async fn bind_slot(&self, doctor_id: Uuid, date: NaiveDate, time: &str, appointment_id: Uuid)
        -> Result<(), ScheduleError>;

    /// Reopen a slot and clear its binding. Idempotent: releasing an already
    /// open slot is a no-op.
    async fn release_slot(&self, doctor_id: Uuid, date: NaiveDate, time: &str)
        -> Result<(), ScheduleError>;
}

/// In-memory schedule store. The availability check and the flip in
/// `claim_slot` happen under one write lock, which gives the conditional-write
/// semantics the allocator relies on.
#[derive(Default)]
pub struct InMemoryScheduleStore {
    schedules: RwLock<HashMap<(Uuid, NaiveDate), DoctorSchedule>>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn find(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<DoctorSchedule>, ScheduleError> {
        let schedules = self.schedules.read().await;
        Ok(schedules.get(&(doctor_id, date)).cloned())
    }

    async fn upsert(&self, mut schedule: DoctorSchedule) -> Result<(), ScheduleError> {
        schedule.updated_at = Utc::now();
        let mut schedules = self.schedules.write().await;
        schedules.insert((schedule.doctor_id, schedule.date), schedule);
        Ok(())
    }

    async fn claim_slot(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: &str,
    ) -> Result<ClaimOutcome, ScheduleError> {
        let mut schedules = self.schedules.write().await;

        let schedule = match schedules.get_mut(&(doctor_id, date)) {
            Some(schedule) => schedule,
            None => return Ok(ClaimOutcome::ScheduleMissing),
        };

        if !schedule.is_working_day {
            return Ok(ClaimOutcome::NotWorkingDay);
        }

        let updated_at = Utc::now();
        let slot = match schedule.slot_mut(time) {
            Some(slot) => slot,
            None => return Ok(ClaimOutcome::UnknownSlot),
        };

        if !slot.is_available || slot.appointment_id.is_some() {
            debug!("Slot {} on {} for doctor {} already taken", time, date, doctor_id);
            return Ok(ClaimOutcome::SlotTaken);
        }

        slot.is_available = false;
        schedule.updated_at = updated_at;
        Ok(ClaimOutcome::Claimed)
    }

    async fn bind_slot(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: &str,
        appointment_id: Uuid,
    ) -> Result<(), ScheduleError> {
        let mut schedules = self.schedules.write().await;

        let schedule = schedules
            .get_mut(&(doctor_id, date))
            .ok_or(ScheduleError::NotFound { doctor_id, date })?;

        let updated_at = Utc::now();
        let slot = schedule.slot_mut(time).ok_or_else(|| {
            ScheduleError::Validation(format!("Unknown slot label: {}", time))
        })?;

        if slot.is_available {
            return Err(ScheduleError::Storage(format!(
                "Cannot bind unclaimed slot {} on {}",
                time, date
            )));
        }

        slot.appointment_id = Some(appointment_id);
        schedule.updated_at = updated_at;
        Ok(())
    }

    async fn release_slot(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: &str,
    ) -> Result<(), ScheduleError> {
        let mut schedules = self.schedules.write().await;

        let schedule = match schedules.get_mut(&(doctor_id, date)) {
            Some(schedule) => schedule,
            None => {
                warn!("Release for unknown schedule: doctor {} on {}", doctor_id, date);
                return Ok(());
            }
        };

        let updated_at = Utc::now();
        match schedule.slot_mut(time) {
            Some(slot) if !slot.is_available => {
                slot.is_available = true;
                slot.appointment_id = None;
                schedule.updated_at = updated_at;
            }
            // Already open (or unknown label): releasing is a no-op.
            _ => {}
        }

        Ok(())
    }
}
