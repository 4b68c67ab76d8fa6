// libs/appointment-cell/src/services/allocator.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use schedule_cell::models::ClaimOutcome;
use schedule_cell::store::ScheduleStore;

use crate::models::BookingError;
use crate::store::AppointmentStore;

/// Token for a provisionally held slot. Produced by `try_claim`, consumed by
/// `bind` once the appointment row exists, or handed back via `release` as
/// the compensating action.
#[derive(Debug, Clone)]
pub struct SlotClaim {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time_slot: String,
}

/// Single home for both double-booking checks. The doctor-slot check rides on
/// the schedule store's conditional claim write; the patient-slot check spans
/// doctors and is re-verified by the appointment store at insert time.
pub struct SlotAllocator {
    schedules: Arc<dyn ScheduleStore>,
    appointments: Arc<dyn AppointmentStore>,
}

impl SlotAllocator {
    pub fn new(schedules: Arc<dyn ScheduleStore>, appointments: Arc<dyn AppointmentStore>) -> Self {
        Self { schedules, appointments }
    }

    pub async fn try_claim(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        date: NaiveDate,
        time_slot: &str,
    ) -> Result<SlotClaim, BookingError> {
        debug!(
            "Claiming slot {} on {} for doctor {} / patient {}",
            time_slot, date, doctor_id, patient_id
        );

        // Patient may not hold two active appointments at the same date+slot,
        // regardless of doctor. This read is advisory; the store's insert
        // re-checks it atomically.
        if let Some(existing) = self
            .appointments
            .find_active_for_patient_slot(patient_id, date, time_slot)
            .await?
        {
            warn!(
                "Patient {} already holds {} on {} (appointment {})",
                patient_id, time_slot, date, existing.id
            );
            return Err(BookingError::Conflict(format!(
                "Patient already has an appointment at {} on {}",
                time_slot, date
            )));
        }

        match self.schedules.claim_slot(doctor_id, date, time_slot).await? {
            ClaimOutcome::Claimed => {
                info!("Slot {} on {} claimed for doctor {}", time_slot, date, doctor_id);
                Ok(SlotClaim {
                    doctor_id,
                    date,
                    time_slot: time_slot.to_string(),
                })
            }
            ClaimOutcome::ScheduleMissing => Err(BookingError::ScheduleNotFound),
            ClaimOutcome::NotWorkingDay => Err(BookingError::Validation(format!(
                "Doctor is not working on {}",
                date
            ))),
            ClaimOutcome::UnknownSlot => Err(BookingError::Validation(format!(
                "No {} slot exists on {}",
                time_slot, date
            ))),
            ClaimOutcome::SlotTaken => Err(BookingError::Conflict(format!(
                "Slot {} on {} is already booked",
                time_slot, date
            ))),
        }
    }

    /// Phase two: record the appointment id on the claimed slot.
    pub async fn bind(&self, claim: &SlotClaim, appointment_id: Uuid) -> Result<(), BookingError> {
        self.schedules
            .bind_slot(claim.doctor_id, claim.date, &claim.time_slot, appointment_id)
            .await?;
        Ok(())
    }

    /// Compensating action: reopen the slot. Safe to call more than once.
    pub async fn release(&self, claim: &SlotClaim) -> Result<(), BookingError> {
        self.release_slot(claim.doctor_id, claim.date, &claim.time_slot).await
    }

    pub async fn release_slot(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time_slot: &str,
    ) -> Result<(), BookingError> {
        debug!("Releasing slot {} on {} for doctor {}", time_slot, date, doctor_id);
        self.schedules.release_slot(doctor_id, date, time_slot).await?;
        Ok(())
    }
}
