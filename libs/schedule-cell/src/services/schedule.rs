use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{DoctorSchedule, ScheduleError, SetAvailabilityRequest, TimeSlot};
use crate::store::ScheduleStore;

/// Doctor-facing schedule management: lazy schedule creation and slot listing.
/// Claim/release traffic goes through the store directly, not through here.
pub struct ScheduleService {
    store: Arc<dyn ScheduleStore>,
}

impl ScheduleService {
    pub fn new(store: Arc<dyn ScheduleStore>) -> Self {
        Self { store }
    }

    /// Create or update the schedule for a doctor/date. Slots that are already
    /// claimed keep their state; a request that would drop a booked slot is
    /// rejected so bound appointments never lose their slot silently.
    pub async fn set_availability(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        request: SetAvailabilityRequest,
    ) -> Result<DoctorSchedule, ScheduleError> {
        debug!("Setting availability for doctor {} on {}", doctor_id, date);

        validate_slot_labels(&request.slots)?;

        let existing = self.store.find(doctor_id, date).await?;

        let mut slots = Vec::with_capacity(request.slots.len());
        for label in &request.slots {
            match existing.as_ref().and_then(|s| s.slot(label)) {
                Some(kept) => slots.push(kept.clone()),
                None => slots.push(TimeSlot::open(label.clone())),
            }
        }
        slots.sort_by(|a, b| a.time.cmp(&b.time));

        if let Some(existing) = &existing {
            for slot in &existing.slots {
                if slot.appointment_id.is_some() && !request.slots.contains(&slot.time) {
                    return Err(ScheduleError::Validation(format!(
                        "Slot {} has an active booking and cannot be removed",
                        slot.time
                    )));
                }
            }
        }

        let now = Utc::now();
        let schedule = DoctorSchedule {
            doctor_id,
            date,
            slots,
            is_working_day: request.is_working_day,
            max_appointments: request
                .max_appointments
                .or(existing.as_ref().map(|s| s.max_appointments))
                .unwrap_or_else(|| request.slots.len() as i32),
            created_at: existing.as_ref().map(|s| s.created_at).unwrap_or(now),
            updated_at: now,
        };

        self.store.upsert(schedule.clone()).await?;
        info!(
            "Availability set for doctor {} on {}: {} slots, working_day={}",
            doctor_id,
            date,
            schedule.slots.len(),
            schedule.is_working_day
        );

        Ok(schedule)
    }

    /// Open slot labels for a doctor/date. Unknown schedules and non-working
    /// days both read as "nothing available".
    pub async fn available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<String>, ScheduleError> {
        debug!("Listing available slots for doctor {} on {}", doctor_id, date);

        let schedule = self.store.find(doctor_id, date).await?;
        Ok(schedule.map(|s| s.available_times()).unwrap_or_default())
    }

    pub async fn get_schedule(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<DoctorSchedule, ScheduleError> {
        self.store
            .find(doctor_id, date)
            .await?
            .ok_or(ScheduleError::NotFound { doctor_id, date })
    }
}

fn validate_slot_labels(slots: &[String]) -> Result<(), ScheduleError> {
    if slots.is_empty() {
        return Err(ScheduleError::Validation(
            "At least one slot is required".to_string(),
        ));
    }

    for label in slots {
        if NaiveTime::parse_from_str(label, "%H:%M").is_err() {
            return Err(ScheduleError::Validation(format!(
                "Slot label must be HH:MM, got: {}",
                label
            )));
        }
    }

    let mut seen = std::collections::HashSet::new();
    for label in slots {
        if !seen.insert(label) {
            return Err(ScheduleError::Validation(format!(
                "Duplicate slot label: {}",
                label
            )));
        }
    }

    Ok(())
}
