// libs/appointment-cell/src/store.rs
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Appointment, BookingError};

/// Storage contract for appointment records.
///
/// `insert` is a conditional write: it must reject a record when the same
/// patient already holds an active (pending/confirmed) appointment at the same
/// date and slot, checked and written atomically. That makes the insert the
/// commit point of the booking protocol rather than a naive check-then-write.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert(&self, appointment: Appointment) -> Result<(), BookingError>;

    async fn find(&self, id: Uuid) -> Result<Option<Appointment>, BookingError>;

    async fn update(&self, appointment: Appointment) -> Result<Appointment, BookingError>;

    /// Remove a record outright. Only the booking compensation path uses this;
    /// committed appointments are voided through the status machine instead.
    async fn delete(&self, id: Uuid) -> Result<(), BookingError>;

    /// Active appointment held by this patient at (date, slot), any doctor.
    async fn find_active_for_patient_slot(
        &self,
        patient_id: Uuid,
        date: NaiveDate,
        time_slot: &str,
    ) -> Result<Option<Appointment>, BookingError>;

    /// Active appointments this patient holds on the given day.
    async fn count_active_for_patient_on(
        &self,
        patient_id: Uuid,
        date: NaiveDate,
    ) -> Result<i32, BookingError>;
}

#[derive(Default)]
pub struct InMemoryAppointmentStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub async fn all(&self) -> Vec<Appointment> {
        self.appointments.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn insert(&self, appointment: Appointment) -> Result<(), BookingError> {
        let mut appointments = self.appointments.write().await;

        if appointments.contains_key(&appointment.id) {
            return Err(BookingError::Storage(format!(
                "Duplicate appointment id: {}",
                appointment.id
            )));
        }

        // Uniqueness checks run under the same write lock as the insert.
        let clash = appointments.values().find(|existing| {
            existing.status.is_active()
                && existing.date == appointment.date
                && existing.time_slot == appointment.time_slot
                && (existing.patient_id == appointment.patient_id
                    || existing.doctor_id == appointment.doctor_id)
        });
        if let Some(existing) = clash {
            return Err(BookingError::Conflict(format!(
                "Slot {} on {} is already held by appointment {}",
                appointment.time_slot, appointment.date, existing.id
            )));
        }

        debug!("Inserting appointment {}", appointment.id);
        appointments.insert(appointment.id, appointment);
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Appointment>, BookingError> {
        let appointments = self.appointments.read().await;
        Ok(appointments.get(&id).cloned())
    }

    async fn update(&self, mut appointment: Appointment) -> Result<Appointment, BookingError> {
        let mut appointments = self.appointments.write().await;

        if !appointments.contains_key(&appointment.id) {
            return Err(BookingError::NotFound);
        }

        appointment.updated_at = Utc::now();
        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn delete(&self, id: Uuid) -> Result<(), BookingError> {
        let mut appointments = self.appointments.write().await;
        match appointments.remove(&id) {
            Some(_) => {
                debug!("Deleted appointment {}", id);
                Ok(())
            }
            None => Err(BookingError::NotFound),
        }
    }

    async fn find_active_for_patient_slot(
        &self,
        patient_id: Uuid,
        date: NaiveDate,
        time_slot: &str,
    ) -> Result<Option<Appointment>, BookingError> {
        let appointments = self.appointments.read().await;
        Ok(appointments
            .values()
            .find(|a| {
                a.patient_id == patient_id
                    && a.date == date
                    && a.time_slot == time_slot
                    && a.status.is_active()
            })
            .cloned())
    }

    async fn count_active_for_patient_on(
        &self,
        patient_id: Uuid,
        date: NaiveDate,
    ) -> Result<i32, BookingError> {
        let appointments = self.appointments.read().await;
        Ok(appointments
            .values()
            .filter(|a| a.patient_id == patient_id && a.date == date && a.status.is_active())
            .count() as i32)
    }
}
