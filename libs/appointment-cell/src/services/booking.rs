// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use notification_cell::models::{
    recipient_for, AppointmentSnapshot, EventContext, NotificationEvent, NotificationKind,
};
use notification_cell::NotificationDispatcher;
use schedule_cell::services::schedule::ScheduleService;
use schedule_cell::store::ScheduleStore;
use shared_config::CoreConfig;
use shared_models::{User, UserRole};

use crate::directory::PartyDirectory;
use crate::models::{
    Appointment, AppointmentStatus, BookingError, CancelAppointmentRequest,
    CreateAppointmentRequest,
};
use crate::services::allocator::SlotAllocator;
use crate::services::lifecycle::{AppointmentStateMachine, TransitionEffect};
use crate::store::AppointmentStore;

/// End-to-end booking orchestration: claim -> insert -> bind -> notify, and
/// the status-change flow with its side effects. All collaborators are
/// injected; there is no hidden global state.
pub struct BookingService {
    appointments: Arc<dyn AppointmentStore>,
    allocator: SlotAllocator,
    lifecycle: AppointmentStateMachine,
    schedule_service: ScheduleService,
    dispatcher: Arc<NotificationDispatcher>,
    directory: Arc<dyn PartyDirectory>,
    config: CoreConfig,
}

impl BookingService {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        schedules: Arc<dyn ScheduleStore>,
        dispatcher: Arc<NotificationDispatcher>,
        directory: Arc<dyn PartyDirectory>,
        config: CoreConfig,
    ) -> Self {
        let allocator = SlotAllocator::new(Arc::clone(&schedules), Arc::clone(&appointments));
        let schedule_service = ScheduleService::new(schedules);

        Self {
            appointments,
            allocator,
            lifecycle: AppointmentStateMachine::new(),
            schedule_service,
            dispatcher,
            directory,
            config,
        }
    }

    /// Book a slot for a patient. The claim is compensated (released) if the
    /// insert fails, so no partial state survives an error. The `created`
    /// event is dispatched only after the record is committed; channel
    /// failures never fail the booking.
    pub async fn create_appointment(
        &self,
        actor: &User,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, BookingError> {
        info!(
            "Booking request: patient {} with doctor {} at {} on {}",
            request.patient_id, request.doctor_id, request.time_slot, request.date
        );

        if actor.role != UserRole::Admin && actor.id != request.patient_id {
            return Err(BookingError::Permission(
                "Only the patient or an admin may book this appointment".to_string(),
            ));
        }

        self.validate_create_request(&request).await?;

        let claim = self
            .allocator
            .try_claim(request.patient_id, request.doctor_id, request.date, &request.time_slot)
            .await?;

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            doctor_id: request.doctor_id,
            date: request.date,
            time_slot: request.time_slot.clone(),
            status: AppointmentStatus::Pending,
            appointment_type: request.appointment_type,
            symptoms: request.symptoms,
            notes: None,
            cancellation_reason: None,
            cancelled_by: None,
            cancelled_at: None,
            reminder_sent: false,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.appointments.insert(appointment.clone()).await {
            warn!("Insert failed after slot claim, releasing {} on {}", claim.time_slot, claim.date);
            if let Err(release_err) = self.allocator.release(&claim).await {
                warn!("Compensating release also failed: {}", release_err);
            }
            return Err(e);
        }

        if let Err(e) = self.allocator.bind(&claim, appointment.id).await {
            warn!("Slot bind failed for appointment {}: {}", appointment.id, e);
            // Undo the insert as well, or the record lingers as an active
            // booking for a slot nobody holds.
            if let Err(delete_err) = self.appointments.delete(appointment.id).await {
                warn!("Compensating delete also failed: {}", delete_err);
            }
            if let Err(release_err) = self.allocator.release(&claim).await {
                warn!("Compensating release also failed: {}", release_err);
            }
            return Err(e);
        }

        let event = self
            .build_event(NotificationKind::Created, &appointment, actor, None)
            .await;
        self.dispatcher.dispatch(&event).await;

        info!("Appointment {} booked (pending)", appointment.id);
        Ok(appointment)
    }

    /// Apply a status change: permission check, state-machine transition,
    /// requested side effects (slot release), persist, then notify. `notes`
    /// updates the clinical notes; `reason` is the cancellation reason and is
    /// only meaningful when the target is `Cancelled`.
    pub async fn change_status(
        &self,
        actor: &User,
        appointment_id: Uuid,
        target: AppointmentStatus,
        notes: Option<String>,
        reason: Option<String>,
    ) -> Result<Appointment, BookingError> {
        debug!("Status change for {}: -> {}", appointment_id, target);

        let mut appointment = self
            .appointments
            .find(appointment_id)
            .await?
            .ok_or(BookingError::NotFound)?;

        self.authorize_transition(actor, &appointment, target)?;

        if let Some(n) = notes {
            appointment.notes = Some(n);
        }

        let outcome = self
            .lifecycle
            .transition(appointment, target, actor, reason)?;

        let mut notify_kinds = Vec::new();
        for effect in &outcome.effects {
            match effect {
                TransitionEffect::ReleaseSlot => {
                    self.allocator
                        .release_slot(
                            outcome.appointment.doctor_id,
                            outcome.appointment.date,
                            &outcome.appointment.time_slot,
                        )
                        .await?;
                }
                TransitionEffect::Notify(kind) => notify_kinds.push(*kind),
            }
        }

        let updated = self.appointments.update(outcome.appointment).await?;

        for kind in notify_kinds {
            let reason = updated.cancellation_reason.clone();
            let event = self.build_event(kind, &updated, actor, reason).await;
            self.dispatcher.dispatch(&event).await;
        }

        info!("Appointment {} is now {}", updated.id, updated.status);
        Ok(updated)
    }

    pub async fn cancel_appointment(
        &self,
        actor: &User,
        appointment_id: Uuid,
        request: CancelAppointmentRequest,
    ) -> Result<Appointment, BookingError> {
        self.change_status(
            actor,
            appointment_id,
            AppointmentStatus::Cancelled,
            None,
            request.reason,
        )
        .await
    }

    pub async fn get_appointment(
        &self,
        actor: &User,
        appointment_id: Uuid,
    ) -> Result<Appointment, BookingError> {
        let appointment = self
            .appointments
            .find(appointment_id)
            .await?
            .ok_or(BookingError::NotFound)?;

        let involved = actor.id == appointment.patient_id || actor.id == appointment.doctor_id;
        if !actor.is_admin() && !involved {
            return Err(BookingError::Permission(
                "Not a party to this appointment".to_string(),
            ));
        }

        Ok(appointment)
    }

    pub async fn available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<String>, BookingError> {
        Ok(self.schedule_service.available_slots(doctor_id, date).await?)
    }

    /// Flip the reminder flag. Idempotent; used by an external reminder job.
    pub async fn mark_reminder_sent(&self, appointment_id: Uuid) -> Result<Appointment, BookingError> {
        let mut appointment = self
            .appointments
            .find(appointment_id)
            .await?
            .ok_or(BookingError::NotFound)?;

        if appointment.reminder_sent {
            return Ok(appointment);
        }

        appointment.reminder_sent = true;
        self.appointments.update(appointment).await
    }

    // ==========================================================================
    // PRIVATE HELPERS
    // ==========================================================================

    async fn validate_create_request(
        &self,
        request: &CreateAppointmentRequest,
    ) -> Result<(), BookingError> {
        if NaiveTime::parse_from_str(&request.time_slot, "%H:%M").is_err() {
            return Err(BookingError::Validation(format!(
                "Time slot must be HH:MM, got: {}",
                request.time_slot
            )));
        }

        if request.date < Utc::now().date_naive() {
            return Err(BookingError::Validation(
                "Appointment date must not be in the past".to_string(),
            ));
        }

        let active_today = self
            .appointments
            .count_active_for_patient_on(request.patient_id, request.date)
            .await?;
        if active_today >= self.config.max_appointments_per_patient_per_day {
            return Err(BookingError::Validation(format!(
                "Patient already has {} active appointments on {}",
                active_today, request.date
            )));
        }

        Ok(())
    }

    fn authorize_transition(
        &self,
        actor: &User,
        appointment: &Appointment,
        target: AppointmentStatus,
    ) -> Result<(), BookingError> {
        match actor.role {
            UserRole::Admin => Ok(()),
            UserRole::Doctor if actor.id == appointment.doctor_id => Ok(()),
            // Patients may only cancel, and only their own appointment.
            UserRole::Patient
                if actor.id == appointment.patient_id
                    && target == AppointmentStatus::Cancelled =>
            {
                Ok(())
            }
            _ => Err(BookingError::Permission(format!(
                "Actor {} may not move appointment {} to {}",
                actor.id, appointment.id, target
            ))),
        }
    }

    async fn build_event(
        &self,
        kind: NotificationKind,
        appointment: &Appointment,
        actor: &User,
        reason: Option<String>,
    ) -> NotificationEvent {
        let recipient = recipient_for(
            kind,
            actor.id,
            appointment.patient_id,
            appointment.doctor_id,
        );
        let locale = self
            .directory
            .locale(recipient)
            .await
            .or_else(|| Some(self.config.default_locale.clone()));

        NotificationEvent {
            kind,
            appointment: AppointmentSnapshot {
                appointment_id: appointment.id,
                patient_id: appointment.patient_id,
                doctor_id: appointment.doctor_id,
                date: appointment.date,
                time_slot: appointment.time_slot.clone(),
                status: appointment.status.to_string(),
                snapshot: serde_json::to_value(appointment).unwrap_or(serde_json::Value::Null),
            },
            context: EventContext {
                actor: actor.clone(),
                patient_name: self.directory.display_name(appointment.patient_id).await,
                doctor_name: self.directory.display_name(appointment.doctor_id).await,
                locale,
                reason,
            },
        }
    }
}
