// libs/appointment-cell/src/services/lifecycle.rs
use chrono::Utc;
use tracing::{debug, warn};

use notification_cell::models::NotificationKind;
use shared_models::User;

use crate::models::{Appointment, AppointmentStatus, BookingError, CancelledBy};

/// Cross-entity work a transition asks the orchestrator to perform. The state
/// machine itself mutates nothing but the appointment it was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionEffect {
    ReleaseSlot,
    Notify(NotificationKind),
}

#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub appointment: Appointment,
    pub effects: Vec<TransitionEffect>,
}

/// Table-driven appointment status machine. Legality lives in one table here
/// instead of per-caller conditionals.
pub struct AppointmentStateMachine;

impl AppointmentStateMachine {
    pub fn new() -> Self {
        Self
    }

    pub fn valid_transitions(&self, status: AppointmentStatus) -> &'static [AppointmentStatus] {
        match status {
            AppointmentStatus::Pending => {
                &[AppointmentStatus::Confirmed, AppointmentStatus::Cancelled]
            }
            AppointmentStatus::Confirmed => &[
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
            ],
            // Terminal states
            AppointmentStatus::Cancelled
            | AppointmentStatus::Completed
            | AppointmentStatus::NoShow => &[],
        }
    }

    /// Apply a status transition, returning the updated record and the
    /// follow-up effects the orchestrator must execute. Performs no I/O.
    pub fn transition(
        &self,
        mut appointment: Appointment,
        target: AppointmentStatus,
        actor: &User,
        reason: Option<String>,
    ) -> Result<TransitionOutcome, BookingError> {
        let from = appointment.status;
        debug!("Transition requested: {} -> {}", from, target);

        if !self.valid_transitions(from).contains(&target) {
            warn!("Illegal transition attempted: {} -> {}", from, target);
            return Err(BookingError::IllegalTransition { from, to: target });
        }

        appointment.status = target;
        appointment.updated_at = Utc::now();

        let mut effects = Vec::new();
        match target {
            AppointmentStatus::Confirmed => {
                effects.push(TransitionEffect::Notify(NotificationKind::Confirmed));
            }
            AppointmentStatus::Completed => {
                effects.push(TransitionEffect::Notify(NotificationKind::Completed));
            }
            AppointmentStatus::Cancelled => {
                appointment.cancellation_reason = reason;
                appointment.cancelled_by = Some(CancelledBy::from(actor.role));
                appointment.cancelled_at = Some(Utc::now());
                effects.push(TransitionEffect::ReleaseSlot);
                effects.push(TransitionEffect::Notify(NotificationKind::Cancelled));
            }
            // A no-show consumes its slot and has no event kind; the record
            // update alone is the outcome.
            AppointmentStatus::NoShow => {}
            AppointmentStatus::Pending => {}
        }

        Ok(TransitionOutcome { appointment, effects })
    }
}

impl Default for AppointmentStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
