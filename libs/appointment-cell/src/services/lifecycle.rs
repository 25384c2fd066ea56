use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use shared_models::auth::{Actor, UserRole};

use crate::models::{Appointment, AppointmentError, AppointmentStatus, StatusChangeRequest};

impl AppointmentStatus {
    pub fn valid_transitions(&self) -> Vec<AppointmentStatus> {
        match self {
            AppointmentStatus::Pending => vec![
                AppointmentStatus::Approved,
                AppointmentStatus::Rejected,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Approved => vec![
                AppointmentStatus::Cancelled,
                AppointmentStatus::Completed,
                AppointmentStatus::NoShow,
            ],
            // Terminal states
            AppointmentStatus::Rejected
            | AppointmentStatus::Cancelled
            | AppointmentStatus::Completed
            | AppointmentStatus::NoShow => vec![],
        }
    }

    pub fn can_transition_to(&self, target: &AppointmentStatus) -> bool {
        self.valid_transitions().contains(target)
    }

    pub fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

/// Applies status transitions and their derived fields to an appointment.
pub struct BookingStateMachine;

impl BookingStateMachine {
    pub fn validate_transition(
        current: AppointmentStatus,
        target: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current, target);

        if !current.can_transition_to(&target) {
            warn!("Invalid status transition attempted: {} -> {}", current, target);
            let reason = if current.is_terminal() {
                format!("appointment is {} and can no longer change", current)
            } else {
                format!("cannot move from {} to {}", current, target)
            };
            return Err(AppointmentError::InvalidState(reason));
        }
        Ok(())
    }

    /// Moves `appointment` to `target`, setting the fields each edge owns.
    /// Approval is reserved for doctors and admins; an absent actor is the system path.
    pub fn transition(
        appointment: &mut Appointment,
        change: &StatusChangeRequest,
        actor: Option<Actor>,
        now: DateTime<Utc>,
    ) -> Result<(), AppointmentError> {
        let target = change.status;
        Self::validate_transition(appointment.status, target)?;

        if target == AppointmentStatus::Approved {
            if let Some(actor) = actor.filter(|a| a.role == UserRole::Patient) {
                warn!("Patient {} attempted to approve appointment {}", actor.user_id, appointment.id);
                return Err(AppointmentError::Unauthorized(
                    "Only doctors or admins can approve appointments".to_string(),
                ));
            }
        }

        if let Some(notes) = change.notes.as_ref().filter(|n| !n.is_empty()) {
            appointment.notes = Some(notes.clone());
        }

        match target {
            AppointmentStatus::Approved => {
                appointment.approved_at = Some(now);
                appointment.approved_by = actor.map(|a| a.user_id);
            }
            AppointmentStatus::Cancelled => {
                appointment.cancelled_at = Some(now);
                appointment.cancellation_reason = change.cancellation_reason.clone();
            }
            _ => {}
        }

        let previous = appointment.status;
        appointment.status = target;
        appointment.touch(now);

        info!("Appointment {} moved {} -> {}", appointment.id, previous, target);
        Ok(())
    }

    /// Field edits are only allowed while the booking is still Pending.
    pub fn ensure_editable(appointment: &Appointment) -> Result<(), AppointmentError> {
        if appointment.status != AppointmentStatus::Pending {
            warn!("Edit rejected for appointment {} in status {}", appointment.id, appointment.status);
            return Err(AppointmentError::InvalidState(format!(
                "only pending appointments can be edited, this one is {}",
                appointment.status
            )));
        }
        Ok(())
    }
}
