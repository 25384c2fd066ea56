use std::sync::Arc;

use tracing::{debug, warn};

use doctor_cell::Directory;
use shared_models::auth::{Actor, UserRole};

use crate::models::{Appointment, AppointmentError};

/// Role-based checks for mutations that need more than a valid transition.
#[derive(Clone)]
pub struct AuthorizationGate {
    directory: Arc<dyn Directory>,
}

impl AuthorizationGate {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    /// Admins may cancel anything, patients their own bookings, doctors bookings
    /// made against the doctor record they own. Everything else is `Unauthorized`.
    pub async fn can_cancel(&self, actor: &Actor, appointment: &Appointment) -> Result<(), AppointmentError> {
        debug!("Checking cancel rights of {} {} on {}", actor.role, actor.user_id, appointment.id);

        let allowed = match actor.role {
            UserRole::Admin => true,
            UserRole::Patient => actor.user_id == appointment.patient_id,
            UserRole::Doctor => self
                .directory
                .find_doctor_by_user(actor.user_id)
                .await?
                .is_some_and(|doctor| doctor.id == appointment.doctor_id),
        };

        if !allowed {
            warn!("{} {} may not cancel appointment {}", actor.role, actor.user_id, appointment.id);
            return Err(AppointmentError::Unauthorized(
                "You can only cancel your own appointments".to_string(),
            ));
        }
        Ok(())
    }
}
