use tracing::{debug, warn};

use doctor_cell::Doctor;
use shared_models::ids::{AppointmentId, DoctorId};

use crate::models::{Appointment, AppointmentError, BookingWindow};

/// Decides whether a candidate window can be booked for a doctor.
pub struct ConflictChecker;

impl ConflictChecker {
    /// True when an active booking of `doctor_id` overlaps `candidate`.
    pub fn has_conflict(doctor_id: DoctorId, candidate: &BookingWindow, existing: &[Appointment]) -> bool {
        Self::find_conflict(doctor_id, candidate, existing, None).is_some()
    }

    /// First active booking overlapping `candidate`, skipping `exclude` (the booking being edited).
    pub fn find_conflict<'a>(
        doctor_id: DoctorId,
        candidate: &BookingWindow,
        existing: &'a [Appointment],
        exclude: Option<AppointmentId>,
    ) -> Option<&'a Appointment> {
        existing.iter().find(|a| {
            a.doctor_id == doctor_id
                && Some(a.id) != exclude
                && a.blocks_schedule()
                && a.window.overlaps(candidate)
        })
    }

    pub fn ensure_eligible(doctor: &Doctor) -> Result<(), AppointmentError> {
        if !doctor.is_bookable() {
            warn!(
                "Doctor {} is not eligible for booking (active={}, approved={})",
                doctor.id, doctor.is_active, doctor.is_approved
            );
            return Err(AppointmentError::DoctorNotEligible);
        }
        Ok(())
    }

    pub fn validate_against_availability(doctor: &Doctor, candidate: &BookingWindow) -> Result<(), AppointmentError> {
        if !doctor
            .availability_model()
            .is_open_at(candidate.weekday(), candidate.start, candidate.end)
        {
            warn!(
                "Doctor {} is not available on {} {}-{}",
                doctor.id, candidate.date, candidate.start, candidate.end
            );
            return Err(AppointmentError::SlotUnavailable(
                "Doctor is not available at the requested time".to_string(),
            ));
        }
        Ok(())
    }

    /// Eligibility, then availability containment, then overlap. First failure wins.
    pub fn check(
        doctor: &Doctor,
        candidate: &BookingWindow,
        existing: &[Appointment],
        exclude: Option<AppointmentId>,
    ) -> Result<(), AppointmentError> {
        debug!("Checking {} {}-{} for doctor {}", candidate.date, candidate.start, candidate.end, doctor.id);

        Self::ensure_eligible(doctor)?;
        Self::validate_against_availability(doctor, candidate)?;

        if let Some(existing) = Self::find_conflict(doctor.id, candidate, existing, exclude) {
            warn!("Conflict for doctor {} with appointment {}", doctor.id, existing.id);
            return Err(AppointmentError::SlotUnavailable(
                "Time slot is already booked".to_string(),
            ));
        }
        Ok(())
    }
}
