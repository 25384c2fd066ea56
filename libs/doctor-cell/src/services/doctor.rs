use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use shared_models::ids::{DoctorId, UserId};

use crate::directory::Directory;
use crate::models::{AvailabilityWindow, Doctor, DoctorError, DoctorProfile};
use crate::services::availability::AvailabilityModel;

/// Doctor profile administration over a [`Directory`].
#[derive(Clone)]
pub struct DoctorService {
    directory: Arc<dyn Directory>,
}

impl DoctorService {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    /// Active doctor by id. Inactive profiles read as not found.
    pub async fn get_doctor(&self, doctor_id: DoctorId) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor profile: {}", doctor_id);

        match self.directory.find_doctor(doctor_id).await? {
            Some(doctor) if doctor.is_active => Ok(doctor),
            _ => Err(DoctorError::NotFound(doctor_id)),
        }
    }

    /// Active doctor owned by the given user account.
    pub async fn get_doctor_by_user(&self, user_id: UserId) -> Result<Doctor, DoctorError> {
        match self.directory.find_doctor_by_user(user_id).await? {
            Some(doctor) if doctor.is_active => Ok(doctor),
            _ => Err(DoctorError::ProfileNotFound(user_id)),
        }
    }

    /// Doctor joined with its user account and specialty.
    pub async fn get_doctor_profile(&self, doctor_id: DoctorId) -> Result<DoctorProfile, DoctorError> {
        let doctor = self.get_doctor(doctor_id).await?;
        let (user, specialty) = tokio::try_join!(
            self.directory.find_user(doctor.user_id),
            self.directory.find_specialty(doctor.specialty_id),
        )?;

        Ok(DoctorProfile { doctor, user, specialty })
    }

    /// Replaces the doctor's weekly windows wholesale.
    pub async fn set_availability(
        &self,
        doctor_id: DoctorId,
        windows: Vec<AvailabilityWindow>,
    ) -> Result<(), DoctorError> {
        AvailabilityModel::validate(&windows)?;

        let count = windows.len();
        if !self.directory.set_doctor_availability(doctor_id, windows).await? {
            warn!("Availability update for unknown doctor {}", doctor_id);
            return Err(DoctorError::NotFound(doctor_id));
        }

        info!("Doctor {} availability replaced with {} windows", doctor_id, count);
        Ok(())
    }

    /// Approving clears any earlier rejection.
    pub async fn approve_doctor(&self, doctor_id: DoctorId) -> Result<Doctor, DoctorError> {
        let doctor = self
            .modify(doctor_id, |doctor| {
                doctor.is_approved = true;
                doctor.is_rejected = false;
                doctor.rejection_reason = None;
                doctor.rejected_at = None;
            })
            .await?;

        info!("Doctor {} approved", doctor.id);
        Ok(doctor)
    }

    pub async fn reject_doctor(&self, doctor_id: DoctorId, reason: impl Into<String>) -> Result<Doctor, DoctorError> {
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(DoctorError::ValidationError("Rejection reason is required".to_string()));
        }

        let doctor = self
            .modify(doctor_id, |doctor| {
                doctor.is_approved = false;
                doctor.is_rejected = true;
                doctor.rejection_reason = Some(reason);
                doctor.rejected_at = Some(Utc::now());
            })
            .await?;

        info!("Doctor {} rejected", doctor.id);
        Ok(doctor)
    }

    pub async fn update_consultation_fee(&self, doctor_id: DoctorId, fee: f64) -> Result<Doctor, DoctorError> {
        if !fee.is_finite() || fee < 0.0 {
            return Err(DoctorError::ValidationError(format!(
                "Consultation fee must be a non-negative amount, got {}",
                fee
            )));
        }

        self.modify(doctor_id, |doctor| doctor.consultation_fee = fee).await
    }

    pub async fn deactivate_doctor(&self, doctor_id: DoctorId) -> Result<Doctor, DoctorError> {
        let doctor = self.modify(doctor_id, |doctor| doctor.is_active = false).await?;
        info!("Doctor {} deactivated", doctor.id);
        Ok(doctor)
    }

    async fn modify<F>(&self, doctor_id: DoctorId, apply: F) -> Result<Doctor, DoctorError>
    where
        F: FnOnce(&mut Doctor),
    {
        let mut doctor = self
            .directory
            .find_doctor(doctor_id)
            .await?
            .ok_or(DoctorError::NotFound(doctor_id))?;

        apply(&mut doctor);
        doctor.updated_at = Utc::now();

        if !self.directory.update_doctor(&doctor).await? {
            return Err(DoctorError::NotFound(doctor_id));
        }
        Ok(doctor)
    }
}
