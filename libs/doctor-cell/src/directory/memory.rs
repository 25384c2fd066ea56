use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use shared_database::DatabaseError;
use shared_models::auth::User;
use shared_models::ids::{DoctorId, SpecialtyId, UserId};

use super::Directory;
use crate::models::{AvailabilityWindow, Doctor, Specialty};

/// Process-local directory, used by tests and single-node deployments.
#[derive(Default)]
pub struct InMemoryDirectory {
    doctors: RwLock<HashMap<DoctorId, Doctor>>,
    users: RwLock<HashMap<UserId, User>>,
    specialties: RwLock<HashMap<SpecialtyId, Specialty>>,
    unavailable: AtomicBool,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_doctor(&self, doctor: Doctor) {
        self.doctors.write().await.insert(doctor.id, doctor);
    }

    pub async fn insert_user(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }

    pub async fn insert_specialty(&self, specialty: Specialty) {
        self.specialties.write().await.insert(specialty.id, specialty);
    }

    /// While set, every call fails with `DatabaseError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), DatabaseError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DatabaseError::Unavailable("directory offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn find_doctor(&self, id: DoctorId) -> Result<Option<Doctor>, DatabaseError> {
        self.check_available()?;
        Ok(self.doctors.read().await.get(&id).cloned())
    }

    async fn find_doctor_by_user(&self, user_id: UserId) -> Result<Option<Doctor>, DatabaseError> {
        self.check_available()?;
        Ok(self
            .doctors
            .read()
            .await
            .values()
            .find(|d| d.user_id == user_id)
            .cloned())
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, DatabaseError> {
        self.check_available()?;
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_specialty(&self, id: SpecialtyId) -> Result<Option<Specialty>, DatabaseError> {
        self.check_available()?;
        Ok(self.specialties.read().await.get(&id).cloned())
    }

    async fn set_doctor_availability(
        &self,
        id: DoctorId,
        windows: Vec<AvailabilityWindow>,
    ) -> Result<bool, DatabaseError> {
        self.check_available()?;
        let mut doctors = self.doctors.write().await;
        match doctors.get_mut(&id) {
            Some(doctor) => {
                doctor.availability = windows;
                doctor.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_doctor(&self, doctor: &Doctor) -> Result<bool, DatabaseError> {
        self.check_available()?;
        let mut doctors = self.doctors.write().await;
        match doctors.get_mut(&doctor.id) {
            Some(stored) => {
                *stored = doctor.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
