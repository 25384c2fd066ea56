//! Directory port: read access to doctors, users and specialties, plus the
//! two doctor mutations the scheduling core needs.

mod memory;
mod supabase;

pub use memory::InMemoryDirectory;
pub use supabase::SupabaseDirectory;

use async_trait::async_trait;

use shared_database::DatabaseError;
use shared_models::auth::User;
use shared_models::ids::{DoctorId, SpecialtyId, UserId};

use crate::models::{AvailabilityWindow, Doctor, Specialty};

#[async_trait]
pub trait Directory: Send + Sync {
    /// Looks a doctor up by id regardless of approval or active flags.
    async fn find_doctor(&self, id: DoctorId) -> Result<Option<Doctor>, DatabaseError>;

    /// The doctor record owned by a user account, if any.
    async fn find_doctor_by_user(&self, user_id: UserId) -> Result<Option<Doctor>, DatabaseError>;

    async fn find_user(&self, id: UserId) -> Result<Option<User>, DatabaseError>;

    async fn find_specialty(&self, id: SpecialtyId) -> Result<Option<Specialty>, DatabaseError>;

    /// Replaces the doctor's windows wholesale. `Ok(false)` when no doctor matched.
    async fn set_doctor_availability(
        &self,
        id: DoctorId,
        windows: Vec<AvailabilityWindow>,
    ) -> Result<bool, DatabaseError>;

    /// Persists the full doctor record. `Ok(false)` when no doctor matched.
    async fn update_doctor(&self, doctor: &Doctor) -> Result<bool, DatabaseError>;
}
