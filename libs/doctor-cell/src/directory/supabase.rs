use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::{DatabaseError, SupabaseClient};
use shared_models::auth::User;
use shared_models::ids::{DoctorId, SpecialtyId, UserId};

use super::Directory;
use crate::models::{AvailabilityWindow, Doctor, Specialty};

/// Directory backed by the PostgREST `doctors`, `users` and `specialties` tables.
pub struct SupabaseDirectory {
    supabase: SupabaseClient,
}

impl SupabaseDirectory {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn fetch_one<T: DeserializeOwned>(&self, table: &str, column: &str, value: &str) -> Result<Option<T>, DatabaseError> {
        let path = format!("/rest/v1/{}?{}=eq.{}&limit=1", table, column, value);
        let mut rows: Vec<T> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(if rows.is_empty() { None } else { Some(rows.swap_remove(0)) })
    }

    async fn patch_doctor(&self, id: DoctorId, body: Value) -> Result<bool, DatabaseError> {
        let path = format!("/rest/v1/doctors?id=eq.{}", id);
        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(Method::PATCH, &path, Some(body), Some(SupabaseClient::return_representation()))
            .await?;
        Ok(!rows.is_empty())
    }
}

#[async_trait]
impl Directory for SupabaseDirectory {
    async fn find_doctor(&self, id: DoctorId) -> Result<Option<Doctor>, DatabaseError> {
        debug!("Fetching doctor {}", id);
        self.fetch_one("doctors", "id", &id.to_string()).await
    }

    async fn find_doctor_by_user(&self, user_id: UserId) -> Result<Option<Doctor>, DatabaseError> {
        debug!("Fetching doctor for user {}", user_id);
        self.fetch_one("doctors", "user_id", &user_id.to_string()).await
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, DatabaseError> {
        self.fetch_one("users", "id", &id.to_string()).await
    }

    async fn find_specialty(&self, id: SpecialtyId) -> Result<Option<Specialty>, DatabaseError> {
        self.fetch_one("specialties", "id", &id.to_string()).await
    }

    async fn set_doctor_availability(
        &self,
        id: DoctorId,
        windows: Vec<AvailabilityWindow>,
    ) -> Result<bool, DatabaseError> {
        debug!("Replacing {} availability windows for doctor {}", windows.len(), id);
        self.patch_doctor(
            id,
            json!({
                "availability": windows,
                "updated_at": Utc::now().to_rfc3339(),
            }),
        )
        .await
    }

    async fn update_doctor(&self, doctor: &Doctor) -> Result<bool, DatabaseError> {
        let body = serde_json::to_value(doctor)?;
        self.patch_doctor(doctor.id, body).await
    }
}
