use chrono::{NaiveDate, NaiveTime, Utc};
use serde_json::{json, Value};

use shared_config::{AppConfig, SchedulingSettings};
use shared_models::auth::{Actor, User, UserRole};
use shared_models::ids::{AppointmentId, DoctorId, SpecialtyId, UserId};

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub scheduling: SchedulingSettings,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            scheduling: SchedulingSettings::default(),
        }
    }
}

impl TestConfig {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            supabase_url: url.into(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_service_token: None,
            scheduling: self.scheduling.clone(),
        }
    }
}

pub struct TestUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("test@example.com", UserRole::Patient)
    }
}

impl TestUser {
    pub fn new(email: &str, role: UserRole) -> Self {
        let name = email.split('@').next().unwrap_or(email).to_string();
        Self {
            id: UserId::new(),
            name,
            email: email.to_string(),
            role,
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, UserRole::Doctor)
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, UserRole::Patient)
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, UserRole::Admin)
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            phone: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn to_actor(&self) -> Actor {
        Actor::new(self.id, self.role)
    }
}

/// Row shapes the PostgREST tables return, for wiremock-backed tests.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn user_response(user: &TestUser) -> Value {
        json!({
            "id": user.id,
            "name": user.name,
            "email": user.email,
            "role": user.role,
            "phone": null,
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn specialty_response(specialty_id: SpecialtyId, name: &str) -> Value {
        json!({
            "id": specialty_id,
            "name": name,
            "description": null,
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn doctor_response(
        doctor_id: DoctorId,
        user_id: UserId,
        specialty_id: SpecialtyId,
        consultation_fee: f64,
    ) -> Value {
        json!({
            "id": doctor_id,
            "user_id": user_id,
            "specialty_id": specialty_id,
            "license_number": "MD123456",
            "experience": 10,
            "qualification": "MBBS",
            "consultation_fee": consultation_fee,
            "availability": [
                {
                    "day_of_week": "Mon",
                    "start_time": "09:00:00",
                    "end_time": "12:00:00",
                    "is_open": true
                }
            ],
            "is_approved": true,
            "is_rejected": false,
            "rejection_reason": null,
            "rejected_at": null,
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_response(
        appointment_id: AppointmentId,
        patient_id: UserId,
        doctor_id: DoctorId,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        status: &str,
    ) -> Value {
        json!({
            "id": appointment_id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "appointment_date": date,
            "start_time": start,
            "end_time": end,
            "status": status,
            "reason_for_visit": "Checkup",
            "notes": null,
            "consultation_fee": 150.0,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
            "approved_at": null,
            "approved_by": null,
            "cancelled_at": null,
            "cancellation_reason": null,
            "version": 1
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
