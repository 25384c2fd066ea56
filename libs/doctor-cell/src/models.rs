use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::DatabaseError;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::ids::{DoctorId, SpecialtyId, UserId};

use crate::services::availability::AvailabilityModel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: DoctorId,
    pub user_id: UserId,
    pub specialty_id: SpecialtyId,
    pub license_number: String,
    pub experience: i32,
    pub qualification: Option<String>,
    pub consultation_fee: f64,
    #[serde(default)]
    pub availability: Vec<AvailabilityWindow>,
    pub is_approved: bool,
    #[serde(default)]
    pub is_rejected: bool,
    pub rejection_reason: Option<String>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Doctor {
    /// New unapproved, active profile with no open hours.
    pub fn new(user_id: UserId, specialty_id: SpecialtyId, license_number: impl Into<String>, consultation_fee: f64) -> Self {
        let now = Utc::now();
        Self {
            id: DoctorId::new(),
            user_id,
            specialty_id,
            license_number: license_number.into(),
            experience: 0,
            qualification: None,
            consultation_fee,
            availability: Vec::new(),
            is_approved: false,
            is_rejected: false,
            rejection_reason: None,
            rejected_at: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Bookings may only be created against active, approved doctors.
    pub fn is_bookable(&self) -> bool {
        self.is_active && self.is_approved
    }

    pub fn availability_model(&self) -> AvailabilityModel<'_> {
        AvailabilityModel::new(&self.availability)
    }
}

/// A recurring weekly open-hours interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub day_of_week: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default = "default_open")]
    pub is_open: bool,
}

fn default_open() -> bool {
    true
}

impl AvailabilityWindow {
    pub fn open(day_of_week: Weekday, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            day_of_week,
            start_time,
            end_time,
            is_open: true,
        }
    }

    pub fn closed(day_of_week: Weekday, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            is_open: false,
            ..Self::open(day_of_week, start_time, end_time)
        }
    }

    /// Full containment of `[start, end]` on an open window for `day`.
    pub fn contains(&self, day: Weekday, start: NaiveTime, end: NaiveTime) -> bool {
        self.is_open
            && self.day_of_week == day
            && self.start_time <= start
            && self.end_time >= end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specialty {
    pub id: SpecialtyId,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A doctor joined with the records it references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub doctor: Doctor,
    pub user: Option<User>,
    pub specialty: Option<Specialty>,
}

#[derive(Debug, Error)]
pub enum DoctorError {
    #[error("Doctor not found: {0}")]
    NotFound(DoctorId),

    #[error("No doctor profile for user {0}")]
    ProfileNotFound(UserId),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

impl From<DatabaseError> for DoctorError {
    fn from(err: DatabaseError) -> Self {
        DoctorError::PersistenceFailure(err.to_string())
    }
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound(_) | DoctorError::ProfileNotFound(_) => AppError::NotFound(err.to_string()),
            DoctorError::ValidationError(msg) => AppError::ValidationError(msg),
            DoctorError::PersistenceFailure(msg) => AppError::Database(msg),
        }
    }
}
