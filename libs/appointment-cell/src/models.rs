use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use doctor_cell::{Doctor, DoctorError, Specialty};
use shared_database::DatabaseError;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::ids::{AppointmentId, DoctorId, UserId};

/// Concrete date and time range of one appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingWindow {
    #[serde(rename = "appointment_date")]
    pub date: NaiveDate,
    #[serde(rename = "start_time")]
    pub start: NaiveTime,
    #[serde(rename = "end_time")]
    pub end: NaiveTime,
}

impl BookingWindow {
    pub fn new(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Result<Self, AppointmentError> {
        if start >= end {
            return Err(AppointmentError::ValidationError(format!(
                "Start time {} must be before end time {}",
                start, end
            )));
        }
        Ok(Self { date, start, end })
    }

    pub fn weekday(&self) -> Weekday {
        self.date.weekday()
    }

    /// Half-open overlap on the same date.
    pub fn overlaps(&self, other: &BookingWindow) -> bool {
        self.date == other.date && self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub patient_id: UserId,
    pub doctor_id: DoctorId,
    #[serde(flatten)]
    pub window: BookingWindow,
    pub status: AppointmentStatus,
    pub reason_for_visit: Option<String>,
    pub notes: Option<String>,
    pub consultation_fee: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<UserId>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    /// Optimistic-concurrency token, bumped on every persisted change.
    #[serde(default = "initial_version")]
    pub version: u32,
}

fn initial_version() -> u32 {
    1
}

impl Appointment {
    /// A fresh Pending booking. The fee is a snapshot of the doctor's fee at this instant.
    pub fn pending(patient_id: UserId, doctor: &Doctor, window: BookingWindow, reason_for_visit: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: AppointmentId::new(),
            patient_id,
            doctor_id: doctor.id,
            window,
            status: AppointmentStatus::Pending,
            reason_for_visit,
            notes: None,
            consultation_fee: doctor.consultation_fee,
            created_at: now,
            updated_at: now,
            approved_at: None,
            approved_by: None,
            cancelled_at: None,
            cancellation_reason: None,
            version: initial_version(),
        }
    }

    pub fn blocks_schedule(&self) -> bool {
        self.status.blocks_schedule()
    }

    /// Stamps `updated_at` and advances the version ahead of a replace.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        self.version += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Completed,
    NoShow,
}

impl AppointmentStatus {
    /// Pending and Approved bookings hold their slot; every other status is inert.
    pub fn blocks_schedule(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Approved)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Approved => "approved",
            AppointmentStatus::Rejected => "rejected",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::NoShow => "no_show",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub doctor_id: DoctorId,
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub reason_for_visit: Option<String>,
}

/// Pending-only edit. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub appointment_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub reason_for_visit: Option<String>,
    pub notes: Option<String>,
}

impl UpdateAppointmentRequest {
    pub fn touches_window(&self) -> bool {
        self.appointment_date.is_some() || self.start_time.is_some() || self.end_time.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangeRequest {
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
}

impl StatusChangeRequest {
    pub fn to(status: AppointmentStatus) -> Self {
        Self {
            status,
            notes: None,
            cancellation_reason: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_cancellation_reason(mut self, reason: impl Into<String>) -> Self {
        self.cancellation_reason = Some(reason.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentSearchQuery {
    pub patient_id: Option<UserId>,
    pub doctor_id: Option<DoctorId>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// One bookable step of a doctor's day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: bool,
}

/// An appointment joined with the directory records it references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentDetails {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub patient: Option<User>,
    pub doctor: Option<Doctor>,
    pub doctor_user: Option<User>,
    pub specialty: Option<Specialty>,
}

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Doctor is not active or not approved")]
    DoctorNotEligible,

    #[error("Appointment slot not available: {0}")]
    SlotUnavailable(String),

    #[error("Invalid appointment state: {0}")]
    InvalidState(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("Appointment was modified concurrently")]
    ConcurrentModification,
}

impl From<DatabaseError> for AppointmentError {
    fn from(err: DatabaseError) -> Self {
        AppointmentError::PersistenceFailure(err.to_string())
    }
}

impl From<DoctorError> for AppointmentError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound(_) | DoctorError::ProfileNotFound(_) => AppointmentError::NotFound(err.to_string()),
            DoctorError::ValidationError(msg) => AppointmentError::ValidationError(msg),
            DoctorError::PersistenceFailure(msg) => AppointmentError::PersistenceFailure(msg),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound(_) => AppError::NotFound(err.to_string()),
            AppointmentError::DoctorNotEligible => AppError::BadRequest(err.to_string()),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::SlotUnavailable(_)
            | AppointmentError::InvalidState(_)
            | AppointmentError::ConcurrentModification => AppError::Conflict(err.to_string()),
            AppointmentError::Unauthorized(msg) => AppError::Forbidden(msg),
            AppointmentError::PersistenceFailure(msg) => AppError::Database(msg),
        }
    }
}
