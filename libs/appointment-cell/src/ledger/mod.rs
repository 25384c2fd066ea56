//! Ledger port: durable appointment storage with filtered, paged queries.

mod memory;
mod supabase;

pub use memory::InMemoryLedger;
pub use supabase::SupabaseLedger;

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::NaiveDate;

use shared_database::DatabaseError;
use shared_models::ids::{AppointmentId, DoctorId, UserId};

use crate::models::{Appointment, AppointmentSearchQuery, AppointmentStatus};

#[async_trait]
pub trait Ledger: Send + Sync {
    async fn find_appointment(&self, id: AppointmentId) -> Result<Option<Appointment>, DatabaseError>;

    /// Fails with `DatabaseError::Conflict` when the booking would overlap an
    /// active booking of the same doctor.
    async fn insert_appointment(&self, appointment: &Appointment) -> Result<AppointmentId, DatabaseError>;

    /// Compare-and-swap on `version`: applies only when the stored version is
    /// `appointment.version - 1`. `Ok(false)` on a stale or missing record.
    async fn replace_appointment(&self, id: AppointmentId, appointment: &Appointment) -> Result<bool, DatabaseError>;

    async fn query_appointments(
        &self,
        filter: &AppointmentFilter,
        sort: SortOrder,
        skip: usize,
        limit: Option<usize>,
    ) -> Result<Vec<Appointment>, DatabaseError>;
}

/// Conjunctive filter; `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    pub patient_id: Option<UserId>,
    pub doctor_id: Option<DoctorId>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
}

impl AppointmentFilter {
    pub fn for_patient(patient_id: UserId) -> Self {
        Self {
            patient_id: Some(patient_id),
            ..Self::default()
        }
    }

    pub fn for_doctor(doctor_id: DoctorId) -> Self {
        Self {
            doctor_id: Some(doctor_id),
            ..Self::default()
        }
    }

    /// Every booking of one doctor on one date.
    pub fn for_doctor_on(doctor_id: DoctorId, date: NaiveDate) -> Self {
        Self {
            doctor_id: Some(doctor_id),
            from_date: Some(date),
            to_date: Some(date),
            ..Self::default()
        }
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.patient_id.map_or(true, |id| appointment.patient_id == id)
            && self.doctor_id.map_or(true, |id| appointment.doctor_id == id)
            && self.from_date.map_or(true, |d| appointment.window.date >= d)
            && self.to_date.map_or(true, |d| appointment.window.date <= d)
            && self.status.map_or(true, |s| appointment.status == s)
    }
}

impl From<&AppointmentSearchQuery> for AppointmentFilter {
    fn from(query: &AppointmentSearchQuery) -> Self {
        Self {
            patient_id: query.patient_id,
            doctor_id: query.doctor_id,
            from_date: query.from_date,
            to_date: query.to_date,
            status: query.status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Newest first, ties broken by id so pages stay disjoint.
    #[default]
    CreatedAtDesc,
    /// Calendar order: date, then start time.
    StartAsc,
}

impl SortOrder {
    pub fn compare(&self, a: &Appointment, b: &Appointment) -> Ordering {
        match self {
            SortOrder::CreatedAtDesc => b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)),
            SortOrder::StartAsc => a
                .window
                .date
                .cmp(&b.window.date)
                .then_with(|| a.window.start.cmp(&b.window.start))
                .then_with(|| a.id.cmp(&b.id)),
        }
    }
}
