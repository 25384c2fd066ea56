use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use shared_database::DatabaseError;
use shared_models::ids::AppointmentId;

use super::{AppointmentFilter, Ledger, SortOrder};
use crate::models::Appointment;

/// Process-local ledger. Overlap and version checks run under the write lock,
/// so concurrent writers cannot double-book a doctor.
#[derive(Default)]
pub struct InMemoryLedger {
    appointments: RwLock<HashMap<AppointmentId, Appointment>>,
    unavailable: AtomicBool,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every call fails with `DatabaseError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.appointments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.appointments.read().await.is_empty()
    }

    fn check_available(&self) -> Result<(), DatabaseError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DatabaseError::Unavailable("ledger offline".to_string()));
        }
        Ok(())
    }

    fn overlapping<'a>(
        stored: &'a HashMap<AppointmentId, Appointment>,
        candidate: &Appointment,
    ) -> Option<&'a Appointment> {
        if !candidate.blocks_schedule() {
            return None;
        }
        stored.values().find(|a| {
            a.id != candidate.id
                && a.doctor_id == candidate.doctor_id
                && a.blocks_schedule()
                && a.window.overlaps(&candidate.window)
        })
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn find_appointment(&self, id: AppointmentId) -> Result<Option<Appointment>, DatabaseError> {
        self.check_available()?;
        Ok(self.appointments.read().await.get(&id).cloned())
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<AppointmentId, DatabaseError> {
        self.check_available()?;
        let mut stored = self.appointments.write().await;

        if stored.contains_key(&appointment.id) {
            return Err(DatabaseError::Conflict(format!("appointment {} already exists", appointment.id)));
        }
        if let Some(existing) = Self::overlapping(&stored, appointment) {
            warn!("Insert of {} overlaps booking {}", appointment.id, existing.id);
            return Err(DatabaseError::Conflict(format!(
                "doctor {} already booked by appointment {}",
                appointment.doctor_id, existing.id
            )));
        }

        stored.insert(appointment.id, appointment.clone());
        debug!("Stored appointment {}", appointment.id);
        Ok(appointment.id)
    }

    async fn replace_appointment(&self, id: AppointmentId, appointment: &Appointment) -> Result<bool, DatabaseError> {
        self.check_available()?;
        let mut stored = self.appointments.write().await;

        let current_version = match stored.get(&id) {
            Some(current) => current.version,
            None => return Ok(false),
        };
        if current_version + 1 != appointment.version {
            debug!("Stale replace of {}: stored v{}, incoming v{}", id, current_version, appointment.version);
            return Ok(false);
        }
        if let Some(existing) = Self::overlapping(&stored, appointment) {
            return Err(DatabaseError::Conflict(format!(
                "doctor {} already booked by appointment {}",
                appointment.doctor_id, existing.id
            )));
        }

        stored.insert(id, appointment.clone());
        Ok(true)
    }

    async fn query_appointments(
        &self,
        filter: &AppointmentFilter,
        sort: SortOrder,
        skip: usize,
        limit: Option<usize>,
    ) -> Result<Vec<Appointment>, DatabaseError> {
        self.check_available()?;
        let stored = self.appointments.read().await;

        let mut matched: Vec<Appointment> = stored.values().filter(|a| filter.matches(a)).cloned().collect();
        matched.sort_by(|a, b| sort.compare(a, b));

        Ok(matched
            .into_iter()
            .skip(skip)
            .take(limit.unwrap_or(usize::MAX))
            .collect())
    }
}
