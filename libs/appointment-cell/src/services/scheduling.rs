use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use futures::future::try_join_all;
use tracing::{debug, error, info, warn};

use doctor_cell::{AvailabilityWindow, Directory, Doctor, DoctorService, SupabaseDirectory};
use shared_config::{AppConfig, SchedulingSettings};
use shared_database::DatabaseError;
use shared_models::auth::{Actor, UserRole};
use shared_models::ids::{AppointmentId, DoctorId, UserId};

use crate::ledger::{AppointmentFilter, Ledger, SortOrder, SupabaseLedger};
use crate::models::{
    Appointment, AppointmentDetails, AppointmentError, AppointmentSearchQuery, AppointmentStatus,
    BookingWindow, CreateAppointmentRequest, StatusChangeRequest, TimeSlot, UpdateAppointmentRequest,
};
use crate::services::authorization::AuthorizationGate;
use crate::services::conflict::ConflictChecker;
use crate::services::lifecycle::BookingStateMachine;
use crate::services::slots::SlotGenerator;

/// Entry point for every booking operation. Holds no appointment state of its
/// own; the ledger and directory are the source of truth.
#[derive(Clone)]
pub struct SchedulingService {
    directory: Arc<dyn Directory>,
    ledger: Arc<dyn Ledger>,
    doctors: DoctorService,
    gate: AuthorizationGate,
    slots: SlotGenerator,
    settings: SchedulingSettings,
}

impl SchedulingService {
    pub fn new(
        directory: Arc<dyn Directory>,
        ledger: Arc<dyn Ledger>,
        settings: SchedulingSettings,
    ) -> Result<Self, AppointmentError> {
        Ok(Self {
            doctors: DoctorService::new(directory.clone()),
            gate: AuthorizationGate::new(directory.clone()),
            slots: SlotGenerator::new(settings.slot_granularity_minutes)?,
            directory,
            ledger,
            settings,
        })
    }

    /// Service wired to the Supabase-backed directory and ledger.
    pub fn from_config(config: &AppConfig) -> Result<Self, AppointmentError> {
        Self::new(
            Arc::new(SupabaseDirectory::new(config)),
            Arc::new(SupabaseLedger::new(config)),
            config.scheduling.clone(),
        )
    }

    pub fn doctors(&self) -> &DoctorService {
        &self.doctors
    }

    /// Books a Pending appointment for `patient_id`, the caller's authenticated identity.
    pub async fn create(
        &self,
        request: CreateAppointmentRequest,
        patient_id: UserId,
    ) -> Result<AppointmentDetails, AppointmentError> {
        debug!("Booking request from patient {} for doctor {}", patient_id, request.doctor_id);

        let window = BookingWindow::new(request.appointment_date, request.start_time, request.end_time)?;
        let doctor = self.load_doctor(request.doctor_id).await?;
        let existing = self.bookings_on(doctor.id, window.date).await?;

        ConflictChecker::check(&doctor, &window, &existing, None)?;

        // Joins are read before the insert so a directory failure leaves no row behind.
        let (patient, doctor_user, specialty) = tokio::try_join!(
            self.directory.find_user(patient_id),
            self.directory.find_user(doctor.user_id),
            self.directory.find_specialty(doctor.specialty_id),
        )?;

        let appointment = Appointment::pending(patient_id, &doctor, window, request.reason_for_visit);
        let id = match self.ledger.insert_appointment(&appointment).await {
            Ok(id) => id,
            Err(DatabaseError::Conflict(msg)) => {
                warn!("Ledger rejected overlapping booking for doctor {}: {}", doctor.id, msg);
                return Err(AppointmentError::SlotUnavailable("Time slot is already booked".to_string()));
            }
            Err(e) => {
                error!("Failed to store appointment for doctor {}: {}", doctor.id, e);
                return Err(e.into());
            }
        };

        // The booking is committed from here on; a failed read-back falls back to the inserted value.
        let stored = match self.ledger.find_appointment(id).await {
            Ok(Some(row)) => row,
            Ok(None) => {
                error!("Appointment {} missing right after insert", id);
                appointment
            }
            Err(e) => {
                error!("Failed to read back appointment {}: {}", id, e);
                appointment
            }
        };

        info!(
            "Appointment {} booked with doctor {} on {} {}-{}",
            id, doctor.id, stored.window.date, stored.window.start, stored.window.end
        );
        Ok(AppointmentDetails {
            appointment: stored,
            patient,
            doctor: Some(doctor),
            doctor_user,
            specialty,
        })
    }

    pub async fn get(&self, id: AppointmentId) -> Result<AppointmentDetails, AppointmentError> {
        let appointment = self.load(id).await?;
        self.hydrate(appointment).await
    }

    /// Pending-only edit of date, times, reason and notes.
    pub async fn update(
        &self,
        id: AppointmentId,
        request: UpdateAppointmentRequest,
    ) -> Result<AppointmentDetails, AppointmentError> {
        debug!("Updating appointment {}", id);

        let mut appointment = self.load(id).await?;
        BookingStateMachine::ensure_editable(&appointment)?;

        if request.touches_window() {
            let window = BookingWindow::new(
                request.appointment_date.unwrap_or(appointment.window.date),
                request.start_time.unwrap_or(appointment.window.start),
                request.end_time.unwrap_or(appointment.window.end),
            )?;

            let doctor = self.load_doctor(appointment.doctor_id).await?;
            ConflictChecker::validate_against_availability(&doctor, &window)?;
            let existing = self.bookings_on(doctor.id, window.date).await?;
            if ConflictChecker::find_conflict(doctor.id, &window, &existing, Some(id)).is_some() {
                warn!("Rescheduling {} would overlap another booking", id);
                return Err(AppointmentError::SlotUnavailable("Time slot is already booked".to_string()));
            }
            appointment.window = window;
        }

        if let Some(reason) = request.reason_for_visit {
            appointment.reason_for_visit = Some(reason);
        }
        if let Some(notes) = request.notes {
            appointment.notes = Some(notes);
        }

        appointment.touch(Utc::now());
        self.persist(&appointment).await?;

        info!("Appointment {} updated", id);
        self.hydrate(appointment).await
    }

    /// Moves an appointment along the status table. `actor_id`, when present,
    /// is recorded as the approver.
    pub async fn change_status(
        &self,
        id: AppointmentId,
        request: StatusChangeRequest,
        actor_id: Option<UserId>,
    ) -> Result<AppointmentDetails, AppointmentError> {
        debug!("Status change of {} to {}", id, request.status);

        let mut appointment = self.load(id).await?;
        let actor = self.resolve_actor(actor_id).await?;

        BookingStateMachine::transition(&mut appointment, &request, actor, Utc::now())?;
        self.persist(&appointment).await?;

        self.hydrate(appointment).await
    }

    /// Cancels after checking the actor's rights. No actor means the system path.
    pub async fn cancel(
        &self,
        id: AppointmentId,
        reason: impl Into<String>,
        actor_id: Option<UserId>,
    ) -> Result<Appointment, AppointmentError> {
        let mut appointment = self.load(id).await?;
        let actor = self.resolve_actor(actor_id).await?;

        if let Some(actor) = &actor {
            self.gate.can_cancel(actor, &appointment).await?;
        }

        let change = StatusChangeRequest::to(AppointmentStatus::Cancelled).with_cancellation_reason(reason);
        BookingStateMachine::transition(&mut appointment, &change, actor, Utc::now())?;
        self.persist(&appointment).await?;

        info!("Appointment {} cancelled", id);
        Ok(appointment)
    }

    /// Filtered, newest-first, offset-paged search.
    pub async fn search(&self, query: &AppointmentSearchQuery) -> Result<Vec<AppointmentDetails>, AppointmentError> {
        let page = query.page.unwrap_or(1);
        let page_size = query.page_size.unwrap_or(self.settings.default_page_size);

        if page == 0 {
            return Err(AppointmentError::ValidationError("page starts at 1".to_string()));
        }
        if page_size == 0 || page_size > self.settings.max_page_size {
            return Err(AppointmentError::ValidationError(format!(
                "page_size must be between 1 and {}",
                self.settings.max_page_size
            )));
        }

        let skip = (page as usize - 1) * page_size as usize;
        let appointments = self
            .ledger
            .query_appointments(&AppointmentFilter::from(query), SortOrder::CreatedAtDesc, skip, Some(page_size as usize))
            .await?;

        debug!("Search page {} returned {} appointments", page, appointments.len());
        self.hydrate_all(appointments).await
    }

    /// Appointments visible to a user by role. A doctor account without a
    /// doctor record sees nothing.
    pub async fn list_for_actor(
        &self,
        user_id: UserId,
        role: UserRole,
    ) -> Result<Vec<AppointmentDetails>, AppointmentError> {
        let filter = match role {
            UserRole::Patient => AppointmentFilter::for_patient(user_id),
            UserRole::Doctor => match self.directory.find_doctor_by_user(user_id).await? {
                Some(doctor) => AppointmentFilter::for_doctor(doctor.id),
                None => {
                    warn!("User {} has the doctor role but no doctor record", user_id);
                    return Ok(Vec::new());
                }
            },
            UserRole::Admin => AppointmentFilter::default(),
        };

        let appointments = self
            .ledger
            .query_appointments(&filter, SortOrder::CreatedAtDesc, 0, None)
            .await?;
        self.hydrate_all(appointments).await
    }

    /// Slots for a bookable doctor on `date`. Unknown or non-bookable doctors have none.
    pub async fn get_available_slots(
        &self,
        doctor_id: DoctorId,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>, AppointmentError> {
        let doctor = match self.directory.find_doctor(doctor_id).await? {
            Some(doctor) if doctor.is_bookable() => doctor,
            _ => return Ok(Vec::new()),
        };

        let bookings = self.bookings_on(doctor_id, date).await?;
        Ok(self.slots.generate(&doctor, date, &bookings))
    }

    pub async fn set_availability(
        &self,
        doctor_id: DoctorId,
        windows: Vec<AvailabilityWindow>,
    ) -> Result<(), AppointmentError> {
        Ok(self.doctors.set_availability(doctor_id, windows).await?)
    }

    pub async fn approve_doctor(&self, doctor_id: DoctorId) -> Result<Doctor, AppointmentError> {
        Ok(self.doctors.approve_doctor(doctor_id).await?)
    }

    async fn load(&self, id: AppointmentId) -> Result<Appointment, AppointmentError> {
        self.ledger
            .find_appointment(id)
            .await?
            .ok_or_else(|| AppointmentError::NotFound(format!("Appointment {}", id)))
    }

    async fn load_doctor(&self, doctor_id: DoctorId) -> Result<Doctor, AppointmentError> {
        self.directory
            .find_doctor(doctor_id)
            .await?
            .ok_or_else(|| AppointmentError::NotFound(format!("Doctor {}", doctor_id)))
    }

    async fn resolve_actor(&self, actor_id: Option<UserId>) -> Result<Option<Actor>, AppointmentError> {
        let Some(user_id) = actor_id else {
            return Ok(None);
        };
        let user = self
            .directory
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppointmentError::NotFound(format!("User {}", user_id)))?;
        Ok(Some(Actor::from(&user)))
    }

    async fn bookings_on(&self, doctor_id: DoctorId, date: NaiveDate) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self
            .ledger
            .query_appointments(&AppointmentFilter::for_doctor_on(doctor_id, date), SortOrder::StartAsc, 0, None)
            .await?)
    }

    async fn persist(&self, appointment: &Appointment) -> Result<(), AppointmentError> {
        match self.ledger.replace_appointment(appointment.id, appointment).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                warn!("Appointment {} changed underneath us (v{})", appointment.id, appointment.version);
                Err(AppointmentError::ConcurrentModification)
            }
            Err(DatabaseError::Conflict(msg)) => Err(AppointmentError::SlotUnavailable(msg)),
            Err(e) => {
                error!("Failed to store appointment {}: {}", appointment.id, e);
                Err(e.into())
            }
        }
    }

    async fn hydrate(&self, appointment: Appointment) -> Result<AppointmentDetails, AppointmentError> {
        let (patient, doctor) = tokio::try_join!(
            self.directory.find_user(appointment.patient_id),
            self.directory.find_doctor(appointment.doctor_id),
        )?;

        let (doctor_user, specialty) = match &doctor {
            Some(doctor) => tokio::try_join!(
                self.directory.find_user(doctor.user_id),
                self.directory.find_specialty(doctor.specialty_id),
            )?,
            None => (None, None),
        };

        Ok(AppointmentDetails {
            appointment,
            patient,
            doctor,
            doctor_user,
            specialty,
        })
    }

    async fn hydrate_all(&self, appointments: Vec<Appointment>) -> Result<Vec<AppointmentDetails>, AppointmentError> {
        try_join_all(appointments.into_iter().map(|a| self.hydrate(a))).await
    }
}
