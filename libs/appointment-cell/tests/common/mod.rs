#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc, Weekday};

use appointment_cell::{CreateAppointmentRequest, InMemoryLedger, SchedulingService};
use doctor_cell::{AvailabilityWindow, Doctor, InMemoryDirectory, Specialty};
use shared_config::SchedulingSettings;
use shared_models::ids::{DoctorId, SpecialtyId};
use shared_utils::test_utils::TestUser;

pub struct Fixture {
    pub directory: Arc<InMemoryDirectory>,
    pub ledger: Arc<InMemoryLedger>,
    pub service: SchedulingService,
    pub doctor: Doctor,
    pub doctor_user: TestUser,
    pub patient: TestUser,
    pub admin: TestUser,
}

pub fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// 2025-06-02 is a Monday.
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

pub fn request(doctor_id: DoctorId, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> CreateAppointmentRequest {
    CreateAppointmentRequest {
        doctor_id,
        appointment_date: date,
        start_time: start,
        end_time: end,
        reason_for_visit: Some("Checkup".to_string()),
    }
}

/// Approved doctor open Mondays 09:00-12:00, plus a patient and an admin.
pub async fn fixture() -> Fixture {
    fixture_with_hours(vec![AvailabilityWindow::open(Weekday::Mon, t(9, 0), t(12, 0))]).await
}

pub async fn fixture_with_hours(availability: Vec<AvailabilityWindow>) -> Fixture {
    shared_utils::telemetry::try_init_test_tracing();

    let directory = Arc::new(InMemoryDirectory::new());
    let ledger = Arc::new(InMemoryLedger::new());

    let specialty = Specialty {
        id: SpecialtyId::new(),
        name: "Cardiology".to_string(),
        description: None,
        is_active: true,
        created_at: Utc::now(),
    };
    let doctor_user = TestUser::doctor("doc@example.com");
    let patient = TestUser::patient("pat@example.com");
    let admin = TestUser::admin("admin@example.com");

    let mut doctor = Doctor::new(doctor_user.id, specialty.id, "MD123456", 150.0);
    doctor.is_approved = true;
    doctor.availability = availability;

    directory.insert_specialty(specialty).await;
    directory.insert_user(doctor_user.to_user()).await;
    directory.insert_user(patient.to_user()).await;
    directory.insert_user(admin.to_user()).await;
    directory.insert_doctor(doctor.clone()).await;

    let service = SchedulingService::new(directory.clone(), ledger.clone(), SchedulingSettings::default()).unwrap();

    Fixture {
        directory,
        ledger,
        service,
        doctor,
        doctor_user,
        patient,
        admin,
    }
}

impl Fixture {
    /// Registers another user in the directory.
    pub async fn add_user(&self, user: TestUser) -> TestUser {
        self.directory.insert_user(user.to_user()).await;
        user
    }
}
