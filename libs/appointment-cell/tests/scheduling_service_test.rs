mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::Weekday;

use appointment_cell::{
    AppointmentError, AppointmentStatus, Ledger, SchedulingService, StatusChangeRequest,
    UpdateAppointmentRequest,
};
use doctor_cell::{AvailabilityWindow, Directory, Doctor, InMemoryDirectory, Specialty};
use shared_config::SchedulingSettings;
use shared_database::DatabaseError;
use shared_models::auth::{User, UserRole};
use shared_models::ids::{AppointmentId, DoctorId, SpecialtyId, UserId};
use shared_utils::test_utils::TestUser;

use common::{fixture, monday, request, t};

#[tokio::test]
async fn create_returns_hydrated_pending_booking() {
    let fx = fixture().await;

    let details = fx
        .service
        .create(request(fx.doctor.id, monday(), t(9, 0), t(9, 30)), fx.patient.id)
        .await
        .unwrap();

    let appointment = &details.appointment;
    assert_eq!(appointment.status, AppointmentStatus::Pending);
    assert_eq!(appointment.patient_id, fx.patient.id);
    assert_eq!(appointment.consultation_fee, 150.0);
    assert_eq!(details.patient.as_ref().map(|u| u.id), Some(fx.patient.id));
    assert_eq!(details.doctor.as_ref().map(|d| d.id), Some(fx.doctor.id));
    assert_eq!(details.doctor_user.as_ref().map(|u| u.id), Some(fx.doctor_user.id));
    assert_eq!(details.specialty.as_ref().map(|s| s.name.as_str()), Some("Cardiology"));
}

#[tokio::test]
async fn overlapping_booking_is_rejected_in_either_order() {
    let fx = fixture().await;
    let other = fx.add_user(TestUser::patient("other@example.com")).await;

    fx.service
        .create(request(fx.doctor.id, monday(), t(10, 0), t(10, 30)), fx.patient.id)
        .await
        .unwrap();

    // Starts before, ends inside.
    assert_matches!(
        fx.service
            .create(request(fx.doctor.id, monday(), t(9, 45), t(10, 15)), other.id)
            .await,
        Err(AppointmentError::SlotUnavailable(_))
    );
    // Starts inside, ends after.
    assert_matches!(
        fx.service
            .create(request(fx.doctor.id, monday(), t(10, 15), t(10, 45)), other.id)
            .await,
        Err(AppointmentError::SlotUnavailable(_))
    );
    // Touching at the boundary is fine.
    assert!(fx
        .service
        .create(request(fx.doctor.id, monday(), t(10, 30), t(11, 0)), other.id)
        .await
        .is_ok());
}

#[tokio::test]
async fn approved_booking_still_blocks_and_cancelled_frees() {
    let fx = fixture().await;
    let first = fx
        .service
        .create(request(fx.doctor.id, monday(), t(9, 0), t(9, 30)), fx.patient.id)
        .await
        .unwrap()
        .appointment;

    fx.service
        .change_status(first.id, StatusChangeRequest::to(AppointmentStatus::Approved), Some(fx.doctor_user.id))
        .await
        .unwrap();
    assert_matches!(
        fx.service
            .create(request(fx.doctor.id, monday(), t(9, 0), t(9, 30)), fx.patient.id)
            .await,
        Err(AppointmentError::SlotUnavailable(_))
    );

    fx.service.cancel(first.id, "Travel", None).await.unwrap();
    assert!(fx
        .service
        .create(request(fx.doctor.id, monday(), t(9, 0), t(9, 30)), fx.patient.id)
        .await
        .is_ok());
}

#[tokio::test]
async fn booking_outside_open_hours_is_unavailable() {
    let fx = fixture().await;

    // Partially outside the 09:00-12:00 window, no other bookings exist.
    assert_matches!(
        fx.service
            .create(request(fx.doctor.id, monday(), t(11, 30), t(12, 30)), fx.patient.id)
            .await,
        Err(AppointmentError::SlotUnavailable(_))
    );
    // Right hours, wrong weekday.
    let tuesday = monday().succ_opt().unwrap();
    assert_matches!(
        fx.service
            .create(request(fx.doctor.id, tuesday, t(9, 0), t(9, 30)), fx.patient.id)
            .await,
        Err(AppointmentError::SlotUnavailable(_))
    );
    assert!(fx.ledger.is_empty().await);
}

#[tokio::test]
async fn unapproved_or_inactive_doctor_is_not_eligible() {
    let fx = fixture().await;

    let mut pending_doctor = Doctor::new(UserId::new(), fx.doctor.specialty_id, "MD-2", 80.0);
    pending_doctor.availability = vec![AvailabilityWindow::open(Weekday::Mon, t(9, 0), t(12, 0))];
    fx.directory.insert_doctor(pending_doctor.clone()).await;

    assert_matches!(
        fx.service
            .create(request(pending_doctor.id, monday(), t(9, 0), t(9, 30)), fx.patient.id)
            .await,
        Err(AppointmentError::DoctorNotEligible)
    );

    fx.service.doctors().deactivate_doctor(fx.doctor.id).await.unwrap();
    assert_matches!(
        fx.service
            .create(request(fx.doctor.id, monday(), t(9, 0), t(9, 30)), fx.patient.id)
            .await,
        Err(AppointmentError::DoctorNotEligible)
    );
}

#[tokio::test]
async fn unknown_doctor_and_inverted_window_are_rejected() {
    let fx = fixture().await;

    assert_matches!(
        fx.service
            .create(request(DoctorId::new(), monday(), t(9, 0), t(9, 30)), fx.patient.id)
            .await,
        Err(AppointmentError::NotFound(_))
    );
    assert_matches!(
        fx.service
            .create(request(fx.doctor.id, monday(), t(9, 30), t(9, 0)), fx.patient.id)
            .await,
        Err(AppointmentError::ValidationError(_))
    );
}

#[tokio::test]
async fn fee_is_snapshotted_at_booking_time() {
    let fx = fixture().await;
    let booked = fx
        .service
        .create(request(fx.doctor.id, monday(), t(9, 0), t(9, 30)), fx.patient.id)
        .await
        .unwrap()
        .appointment;

    fx.service.doctors().update_consultation_fee(fx.doctor.id, 300.0).await.unwrap();

    let reread = fx.service.get(booked.id).await.unwrap();
    assert_eq!(reread.appointment.consultation_fee, 150.0);
    assert_eq!(reread.doctor.map(|d| d.consultation_fee), Some(300.0));
}

#[tokio::test]
async fn edits_are_locked_once_not_pending() {
    let fx = fixture().await;
    let booked = fx
        .service
        .create(request(fx.doctor.id, monday(), t(9, 0), t(9, 30)), fx.patient.id)
        .await
        .unwrap()
        .appointment;

    fx.service
        .change_status(booked.id, StatusChangeRequest::to(AppointmentStatus::Approved), Some(fx.admin.id))
        .await
        .unwrap();

    let edit = UpdateAppointmentRequest {
        notes: Some("bring results".to_string()),
        ..Default::default()
    };
    assert_matches!(
        fx.service.update(booked.id, edit).await,
        Err(AppointmentError::InvalidState(_))
    );
}

#[tokio::test]
async fn pending_edit_applies_only_supplied_fields() {
    let fx = fixture().await;
    let booked = fx
        .service
        .create(request(fx.doctor.id, monday(), t(9, 0), t(9, 30)), fx.patient.id)
        .await
        .unwrap()
        .appointment;

    let edit = UpdateAppointmentRequest {
        notes: Some("fasting".to_string()),
        ..Default::default()
    };
    let updated = fx.service.update(booked.id, edit).await.unwrap().appointment;

    assert_eq!(updated.notes.as_deref(), Some("fasting"));
    assert_eq!(updated.reason_for_visit.as_deref(), Some("Checkup"));
    assert_eq!(updated.window, booked.window);
    assert!(updated.updated_at >= booked.updated_at);
    assert_eq!(updated.version, booked.version + 1);
}

#[tokio::test]
async fn rescheduling_revalidates_the_new_window() {
    let fx = fixture().await;
    let booked = fx
        .service
        .create(request(fx.doctor.id, monday(), t(9, 0), t(9, 30)), fx.patient.id)
        .await
        .unwrap()
        .appointment;
    fx.service
        .create(request(fx.doctor.id, monday(), t(10, 0), t(10, 30)), fx.patient.id)
        .await
        .unwrap();

    // Shifting within its own slot does not conflict with itself.
    let shift = UpdateAppointmentRequest {
        end_time: Some(t(9, 45)),
        ..Default::default()
    };
    let shifted = fx.service.update(booked.id, shift).await.unwrap().appointment;
    assert_eq!(shifted.window.end, t(9, 45));

    let onto_other = UpdateAppointmentRequest {
        start_time: Some(t(10, 0)),
        end_time: Some(t(10, 30)),
        ..Default::default()
    };
    assert_matches!(
        fx.service.update(booked.id, onto_other).await,
        Err(AppointmentError::SlotUnavailable(_))
    );

    let after_hours = UpdateAppointmentRequest {
        start_time: Some(t(13, 0)),
        end_time: Some(t(13, 30)),
        ..Default::default()
    };
    assert_matches!(
        fx.service.update(booked.id, after_hours).await,
        Err(AppointmentError::SlotUnavailable(_))
    );

    let inverted = UpdateAppointmentRequest {
        start_time: Some(t(11, 0)),
        ..Default::default()
    };
    assert_matches!(
        fx.service.update(booked.id, inverted).await,
        Err(AppointmentError::ValidationError(_))
    );
}

#[tokio::test]
async fn status_changes_follow_the_table() {
    let fx = fixture().await;
    let booked = fx
        .service
        .create(request(fx.doctor.id, monday(), t(9, 0), t(9, 30)), fx.patient.id)
        .await
        .unwrap()
        .appointment;

    assert_matches!(
        fx.service
            .change_status(booked.id, StatusChangeRequest::to(AppointmentStatus::Completed), None)
            .await,
        Err(AppointmentError::InvalidState(_))
    );

    let approved = fx
        .service
        .change_status(booked.id, StatusChangeRequest::to(AppointmentStatus::Approved), Some(fx.doctor_user.id))
        .await
        .unwrap()
        .appointment;
    assert_eq!(approved.approved_by, Some(fx.doctor_user.id));
    assert!(approved.approved_at.is_some());

    let completed = fx
        .service
        .change_status(booked.id, StatusChangeRequest::to(AppointmentStatus::Completed), None)
        .await
        .unwrap()
        .appointment;
    assert_eq!(completed.status, AppointmentStatus::Completed);

    assert_matches!(
        fx.service
            .change_status(booked.id, StatusChangeRequest::to(AppointmentStatus::Cancelled), None)
            .await,
        Err(AppointmentError::InvalidState(_))
    );
}

#[tokio::test]
async fn rejection_records_notes() {
    let fx = fixture().await;
    let booked = fx
        .service
        .create(request(fx.doctor.id, monday(), t(9, 0), t(9, 30)), fx.patient.id)
        .await
        .unwrap()
        .appointment;

    let rejected = fx
        .service
        .change_status(
            booked.id,
            StatusChangeRequest::to(AppointmentStatus::Rejected).with_notes("Please see a specialist"),
            Some(fx.doctor_user.id),
        )
        .await
        .unwrap()
        .appointment;

    assert_eq!(rejected.status, AppointmentStatus::Rejected);
    assert_eq!(rejected.notes.as_deref(), Some("Please see a specialist"));
}

#[tokio::test]
async fn patient_cannot_cancel_someone_elses_booking() {
    let fx = fixture().await;
    let intruder = fx.add_user(TestUser::patient("intruder@example.com")).await;
    let booked = fx
        .service
        .create(request(fx.doctor.id, monday(), t(9, 0), t(9, 30)), fx.patient.id)
        .await
        .unwrap()
        .appointment;

    assert_matches!(
        fx.service.cancel(booked.id, "not mine", Some(intruder.id)).await,
        Err(AppointmentError::Unauthorized(_))
    );

    let cancelled = fx.service.cancel(booked.id, "Feeling better", Some(fx.patient.id)).await.unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert!(cancelled.cancelled_at.is_some());
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("Feeling better"));

    let stored = fx.ledger.find_appointment(booked.id).await.unwrap().unwrap();
    assert_eq!(stored.status, AppointmentStatus::Cancelled);
}

#[tokio::test]
async fn owning_doctor_and_admin_may_cancel() {
    let fx = fixture().await;
    let first = fx
        .service
        .create(request(fx.doctor.id, monday(), t(9, 0), t(9, 30)), fx.patient.id)
        .await
        .unwrap()
        .appointment;
    let second = fx
        .service
        .create(request(fx.doctor.id, monday(), t(9, 30), t(10, 0)), fx.patient.id)
        .await
        .unwrap()
        .appointment;

    fx.service.cancel(first.id, "Clinic closed", Some(fx.doctor_user.id)).await.unwrap();
    fx.service.cancel(second.id, "Duplicate", Some(fx.admin.id)).await.unwrap();
}

#[tokio::test]
async fn other_doctor_cannot_cancel() {
    let fx = fixture().await;
    let other_doc_user = fx.add_user(TestUser::doctor("other-doc@example.com")).await;
    let other_doctor = Doctor::new(other_doc_user.id, fx.doctor.specialty_id, "MD-9", 90.0);
    fx.directory.insert_doctor(other_doctor).await;

    let booked = fx
        .service
        .create(request(fx.doctor.id, monday(), t(9, 0), t(9, 30)), fx.patient.id)
        .await
        .unwrap()
        .appointment;

    assert_matches!(
        fx.service.cancel(booked.id, "not my patient", Some(other_doc_user.id)).await,
        Err(AppointmentError::Unauthorized(_))
    );
}

#[tokio::test]
async fn cancel_by_unknown_user_or_missing_booking_is_not_found() {
    let fx = fixture().await;
    let booked = fx
        .service
        .create(request(fx.doctor.id, monday(), t(9, 0), t(9, 30)), fx.patient.id)
        .await
        .unwrap()
        .appointment;

    assert_matches!(
        fx.service.cancel(booked.id, "?", Some(UserId::new())).await,
        Err(AppointmentError::NotFound(_))
    );
    assert_matches!(
        fx.service.cancel(AppointmentId::new(), "?", None).await,
        Err(AppointmentError::NotFound(_))
    );
}

#[tokio::test]
async fn list_for_actor_scopes_by_role() {
    let fx = fixture().await;
    let other = fx.add_user(TestUser::patient("other@example.com")).await;

    fx.service
        .create(request(fx.doctor.id, monday(), t(9, 0), t(9, 30)), fx.patient.id)
        .await
        .unwrap();
    fx.service
        .create(request(fx.doctor.id, monday(), t(9, 30), t(10, 0)), other.id)
        .await
        .unwrap();

    let mine = fx.service.list_for_actor(fx.patient.id, UserRole::Patient).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].appointment.patient_id, fx.patient.id);

    let doctors = fx.service.list_for_actor(fx.doctor_user.id, UserRole::Doctor).await.unwrap();
    assert_eq!(doctors.len(), 2);

    let all = fx.service.list_for_actor(fx.admin.id, UserRole::Admin).await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all[0].appointment.created_at >= all[1].appointment.created_at);

    let orphan = fx.add_user(TestUser::doctor("no-profile@example.com")).await;
    assert!(fx.service.list_for_actor(orphan.id, UserRole::Doctor).await.unwrap().is_empty());
}

#[tokio::test]
async fn ledger_outage_is_a_persistence_failure() {
    let fx = fixture().await;
    fx.ledger.set_unavailable(true);

    assert_matches!(
        fx.service
            .create(request(fx.doctor.id, monday(), t(9, 0), t(9, 30)), fx.patient.id)
            .await,
        Err(AppointmentError::PersistenceFailure(_))
    );
}

#[tokio::test]
async fn availability_and_doctor_approval_pass_through() {
    let fx = fixture().await;
    let mut fresh = Doctor::new(UserId::new(), fx.doctor.specialty_id, "MD-5", 50.0);
    fresh.availability = Vec::new();
    fx.directory.insert_doctor(fresh.clone()).await;

    fx.service
        .set_availability(fresh.id, vec![AvailabilityWindow::open(Weekday::Mon, t(14, 0), t(16, 0))])
        .await
        .unwrap();
    let approved = fx.service.approve_doctor(fresh.id).await.unwrap();
    assert!(approved.is_bookable());

    let booked = fx
        .service
        .create(request(fresh.id, monday(), t(14, 0), t(14, 30)), fx.patient.id)
        .await
        .unwrap();
    assert_eq!(booked.appointment.consultation_fee, 50.0);

    assert_matches!(
        fx.service
            .set_availability(fresh.id, vec![AvailabilityWindow::open(Weekday::Mon, t(16, 0), t(14, 0))])
            .await,
        Err(AppointmentError::ValidationError(_))
    );
    assert_matches!(
        fx.service.approve_doctor(DoctorId::new()).await,
        Err(AppointmentError::NotFound(_))
    );

    let stored = fx.directory.find_doctor(fresh.id).await.unwrap().unwrap();
    assert_eq!(stored.availability.len(), 1);
}

/// Directory whose specialty lookups can be switched off.
struct SpecialtyOutage {
    inner: Arc<InMemoryDirectory>,
    down: AtomicBool,
}

#[async_trait]
impl Directory for SpecialtyOutage {
    async fn find_doctor(&self, id: DoctorId) -> Result<Option<Doctor>, DatabaseError> {
        self.inner.find_doctor(id).await
    }

    async fn find_doctor_by_user(&self, user_id: UserId) -> Result<Option<Doctor>, DatabaseError> {
        self.inner.find_doctor_by_user(user_id).await
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, DatabaseError> {
        self.inner.find_user(id).await
    }

    async fn find_specialty(&self, id: SpecialtyId) -> Result<Option<Specialty>, DatabaseError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(DatabaseError::Unavailable("specialties offline".to_string()));
        }
        self.inner.find_specialty(id).await
    }

    async fn set_doctor_availability(
        &self,
        id: DoctorId,
        windows: Vec<AvailabilityWindow>,
    ) -> Result<bool, DatabaseError> {
        self.inner.set_doctor_availability(id, windows).await
    }

    async fn update_doctor(&self, doctor: &Doctor) -> Result<bool, DatabaseError> {
        self.inner.update_doctor(doctor).await
    }
}

#[tokio::test]
async fn failed_create_leaves_no_booking_behind() {
    let fx = fixture().await;
    let directory = Arc::new(SpecialtyOutage {
        inner: fx.directory.clone(),
        down: AtomicBool::new(true),
    });
    let service = SchedulingService::new(directory.clone(), fx.ledger.clone(), SchedulingSettings::default()).unwrap();
    let slot = request(fx.doctor.id, monday(), t(9, 0), t(9, 30));

    assert_matches!(
        service.create(slot.clone(), fx.patient.id).await,
        Err(AppointmentError::PersistenceFailure(_))
    );
    assert!(fx.ledger.is_empty().await);

    directory.down.store(false, Ordering::SeqCst);
    let details = service.create(slot, fx.patient.id).await.unwrap();

    assert_eq!(details.appointment.status, AppointmentStatus::Pending);
    assert_eq!(details.specialty.map(|s| s.name), Some("Cardiology".to_string()));
    assert_eq!(fx.ledger.len().await, 1);
}
