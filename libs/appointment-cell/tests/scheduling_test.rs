use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use appointment_cell::models::{
    Appointment, AppointmentChanges, AppointmentError, BookAppointmentRequest, NewAppointment,
    UpdateAppointmentRequest,
};
use appointment_cell::store::{AppointmentStore, InMemoryAppointmentStore, StoreError};
use appointment_cell::{SchedulingPolicy, SchedulingService};
use shared_models::auth::PatientIdentity;

// ==============================================================================
// TEST STORES
// ==============================================================================

/// In-memory store that counts mutating calls.
#[derive(Default)]
struct RecordingStore {
    inner: InMemoryAppointmentStore,
    writes: AtomicUsize,
}

impl RecordingStore {
    fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AppointmentStore for RecordingStore {
    async fn create(&self, patient_id: &str, record: &NewAppointment) -> Result<String, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.create(patient_id, record).await
    }

    async fn list_all(&self, patient_id: &str) -> Result<Vec<Appointment>, StoreError> {
        self.inner.list_all(patient_id).await
    }

    async fn get(&self, patient_id: &str, id: &str) -> Result<Appointment, StoreError> {
        self.inner.get(patient_id, id).await
    }

    async fn update(
        &self,
        patient_id: &str,
        id: &str,
        changes: &AppointmentChanges,
    ) -> Result<Appointment, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update(patient_id, id, changes).await
    }

    async fn delete(&self, patient_id: &str, id: &str) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(patient_id, id).await
    }
}

/// Store whose backend is down.
struct UnavailableStore;

#[async_trait]
impl AppointmentStore for UnavailableStore {
    async fn create(&self, _: &str, _: &NewAppointment) -> Result<String, StoreError> {
        Err(StoreError::Storage("connection refused".into()))
    }

    async fn list_all(&self, _: &str) -> Result<Vec<Appointment>, StoreError> {
        Err(StoreError::Storage("connection refused".into()))
    }

    async fn get(&self, _: &str, _: &str) -> Result<Appointment, StoreError> {
        Err(StoreError::Storage("connection refused".into()))
    }

    async fn update(&self, _: &str, _: &str, _: &AppointmentChanges) -> Result<Appointment, StoreError> {
        Err(StoreError::Storage("connection refused".into()))
    }

    async fn delete(&self, _: &str, _: &str) -> Result<(), StoreError> {
        Err(StoreError::Storage("connection refused".into()))
    }
}

// ==============================================================================
// HELPERS
// ==============================================================================

fn setup() -> (Arc<RecordingStore>, SchedulingService) {
    let store = Arc::new(RecordingStore::default());
    let service = SchedulingService::new(store.clone());
    (store, service)
}

fn patient(id: &str) -> PatientIdentity {
    PatientIdentity::new(id)
}

fn booking(date_time: &str) -> BookAppointmentRequest {
    BookAppointmentRequest {
        name: Some("Ada Lovelace".into()),
        email: Some("ada@example.com".into()),
        hospital: Some("Hospital A".into()),
        appointment_date_time: Some(date_time.into()),
        ..Default::default()
    }
}

fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

// ==============================================================================
// BOOKING
// ==============================================================================

#[tokio::test]
async fn test_booking_into_empty_collection_succeeds() {
    let (store, service) = setup();
    let p1 = patient("p1");

    let appointment = service
        .book_appointment(Some(&p1), booking("2024-06-01 10:00"))
        .await
        .unwrap();

    assert_eq!(appointment.patient_id, "p1");
    assert_eq!(appointment.name, "Ada Lovelace");
    assert_eq!(appointment.hospital, "Hospital A");
    assert_eq!(appointment.appointment_date_time, at(1, 10, 0));
    assert!(!appointment.id.is_empty());
    assert_eq!(store.list_all("p1").await.unwrap(), vec![appointment]);
}

#[tokio::test]
async fn test_conflict_window_scenario() {
    let (store, service) = setup();
    let p1 = patient("p1");

    service
        .book_appointment(Some(&p1), booking("2024-06-01 10:00"))
        .await
        .unwrap();

    // 30 minute gap on the same day
    let half_hour = service
        .book_appointment(Some(&p1), booking("2024-06-01 10:30"))
        .await;
    assert_matches!(half_hour, Err(AppointmentError::Conflict { .. }));

    // exactly 60 minutes
    let hour_later = service
        .book_appointment(Some(&p1), booking("2024-06-01 11:00"))
        .await;
    assert!(hour_later.is_ok());

    // next day, 15 minutes later on the clock
    let next_day = service
        .book_appointment(Some(&p1), booking("2024-06-02 10:15"))
        .await;
    assert!(next_day.is_ok());

    assert_eq!(store.list_all("p1").await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_conflict_names_existing_appointment() {
    let (_, service) = setup();
    let p1 = patient("p1");

    let first = service
        .book_appointment(Some(&p1), booking("2024-06-01 10:00"))
        .await
        .unwrap();

    let err = service
        .book_appointment(Some(&p1), booking("2024-06-01 09:15"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        AppointmentError::Conflict {
            conflicting_id: first.id
        }
    );
}

#[tokio::test]
async fn test_conflicting_booking_never_writes() {
    let (store, service) = setup();
    let p1 = patient("p1");

    service
        .book_appointment(Some(&p1), booking("2024-06-01 10:00"))
        .await
        .unwrap();
    let before = store.list_all("p1").await.unwrap();
    let writes_before = store.writes();

    let result = service
        .book_appointment(Some(&p1), booking("2024-06-01 10:45"))
        .await;

    assert_matches!(result, Err(AppointmentError::Conflict { .. }));
    assert_eq!(store.writes(), writes_before);
    assert_eq!(store.list_all("p1").await.unwrap(), before);
}

#[tokio::test]
async fn test_midnight_boundary_is_not_a_conflict() {
    let (_, service) = setup();
    let p1 = patient("p1");

    service
        .book_appointment(Some(&p1), booking("2024-06-01 23:59"))
        .await
        .unwrap();
    let after_midnight = service
        .book_appointment(Some(&p1), booking("2024-06-02 00:01"))
        .await;

    assert!(after_midnight.is_ok());
}

#[tokio::test]
async fn test_other_patients_do_not_conflict() {
    let (_, service) = setup();

    service
        .book_appointment(Some(&patient("p1")), booking("2024-06-01 10:00"))
        .await
        .unwrap();
    let same_slot_other_patient = service
        .book_appointment(Some(&patient("p2")), booking("2024-06-01 10:00"))
        .await;

    assert!(same_slot_other_patient.is_ok());
}

#[tokio::test]
async fn test_unauthenticated_booking_is_rejected_without_write() {
    let (store, service) = setup();

    let result = service
        .book_appointment(None, booking("2024-06-01 10:00"))
        .await;

    assert_eq!(result, Err(AppointmentError::Unauthorized));
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn test_invalid_booking_is_rejected_without_write() {
    let (store, service) = setup();
    let p1 = patient("p1");

    let mut missing_hospital = booking("2024-06-01 10:00");
    missing_hospital.hospital = None;
    assert_matches!(
        service.book_appointment(Some(&p1), missing_hospital).await,
        Err(AppointmentError::Validation { field, .. }) if field == "hospital"
    );

    assert_matches!(
        service.book_appointment(Some(&p1), booking("June 1st, 10am")).await,
        Err(AppointmentError::Validation { field, .. }) if field == "appointmentDateTime"
    );

    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn test_concurrent_bookings_for_same_slot_admit_one() {
    let store = Arc::new(InMemoryAppointmentStore::new());
    let service = Arc::new(SchedulingService::new(store.clone()));

    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .book_appointment(Some(&PatientIdentity::new("p1")), booking("2024-06-01 10:00"))
                    .await
            })
        })
        .collect();

    let mut booked = 0;
    let mut conflicts = 0;
    for attempt in attempts {
        match attempt.await.unwrap() {
            Ok(_) => booked += 1,
            Err(AppointmentError::Conflict { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(booked, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(store.list_all("p1").await.unwrap().len(), 1);
}

// ==============================================================================
// LIST, EDIT, CANCEL
// ==============================================================================

#[tokio::test]
async fn test_list_after_bookings_and_cancellations() {
    let (_, service) = setup();
    let p1 = patient("p1");

    let mut ids = Vec::new();
    for day in 1..=5 {
        let appointment = service
            .book_appointment(Some(&p1), booking(&format!("2024-06-0{} 10:00", day)))
            .await
            .unwrap();
        ids.push(appointment.id);
    }

    service.cancel_appointment(Some(&p1), &ids[1]).await.unwrap();
    service.cancel_appointment(Some(&p1), &ids[3]).await.unwrap();

    let listed: Vec<String> = service
        .list_appointments(Some(&p1))
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(listed, vec![ids[0].clone(), ids[2].clone(), ids[4].clone()]);
}

#[tokio::test]
async fn test_list_requires_identity() {
    let (_, service) = setup();
    assert_eq!(
        service.list_appointments(None).await,
        Err(AppointmentError::Unauthorized)
    );
}

#[tokio::test]
async fn test_cancel_unknown_id_leaves_store_unchanged() {
    let (store, service) = setup();
    let p1 = patient("p1");

    service
        .book_appointment(Some(&p1), booking("2024-06-01 10:00"))
        .await
        .unwrap();
    let before = store.list_all("p1").await.unwrap();

    let result = service.cancel_appointment(Some(&p1), "no-such-id").await;

    assert_eq!(result, Err(AppointmentError::NotFound));
    assert_eq!(store.list_all("p1").await.unwrap(), before);
}

#[tokio::test]
async fn test_cancelled_slot_can_be_rebooked() {
    let (_, service) = setup();
    let p1 = patient("p1");

    let first = service
        .book_appointment(Some(&p1), booking("2024-06-01 10:00"))
        .await
        .unwrap();
    service.cancel_appointment(Some(&p1), &first.id).await.unwrap();

    let rebooked = service
        .book_appointment(Some(&p1), booking("2024-06-01 10:15"))
        .await;
    assert!(rebooked.is_ok());
}

#[tokio::test]
async fn test_edit_updates_only_given_fields() {
    let (_, service) = setup();
    let p1 = patient("p1");

    let original = service
        .book_appointment(Some(&p1), booking("2024-06-01 10:00"))
        .await
        .unwrap();

    let updated = service
        .edit_appointment(
            Some(&p1),
            &original.id,
            UpdateAppointmentRequest {
                hospital: Some("Hospital B".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.id, original.id);
    assert_eq!(updated.patient_id, "p1");
    assert_eq!(updated.hospital, "Hospital B");
    assert_eq!(updated.name, original.name);
    assert_eq!(updated.appointment_date_time, original.appointment_date_time);
}

#[tokio::test]
async fn test_edit_of_other_patients_appointment_is_not_found() {
    let (store, service) = setup();

    let theirs = service
        .book_appointment(Some(&patient("p2")), booking("2024-06-01 10:00"))
        .await
        .unwrap();

    let result = service
        .edit_appointment(
            Some(&patient("p1")),
            &theirs.id,
            UpdateAppointmentRequest {
                name: Some("Mallory".into()),
                ..Default::default()
            },
        )
        .await;

    assert_eq!(result, Err(AppointmentError::NotFound));
    assert_eq!(store.get("p2", &theirs.id).await.unwrap().name, "Ada Lovelace");
}

#[tokio::test]
async fn test_edit_does_not_recheck_conflicts_by_default() {
    let (_, service) = setup();
    let p1 = patient("p1");

    service
        .book_appointment(Some(&p1), booking("2024-06-01 10:00"))
        .await
        .unwrap();
    let second = service
        .book_appointment(Some(&p1), booking("2024-06-01 14:00"))
        .await
        .unwrap();

    let moved = service
        .edit_appointment(
            Some(&p1),
            &second.id,
            UpdateAppointmentRequest {
                appointment_date_time: Some("2024-06-01 10:30".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(moved.appointment_date_time, at(1, 10, 30));
}

#[tokio::test]
async fn test_edit_recheck_policy_rejects_overlap() {
    let store = Arc::new(RecordingStore::default());
    let service = SchedulingService::with_policy(
        store.clone(),
        SchedulingPolicy {
            recheck_conflicts_on_edit: true,
        },
    );
    let p1 = patient("p1");

    let first = service
        .book_appointment(Some(&p1), booking("2024-06-01 10:00"))
        .await
        .unwrap();
    let second = service
        .book_appointment(Some(&p1), booking("2024-06-01 14:00"))
        .await
        .unwrap();

    let overlap = service
        .edit_appointment(
            Some(&p1),
            &second.id,
            UpdateAppointmentRequest {
                appointment_date_time: Some("2024-06-01 10:30".into()),
                ..Default::default()
            },
        )
        .await;
    assert_eq!(
        overlap,
        Err(AppointmentError::Conflict {
            conflicting_id: first.id.clone()
        })
    );

    // Moving an appointment within its own window is fine.
    let nudged = service
        .edit_appointment(
            Some(&p1),
            &first.id,
            UpdateAppointmentRequest {
                appointment_date_time: Some("2024-06-01 10:20".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(nudged.appointment_date_time, at(1, 10, 20));

    let missing = service
        .edit_appointment(
            Some(&p1),
            "no-such-id",
            UpdateAppointmentRequest {
                appointment_date_time: Some("2024-06-03 10:00".into()),
                ..Default::default()
            },
        )
        .await;
    assert_eq!(missing, Err(AppointmentError::NotFound));
}

#[tokio::test]
async fn test_get_is_patient_scoped() {
    let (_, service) = setup();

    let mine = service
        .book_appointment(Some(&patient("p1")), booking("2024-06-01 10:00"))
        .await
        .unwrap();

    assert_eq!(
        service.get_appointment(Some(&patient("p1")), &mine.id).await.unwrap(),
        mine
    );
    assert_eq!(
        service.get_appointment(Some(&patient("p2")), &mine.id).await,
        Err(AppointmentError::NotFound)
    );
}

// ==============================================================================
// STORAGE FAILURES
// ==============================================================================

#[tokio::test]
async fn test_storage_errors_propagate() {
    let service = SchedulingService::new(Arc::new(UnavailableStore));
    let p1 = patient("p1");

    assert_matches!(
        service.book_appointment(Some(&p1), booking("2024-06-01 10:00")).await,
        Err(AppointmentError::Storage(msg)) if msg == "connection refused"
    );
    assert_matches!(
        service.list_appointments(Some(&p1)).await,
        Err(AppointmentError::Storage(_))
    );
    assert_matches!(
        service.cancel_appointment(Some(&p1), "a1").await,
        Err(AppointmentError::Storage(_))
    );
    assert_matches!(
        service
            .edit_appointment(Some(&p1), "a1", UpdateAppointmentRequest::default())
            .await,
        Err(AppointmentError::Storage(_))
    );
}
