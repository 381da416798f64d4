// libs/appointment-cell/src/services/scheduling.rs
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use shared_config::AppConfig;
use shared_models::auth::PatientIdentity;

use crate::models::{
    Appointment, AppointmentError, BookAppointmentRequest, UpdateAppointmentRequest,
};
use crate::services::conflict::{ConflictDetector, CONFLICT_WINDOW_MINUTES};
use crate::services::locks::PatientLocks;
use crate::store::{AppointmentStore, StoreError};

/// Product switches for scheduling behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulingPolicy {
    /// When set, an edit that moves `appointmentDateTime` must pass the conflict check against the
    /// patient's other appointments. Off by default: edits are applied as sent.
    pub recheck_conflicts_on_edit: bool,
}

impl SchedulingPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            recheck_conflicts_on_edit: config.recheck_conflicts_on_edit,
        }
    }
}

/// Books, lists, edits and cancels appointments for the calling patient.
///
/// Every mutation holds the patient's write lane from the conflict read through the store write,
/// so two bookings for one patient in this process cannot both pass the check.
pub struct SchedulingService {
    store: Arc<dyn AppointmentStore>,
    conflict_detector: ConflictDetector,
    locks: PatientLocks,
    policy: SchedulingPolicy,
}

impl SchedulingService {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self::with_policy(store, SchedulingPolicy::default())
    }

    pub fn with_policy(store: Arc<dyn AppointmentStore>, policy: SchedulingPolicy) -> Self {
        Self {
            store,
            conflict_detector: ConflictDetector::default(),
            locks: PatientLocks::new(),
            policy,
        }
    }

    pub fn authorize(identity: Option<&PatientIdentity>) -> Result<&PatientIdentity, AppointmentError> {
        identity.ok_or(AppointmentError::Unauthorized)
    }

    #[instrument(skip(self, identity, request))]
    pub async fn book_appointment(
        &self,
        identity: Option<&PatientIdentity>,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let identity = Self::authorize(identity)?;
        let patient_id = identity.patient_id.as_str();
        let record = request.validate()?;

        debug!("Booking {} at {} for patient {}", record.hospital, record.appointment_date_time, patient_id);

        let _lane = self.locks.acquire(patient_id).await;

        let existing = self.store.list_all(patient_id).await?;
        if let Some(conflicting) = self
            .conflict_detector
            .find_conflict(&existing, record.appointment_date_time)
        {
            warn!(
                "Conflict for patient {}: {} is within {} minutes of appointment {} at {}",
                patient_id,
                record.appointment_date_time,
                CONFLICT_WINDOW_MINUTES,
                conflicting.id,
                conflicting.appointment_date_time
            );
            return Err(AppointmentError::Conflict {
                conflicting_id: conflicting.id.clone(),
            });
        }

        let id = self.store.create(patient_id, &record).await?;
        let appointment = self.store.get(patient_id, &id).await.map_err(|e| match e {
            StoreError::NotFound => AppointmentError::Storage(format!(
                "Appointment {} was written but could not be read back",
                id
            )),
            other => other.into(),
        })?;

        info!("Booked appointment {} for patient {}", appointment.id, patient_id);
        Ok(appointment)
    }

    #[instrument(skip(self, identity))]
    pub async fn list_appointments(
        &self,
        identity: Option<&PatientIdentity>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let identity = Self::authorize(identity)?;
        let appointments = self.store.list_all(&identity.patient_id).await?;

        debug!("Found {} appointments for patient {}", appointments.len(), identity.patient_id);
        Ok(appointments)
    }

    #[instrument(skip(self, identity))]
    pub async fn get_appointment(
        &self,
        identity: Option<&PatientIdentity>,
        appointment_id: &str,
    ) -> Result<Appointment, AppointmentError> {
        let identity = Self::authorize(identity)?;
        Ok(self.store.get(&identity.patient_id, appointment_id).await?)
    }

    #[instrument(skip(self, identity, request))]
    pub async fn edit_appointment(
        &self,
        identity: Option<&PatientIdentity>,
        appointment_id: &str,
        request: UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let identity = Self::authorize(identity)?;
        let patient_id = identity.patient_id.as_str();
        let changes = request.validate()?;

        let _lane = self.locks.acquire(patient_id).await;

        if let (true, Some(new_time)) = (
            self.policy.recheck_conflicts_on_edit,
            changes.appointment_date_time,
        ) {
            let existing = self.store.list_all(patient_id).await?;
            if !existing.iter().any(|a| a.id == appointment_id) {
                return Err(AppointmentError::NotFound);
            }

            if let Some(conflicting) =
                self.conflict_detector
                    .find_conflict_excluding(&existing, new_time, appointment_id)
            {
                warn!(
                    "Edit of appointment {} to {} conflicts with appointment {}",
                    appointment_id, new_time, conflicting.id
                );
                return Err(AppointmentError::Conflict {
                    conflicting_id: conflicting.id.clone(),
                });
            }
        }

        let updated = self.store.update(patient_id, appointment_id, &changes).await?;

        info!("Edited appointment {} for patient {}", appointment_id, patient_id);
        Ok(updated)
    }

    #[instrument(skip(self, identity))]
    pub async fn cancel_appointment(
        &self,
        identity: Option<&PatientIdentity>,
        appointment_id: &str,
    ) -> Result<(), AppointmentError> {
        let identity = Self::authorize(identity)?;
        let patient_id = identity.patient_id.as_str();

        let _lane = self.locks.acquire(patient_id).await;
        self.store.delete(patient_id, appointment_id).await?;

        info!("Cancelled appointment {} for patient {}", appointment_id, patient_id);
        Ok(())
    }
}
