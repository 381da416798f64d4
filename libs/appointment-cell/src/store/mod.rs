// libs/appointment-cell/src/store/mod.rs
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Appointment, AppointmentChanges, AppointmentError, NewAppointment};

pub mod memory;
pub mod realtime;

pub use memory::InMemoryAppointmentStore;
pub use realtime::RealtimeAppointmentStore;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<StoreError> for AppointmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppointmentError::NotFound,
            StoreError::Storage(msg) => AppointmentError::Storage(msg),
        }
    }
}

/// Durable appointment collections, partitioned by patient.
///
/// Every operation is scoped to `patient_id`; an id that exists under another patient is
/// `NotFound`. Reads always reflect the current persisted state.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Persists `record` under a freshly minted id and returns that id.
    async fn create(&self, patient_id: &str, record: &NewAppointment) -> Result<String, StoreError>;

    /// All live appointments for the patient, in insertion order.
    async fn list_all(&self, patient_id: &str) -> Result<Vec<Appointment>, StoreError>;

    async fn get(&self, patient_id: &str, id: &str) -> Result<Appointment, StoreError>;

    /// Merges `changes` into the stored record and returns the result.
    async fn update(
        &self,
        patient_id: &str,
        id: &str,
        changes: &AppointmentChanges,
    ) -> Result<Appointment, StoreError>;

    async fn delete(&self, patient_id: &str, id: &str) -> Result<(), StoreError>;
}

pub fn mint_appointment_id() -> String {
    Uuid::new_v4().to_string()
}
