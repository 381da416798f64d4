// libs/appointment-cell/src/store/memory.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use super::{mint_appointment_id, AppointmentStore, StoreError};
use crate::models::{Appointment, AppointmentChanges, NewAppointment};

/// Process-local store. Each patient's collection is a `Vec`, so listing keeps insertion order.
#[derive(Default)]
pub struct InMemoryAppointmentStore {
    collections: RwLock<HashMap<String, Vec<Appointment>>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn create(&self, patient_id: &str, record: &NewAppointment) -> Result<String, StoreError> {
        let id = mint_appointment_id();
        let appointment = Appointment::from_new(id.clone(), patient_id, record, Utc::now());

        let mut collections = self.collections.write().await;
        collections
            .entry(patient_id.to_string())
            .or_default()
            .push(appointment);

        debug!("Stored appointment {} for patient {}", id, patient_id);
        Ok(id)
    }

    async fn list_all(&self, patient_id: &str) -> Result<Vec<Appointment>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections.get(patient_id).cloned().unwrap_or_default())
    }

    async fn get(&self, patient_id: &str, id: &str) -> Result<Appointment, StoreError> {
        let collections = self.collections.read().await;
        collections
            .get(patient_id)
            .and_then(|appointments| appointments.iter().find(|a| a.id == id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update(
        &self,
        patient_id: &str,
        id: &str,
        changes: &AppointmentChanges,
    ) -> Result<Appointment, StoreError> {
        let mut collections = self.collections.write().await;
        let appointment = collections
            .get_mut(patient_id)
            .and_then(|appointments| appointments.iter_mut().find(|a| a.id == id))
            .ok_or(StoreError::NotFound)?;

        changes.apply_to(appointment, Utc::now());
        Ok(appointment.clone())
    }

    async fn delete(&self, patient_id: &str, id: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let appointments = collections.get_mut(patient_id).ok_or(StoreError::NotFound)?;

        let position = appointments
            .iter()
            .position(|a| a.id == id)
            .ok_or(StoreError::NotFound)?;
        appointments.remove(position);

        if appointments.is_empty() {
            collections.remove(patient_id);
        }

        debug!("Removed appointment {} for patient {}", id, patient_id);
        Ok(())
    }
}
