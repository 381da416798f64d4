// libs/appointment-cell/src/store/realtime.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use shared_config::AppConfig;
use shared_database::realtime::RealtimeDatabaseClient;

use super::{mint_appointment_id, AppointmentStore, StoreError};
use crate::models::{resolve_date_time, Age, Appointment, AppointmentChanges, NewAppointment};

const USERS_NODE: &str = "users";
const APPOINTMENTS_NODE: &str = "appointments";

/// Store backed by the hosted realtime database, laid out as
/// `users/{patient_id}/appointments/{id}`.
pub struct RealtimeAppointmentStore {
    client: RealtimeDatabaseClient,
}

impl RealtimeAppointmentStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: RealtimeDatabaseClient::new(config),
        }
    }

    pub fn with_client(client: RealtimeDatabaseClient) -> Self {
        Self { client }
    }

    async fn fetch(&self, patient_id: &str, id: &str) -> Result<Option<Appointment>, StoreError> {
        let node: Option<Value> = self
            .client
            .get(&[USERS_NODE, patient_id, APPOINTMENTS_NODE, id])
            .await
            .map_err(storage_error)?;

        node.map(|value| decode_stored(patient_id, id, value).map_err(StoreError::Storage))
            .transpose()
    }
}

/// A child of `users/{patient_id}/appointments` as it may be found on disk. Older children carry
/// `appointmentDate` and `appointmentTime` instead of `appointmentDateTime`, an `id` of their own
/// that differs from the node key, and neither `patientId` nor timestamps.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredAppointment {
    #[serde(default)]
    name: String,
    #[serde(default)]
    age: Option<Age>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    hospital: String,
    appointment_date_time: Option<String>,
    appointment_date: Option<String>,
    appointment_time: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

/// The node key is the id every path operation addresses, and the owner comes from the path.
fn decode_stored(patient_id: &str, key: &str, value: Value) -> Result<Appointment, String> {
    let stored: StoredAppointment = serde_json::from_value(value)
        .map_err(|e| format!("Malformed appointment {}: {}", key, e))?;

    let appointment_date_time = resolve_date_time(
        stored.appointment_date_time.as_deref(),
        stored.appointment_date.as_deref(),
        stored.appointment_time.as_deref(),
    )
    .map_err(|e| format!("Malformed appointment {}: {}", key, e))?
    .ok_or_else(|| format!("Appointment {} has no date-time", key))?;

    Ok(Appointment {
        id: key.to_string(),
        patient_id: patient_id.to_string(),
        name: stored.name,
        age: stored.age,
        email: stored.email,
        hospital: stored.hospital,
        appointment_date_time,
        created_at: stored.created_at,
        updated_at: stored.updated_at,
    })
}

fn storage_error(err: anyhow::Error) -> StoreError {
    error!("Realtime appointment store failure: {}", err);
    StoreError::Storage(err.to_string())
}

#[async_trait]
impl AppointmentStore for RealtimeAppointmentStore {
    async fn create(&self, patient_id: &str, record: &NewAppointment) -> Result<String, StoreError> {
        let id = mint_appointment_id();
        let appointment = Appointment::from_new(id.clone(), patient_id, record, Utc::now());
        let body = serde_json::to_value(&appointment)
            .map_err(|e| StoreError::Storage(format!("Failed to encode appointment: {}", e)))?;

        self.client
            .put(&[USERS_NODE, patient_id, APPOINTMENTS_NODE, id.as_str()], &body)
            .await
            .map_err(storage_error)?;

        debug!("Stored appointment {} for patient {}", id, patient_id);
        Ok(id)
    }

    async fn list_all(&self, patient_id: &str) -> Result<Vec<Appointment>, StoreError> {
        let collection: Option<HashMap<String, Value>> = self
            .client
            .get(&[USERS_NODE, patient_id, APPOINTMENTS_NODE])
            .await
            .map_err(storage_error)?;

        let mut appointments: Vec<Appointment> = collection
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(key, value)| match decode_stored(patient_id, &key, value) {
                Ok(appointment) => Some(appointment),
                Err(e) => {
                    warn!("Skipping unreadable appointment for patient {}: {}", patient_id, e);
                    None
                }
            })
            .collect();

        // Keys come back unordered; creation time restores insertion order. Untimestamped
        // records go last, by key, which for pushed children is chronological.
        appointments.sort_by(|a, b| {
            a.created_at
                .is_none()
                .cmp(&b.created_at.is_none())
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(appointments)
    }

    async fn get(&self, patient_id: &str, id: &str) -> Result<Appointment, StoreError> {
        self.fetch(patient_id, id).await?.ok_or(StoreError::NotFound)
    }

    async fn update(
        &self,
        patient_id: &str,
        id: &str,
        changes: &AppointmentChanges,
    ) -> Result<Appointment, StoreError> {
        // PATCH on an absent node would create it, so existence is checked first.
        let mut appointment = self.fetch(patient_id, id).await?.ok_or(StoreError::NotFound)?;

        let now = Utc::now();
        changes.apply_to(&mut appointment, now);

        let mut patch = match serde_json::to_value(changes) {
            Ok(Value::Object(map)) => map,
            Ok(_) => serde_json::Map::new(),
            Err(e) => return Err(StoreError::Storage(format!("Failed to encode changes: {}", e))),
        };
        patch.insert(
            "updatedAt".to_string(),
            serde_json::to_value(now)
                .map_err(|e| StoreError::Storage(format!("Failed to encode timestamp: {}", e)))?,
        );

        self.client
            .patch(&[USERS_NODE, patient_id, APPOINTMENTS_NODE, id], &Value::Object(patch))
            .await
            .map_err(storage_error)?;

        Ok(appointment)
    }

    async fn delete(&self, patient_id: &str, id: &str) -> Result<(), StoreError> {
        if self.fetch(patient_id, id).await?.is_none() {
            return Err(StoreError::NotFound);
        }

        self.client
            .delete(&[USERS_NODE, patient_id, APPOINTMENTS_NODE, id])
            .await
            .map_err(storage_error)?;

        debug!("Removed appointment {} for patient {}", id, patient_id);
        Ok(())
    }
}
