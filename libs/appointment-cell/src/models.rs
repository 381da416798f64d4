// libs/appointment-cell/src/models.rs
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// A booked slot in a patient's collection. `id` and `patient_id` never change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<Age>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub hospital: String,
    pub appointment_date_time: NaiveDateTime,
    /// Absent on records written before timestamps were kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Appointment {
    pub fn from_new(id: String, patient_id: &str, record: &NewAppointment, now: DateTime<Utc>) -> Self {
        Self {
            id,
            patient_id: patient_id.to_string(),
            name: record.name.clone(),
            age: record.age.clone(),
            email: record.email.clone(),
            hospital: record.hospital.clone(),
            appointment_date_time: record.appointment_date_time,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}

/// Age exactly as the caller sent it; forms send either a number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Age {
    Number(serde_json::Number),
    Text(String),
}

/// Booking details that passed validation, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub name: String,
    pub age: Option<Age>,
    pub email: Option<String>,
    pub hospital: String,
    pub appointment_date_time: NaiveDateTime,
}

/// Validated partial update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<Age>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hospital: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_date_time: Option<NaiveDateTime>,
}

impl AppointmentChanges {
    pub fn apply_to(&self, appointment: &mut Appointment, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            appointment.name = name.clone();
        }
        if let Some(age) = &self.age {
            appointment.age = Some(age.clone());
        }
        if let Some(email) = &self.email {
            appointment.email = Some(email.clone());
        }
        if let Some(hospital) = &self.hospital {
            appointment.hospital = hospital.clone();
        }
        if let Some(date_time) = self.appointment_date_time {
            appointment.appointment_date_time = date_time;
        }
        appointment.updated_at = Some(now);
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    pub name: Option<String>,
    pub age: Option<Age>,
    pub email: Option<String>,
    pub hospital: Option<String>,
    pub appointment_date_time: Option<String>,
    pub appointment_date: Option<String>,
    pub appointment_time: Option<String>,
}

impl BookAppointmentRequest {
    pub fn validate(self) -> Result<NewAppointment, AppointmentError> {
        let name = required_text(self.name, "name")?;
        let hospital = required_text(self.hospital, "hospital")?;
        let appointment_date_time = resolve_date_time(
            self.appointment_date_time.as_deref(),
            self.appointment_date.as_deref(),
            self.appointment_time.as_deref(),
        )?
        .ok_or_else(|| AppointmentError::validation("appointmentDateTime", "is required"))?;

        Ok(NewAppointment {
            name,
            age: self.age,
            email: optional_text(self.email),
            hospital,
            appointment_date_time,
        })
    }
}

/// Body of `book-selected`: the hospital arrives as `selectedHospital` after a recommendation step.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSelectedHospitalRequest {
    pub name: Option<String>,
    pub age: Option<Age>,
    pub email: Option<String>,
    pub selected_hospital: Option<String>,
    pub appointment_date_time: Option<String>,
    pub appointment_date: Option<String>,
    pub appointment_time: Option<String>,
}

impl From<BookSelectedHospitalRequest> for BookAppointmentRequest {
    fn from(request: BookSelectedHospitalRequest) -> Self {
        Self {
            name: request.name,
            age: request.age,
            email: request.email,
            hospital: request.selected_hospital,
            appointment_date_time: request.appointment_date_time,
            appointment_date: request.appointment_date,
            appointment_time: request.appointment_time,
        }
    }
}

// Unknown keys such as `id` or `patientId` are ignored, so those fields cannot be edited.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentRequest {
    pub name: Option<String>,
    pub age: Option<Age>,
    pub email: Option<String>,
    #[serde(alias = "selectedHospital")]
    pub hospital: Option<String>,
    pub appointment_date_time: Option<String>,
    pub appointment_date: Option<String>,
    pub appointment_time: Option<String>,
}

impl UpdateAppointmentRequest {
    pub fn validate(self) -> Result<AppointmentChanges, AppointmentError> {
        let name = self.name.map(|n| required_text(Some(n), "name")).transpose()?;
        let hospital = self
            .hospital
            .map(|h| required_text(Some(h), "hospital"))
            .transpose()?;
        let appointment_date_time = resolve_date_time(
            self.appointment_date_time.as_deref(),
            self.appointment_date.as_deref(),
            self.appointment_time.as_deref(),
        )?;

        Ok(AppointmentChanges {
            name,
            age: self.age,
            email: optional_text(self.email),
            hospital,
            appointment_date_time,
        })
    }
}

fn required_text(value: Option<String>, field: &str) -> Result<String, AppointmentError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        Some(_) => Err(AppointmentError::validation(field, "must not be blank")),
        None => Err(AppointmentError::validation(field, "is required")),
    }
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ==============================================================================
// DATE-TIME PARSING
// ==============================================================================

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parses a slot start. Offsets are dropped and the wall-clock time is kept as written.
pub fn parse_appointment_date_time(input: &str) -> Result<NaiveDateTime, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("must not be blank".to_string());
    }

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(with_offset.naive_local());
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| format!("'{}' is not a recognised date-time (expected YYYY-MM-DD HH:MM)", trimmed))
}

pub(crate) fn resolve_date_time(
    date_time: Option<&str>,
    date: Option<&str>,
    time: Option<&str>,
) -> Result<Option<NaiveDateTime>, AppointmentError> {
    if let Some(date_time) = date_time {
        return parse_appointment_date_time(date_time)
            .map(Some)
            .map_err(|msg| AppointmentError::validation("appointmentDateTime", &msg));
    }

    match (date, time) {
        (Some(date), Some(time)) => {
            let combined = format!("{} {}", date.trim(), time.trim());
            parse_appointment_date_time(&combined)
                .map(Some)
                .map_err(|msg| AppointmentError::validation("appointmentDate", &msg))
        }
        (Some(_), None) => Err(AppointmentError::validation(
            "appointmentTime",
            "is required when appointmentDate is given",
        )),
        (None, Some(_)) => Err(AppointmentError::validation(
            "appointmentDate",
            "is required when appointmentTime is given",
        )),
        (None, None) => Ok(None),
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Scheduling conflict detected. Please choose another time slot.")]
    Conflict { conflicting_id: String },

    #[error("Appointment not found")]
    NotFound,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl AppointmentError {
    pub fn validation(field: &str, message: &str) -> Self {
        AppointmentError::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}
