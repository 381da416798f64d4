// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_models::error::AppError;
use shared_utils::extractor::CurrentIdentity;

use crate::models::{
    Appointment, AppointmentError, BookAppointmentRequest, BookSelectedHospitalRequest,
    UpdateAppointmentRequest,
};
use crate::services::scheduling::SchedulingService;

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::Unauthorized => AppError::Auth("Unauthorized".to_string()),
            AppointmentError::Validation { field, message } => {
                AppError::ValidationError { field, message }
            }
            AppointmentError::Conflict { .. } => AppError::Conflict(err.to_string()),
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            AppointmentError::Storage(msg) => AppError::Database(msg),
        }
    }
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(service): State<Arc<SchedulingService>>,
    identity: CurrentIdentity,
    payload: Result<Json<BookAppointmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    // Auth is answered before the body is looked at.
    SchedulingService::authorize(identity.identity())?;
    let request = json_body(payload)?;

    let appointment = service.book_appointment(identity.identity(), request).await?;

    Ok((StatusCode::CREATED, Json(appointment)))
}

#[axum::debug_handler]
pub async fn book_selected_hospital(
    State(service): State<Arc<SchedulingService>>,
    identity: CurrentIdentity,
    payload: Result<Json<BookSelectedHospitalRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    SchedulingService::authorize(identity.identity())?;
    let request = json_body(payload)?;

    let appointment = service
        .book_appointment(identity.identity(), request.into())
        .await?;

    Ok((StatusCode::CREATED, Json(json!({ "appointment": appointment }))))
}

// ==============================================================================
// LISTING AND LOOKUP
// ==============================================================================

#[axum::debug_handler]
pub async fn list_my_appointments(
    State(service): State<Arc<SchedulingService>>,
    identity: CurrentIdentity,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let appointments = service.list_appointments(identity.identity()).await?;
    Ok(Json(appointments))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(service): State<Arc<SchedulingService>>,
    identity: CurrentIdentity,
    Path(appointment_id): Path<String>,
) -> Result<Json<Appointment>, AppError> {
    let appointment = service
        .get_appointment(identity.identity(), &appointment_id)
        .await?;
    Ok(Json(appointment))
}

// ==============================================================================
// EDIT AND CANCEL
// ==============================================================================

#[axum::debug_handler]
pub async fn edit_appointment(
    State(service): State<Arc<SchedulingService>>,
    identity: CurrentIdentity,
    Path(appointment_id): Path<String>,
    payload: Result<Json<UpdateAppointmentRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    SchedulingService::authorize(identity.identity())?;
    let request = json_body(payload)?;

    service
        .edit_appointment(identity.identity(), &appointment_id, request)
        .await?;

    Ok(Json(json!({ "success": true })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(service): State<Arc<SchedulingService>>,
    identity: CurrentIdentity,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    service
        .cancel_appointment(identity.identity(), &appointment_id)
        .await?;

    Ok(Json(json!({ "success": true })))
}
