use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use super::AppState;
use crate::models::PatientId;

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub active: Option<bool>,
}

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// Activation toggles whether the patient receives simulated vitals.
#[instrument(skip(state, body))]
pub async fn update_patient_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<StatusUpdate>,
) -> impl Responder {
    let patient_id = PatientId::new(path.into_inner());
    let Some(active) = body.active else {
        return HttpResponse::BadRequest().json(json!({ "message": "Missing 'active' field" }));
    };

    let changed = if active {
        state.registry.activate(patient_id.clone())
    } else {
        state.registry.deactivate(&patient_id)
    };

    HttpResponse::Ok().json(json!({
        "message": "Patient status updated successfully",
        "patient_id": patient_id,
        "active": active,
        "changed": changed,
    }))
}

pub async fn active_patients(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(json!({ "patients": state.registry.entries() }))
}

pub async fn analyzed_groups(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(json!({ "groups": state.analyzed.list() }))
}
