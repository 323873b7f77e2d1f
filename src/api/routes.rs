use actix_web::web;

use super::handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health))
        .route("/patient/{patient_id}/status", web::post().to(handlers::update_patient_status))
        .route("/simulation/patients", web::get().to(handlers::active_patients))
        .route("/automation/groups/analyzed", web::get().to(handlers::analyzed_groups));
}
