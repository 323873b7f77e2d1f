//! HTTP control surface for the simulation engine.
//!
//! Lets the request layer toggle patient activation and inspect the state
//! of both background loops.

pub mod handlers;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use crate::engine::{AnalyzedGroups, PatientRegistry};

pub use routes::configure;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub registry: Arc<PatientRegistry>,
    pub analyzed: Arc<AnalyzedGroups>,
}

impl AppState {
    pub fn new(registry: Arc<PatientRegistry>, analyzed: Arc<AnalyzedGroups>) -> Self {
        Self { registry, analyzed }
    }
}
