//! Outbound path to the clinical data store.
//!
//! Simulated measurements become FHIR `Observation`s and analyzer insights
//! become FHIR `Flag`s. Delivery is best effort: callers log failures and
//! move on.

use std::time::Duration;
use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use crate::error::EmitError;
use crate::models::{Measurement, PatientId};

const VITAL_SIGNS_CATEGORY: &str = "http://terminology.hl7.org/CodeSystem/observation-category";
const LOINC_SYSTEM: &str = "http://loinc.org";
const UCUM_SYSTEM: &str = "http://unitsofmeasure.org";

/// Sink for simulated observations and clinical flags.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Emitter: Send + Sync {
    async fn emit_measurement(&self, patient_id: &PatientId, measurement: &Measurement) -> Result<(), EmitError>;

    async fn emit_flag(&self, patient_id: &PatientId, insight_text: &str) -> Result<(), EmitError>;
}

/// Posts resources to a FHIR server over HTTP.
#[derive(Debug, Clone)]
pub struct FhirEmitter {
    client: Client,
    base_url: String,
}

impl FhirEmitter {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, EmitError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post(&self, resource: &'static str, body: &Value) -> Result<(), EmitError> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, resource))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmitError::Rejected { resource, status: status.as_u16() });
        }
        Ok(())
    }
}

pub fn observation_resource(patient_id: &PatientId, measurement: &Measurement) -> Value {
    json!({
        "resourceType": "Observation",
        "status": "final",
        "category": [{
            "coding": [{ "system": VITAL_SIGNS_CATEGORY, "code": "vital-signs" }]
        }],
        "code": {
            "coding": [{ "system": LOINC_SYSTEM, "code": measurement.code }]
        },
        "subject": { "reference": patient_id.reference() },
        "effectiveDateTime": measurement.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        "valueQuantity": {
            "value": measurement.value,
            "unit": measurement.unit,
            "system": UCUM_SYSTEM,
            "code": measurement.unit
        }
    })
}

pub fn flag_resource(patient_id: &PatientId, insight_text: &str) -> Value {
    json!({
        "resourceType": "Flag",
        "status": "active",
        "category": [{ "text": "Clinical Alert" }],
        "code": { "text": insight_text },
        "subject": { "reference": patient_id.reference() }
    })
}

#[async_trait]
impl Emitter for FhirEmitter {
    #[instrument(skip(self, measurement), fields(code = measurement.code))]
    async fn emit_measurement(&self, patient_id: &PatientId, measurement: &Measurement) -> Result<(), EmitError> {
        self.post("Observation", &observation_resource(patient_id, measurement)).await
    }

    #[instrument(skip(self, insight_text))]
    async fn emit_flag(&self, patient_id: &PatientId, insight_text: &str) -> Result<(), EmitError> {
        self.post("Flag", &flag_resource(patient_id, insight_text)).await?;
        info!(%patient_id, "clinical flag created");
        Ok(())
    }
}

/// Dry-run sink that only writes to the log.
#[derive(Debug, Default, Clone)]
pub struct LogEmitter;

#[async_trait]
impl Emitter for LogEmitter {
    async fn emit_measurement(&self, patient_id: &PatientId, measurement: &Measurement) -> Result<(), EmitError> {
        debug!(
            %patient_id,
            parameter = measurement.parameter.key(),
            value = measurement.value,
            unit = measurement.unit,
            "observation"
        );
        Ok(())
    }

    async fn emit_flag(&self, patient_id: &PatientId, insight_text: &str) -> Result<(), EmitError> {
        info!(%patient_id, insight = insight_text, "clinical flag");
        Ok(())
    }
}
