use std::fmt;
use serde::{Serialize, Deserialize};

/// Externally assigned patient identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(String);

impl PatientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parses a FHIR-style reference such as `Patient/abc`, or a bare id.
    pub fn from_reference(reference: &str) -> Self {
        let id = reference.strip_prefix("Patient/").unwrap_or(reference);
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// FHIR reference form, e.g. `Patient/abc`.
    pub fn reference(&self) -> String {
        format!("Patient/{}", self.0)
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PatientId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PatientId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Coarse severity tier selecting the simulated value ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClinicalState {
    #[default]
    Stable,
    Critical,
}

impl fmt::Display for ClinicalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClinicalState::Stable => f.write_str("stable"),
            ClinicalState::Critical => f.write_str("critical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientState {
    pub patient_id: PatientId,
    pub clinical_state: ClinicalState,
}
