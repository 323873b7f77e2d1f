use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use super::patient::ClinicalState;

/// The thirteen simulated clinical parameters, in panel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalParameter {
    HeartRate,
    Spo2,
    RespiratoryRate,
    Temperature,
    BpSystolic,
    BpDiastolic,
    BloodSugar,
    Sodium,
    Potassium,
    Ph,
    Paco2,
    Pao2,
    Gcs,
}

impl VitalParameter {
    pub const ALL: [VitalParameter; 13] = [
        VitalParameter::HeartRate,
        VitalParameter::Spo2,
        VitalParameter::RespiratoryRate,
        VitalParameter::Temperature,
        VitalParameter::BpSystolic,
        VitalParameter::BpDiastolic,
        VitalParameter::BloodSugar,
        VitalParameter::Sodium,
        VitalParameter::Potassium,
        VitalParameter::Ph,
        VitalParameter::Paco2,
        VitalParameter::Pao2,
        VitalParameter::Gcs,
    ];

    pub fn key(self) -> &'static str {
        match self {
            VitalParameter::HeartRate => "heart_rate",
            VitalParameter::Spo2 => "spo2",
            VitalParameter::RespiratoryRate => "respiratory_rate",
            VitalParameter::Temperature => "temperature",
            VitalParameter::BpSystolic => "bp_systolic",
            VitalParameter::BpDiastolic => "bp_diastolic",
            VitalParameter::BloodSugar => "blood_sugar",
            VitalParameter::Sodium => "sodium",
            VitalParameter::Potassium => "potassium",
            VitalParameter::Ph => "ph",
            VitalParameter::Paco2 => "paco2",
            VitalParameter::Pao2 => "pao2",
            VitalParameter::Gcs => "gcs",
        }
    }

    /// LOINC code.
    pub fn code(self) -> &'static str {
        match self {
            VitalParameter::HeartRate => "8867-4",
            VitalParameter::Spo2 => "59408-5",
            VitalParameter::RespiratoryRate => "9279-1",
            VitalParameter::Temperature => "8310-5",
            VitalParameter::BpSystolic => "8480-6",
            VitalParameter::BpDiastolic => "8462-4",
            VitalParameter::BloodSugar => "2339-0",
            VitalParameter::Sodium => "2951-2",
            VitalParameter::Potassium => "2823-3",
            VitalParameter::Ph => "11558-4",
            VitalParameter::Paco2 => "2019-8",
            VitalParameter::Pao2 => "2703-7",
            VitalParameter::Gcs => "9269-2",
        }
    }

    /// UCUM unit.
    pub fn unit(self) -> &'static str {
        match self {
            VitalParameter::HeartRate => "bpm",
            VitalParameter::Spo2 => "%",
            VitalParameter::RespiratoryRate => "/min",
            VitalParameter::Temperature => "Cel",
            VitalParameter::BpSystolic | VitalParameter::BpDiastolic => "mm[Hg]",
            VitalParameter::BloodSugar => "mg/dL",
            VitalParameter::Sodium | VitalParameter::Potassium => "mmol/L",
            VitalParameter::Ph => "{pH}",
            VitalParameter::Paco2 | VitalParameter::Pao2 => "mm[Hg]",
            VitalParameter::Gcs => "{score}",
        }
    }

    /// Counted parameters are reported as whole numbers.
    pub fn is_integer(self) -> bool {
        matches!(self, VitalParameter::RespiratoryRate | VitalParameter::Gcs)
    }

    /// Configured `(min, max)` range for the given clinical state.
    pub fn range(self, state: ClinicalState) -> (f64, f64) {
        match state {
            ClinicalState::Stable => match self {
                VitalParameter::HeartRate => (70.0, 100.0),
                VitalParameter::Spo2 => (96.0, 99.0),
                VitalParameter::RespiratoryRate => (12.0, 18.0),
                VitalParameter::Temperature => (36.5, 37.5),
                VitalParameter::BpSystolic => (110.0, 130.0),
                VitalParameter::BpDiastolic => (70.0, 85.0),
                VitalParameter::BloodSugar => (80.0, 110.0),
                VitalParameter::Sodium => (135.0, 145.0),
                VitalParameter::Potassium => (3.5, 5.0),
                VitalParameter::Ph => (7.35, 7.45),
                VitalParameter::Paco2 => (35.0, 45.0),
                VitalParameter::Pao2 => (80.0, 100.0),
                VitalParameter::Gcs => (15.0, 15.0),
            },
            ClinicalState::Critical => match self {
                VitalParameter::HeartRate => (140.0, 165.0),
                VitalParameter::Spo2 => (86.0, 91.0),
                VitalParameter::RespiratoryRate => (25.0, 35.0),
                VitalParameter::Temperature => (38.5, 40.0),
                VitalParameter::BpSystolic => (80.0, 95.0),
                VitalParameter::BpDiastolic => (50.0, 65.0),
                VitalParameter::BloodSugar => (180.0, 250.0),
                VitalParameter::Sodium => (125.0, 135.0),
                VitalParameter::Potassium => (5.5, 6.5),
                VitalParameter::Ph => (7.20, 7.30),
                VitalParameter::Paco2 => (50.0, 60.0),
                VitalParameter::Pao2 => (55.0, 65.0),
                VitalParameter::Gcs => (3.0, 8.0),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub parameter: VitalParameter,
    pub code: &'static str,
    pub unit: &'static str,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// One full set of simulated measurements for a patient at one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VitalPanel {
    pub state: ClinicalState,
    pub measurements: Vec<Measurement>,
}

impl VitalPanel {
    pub fn get(&self, parameter: VitalParameter) -> Option<&Measurement> {
        self.measurements.iter().find(|m| m.parameter == parameter)
    }
}
