//! Data models shared by the simulation and automation loops.

pub mod group;
pub mod patient;
pub mod vitals;

pub use group::{AnalysisResult, Group, GroupId, GroupMember};
pub use patient::{ClinicalState, PatientId, PatientState};
pub use vitals::{Measurement, VitalPanel, VitalParameter};
