//! Simulation and automation core.
//!
//! Two background loops share process state: [`simulation`] mutates the
//! [`registry`] and emits vitals, [`automation`] watches groups and files
//! analyzer insights.

pub mod ai;
pub mod automation;
pub mod policy;
pub mod registry;
pub mod simulation;
pub mod vitals;

pub use ai::{Analyzer, CommandAnalyzer};
pub use automation::{AnalyzedGroups, GroupWatcher, SweepReport};
pub use policy::{AutomationPolicy, SimulationPolicy};
pub use registry::PatientRegistry;
pub use simulation::{SimulationScheduler, TickReport};
