//! C.A.R.E. Gateway core library
//!
//! Simulates live vital-sign streams for active patients and automatically
//! runs insight analysis for qualifying patient groups.

pub mod api;
pub mod db;
pub mod ehr;
pub mod engine;
pub mod error;
pub mod models;

pub use crate::engine::{
    AnalyzedGroups, Analyzer, AutomationPolicy, CommandAnalyzer, GroupWatcher, PatientRegistry,
    SimulationPolicy, SimulationScheduler,
};
pub use db::{GroupStore, JsonGroupStore, MemoryGroupStore};
pub use ehr::{Emitter, FhirEmitter, LogEmitter};
pub use error::Error;

/// Application settings
pub mod settings {
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use serde::Deserialize;

    use crate::engine::{AutomationPolicy, SimulationPolicy};
    use crate::error::SettingsError;

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(default)]
    pub struct Settings {
        pub server: ServerSettings,
        pub fhir: FhirSettings,
        pub simulation: SimulationPolicy,
        pub automation: AutomationPolicy,
        pub groups: GroupStoreSettings,
        pub log: LogSettings,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(default)]
    pub struct ServerSettings {
        pub host: String,
        pub port: u16,
    }

    impl Default for ServerSettings {
        fn default() -> Self {
            Self { host: "0.0.0.0".to_string(), port: 5000 }
        }
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(default)]
    pub struct FhirSettings {
        pub base_url: String,
        pub timeout_secs: u64,
    }

    impl Default for FhirSettings {
        fn default() -> Self {
            Self { base_url: "http://localhost:8080/fhir".to_string(), timeout_secs: 10 }
        }
    }

    impl FhirSettings {
        pub fn timeout(&self) -> Duration {
            Duration::from_secs(self.timeout_secs)
        }
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(default)]
    pub struct GroupStoreSettings {
        pub path: PathBuf,
    }

    impl Default for GroupStoreSettings {
        fn default() -> Self {
            Self { path: PathBuf::from("groups_db.json") }
        }
    }

    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum LogFormat {
        #[default]
        Pretty,
        Json,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(default)]
    pub struct LogSettings {
        pub format: LogFormat,
        /// Used when `RUST_LOG` is unset.
        pub filter: String,
    }

    impl Default for LogSettings {
        fn default() -> Self {
            Self { format: LogFormat::Pretty, filter: "info".to_string() }
        }
    }

    impl Settings {
        pub fn validate(&self) -> Result<(), SettingsError> {
            self.simulation.validate()?;
            self.automation.validate()?;
            if self.fhir.timeout_secs == 0 {
                return Err(SettingsError::Invalid {
                    section: "fhir",
                    reason: "timeout_secs must be greater than 0".to_string(),
                });
            }
            Ok(())
        }
    }

    /// Load settings from `config_dir`.
    ///
    /// Layers `default.toml`, then `{CARE_ENV}.toml` (both optional), then
    /// `CARE_*` environment variables, e.g. `CARE_SIMULATION__SEED=7`.
    pub fn load_settings(config_dir: &Path) -> Result<Settings, SettingsError> {
        let env = std::env::var("CARE_ENV").unwrap_or_else(|_| "development".into());
        load_settings_for(config_dir, &env)
    }

    pub fn load_settings_for(config_dir: &Path, env: &str) -> Result<Settings, SettingsError> {
        let file = |name: &str| {
            let path = config_dir.join(name);
            config::File::with_name(&path.to_string_lossy()).required(false)
        };

        let settings: Settings = config::Config::builder()
            .add_source(file("default"))
            .add_source(file(env))
            .add_source(
                config::Environment::with_prefix("CARE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

}
