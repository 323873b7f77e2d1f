//! Timing and trigger rules for the two background loops.

use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// Vital-sign simulation policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationPolicy {
    /// Seconds between panels for each active patient.
    ///
    /// **Default:** 10
    pub tick_interval_secs: u64,

    /// Milliseconds to wait before re-checking an empty registry.
    ///
    /// **Default:** 1000
    pub idle_interval_ms: u64,

    /// Whether the scripted crisis escalation runs at all.
    pub crisis_enabled: bool,

    /// Seconds after scheduler start before the crisis may fire.
    ///
    /// **Default:** 30
    pub crisis_delay_secs: u64,

    /// Fixed RNG seed for reproducible runs. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for SimulationPolicy {
    fn default() -> Self {
        Self {
            tick_interval_secs: 10,
            idle_interval_ms: 1000,
            crisis_enabled: true,
            crisis_delay_secs: 30,
            seed: None,
        }
    }
}

impl SimulationPolicy {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }

    pub fn crisis_delay(&self) -> Duration {
        Duration::from_secs(self.crisis_delay_secs)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.tick_interval_secs == 0 {
            return Err(invalid("simulation", "tick_interval_secs must be greater than 0"));
        }
        if self.idle_interval_ms == 0 {
            return Err(invalid("simulation", "idle_interval_ms must be greater than 0"));
        }
        Ok(())
    }
}

/// Group analysis automation policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationPolicy {
    /// Seconds between group store scans.
    ///
    /// **Default:** 15
    pub scan_interval_secs: u64,

    /// Group type that triggers analysis.
    ///
    /// **Default:** "snakebite"
    pub group_type: String,

    /// Minimum member count for a group to qualify.
    ///
    /// **Default:** 2
    pub min_members: usize,

    /// Upper bound on a single analyzer call.
    ///
    /// **Default:** 120
    pub analyzer_timeout_secs: u64,

    /// Analyzer command line, program first.
    pub analyzer_command: Vec<String>,
}

impl Default for AutomationPolicy {
    fn default() -> Self {
        Self {
            scan_interval_secs: 15,
            group_type: "snakebite".to_string(),
            min_members: 2,
            analyzer_timeout_secs: 120,
            analyzer_command: vec![
                "docker".to_string(),
                "run".to_string(),
                "--rm".to_string(),
                "care-analyzer".to_string(),
            ],
        }
    }
}

impl AutomationPolicy {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn analyzer_timeout(&self) -> Duration {
        Duration::from_secs(self.analyzer_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.scan_interval_secs == 0 {
            return Err(invalid("automation", "scan_interval_secs must be greater than 0"));
        }
        if self.analyzer_timeout_secs == 0 {
            return Err(invalid("automation", "analyzer_timeout_secs must be greater than 0"));
        }
        if self.min_members == 0 {
            return Err(invalid("automation", "min_members must be at least 1"));
        }
        if self.analyzer_command.is_empty() {
            return Err(invalid("automation", "analyzer_command must name a program"));
        }
        Ok(())
    }
}

fn invalid(section: &'static str, reason: &str) -> SettingsError {
    SettingsError::Invalid { section, reason: reason.to_string() }
}
