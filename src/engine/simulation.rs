//! Vital-sign simulation loop.
//!
//! Every tick the scheduler snapshots the registry, applies the one scripted
//! crisis escalation once it is due, and emits a fresh panel for each active
//! patient. Emission is best effort: a failed measurement is logged and the
//! tick carries on.

use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::policy::SimulationPolicy;
use super::registry::PatientRegistry;
use super::vitals;
use crate::ehr::Emitter;
use crate::models::{ClinicalState, PatientId};

/// Outcome of a single tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Patients in the snapshot.
    pub patients: usize,
    /// Panels generated (patients deactivated mid-tick are skipped).
    pub panels: usize,
    pub emitted: usize,
    pub failed: usize,
    /// Patient escalated to critical during this tick, if any.
    pub crisis: Option<PatientId>,
}

pub struct SimulationScheduler {
    registry: Arc<PatientRegistry>,
    emitter: Arc<dyn Emitter>,
    policy: SimulationPolicy,
    rng: StdRng,
    started: Instant,
    crisis_fired: bool,
}

impl SimulationScheduler {
    pub fn new(registry: Arc<PatientRegistry>, emitter: Arc<dyn Emitter>, policy: SimulationPolicy) -> Self {
        let rng = match policy.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            registry,
            emitter,
            policy,
            rng,
            started: Instant::now(),
            crisis_fired: false,
        }
    }

    pub fn crisis_fired(&self) -> bool {
        self.crisis_fired
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Runs ticks until `shutdown` is cancelled. A tick in progress always
    /// completes; cancellation is only observed between ticks.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            tick_interval_s = self.policy.tick_interval_secs,
            crisis_delay_s = self.policy.crisis_delay_secs,
            crisis_enabled = self.policy.crisis_enabled,
            "vital signs simulation started"
        );

        while !shutdown.is_cancelled() {
            let report = self.tick().await;
            let pause = if report.patients == 0 {
                self.policy.idle_interval()
            } else {
                self.policy.tick_interval()
            };

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        info!("vital signs simulation stopped");
    }

    pub async fn tick(&mut self) -> TickReport {
        let snapshot = self.registry.snapshot();
        let mut report = TickReport { patients: snapshot.len(), ..Default::default() };
        if snapshot.is_empty() {
            return report;
        }

        report.crisis = self.escalate_if_due(&snapshot);

        for patient_id in &snapshot {
            // read once, so the whole panel reflects a single state
            let Some(state) = self.registry.state(patient_id) else {
                debug!(%patient_id, "patient deactivated during tick");
                continue;
            };

            let panel = vitals::generate(state, &mut self.rng, Utc::now());
            report.panels += 1;

            for measurement in &panel.measurements {
                match self.emitter.emit_measurement(patient_id, measurement).await {
                    Ok(()) => report.emitted += 1,
                    Err(e) => {
                        report.failed += 1;
                        warn!(%patient_id, parameter = measurement.parameter.key(), "failed to post observation: {}", e);
                    }
                }
            }
        }

        info!(
            patients = report.panels,
            emitted = report.emitted,
            failed = report.failed,
            "posted new vital panels for {} active patient(s)",
            report.panels
        );
        report
    }

    fn escalate_if_due(&mut self, snapshot: &[PatientId]) -> Option<PatientId> {
        if !self.policy.crisis_enabled || self.crisis_fired || self.elapsed() < self.policy.crisis_delay() {
            return None;
        }

        let target = snapshot
            .iter()
            .find(|id| self.registry.state(id) == Some(ClinicalState::Stable))?;

        // a patient removed since the snapshot leaves the crisis armed
        if !self.registry.set_state(target, ClinicalState::Critical) {
            return None;
        }

        self.crisis_fired = true;
        warn!(patient_id = %target, "crisis event: patient escalated to critical");
        Some(target.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use async_trait::async_trait;

    use crate::ehr::MockEmitter;
    use crate::error::EmitError;
    use crate::models::{Measurement, VitalParameter};

    #[derive(Default)]
    struct RecordingEmitter {
        failing: HashSet<VitalParameter>,
        posted: Mutex<Vec<(PatientId, VitalParameter, f64)>>,
    }

    impl RecordingEmitter {
        fn failing(parameters: &[VitalParameter]) -> Self {
            Self { failing: parameters.iter().copied().collect(), ..Default::default() }
        }

        fn posted(&self) -> Vec<(PatientId, VitalParameter, f64)> {
            self.posted.lock().unwrap().clone()
        }

        fn value(&self, patient: &str, parameter: VitalParameter) -> Option<f64> {
            self.posted()
                .into_iter()
                .rev()
                .find(|(p, param, _)| p.as_str() == patient && *param == parameter)
                .map(|(_, _, v)| v)
        }
    }

    #[async_trait]
    impl Emitter for RecordingEmitter {
        async fn emit_measurement(&self, patient_id: &PatientId, m: &Measurement) -> Result<(), EmitError> {
            if self.failing.contains(&m.parameter) {
                return Err(EmitError::Unavailable("store offline".into()));
            }
            self.posted.lock().unwrap().push((patient_id.clone(), m.parameter, m.value));
            Ok(())
        }

        async fn emit_flag(&self, _: &PatientId, _: &str) -> Result<(), EmitError> {
            Ok(())
        }
    }

    fn seeded() -> SimulationPolicy {
        SimulationPolicy { seed: Some(11), ..Default::default() }
    }

    fn registry_with(ids: &[&str]) -> Arc<PatientRegistry> {
        let registry = Arc::new(PatientRegistry::new());
        for id in ids {
            registry.activate(PatientId::new(*id));
        }
        registry
    }

    #[tokio::test]
    async fn tick_emits_full_panel_per_patient() {
        let mut emitter = MockEmitter::new();
        emitter.expect_emit_measurement().times(3 * 13).returning(|_, _| Ok(()));
        emitter.expect_emit_flag().never();

        let mut scheduler = SimulationScheduler::new(registry_with(&["p1", "p2", "p3"]), Arc::new(emitter), seeded());
        let report = scheduler.tick().await;

        assert_eq!(report.patients, 3);
        assert_eq!(report.panels, 3);
        assert_eq!(report.emitted, 39);
        assert_eq!(report.failed, 0);
        assert_eq!(report.crisis, None);
    }

    #[tokio::test]
    async fn empty_registry_emits_nothing() {
        let mut emitter = MockEmitter::new();
        emitter.expect_emit_measurement().never();

        let mut scheduler = SimulationScheduler::new(registry_with(&[]), Arc::new(emitter), seeded());
        assert_eq!(scheduler.tick().await, TickReport::default());
    }

    #[tokio::test]
    async fn failed_measurements_do_not_abort_the_tick() {
        let failing = [
            VitalParameter::HeartRate,
            VitalParameter::Spo2,
            VitalParameter::Temperature,
            VitalParameter::Sodium,
            VitalParameter::Gcs,
        ];
        let emitter = Arc::new(RecordingEmitter::failing(&failing));
        let mut scheduler = SimulationScheduler::new(registry_with(&["p1", "p2"]), emitter.clone(), seeded());

        let report = scheduler.tick().await;

        assert_eq!(report.failed, 10);
        assert_eq!(report.emitted, 16);
        let posted = emitter.posted();
        assert_eq!(posted.iter().filter(|(p, _, _)| p.as_str() == "p2").count(), 8);
        assert!(posted.iter().all(|(_, param, _)| !failing.contains(param)));
    }

    #[tokio::test(start_paused = true)]
    async fn crisis_waits_for_delay() {
        let registry = registry_with(&["p1", "p2"]);
        let mut scheduler = SimulationScheduler::new(registry.clone(), Arc::new(RecordingEmitter::default()), seeded());

        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(scheduler.tick().await.crisis, None);
        assert!(!scheduler.crisis_fired());
        assert_eq!(registry.state(&PatientId::new("p1")), Some(ClinicalState::Stable));
    }

    #[tokio::test(start_paused = true)]
    async fn crisis_fires_once_on_first_stable_patient() {
        let registry = registry_with(&["p1", "p2"]);
        let emitter = Arc::new(RecordingEmitter::default());
        let mut scheduler = SimulationScheduler::new(registry.clone(), emitter.clone(), seeded());

        tokio::time::advance(Duration::from_secs(31)).await;
        let report = scheduler.tick().await;

        assert_eq!(report.crisis, Some(PatientId::new("p1")));
        assert_eq!(registry.state(&PatientId::new("p1")), Some(ClinicalState::Critical));
        assert_eq!(registry.state(&PatientId::new("p2")), Some(ClinicalState::Stable));

        // panel generated after escalation uses the critical ranges
        assert_ne!(emitter.value("p1", VitalParameter::Gcs), Some(15.0));
        assert_eq!(emitter.value("p2", VitalParameter::Gcs), Some(15.0));

        // later ticks never retrigger, even once the target is gone
        registry.deactivate(&PatientId::new("p1"));
        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(10)).await;
            assert_eq!(scheduler.tick().await.crisis, None);
        }
        assert_eq!(registry.state(&PatientId::new("p2")), Some(ClinicalState::Stable));
    }

    #[tokio::test(start_paused = true)]
    async fn crisis_skips_patients_already_critical() {
        let registry = registry_with(&["p1", "p2"]);
        registry.set_state(&PatientId::new("p1"), ClinicalState::Critical);
        let mut scheduler = SimulationScheduler::new(registry.clone(), Arc::new(RecordingEmitter::default()), seeded());

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(scheduler.tick().await.crisis, Some(PatientId::new("p2")));
    }

    #[tokio::test(start_paused = true)]
    async fn crisis_without_stable_patient_never_fires() {
        let registry = registry_with(&["p1"]);
        registry.set_state(&PatientId::new("p1"), ClinicalState::Critical);
        let mut scheduler = SimulationScheduler::new(registry.clone(), Arc::new(RecordingEmitter::default()), seeded());

        tokio::time::advance(Duration::from_secs(45)).await;
        assert_eq!(scheduler.tick().await.crisis, None);
        assert!(!scheduler.crisis_fired());

        // a stable patient arriving later still receives the crisis
        registry.activate(PatientId::new("p2"));
        assert_eq!(scheduler.tick().await.crisis, Some(PatientId::new("p2")));
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_crisis_never_fires() {
        let policy = SimulationPolicy { crisis_enabled: false, ..seeded() };
        let mut scheduler = SimulationScheduler::new(registry_with(&["p1"]), Arc::new(RecordingEmitter::default()), policy);

        tokio::time::advance(Duration::from_secs(120)).await;
        assert_eq!(scheduler.tick().await.crisis, None);
    }

    struct DeactivatingEmitter {
        registry: Arc<PatientRegistry>,
        target: PatientId,
    }

    #[async_trait]
    impl Emitter for DeactivatingEmitter {
        async fn emit_measurement(&self, _: &PatientId, _: &Measurement) -> Result<(), EmitError> {
            self.registry.deactivate(&self.target);
            Ok(())
        }

        async fn emit_flag(&self, _: &PatientId, _: &str) -> Result<(), EmitError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn patient_deactivated_mid_tick_is_skipped() {
        let registry = registry_with(&["p1", "p2"]);
        let emitter = Arc::new(DeactivatingEmitter { registry: registry.clone(), target: PatientId::new("p2") });
        let mut scheduler = SimulationScheduler::new(registry.clone(), emitter, seeded());

        let report = scheduler.tick().await;
        assert_eq!(report.patients, 2);
        assert_eq!(report.panels, 1);
        assert_eq!(report.emitted, 13);
    }

    #[tokio::test(start_paused = true)]
    async fn run_ticks_on_interval_until_cancelled() {
        let emitter = Arc::new(RecordingEmitter::default());
        let scheduler = SimulationScheduler::new(registry_with(&["p1"]), emitter.clone(), seeded());
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(shutdown.clone()));

        // ticks at 0s, 10s and 20s
        tokio::time::sleep(Duration::from_secs(25)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(emitter.posted().len(), 3 * 13);
    }

    struct SlowEmitter {
        posted: Mutex<usize>,
    }

    #[async_trait]
    impl Emitter for SlowEmitter {
        async fn emit_measurement(&self, _: &PatientId, _: &Measurement) -> Result<(), EmitError> {
            tokio::time::sleep(Duration::from_secs(1)).await;
            *self.posted.lock().unwrap() += 1;
            Ok(())
        }

        async fn emit_flag(&self, _: &PatientId, _: &str) -> Result<(), EmitError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_lets_the_current_tick_finish() {
        let emitter = Arc::new(SlowEmitter { posted: Mutex::new(0) });
        let scheduler = SimulationScheduler::new(registry_with(&["p1"]), emitter.clone(), seeded());
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(shutdown.clone()));

        tokio::time::sleep(Duration::from_millis(4_500)).await;
        assert!(*emitter.posted.lock().unwrap() < 13);
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(*emitter.posted.lock().unwrap(), 13);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_registry_is_rechecked_quickly() {
        let registry = registry_with(&[]);
        let emitter = Arc::new(RecordingEmitter::default());
        let scheduler = SimulationScheduler::new(registry.clone(), emitter.clone(), seeded());
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(shutdown.clone()));

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        registry.activate(PatientId::new("p1"));
        tokio::time::sleep(Duration::from_secs(1)).await;

        // first panel lands on the next idle re-check, not a full tick later
        assert_eq!(emitter.posted().len(), 13);

        shutdown.cancel();
        handle.await.unwrap();
    }
}
