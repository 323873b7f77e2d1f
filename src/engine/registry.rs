//! Registry of patients currently receiving simulated vitals.
//!
//! Membership mirrors the patient's `active` flag in the system of record.
//! All access goes through one mutex; callers iterate over snapshots,
//! never over the live map.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use crate::models::{ClinicalState, PatientId, PatientState};

#[derive(Debug)]
struct Entry {
    state: ClinicalState,
    // activation order, gives snapshots a stable ordering
    seq: u64,
}

#[derive(Debug, Default)]
struct Inner {
    patients: HashMap<PatientId, Entry>,
    next_seq: u64,
}

#[derive(Debug, Default)]
pub struct PatientRegistry {
    inner: Mutex<Inner>,
}

impl PatientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds the patient as `Stable`. Returns `false` if already active.
    pub fn activate(&self, patient_id: PatientId) -> bool {
        let mut inner = self.lock();
        if inner.patients.contains_key(&patient_id) {
            debug!(%patient_id, "patient already active");
            return false;
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.patients.insert(patient_id.clone(), Entry { state: ClinicalState::Stable, seq });
        drop(inner);
        info!(%patient_id, "patient activated and added to simulation");
        true
    }

    /// Removes the patient. Returns `false` if it was not active.
    pub fn deactivate(&self, patient_id: &PatientId) -> bool {
        let removed = self.lock().patients.remove(patient_id).is_some();
        if removed {
            info!(%patient_id, "patient deactivated and removed from simulation");
        }
        removed
    }

    /// Active patient ids in activation order.
    pub fn snapshot(&self) -> Vec<PatientId> {
        self.entries().into_iter().map(|p| p.patient_id).collect()
    }

    /// Active patients with their clinical state, in activation order.
    pub fn entries(&self) -> Vec<PatientState> {
        let inner = self.lock();
        let mut entries: Vec<(u64, PatientState)> = inner
            .patients
            .iter()
            .map(|(id, entry)| {
                (entry.seq, PatientState { patient_id: id.clone(), clinical_state: entry.state })
            })
            .collect();
        drop(inner);
        entries.sort_unstable_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, state)| state).collect()
    }

    pub fn state(&self, patient_id: &PatientId) -> Option<ClinicalState> {
        self.lock().patients.get(patient_id).map(|e| e.state)
    }

    /// Updates the state of an active patient. A patient deactivated in the
    /// meantime is left alone and `false` is returned.
    pub fn set_state(&self, patient_id: &PatientId, state: ClinicalState) -> bool {
        match self.lock().patients.get_mut(patient_id) {
            Some(entry) => {
                entry.state = state;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, patient_id: &PatientId) -> bool {
        self.lock().patients.contains_key(patient_id)
    }

    pub fn len(&self) -> usize {
        self.lock().patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().patients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn pid(id: &str) -> PatientId {
        PatientId::new(id)
    }

    #[test]
    fn activate_is_idempotent_and_starts_stable() {
        let registry = PatientRegistry::new();
        assert!(registry.activate(pid("p1")));
        assert!(registry.set_state(&pid("p1"), ClinicalState::Critical));

        // re-activation must not reset state
        assert!(!registry.activate(pid("p1")));
        assert_eq!(registry.state(&pid("p1")), Some(ClinicalState::Critical));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn deactivate_is_idempotent() {
        let registry = PatientRegistry::new();
        registry.activate(pid("p1"));
        assert!(registry.deactivate(&pid("p1")));
        assert!(!registry.deactivate(&pid("p1")));
        assert!(registry.is_empty());
    }

    #[test]
    fn snapshot_follows_activation_order() {
        let registry = PatientRegistry::new();
        for id in ["zeta", "alpha", "mid"] {
            registry.activate(pid(id));
        }
        registry.deactivate(&pid("alpha"));
        registry.activate(pid("alpha"));

        assert_eq!(registry.snapshot(), vec![pid("zeta"), pid("mid"), pid("alpha")]);
    }

    #[test]
    fn set_state_on_absent_patient_is_ignored() {
        let registry = PatientRegistry::new();
        assert!(!registry.set_state(&pid("ghost"), ClinicalState::Critical));
        assert!(!registry.contains(&pid("ghost")));
    }

    #[test]
    fn snapshot_is_detached_from_live_state() {
        let registry = PatientRegistry::new();
        registry.activate(pid("p1"));
        let snapshot = registry.snapshot();
        registry.deactivate(&pid("p1"));
        registry.activate(pid("p2"));

        assert_eq!(snapshot, vec![pid("p1")]);
    }

    #[test]
    fn activate_then_deactivate_races_with_snapshots() {
        let registry = Arc::new(PatientRegistry::new());

        let reader = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..2_000 {
                    let snapshot = registry.snapshot();
                    assert!(snapshot.len() <= 50);
                }
            })
        };

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for i in 0..250 {
                        let id = pid(&format!("w{w}-{}", i % 10));
                        registry.activate(id.clone());
                        registry.deactivate(&id);
                    }
                })
            })
            .collect();

        for writer in writers {
            writer.join().unwrap();
        }
        reader.join().unwrap();

        assert!(registry.is_empty());
    }
}
