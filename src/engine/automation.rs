//! Group analysis automation.
//!
//! Periodically scans the group store for groups that qualify for analysis,
//! runs the external analyzer once per group and files the resulting insight
//! as a clinical flag. A group is only recorded as analyzed after both the
//! analyzer and the flag succeed; anything else is retried next sweep.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::ai::Analyzer;
use super::policy::AutomationPolicy;
use crate::db::GroupStore;
use crate::ehr::Emitter;
use crate::error::{AnalyzerError, Error};
use crate::models::{AnalysisResult, Group, GroupId};

/// Groups already analyzed by this process. Not persisted.
#[derive(Debug, Default)]
pub struct AnalyzedGroups {
    inner: Mutex<HashSet<GroupId>>,
}

impl AnalyzedGroups {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<GroupId>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn contains(&self, group_id: &GroupId) -> bool {
        self.lock().contains(group_id)
    }

    /// Returns `false` if the group was already recorded.
    pub fn mark(&self, group_id: GroupId) -> bool {
        self.lock().insert(group_id)
    }

    /// Sorted copy of the analyzed ids.
    pub fn list(&self) -> Vec<GroupId> {
        let mut ids: Vec<GroupId> = self.lock().iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Outcome of a single sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub triggered: usize,
    pub analyzed: usize,
    pub failed: usize,
}

pub struct GroupWatcher {
    store: Arc<dyn GroupStore>,
    analyzer: Arc<dyn Analyzer>,
    emitter: Arc<dyn Emitter>,
    analyzed: Arc<AnalyzedGroups>,
    policy: AutomationPolicy,
}

impl GroupWatcher {
    pub fn new(
        store: Arc<dyn GroupStore>,
        analyzer: Arc<dyn Analyzer>,
        emitter: Arc<dyn Emitter>,
        analyzed: Arc<AnalyzedGroups>,
        policy: AutomationPolicy,
    ) -> Self {
        Self { store, analyzer, emitter, analyzed, policy }
    }

    /// Trigger predicate for a single group.
    pub fn qualifies(&self, group: &Group) -> bool {
        group.active
            && group.group_type == self.policy.group_type
            && group.members.len() >= self.policy.min_members
            && !self.analyzed.contains(&group.id)
    }

    /// Sweeps every scan interval until `shutdown` is cancelled. The first
    /// sweep happens one interval after start.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            scan_interval_s = self.policy.scan_interval_secs,
            group_type = %self.policy.group_type,
            min_members = self.policy.min_members,
            "group analysis automation started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.policy.scan_interval()) => {}
            }
            self.sweep().await;
        }

        info!("group analysis automation stopped");
    }

    pub async fn sweep(&self) -> SweepReport {
        debug!("checking for groups to analyze");
        let mut report = SweepReport::default();

        let groups = match self.store.list_groups().await {
            Ok(groups) => groups,
            Err(e) => {
                error!("failed to read groups: {}", e);
                return report;
            }
        };
        report.scanned = groups.len();

        for group in &groups {
            // re-evaluated per group so duplicates in one listing run once
            if !self.qualifies(group) {
                continue;
            }
            report.triggered += 1;
            info!(group_id = %group.id, members = group.members.len(), "analysis triggered");

            match self.analyze(group).await {
                Ok(result) => {
                    report.analyzed += 1;
                    info!(
                        group_id = %group.id,
                        patient_id = %result.patient_id,
                        insight_code = %result.insight_code,
                        "analysis complete, flag created"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    error!(group_id = %group.id, "analysis failed, will retry: {}", e);
                }
            }
        }

        report
    }

    async fn analyze(&self, group: &Group) -> Result<AnalysisResult, Error> {
        let timeout = self.policy.analyzer_timeout();
        let result = tokio::time::timeout(timeout, self.analyzer.analyze(group))
            .await
            .map_err(|_| AnalyzerError::Timeout(timeout))??;

        self.emitter.emit_flag(&result.patient_id, &result.insight_text).await?;
        self.analyzed.mark(group.id.clone());
        Ok(result)
    }
}
