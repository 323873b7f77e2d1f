//! Group store access for the automation loop.
//!
//! Groups are owned by the group management layer; the watcher only ever
//! reads them and tolerates stale reads.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::error::StoreError;
use crate::models::Group;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn list_groups(&self) -> Result<Vec<Group>, StoreError>;
}

#[derive(Debug, Deserialize)]
struct GroupsDocument {
    #[serde(default)]
    groups: Vec<Value>,
}

/// Reads the `{"groups": [...]}` document maintained by the gateway.
#[derive(Debug, Clone)]
pub struct JsonGroupStore {
    path: PathBuf,
}

impl JsonGroupStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl GroupStore for JsonGroupStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("group store not created yet");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(StoreError::Io { path: self.path.display().to_string(), source });
            }
        };

        let document: GroupsDocument = serde_json::from_slice(&raw)
            .map_err(|source| StoreError::Malformed { path: self.path.display().to_string(), source })?;

        // one bad entry must not hide the rest of the document
        let groups = document
            .groups
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value::<Group>(entry) {
                Ok(group) => Some(group),
                Err(e) => {
                    warn!(index, "skipping unreadable group entry: {}", e);
                    None
                }
            })
            .collect();
        Ok(groups)
    }
}

/// In-process store, for embedding the watcher without a groups file.
#[derive(Debug, Default)]
pub struct MemoryGroupStore {
    groups: Mutex<Vec<Group>>,
}

impl MemoryGroupStore {
    pub fn new(groups: Vec<Group>) -> Self {
        Self { groups: Mutex::new(groups) }
    }

    /// Inserts or replaces a group by id.
    pub fn upsert(&self, group: Group) {
        let mut groups = self.groups.lock().unwrap_or_else(PoisonError::into_inner);
        match groups.iter_mut().find(|g| g.id == group.id) {
            Some(existing) => *existing = group,
            None => groups.push(group),
        }
    }
}

#[async_trait]
impl GroupStore for MemoryGroupStore {
    async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        Ok(self.groups.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }
}
