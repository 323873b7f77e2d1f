use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::error::AnalyzerError;
use crate::models::{AnalysisResult, Group};

/// Black-box insight producer for a qualifying group. Calls may be slow.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, group: &Group) -> Result<AnalysisResult, AnalyzerError>;
}

/// Runs an external analyzer process (by default the `care-analyzer`
/// container) and parses the JSON insight it prints on stdout.
#[derive(Debug, Clone)]
pub struct CommandAnalyzer {
    program: String,
    args: Vec<String>,
}

impl CommandAnalyzer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    /// Builds from a full command line, program first.
    pub fn from_command_line(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }

    fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for CommandAnalyzer {
    fn default() -> Self {
        Self::new("docker", vec!["run".into(), "--rm".into(), "care-analyzer".into()])
    }
}

#[async_trait]
impl Analyzer for CommandAnalyzer {
    #[instrument(skip(self, group), fields(group_id = %group.id))]
    async fn analyze(&self, group: &Group) -> Result<AnalysisResult, AnalyzerError> {
        debug!(command = %self.display(), "launching analyzer");
        let output = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| AnalyzerError::Spawn { command: self.display(), source })?;

        if !output.status.success() {
            return Err(AnalyzerError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let result: AnalysisResult = serde_json::from_slice(&output.stdout)?;
        Ok(result)
    }
}
