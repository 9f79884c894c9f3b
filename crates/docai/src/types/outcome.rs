//! Per-file ingestion outcomes and batch reports

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::error::Error;

/// Pipeline stage at which a file failed
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileStage {
    Validation,
    Archive,
    Extraction,
    Enhancement,
    Persistence,
}

impl fmt::Display for FileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileStage::Validation => "validation",
            FileStage::Archive => "archive",
            FileStage::Extraction => "extraction",
            FileStage::Enhancement => "enhancement",
            FileStage::Persistence => "persistence",
        };
        f.write_str(name)
    }
}

/// Result of ingesting a single file
#[derive(Debug)]
pub enum FileOutcome {
    Ingested { id: i64 },
    Failed { stage: FileStage, reason: Error },
}

impl FileOutcome {
    pub fn failed(stage: FileStage, reason: Error) -> Self {
        Self::Failed { stage, reason }
    }

    pub fn document_id(&self) -> Option<i64> {
        match self {
            FileOutcome::Ingested { id } => Some(*id),
            FileOutcome::Failed { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Ingested { .. })
    }
}

/// Serializable description of one failed file
#[derive(Debug, Clone, Serialize)]
pub struct FailureSummary {
    pub path: String,
    pub stage: FileStage,
    pub error: String,
}

/// Ordered outcomes of a directory ingestion, in enumeration order
#[derive(Debug, Default)]
pub struct IngestReport {
    pub entries: Vec<(PathBuf, FileOutcome)>,
}

impl IngestReport {
    pub fn push(&mut self, path: PathBuf, outcome: FileOutcome) {
        self.entries.push((path, outcome));
    }

    /// Ids of successfully ingested files, in enumeration order
    pub fn document_ids(&self) -> Vec<i64> {
        self.entries
            .iter()
            .filter_map(|(_, outcome)| outcome.document_id())
            .collect()
    }

    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|(_, o)| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.succeeded()
    }

    pub fn failures(&self) -> Vec<FailureSummary> {
        self.entries
            .iter()
            .filter_map(|(path, outcome)| match outcome {
                FileOutcome::Failed { stage, reason } => Some(FailureSummary {
                    path: path.display().to_string(),
                    stage: *stage,
                    error: reason.to_string(),
                }),
                FileOutcome::Ingested { .. } => None,
            })
            .collect()
    }
}
