use super::catalog::CatalogVersion;
use crate::error::UpdateError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Snapshot of a tracked file in a profile's install directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledArtifact {
    pub file_name: String,
    pub file_path: PathBuf,
    pub display_name: String,
    pub current_version: String,
    pub catalog_id: String,
    pub last_modified: DateTime<Utc>,
}

/// Outcome of checking one artifact against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReport {
    pub artifact: InstalledArtifact,
    pub has_update: bool,
    pub latest_version: Option<CatalogVersion>,
    pub update_size_bytes: u64,
    pub error: Option<String>,
}

impl UpdateReport {
    pub fn up_to_date(artifact: InstalledArtifact) -> Self {
        Self {
            artifact,
            has_update: false,
            latest_version: None,
            update_size_bytes: 0,
            error: None,
        }
    }

    pub fn available(artifact: InstalledArtifact, latest: CatalogVersion) -> Self {
        Self {
            artifact,
            has_update: true,
            update_size_bytes: latest.file_size(),
            latest_version: Some(latest),
            error: None,
        }
    }

    pub fn failed(artifact: InstalledArtifact, error: impl Into<String>) -> Self {
        Self {
            artifact,
            has_update: false,
            latest_version: None,
            update_size_bytes: 0,
            error: Some(error.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.artifact.display_name
    }
}

/// What a successful update changed on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedArtifact {
    pub name: String,
    pub old_file_name: String,
    pub new_file_name: String,
    pub old_version: String,
    pub new_version: String,
}

/// Per-item result of a batch update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum UpdateResult {
    Updated(UpdatedArtifact),
    Failed { name: String, error: UpdateError },
}

impl UpdateResult {
    pub fn is_success(&self) -> bool {
        matches!(self, UpdateResult::Updated(_))
    }

    pub fn name(&self) -> &str {
        match self {
            UpdateResult::Updated(updated) => &updated.name,
            UpdateResult::Failed { name, .. } => name,
        }
    }

    pub fn error(&self) -> Option<&UpdateError> {
        match self {
            UpdateResult::Updated(_) => None,
            UpdateResult::Failed { error, .. } => Some(error),
        }
    }
}
