use super::common::CompatibilityTags;
use serde::{Deserialize, Serialize};

/// A single downloadable file attached to a catalog version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogFile {
    pub url: String,
    pub file_name: String,
    pub size: u64,
    #[serde(default)]
    pub primary: bool,
}

/// A version of a project as published by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogVersion {
    pub version_id: String,
    pub project_id: String,
    pub version_number: String,
    pub game_versions: Vec<String>,
    pub loaders: Vec<String>,
    pub files: Vec<CatalogFile>,
    #[serde(default)]
    pub changelog: Option<String>,
}

impl CatalogVersion {
    /// The file marked primary, or the first file when none is marked.
    pub fn primary_file(&self) -> Option<&CatalogFile> {
        self.files
            .iter()
            .find(|f| f.primary)
            .or_else(|| self.files.first())
    }

    pub fn download_url(&self) -> Option<&str> {
        self.primary_file().map(|f| f.url.as_str())
    }

    pub fn file_name(&self) -> Option<&str> {
        self.primary_file().map(|f| f.file_name.as_str())
    }

    /// Size of the primary file, 0 if the version has no files.
    pub fn file_size(&self) -> u64 {
        self.primary_file().map(|f| f.size).unwrap_or(0)
    }

    /// True when this version lists both the game version and the loader.
    pub fn matches(&self, tags: &CompatibilityTags) -> bool {
        self.game_versions.iter().any(|v| v == &tags.game_version)
            && self
                .loaders
                .iter()
                .any(|l| l.eq_ignore_ascii_case(&tags.loader))
    }

    /// Compatibility tags recorded in the registry after installing this version.
    pub fn compatibility(&self, profile_tags: &CompatibilityTags) -> CompatibilityTags {
        if self.matches(profile_tags) {
            return profile_tags.clone();
        }
        CompatibilityTags::new(
            self.game_versions
                .first()
                .cloned()
                .unwrap_or_else(|| profile_tags.game_version.clone()),
            self.loaders
                .first()
                .cloned()
                .unwrap_or_else(|| profile_tags.loader.clone()),
        )
    }
}
