//! Updater configuration.
//!
//! `UpdaterConfig` is a plain value: load it once at startup and pass it to
//! the components that need it. Missing fields in the JSON file fall back to
//! the defaults below, so old config files keep working when fields are added.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

pub const DEFAULT_CATALOG_URL: &str = "https://api.modrinth.com";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    /// Base URL of the Modrinth-compatible catalog API
    pub catalog_base_url: String,
    pub user_agent: String,
    /// Timeout applied to every catalog request, downloads included
    pub request_timeout_secs: u64,
    /// File extensions considered artifacts when scanning an install directory.
    /// Empty means every regular file.
    pub artifact_extensions: Vec<String>,
    /// Number of backups kept per file after a successful update.
    /// `None` keeps every backup.
    pub backup_retention: Option<usize>,
    /// Directory holding one sub-directory per profile
    pub profiles_dir: Option<PathBuf>,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            catalog_base_url: DEFAULT_CATALOG_URL.to_string(),
            user_agent: concat!("modsync/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_secs: 60,
            artifact_extensions: vec!["jar".to_string()],
            backup_retention: None,
            profiles_dir: None,
        }
    }
}

impl UpdaterConfig {
    /// Load the config at `path`, or the defaults when the file does not exist.
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Read config {:?}", path))?;
        let config = serde_json::from_str(&contents)
            .with_context(|| format!("Parse config {:?}", path))?;
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Create config dir {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .await
            .with_context(|| format!("Write config {:?}", path))?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Whether a file name passes the extension allow-list.
    pub fn is_artifact_name(&self, file_name: &str) -> bool {
        if file_name.starts_with('.') {
            return false;
        }
        if self.artifact_extensions.is_empty() {
            return true;
        }
        match Path::new(file_name).extension().and_then(|e| e.to_str()) {
            Some(ext) => self
                .artifact_extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext)),
            None => false,
        }
    }
}
