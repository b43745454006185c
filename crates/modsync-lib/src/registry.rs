//! Per-profile registry of installed mods.
//!
//! The registry maps installed file names to the catalog metadata they were
//! installed from. It is stored as a single JSON document and every mutation
//! rewrites it through a temp file + rename, so readers see either the old or
//! the new mapping, never a mix.

use crate::models::{CatalogVersion, CompatibilityTags};
use crate::utils::fs::move_file;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

pub type RegistryMap = BTreeMap<String, RegistryEntry>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub display_name: String,
    pub version_number: String,
    pub catalog_id: String,
    pub file_name: String,
    pub version_id: String,
    pub compatibility: CompatibilityTags,
    pub timestamp: DateTime<Utc>,
}

impl RegistryEntry {
    /// Entry describing `version` installed as `file_name`.
    pub fn from_version(
        display_name: impl Into<String>,
        catalog_id: impl Into<String>,
        file_name: impl Into<String>,
        version: &CatalogVersion,
        profile_tags: &CompatibilityTags,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            version_number: version.version_number.clone(),
            catalog_id: catalog_id.into(),
            file_name: file_name.into(),
            version_id: version.version_id.clone(),
            compatibility: version.compatibility(profile_tags),
            timestamp: Utc::now(),
        }
    }
}

pub struct ArtifactRegistry {
    path: PathBuf,
    // Serializes read-modify-write cycles on this handle
    write_lock: Mutex<()>,
}

impl ArtifactRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole mapping. A missing file is an empty registry.
    pub async fn load(&self) -> Result<RegistryMap> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(RegistryMap::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Read registry {:?}", self.path));
            }
        };

        if contents.trim().is_empty() {
            return Ok(RegistryMap::new());
        }

        serde_json::from_str(&contents).with_context(|| format!("Parse registry {:?}", self.path))
    }

    pub async fn get(&self, file_name: &str) -> Result<Option<RegistryEntry>> {
        Ok(self.load().await?.remove(file_name))
    }

    /// Insert or overwrite the entry keyed by its file name.
    pub async fn upsert(&self, entry: RegistryEntry) -> Result<()> {
        self.modify(|map| {
            map.insert(entry.file_name.clone(), entry);
        })
        .await
    }

    pub async fn remove(&self, file_name: &str) -> Result<Option<RegistryEntry>> {
        self.modify(|map| map.remove(file_name)).await
    }

    /// Swap `old_file_name` for `entry` in a single write.
    pub async fn replace(&self, old_file_name: &str, entry: RegistryEntry) -> Result<()> {
        self.modify(|map| {
            if old_file_name != entry.file_name {
                map.remove(old_file_name);
            }
            map.insert(entry.file_name.clone(), entry);
        })
        .await
    }

    /// Drop every entry for which `keep` returns false. Returns the dropped entries.
    pub async fn retain<F>(&self, mut keep: F) -> Result<Vec<RegistryEntry>>
    where
        F: FnMut(&RegistryEntry) -> bool,
    {
        self.modify(|map| {
            let dropped: Vec<String> = map
                .values()
                .filter(|entry| !keep(*entry))
                .map(|entry| entry.file_name.clone())
                .collect();
            dropped
                .iter()
                .filter_map(|name| map.remove(name))
                .collect()
        })
        .await
    }

    async fn modify<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut RegistryMap) -> T,
    {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load().await?;
        let out = f(&mut map);
        self.write(&map).await?;
        Ok(out)
    }

    async fn write(&self, map: &RegistryMap) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Create registry dir {:?}", parent))?;
        }

        let json = serde_json::to_string_pretty(map)?;
        let tmp = self.path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4()));
        fs::write(&tmp, json)
            .await
            .with_context(|| format!("Write registry temp file {:?}", tmp))?;

        if let Err(e) = move_file(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e).context("Replace registry file");
        }

        log::debug!("[Registry] Wrote {} entries to {:?}", map.len(), self.path);
        Ok(())
    }
}
