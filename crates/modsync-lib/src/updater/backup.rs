use crate::profile::Profile;
use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;

const BACKUP_EXTENSION: &str = "bak";

/// A byte-identical copy of a mod file taken before it was replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Backup {
    /// File name of the mod the backup was taken from
    pub file_name: String,
    pub path: PathBuf,
    /// Milliseconds since the epoch, strictly increasing per file name
    pub timestamp: i64,
}

impl Backup {
    pub fn created_at(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.timestamp)
            .single()
            .unwrap_or_else(Utc::now)
    }

    fn parse(path: PathBuf) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let stem = name.strip_suffix(&format!(".{}", BACKUP_EXTENSION))?;
        let (file_name, stamp) = stem.rsplit_once('.')?;
        if file_name.is_empty() {
            return None;
        }
        let timestamp = stamp.parse().ok()?;
        Some(Self {
            file_name: file_name.to_string(),
            timestamp,
            path,
        })
    }
}

/// Backups of one profile, stored as `<file_name>.<millis>.bak`.
pub struct BackupStore {
    dir: PathBuf,
}

impl BackupStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn for_profile(profile: &Profile) -> Self {
        Self::new(profile.backup_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy `source` into the backup area under a fresh timestamped name.
    pub async fn create(&self, source: &Path, file_name: &str) -> Result<Backup> {
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Create backup dir {:?}", self.dir))?;

        let mut timestamp = Utc::now().timestamp_millis();
        if let Some(previous) = self.latest(file_name).await? {
            timestamp = timestamp.max(previous.timestamp + 1);
        }

        let mut path = self.path_for(file_name, timestamp);
        while fs::try_exists(&path).await.unwrap_or(false) {
            timestamp += 1;
            path = self.path_for(file_name, timestamp);
        }

        fs::copy(source, &path)
            .await
            .with_context(|| format!("Back up {:?} -> {:?}", source, path))?;

        log::debug!("[Backups] Backed up {} to {:?}", file_name, path);
        Ok(Backup {
            file_name: file_name.to_string(),
            path,
            timestamp,
        })
    }

    /// Backups sorted oldest first, optionally limited to one file name.
    pub async fn list(&self, file_name: Option<&str>) -> Result<Vec<Backup>> {
        let mut backups = Vec::new();
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(backups),
            Err(e) => return Err(e).with_context(|| format!("Read backup dir {:?}", self.dir)),
        };

        while let Some(entry) = entries.next_entry().await? {
            if let Some(backup) = Backup::parse(entry.path()) {
                if file_name.map_or(true, |name| backup.file_name == name) {
                    backups.push(backup);
                }
            }
        }

        backups.sort_by(|a, b| {
            a.file_name
                .cmp(&b.file_name)
                .then(a.timestamp.cmp(&b.timestamp))
        });
        Ok(backups)
    }

    pub async fn latest(&self, file_name: &str) -> Result<Option<Backup>> {
        Ok(self.list(Some(file_name)).await?.pop())
    }

    /// Copy a backup back to `destination`, replacing whatever is there.
    pub async fn restore(&self, backup: &Backup, destination: &Path) -> Result<()> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Create restore dir {:?}", parent))?;
        }
        fs::copy(&backup.path, destination)
            .await
            .with_context(|| format!("Restore {:?} -> {:?}", backup.path, destination))?;
        log::info!("[Backups] Restored {} from {:?}", backup.file_name, backup.path);
        Ok(())
    }

    /// Keep the newest `keep` backups of `file_name`, delete the rest.
    pub async fn prune(&self, file_name: &str, keep: usize) -> Result<usize> {
        let backups = self.list(Some(file_name)).await?;
        let excess = backups.len().saturating_sub(keep);
        for backup in &backups[..excess] {
            fs::remove_file(&backup.path)
                .await
                .with_context(|| format!("Remove old backup {:?}", backup.path))?;
        }
        if excess > 0 {
            log::debug!("[Backups] Pruned {} old backups of {}", excess, file_name);
        }
        Ok(excess)
    }

    fn path_for(&self, file_name: &str, timestamp: i64) -> PathBuf {
        self.dir
            .join(format!("{}.{}.{}", file_name, timestamp, BACKUP_EXTENSION))
    }
}
