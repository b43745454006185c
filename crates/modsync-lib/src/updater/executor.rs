use super::backup::BackupStore;
use super::events::{UpdateEvent, UpdateListener};
use crate::catalog::CatalogClient;
use crate::config::UpdaterConfig;
use crate::error::{CatalogError, UpdateError, UpdateStep};
use crate::models::{CatalogFile, CatalogVersion, InstalledArtifact, UpdateReport, UpdatedArtifact};
use crate::profile::Profile;
use crate::registry::{ArtifactRegistry, RegistryEntry};
use crate::utils::fs::{move_file, remove_if_exists};
use anyhow::Context;
use futures::StreamExt;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

/// Replaces one mod file with its new version.
///
/// The sequence is backup, download, swap, commit. Once the backup exists any
/// failure restores the original file from it before the error is returned.
pub struct UpdateExecutor {
    catalog: Arc<dyn CatalogClient>,
    listener: Arc<dyn UpdateListener>,
    config: UpdaterConfig,
}

/// Paths touched by one replacement, used to undo it.
struct ReplaceTransaction<'a> {
    name: &'a str,
    file_name: &'a str,
    original: &'a Path,
    target: PathBuf,
    temp: PathBuf,
    placed: bool,
}

impl ReplaceTransaction<'_> {
    fn checkpoint(&self, step: UpdateStep) {
        log::debug!("[txn:{}] checkpoint {}", self.file_name, step);
    }

    /// Best-effort restore of the original file. Failures are logged only,
    /// the caller still reports the error that triggered the rollback.
    async fn rollback(&self, backups: &BackupStore, reason: &UpdateError) {
        log::warn!("[txn:{}] rollback: {}", self.file_name, reason);

        if let Err(e) = remove_if_exists(&self.temp).await {
            log::error!("[txn:{}] Failed to remove temp file: {:#}", self.file_name, e);
        }

        if self.placed && self.target != self.original {
            if let Err(e) = remove_if_exists(&self.target).await {
                log::error!(
                    "[txn:{}] Failed to remove new file {:?}: {:#}",
                    self.file_name,
                    self.target,
                    e
                );
            }
        }

        let restored = match backups.latest(self.file_name).await {
            Ok(Some(backup)) => backups.restore(&backup, self.original).await,
            Ok(None) => Err(anyhow::anyhow!("no backup of {} found", self.file_name)),
            Err(e) => Err(e),
        };

        match restored {
            Ok(()) => log::info!("[txn:{}] rolled back {}", self.file_name, self.name),
            Err(e) => log::error!(
                "[txn:{}] Rollback of {} failed: {:#}",
                self.file_name,
                self.name,
                e
            ),
        }
    }
}

impl UpdateExecutor {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        listener: Arc<dyn UpdateListener>,
        config: UpdaterConfig,
    ) -> Self {
        Self {
            catalog,
            listener,
            config,
        }
    }

    /// Update the artifact described by `report`.
    ///
    /// Fails immediately, without side effects or events, when the report
    /// carries no newer version.
    pub async fn update(
        &self,
        report: &UpdateReport,
        profile: &Profile,
    ) -> Result<UpdatedArtifact, UpdateError> {
        let artifact = &report.artifact;
        let latest = report
            .latest_version
            .as_ref()
            .ok_or_else(|| UpdateError::NoUpdateAvailable {
                name: artifact.display_name.clone(),
            })?;

        let name = artifact.display_name.clone();
        log::info!(
            "[UpdateExecutor] Updating {} {} -> {}",
            name,
            artifact.current_version,
            latest.version_number
        );
        self.listener
            .on_event(UpdateEvent::UpdateStarted { name: name.clone() });

        let result = self.replace(artifact, latest, profile).await;

        match &result {
            Ok(updated) => {
                log::info!(
                    "[UpdateExecutor] Updated {} to {} ({})",
                    name,
                    updated.new_version,
                    updated.new_file_name
                );
                self.listener.on_event(UpdateEvent::UpdateCompleted {
                    name,
                    old_version: updated.old_version.clone(),
                    new_version: updated.new_version.clone(),
                });
            }
            Err(e) => {
                log::error!("[UpdateExecutor] Update of {} failed: {}", name, e);
                self.listener.on_event(UpdateEvent::UpdateFailed {
                    name,
                    error: e.to_string(),
                });
            }
        }

        result
    }

    async fn replace(
        &self,
        artifact: &InstalledArtifact,
        latest: &CatalogVersion,
        profile: &Profile,
    ) -> Result<UpdatedArtifact, UpdateError> {
        let file = primary_file(latest, &artifact.display_name)?;
        ensure_plain_file_name(&file.file_name)?;
        let backups = BackupStore::for_profile(profile);
        let registry = ArtifactRegistry::new(profile.registry_path());

        // 1. Backup: nothing to undo if this fails
        backups
            .create(&artifact.file_path, &artifact.file_name)
            .await
            .map_err(|e| UpdateError::fs(UpdateStep::Backup, e))?;

        let mut txn = ReplaceTransaction {
            name: &artifact.display_name,
            file_name: &artifact.file_name,
            original: &artifact.file_path,
            target: profile.install_dir.join(&file.file_name),
            temp: temp_path(profile),
            placed: false,
        };
        txn.checkpoint(UpdateStep::Backup);

        let entry = RegistryEntry::from_version(
            artifact.display_name.clone(),
            artifact.catalog_id.clone(),
            file.file_name.clone(),
            latest,
            &profile.compatibility,
        );

        if let Err(e) = self.apply(&mut txn, file, &registry, entry).await {
            txn.rollback(&backups, &e).await;
            return Err(e);
        }

        if let Some(keep) = self.config.backup_retention {
            if let Err(e) = backups.prune(&artifact.file_name, keep).await {
                log::warn!(
                    "[UpdateExecutor] Failed to prune backups of {}: {:#}",
                    artifact.file_name,
                    e
                );
            }
        }

        Ok(UpdatedArtifact {
            name: artifact.display_name.clone(),
            old_file_name: artifact.file_name.clone(),
            new_file_name: file.file_name.clone(),
            old_version: artifact.current_version.clone(),
            new_version: latest.version_number.clone(),
        })
    }

    /// Download, swap and commit. Every failure leaves `txn` describing what
    /// has to be undone.
    async fn apply(
        &self,
        txn: &mut ReplaceTransaction<'_>,
        file: &CatalogFile,
        registry: &ArtifactRegistry,
        entry: RegistryEntry,
    ) -> Result<(), UpdateError> {
        // 2. Download
        self.download(&file.url, &txn.temp, txn.name).await?;
        txn.checkpoint(UpdateStep::Download);

        // 3. Swap
        if txn.target != txn.original && occupied(&txn.target).await? {
            return Err(UpdateError::fs(
                UpdateStep::Swap,
                anyhow::anyhow!("{:?} already exists", txn.target),
            ));
        }
        remove_if_exists(txn.original)
            .await
            .map_err(|e| UpdateError::fs(UpdateStep::Swap, e))?;
        move_file(&txn.temp, &txn.target)
            .await
            .map_err(|e| UpdateError::fs(UpdateStep::Swap, e))?;
        txn.placed = true;
        txn.checkpoint(UpdateStep::Swap);

        // 4. Commit
        registry
            .replace(txn.file_name, entry)
            .await
            .map_err(|e| UpdateError::fs(UpdateStep::Commit, e))?;
        txn.checkpoint(UpdateStep::Commit);

        Ok(())
    }

    /// Install the latest compatible version of a catalog project that is not
    /// installed yet. Emits `Downloading` events only.
    pub async fn install(
        &self,
        catalog_id: &str,
        display_name: &str,
        profile: &Profile,
    ) -> Result<RegistryEntry, UpdateError> {
        let registry = ArtifactRegistry::new(profile.registry_path());
        let existing = registry
            .load()
            .await
            .map_err(|e| UpdateError::fs(UpdateStep::Registry, e))?;
        if let Some(entry) = existing.values().find(|e| e.catalog_id == catalog_id) {
            return Err(UpdateError::AlreadyInstalled {
                file_name: entry.file_name.clone(),
            });
        }

        let latest = self
            .catalog
            .latest_version(catalog_id, &profile.compatibility)
            .await?;
        let file = primary_file(&latest, display_name)?;
        ensure_plain_file_name(&file.file_name)?;
        let target = profile.install_dir.join(&file.file_name);
        if occupied(&target).await? {
            return Err(UpdateError::AlreadyInstalled {
                file_name: file.file_name.clone(),
            });
        }

        log::info!(
            "[UpdateExecutor] Installing {} {} as {}",
            display_name,
            latest.version_number,
            file.file_name
        );

        let temp = temp_path(profile);
        let placed = async {
            self.download(&file.url, &temp, display_name).await?;
            fs::create_dir_all(&profile.install_dir)
                .await
                .with_context(|| format!("Create install dir {:?}", profile.install_dir))
                .map_err(|e| UpdateError::fs(UpdateStep::Swap, e))?;
            move_file(&temp, &target)
                .await
                .map_err(|e| UpdateError::fs(UpdateStep::Swap, e))
        }
        .await;

        if let Err(e) = placed {
            discard(&temp, display_name).await;
            return Err(e);
        }

        let entry = RegistryEntry::from_version(
            display_name,
            catalog_id,
            file.file_name.clone(),
            &latest,
            &profile.compatibility,
        );
        if let Err(e) = registry.upsert(entry.clone()).await {
            discard(&target, display_name).await;
            return Err(UpdateError::fs(UpdateStep::Commit, e));
        }

        Ok(entry)
    }

    /// Stream `url` into `dest`, reporting whole-percent progress.
    async fn download(&self, url: &str, dest: &Path, name: &str) -> Result<u64, UpdateError> {
        log::debug!("[UpdateExecutor] Downloading {} -> {:?}", url, dest);
        let mut download = self.catalog.download(url).await?;
        let total = download.total_bytes.filter(|t| *t > 0);

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Create download dir {:?}", parent))
                .map_err(|e| UpdateError::fs(UpdateStep::Download, e))?;
        }
        let mut file = File::create(dest)
            .await
            .with_context(|| format!("Create temp file {:?}", dest))
            .map_err(|e| UpdateError::fs(UpdateStep::Download, e))?;

        self.listener.on_event(UpdateEvent::Downloading {
            name: name.to_string(),
            percent: 0.0,
        });

        let mut received: u64 = 0;
        let mut last_percent: u64 = 0;
        while let Some(chunk) = download.chunks.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .with_context(|| format!("Write {:?}", dest))
                .map_err(|e| UpdateError::fs(UpdateStep::Download, e))?;
            received += chunk.len() as u64;

            if let Some(total) = total {
                let percent = (received as f64 / total as f64 * 100.0).min(100.0);
                if percent.floor() as u64 > last_percent {
                    last_percent = percent.floor() as u64;
                    self.listener.on_event(UpdateEvent::Downloading {
                        name: name.to_string(),
                        percent,
                    });
                }
            }
        }

        file.flush()
            .await
            .with_context(|| format!("Flush {:?}", dest))
            .map_err(|e| UpdateError::fs(UpdateStep::Download, e))?;
        drop(file);

        if let Some(expected) = total {
            if received < expected {
                return Err(CatalogError::IncompleteDownload { received, expected }.into());
            }
        }

        log::debug!("[UpdateExecutor] Downloaded {} bytes for {}", received, name);
        Ok(received)
    }
}

fn primary_file<'v>(
    version: &'v CatalogVersion,
    name: &str,
) -> Result<&'v CatalogFile, UpdateError> {
    version
        .primary_file()
        .ok_or_else(|| UpdateError::CatalogUnavailable {
            message: format!(
                "version {} of {} has no downloadable files",
                version.version_number, name
            ),
        })
}

/// Catalog file names become paths inside the install dir, so only a single
/// visible path component is accepted.
fn ensure_plain_file_name(name: &str) -> Result<(), UpdateError> {
    let plain = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(|c: char| c == '/' || c == '\\')
        && Path::new(name).file_name() == Some(OsStr::new(name));
    if plain {
        Ok(())
    } else {
        Err(UpdateError::InvalidFileName {
            file_name: name.to_string(),
        })
    }
}

/// Whether something already lives at `path`. I/O errors count as a failed swap.
async fn occupied(path: &Path) -> Result<bool, UpdateError> {
    fs::try_exists(path)
        .await
        .with_context(|| format!("Check {:?}", path))
        .map_err(|e| UpdateError::fs(UpdateStep::Swap, e))
}

/// Remove a leftover file while an install is being undone.
async fn discard(path: &Path, name: &str) {
    if let Err(e) = remove_if_exists(path).await {
        log::error!(
            "[UpdateExecutor] Failed to clean up {:?} after installing {}: {:#}",
            path,
            name,
            e
        );
    }
}

fn temp_path(profile: &Profile) -> PathBuf {
    profile
        .work_dir()
        .join(format!("{}.part", uuid::Uuid::new_v4()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CompatibilityTags;

    fn profile(root: &Path) -> Profile {
        Profile::new("survival", root, CompatibilityTags::new("1.20.1", "fabric"))
    }

    #[test]
    fn only_plain_file_names_are_accepted() {
        assert!(ensure_plain_file_name("sodium-0.5.4.jar").is_ok());
        assert!(ensure_plain_file_name("sodium 0.5.4+mc1.20.jar").is_ok());

        for name in ["", ".", "..", "../x.jar", "/tmp/x.jar", "mods/x.jar", "a\\b.jar", ".hidden.jar"] {
            assert_eq!(
                ensure_plain_file_name(name),
                Err(UpdateError::InvalidFileName {
                    file_name: name.to_string()
                }),
                "{:?}",
                name
            );
        }
    }

    #[tokio::test]
    async fn occupied_reports_io_errors_as_swap_failures() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let plain = dir.path().join("plain.jar");
        fs::write(&plain, b"x").await?;

        assert!(matches!(occupied(&plain).await, Ok(true)));
        assert!(matches!(occupied(&dir.path().join("missing.jar")).await, Ok(false)));

        // A path below a regular file is neither present nor absent
        let err = occupied(&plain.join("child.jar")).await.unwrap_err();
        assert!(matches!(
            err,
            UpdateError::FileSystem {
                step: UpdateStep::Swap,
                ..
            }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn rollback_restores_original_deleted_before_a_failed_move() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let profile = profile(dir.path());
        fs::create_dir_all(&profile.install_dir).await?;
        fs::create_dir_all(profile.work_dir()).await?;

        let original = profile.install_dir.join("lithium.jar");
        fs::write(&original, b"old lithium").await?;
        let backups = BackupStore::for_profile(&profile);
        backups.create(&original, "lithium.jar").await?;

        // Swap removed the original, the move of the download never happened
        let temp = temp_path(&profile);
        fs::write(&temp, b"new lithium").await?;
        fs::remove_file(&original).await?;

        let txn = ReplaceTransaction {
            name: "Lithium",
            file_name: "lithium.jar",
            original: &original,
            target: original.clone(),
            temp: temp.clone(),
            placed: false,
        };
        let reason = UpdateError::fs(UpdateStep::Swap, anyhow::anyhow!("move failed"));
        txn.rollback(&backups, &reason).await;

        assert_eq!(fs::read(&original).await?, b"old lithium");
        assert!(!temp.exists());
        Ok(())
    }

    #[tokio::test]
    async fn rollback_removes_placed_file_with_new_name() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let profile = profile(dir.path());
        fs::create_dir_all(&profile.install_dir).await?;

        let original = profile.install_dir.join("sodium-1.0.0.jar");
        fs::write(&original, b"old").await?;
        let backups = BackupStore::for_profile(&profile);
        backups.create(&original, "sodium-1.0.0.jar").await?;

        let target = profile.install_dir.join("sodium-1.1.0.jar");
        fs::remove_file(&original).await?;
        fs::write(&target, b"new").await?;

        let txn = ReplaceTransaction {
            name: "Sodium",
            file_name: "sodium-1.0.0.jar",
            original: &original,
            target: target.clone(),
            temp: temp_path(&profile),
            placed: true,
        };
        let reason = UpdateError::fs(UpdateStep::Commit, anyhow::anyhow!("registry unwritable"));
        txn.rollback(&backups, &reason).await;

        assert!(!target.exists());
        assert_eq!(fs::read(&original).await?, b"old");
        Ok(())
    }
}
