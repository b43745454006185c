pub mod backup;
pub mod batch;
pub mod checker;
pub mod events;
pub mod executor;
pub mod scanner;


pub use backup::{Backup, BackupStore};
pub use batch::{BatchCoordinator, CancelToken};
pub use checker::UpdateChecker;
pub use events::{ChannelListener, FanOutListener, SilentListener, UpdateEvent, UpdateListener};
pub use executor::UpdateExecutor;

use crate::catalog::CatalogClient;
use crate::config::UpdaterConfig;
use crate::error::{UpdateError, UpdateStep};
use crate::models::{UpdateReport, UpdateResult};
use crate::profile::{Profile, ProfileManager};
use crate::registry::{ArtifactRegistry, RegistryEntry};
use crate::utils::fs::remove_if_exists;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Entry point tying profiles, checker and batch updates together.
///
/// Every operation holds the profile's lock for its whole duration, so the
/// registry of a profile only ever has one writer. Different profiles do not
/// block each other.
pub struct Updater {
    profiles: Arc<dyn ProfileManager>,
    checker: UpdateChecker,
    executor: Arc<UpdateExecutor>,
    batch: BatchCoordinator,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl Updater {
    pub fn new(
        config: UpdaterConfig,
        catalog: Arc<dyn CatalogClient>,
        profiles: Arc<dyn ProfileManager>,
        listener: Arc<dyn UpdateListener>,
    ) -> Self {
        let checker = UpdateChecker::new(catalog.clone(), listener.clone(), config.clone());
        let executor = Arc::new(UpdateExecutor::new(catalog, listener.clone(), config));
        let batch = BatchCoordinator::new(executor.clone(), listener);
        Self {
            profiles,
            checker,
            executor,
            batch,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lock_profile(&self, id: &str) -> Result<(Profile, OwnedMutexGuard<()>), UpdateError> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
            locks
                .entry(id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let guard = lock.lock_owned().await;
        let profile = self.profiles.profile(id).await?;
        Ok((profile, guard))
    }

    pub async fn check_for_updates(&self, profile_id: &str) -> Result<Vec<UpdateReport>, UpdateError> {
        let (profile, _guard) = self.lock_profile(profile_id).await?;
        self.checker.check_for_updates(&profile).await
    }

    /// Check, then update every mod that has a newer version.
    pub async fn update_all(
        &self,
        profile_id: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<UpdateResult>, UpdateError> {
        let (profile, _guard) = self.lock_profile(profile_id).await?;
        let reports: Vec<UpdateReport> = self
            .checker
            .check_for_updates(&profile)
            .await?
            .into_iter()
            .filter(|r| r.has_update)
            .collect();
        Ok(self.batch.update_many(&reports, &profile, cancel).await)
    }

    /// Check, then update the named files.
    ///
    /// Results follow the order of `file_names`, one per name. Unknown files
    /// fail with `NotTracked`, files whose check failed carry that catalog
    /// error, files without a newer version fail with `NoUpdateAvailable`.
    pub async fn update_selected(
        &self,
        profile_id: &str,
        file_names: &[String],
        cancel: &CancelToken,
    ) -> Result<Vec<UpdateResult>, UpdateError> {
        let (profile, _guard) = self.lock_profile(profile_id).await?;
        let reports = self.checker.check_for_updates(&profile).await?;

        let mut slots: Vec<Option<UpdateResult>> = Vec::with_capacity(file_names.len());
        let mut selected = Vec::new();
        let mut positions = Vec::new();
        for (index, file_name) in file_names.iter().enumerate() {
            let report = reports.iter().find(|r| &r.artifact.file_name == file_name);
            let settled = match report {
                None => Some(UpdateResult::Failed {
                    name: file_name.clone(),
                    error: UpdateError::NotTracked {
                        file_name: file_name.clone(),
                    },
                }),
                Some(report) => match &report.error {
                    Some(message) => Some(UpdateResult::Failed {
                        name: report.name().to_string(),
                        error: UpdateError::CatalogUnavailable {
                            message: message.clone(),
                        },
                    }),
                    None => {
                        selected.push(report.clone());
                        positions.push(index);
                        None
                    }
                },
            };
            slots.push(settled);
        }

        let updated = self.batch.update_many(&selected, &profile, cancel).await;
        for (index, result) in positions.into_iter().zip(updated) {
            slots[index] = Some(result);
        }
        Ok(slots.into_iter().flatten().collect())
    }

    /// Update an already produced selection of reports.
    pub async fn update_reports(
        &self,
        profile_id: &str,
        reports: &[UpdateReport],
        cancel: &CancelToken,
    ) -> Result<Vec<UpdateResult>, UpdateError> {
        let (profile, _guard) = self.lock_profile(profile_id).await?;
        Ok(self.batch.update_many(reports, &profile, cancel).await)
    }

    pub async fn install(
        &self,
        profile_id: &str,
        catalog_id: &str,
        display_name: Option<&str>,
    ) -> Result<RegistryEntry, UpdateError> {
        let (profile, _guard) = self.lock_profile(profile_id).await?;
        self.executor
            .install(catalog_id, display_name.unwrap_or(catalog_id), &profile)
            .await
    }

    /// Put the most recent backup of `file_name` back into the install dir.
    ///
    /// Only the file is restored; the registry keeps describing whatever was
    /// installed last.
    pub async fn rollback(&self, profile_id: &str, file_name: &str) -> Result<Backup, UpdateError> {
        let (profile, _guard) = self.lock_profile(profile_id).await?;
        let store = BackupStore::for_profile(&profile);
        let backup = store
            .latest(file_name)
            .await
            .map_err(|e| UpdateError::fs(UpdateStep::Rollback, e))?
            .ok_or_else(|| UpdateError::BackupNotFound {
                file_name: file_name.to_string(),
            })?;

        store
            .restore(&backup, &profile.install_dir.join(file_name))
            .await
            .map_err(|e| UpdateError::fs(UpdateStep::Rollback, e))?;
        Ok(backup)
    }

    pub async fn list_backups(
        &self,
        profile_id: &str,
        file_name: Option<&str>,
    ) -> Result<Vec<Backup>, UpdateError> {
        let (profile, _guard) = self.lock_profile(profile_id).await?;
        BackupStore::for_profile(&profile)
            .list(file_name)
            .await
            .map_err(|e| UpdateError::fs(UpdateStep::Scan, e))
    }

    /// Delete a tracked mod file together with its registry entry.
    pub async fn remove_artifact(
        &self,
        profile_id: &str,
        file_name: &str,
    ) -> Result<RegistryEntry, UpdateError> {
        let (profile, _guard) = self.lock_profile(profile_id).await?;
        let registry = ArtifactRegistry::new(profile.registry_path());
        let entry = registry
            .remove(file_name)
            .await
            .map_err(|e| UpdateError::fs(UpdateStep::Registry, e))?
            .ok_or_else(|| UpdateError::NotTracked {
                file_name: file_name.to_string(),
            })?;

        remove_if_exists(&profile.install_dir.join(file_name))
            .await
            .map_err(|e| UpdateError::fs(UpdateStep::Swap, e))?;
        log::info!("[Updater] Removed {} from profile {}", file_name, profile.id);
        Ok(entry)
    }

    /// Drop registry entries whose file is gone from the install dir.
    pub async fn prune_registry(&self, profile_id: &str) -> Result<Vec<RegistryEntry>, UpdateError> {
        let (profile, _guard) = self.lock_profile(profile_id).await?;
        let registry = ArtifactRegistry::new(profile.registry_path());
        let install_dir = profile.install_dir.clone();
        let dropped = registry
            .retain(|entry| install_dir.join(&entry.file_name).is_file())
            .await
            .map_err(|e| UpdateError::fs(UpdateStep::Registry, e))?;
        if !dropped.is_empty() {
            log::info!(
                "[Updater] Dropped {} stale registry entries from {}",
                dropped.len(),
                profile.id
            );
        }
        Ok(dropped)
    }
}
