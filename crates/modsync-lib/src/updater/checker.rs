use super::events::{UpdateEvent, UpdateListener};
use super::scanner::scan_installed;
use crate::catalog::CatalogClient;
use crate::config::UpdaterConfig;
use crate::error::{UpdateError, UpdateStep};
use crate::models::UpdateReport;
use crate::profile::Profile;
use crate::registry::ArtifactRegistry;
use crate::utils::version::is_newer;
use std::sync::Arc;

/// Compares every tracked mod of a profile with the catalog.
pub struct UpdateChecker {
    catalog: Arc<dyn CatalogClient>,
    listener: Arc<dyn UpdateListener>,
    config: UpdaterConfig,
}

impl UpdateChecker {
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

    /// Produce one report per tracked mod.
    ///
    /// A catalog failure for one mod is recorded on its report and the check
    /// moves on; only scanning the profile itself can fail the whole call.
    pub async fn check_for_updates(
        &self,
        profile: &Profile,
    ) -> Result<Vec<UpdateReport>, UpdateError> {
        let registry = ArtifactRegistry::new(profile.registry_path());
        let artifacts = scan_installed(profile, &registry, &self.config)
            .await
            .map_err(|e| UpdateError::fs(UpdateStep::Scan, e))?;

        let total = artifacts.len();
        log::info!(
            "[UpdateChecker] Checking {} mods of profile {} ({})",
            total,
            profile.id,
            profile.compatibility
        );
        self.listener.on_event(UpdateEvent::UpdateCheckStarted {
            artifact_count: total,
        });

        let mut reports = Vec::with_capacity(total);
        for (index, artifact) in artifacts.into_iter().enumerate() {
            self.listener.on_event(UpdateEvent::CheckingMod {
                name: artifact.display_name.clone(),
                position: index + 1,
                total,
            });

            let report = match self
                .catalog
                .latest_version(&artifact.catalog_id, &profile.compatibility)
                .await
            {
                Ok(latest) if is_newer(&latest.version_number, &artifact.current_version) => {
                    log::info!(
                        "[UpdateChecker] {} {} -> {}",
                        artifact.display_name,
                        artifact.current_version,
                        latest.version_number
                    );
                    UpdateReport::available(artifact, latest)
                }
                Ok(latest) => {
                    log::debug!(
                        "[UpdateChecker] {} is up to date ({} >= {})",
                        artifact.display_name,
                        artifact.current_version,
                        latest.version_number
                    );
                    UpdateReport::up_to_date(artifact)
                }
                Err(e) => {
                    log::warn!(
                        "[UpdateChecker] Failed to check {}: {}",
                        artifact.display_name,
                        e
                    );
                    UpdateReport::failed(artifact, e.to_string())
                }
            };
            reports.push(report);
        }

        let updates_available = reports.iter().filter(|r| r.has_update).count();
        log::info!(
            "[UpdateChecker] {} of {} mods have updates",
            updates_available,
            total
        );
        self.listener.on_event(UpdateEvent::UpdateCheckCompleted {
            reports: reports.clone(),
            updates_available,
        });

        Ok(reports)
    }
}
