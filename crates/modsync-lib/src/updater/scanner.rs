use crate::config::UpdaterConfig;
use crate::models::InstalledArtifact;
use crate::profile::Profile;
use crate::registry::ArtifactRegistry;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use walkdir::WalkDir;

/// List the tracked mods of a profile.
///
/// Files without a registry record have no catalog id to query and are
/// skipped. Results are sorted by file name.
pub async fn scan_installed(
    profile: &Profile,
    registry: &ArtifactRegistry,
    config: &UpdaterConfig,
) -> Result<Vec<InstalledArtifact>> {
    if !profile.install_dir.exists() {
        log::debug!("[Scanner] Install dir {:?} does not exist", profile.install_dir);
        return Ok(Vec::new());
    }

    let entries = registry.load().await?;
    let mut artifacts = Vec::new();
    let mut untracked = 0usize;

    for entry in WalkDir::new(&profile.install_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry =
            entry.with_context(|| format!("Read install dir {:?}", profile.install_dir))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().into_owned();
        if !config.is_artifact_name(&file_name) {
            continue;
        }

        let Some(record) = entries.get(&file_name) else {
            untracked += 1;
            continue;
        };

        let metadata = entry
            .metadata()
            .with_context(|| format!("Read metadata of {:?}", entry.path()))?;
        let last_modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        artifacts.push(InstalledArtifact {
            file_name,
            file_path: entry.path().to_path_buf(),
            display_name: record.display_name.clone(),
            current_version: record.version_number.clone(),
            catalog_id: record.catalog_id.clone(),
            last_modified,
        });
    }

    log::info!(
        "[Scanner] {} tracked mods in {:?} ({} untracked)",
        artifacts.len(),
        profile.install_dir,
        untracked
    );
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CompatibilityTags;
    use crate::registry::RegistryEntry;

    fn entry(file_name: &str) -> RegistryEntry {
        RegistryEntry {
            display_name: format!("Mod {}", file_name),
            version_number: "1.0.0".into(),
            catalog_id: format!("id-{}", file_name),
            file_name: file_name.into(),
            version_id: "v1".into(),
            compatibility: CompatibilityTags::new("1.20.1", "fabric"),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn only_tracked_artifacts_are_listed() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let profile = Profile::new("p", dir.path(), CompatibilityTags::new("1.20.1", "fabric"));
        std::fs::create_dir_all(&profile.install_dir)?;
        std::fs::write(profile.install_dir.join("tracked.jar"), b"a")?;
        std::fs::write(profile.install_dir.join("manual.jar"), b"b")?;
        std::fs::write(profile.install_dir.join("readme.txt"), b"c")?;
        std::fs::create_dir_all(profile.install_dir.join("nested.jar"))?;

        let registry = ArtifactRegistry::new(profile.registry_path());
        registry.upsert(entry("tracked.jar")).await?;
        // Registered but not on disk
        registry.upsert(entry("deleted.jar")).await?;

        let artifacts = scan_installed(&profile, &registry, &UpdaterConfig::default()).await?;

        assert_eq!(artifacts.len(), 1);
        let artifact = &artifacts[0];
        assert_eq!(artifact.file_name, "tracked.jar");
        assert_eq!(artifact.catalog_id, "id-tracked.jar");
        assert_eq!(artifact.current_version, "1.0.0");
        assert_eq!(artifact.file_path, profile.install_dir.join("tracked.jar"));
        Ok(())
    }

    #[tokio::test]
    async fn missing_install_dir_is_empty() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let profile = Profile::new("p", dir.path(), CompatibilityTags::new("1.20.1", "fabric"));
        let registry = ArtifactRegistry::new(profile.registry_path());

        let artifacts = scan_installed(&profile, &registry, &UpdaterConfig::default()).await?;
        assert!(artifacts.is_empty());
        Ok(())
    }
}
