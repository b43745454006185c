use crate::error::UpdateError;
use crate::models::CompatibilityTags;
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

const PROFILE_FILENAME: &str = "profile.json";
const REGISTRY_FILENAME: &str = "mod_registry.json";

/// An isolated installation context: its own mods directory, registry and
/// compatibility tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: String,

    /// Root directory of the profile (registry, backups, scratch space)
    pub path: PathBuf,

    /// Directory holding the installed mod files
    pub install_dir: PathBuf,

    pub compatibility: CompatibilityTags,
}

impl Profile {
    pub fn new(
        id: impl Into<String>,
        path: impl Into<PathBuf>,
        compatibility: CompatibilityTags,
    ) -> Self {
        let path = path.into();
        Self {
            id: id.into(),
            install_dir: path.join("mods"),
            path,
            compatibility,
        }
    }

    pub fn with_install_dir(mut self, install_dir: impl Into<PathBuf>) -> Self {
        self.install_dir = install_dir.into();
        self
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.path.join("backups")
    }

    /// Scratch space for in-flight downloads
    pub fn work_dir(&self) -> PathBuf {
        self.path.join("tmp")
    }

    pub fn registry_path(&self) -> PathBuf {
        self.path.join(REGISTRY_FILENAME)
    }
}

/// Resolves profile ids to profiles.
#[async_trait]
pub trait ProfileManager: Send + Sync {
    async fn profile(&self, id: &str) -> Result<Profile, UpdateError>;

    fn profile_path(&self, id: &str) -> PathBuf;
}

/// On-disk shape of `profile.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProfileFile {
    game_version: String,
    loader: String,
    /// Relative paths are resolved against the profile directory
    #[serde(default)]
    install_dir: Option<PathBuf>,
}

/// Profiles stored as `<root>/<id>/profile.json`.
pub struct DirectoryProfileManager {
    root: PathBuf,
}

impl DirectoryProfileManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create (or overwrite) a profile definition and its directories.
    pub async fn create(
        &self,
        id: &str,
        compatibility: CompatibilityTags,
        install_dir: Option<PathBuf>,
    ) -> anyhow::Result<Profile> {
        let dir = self.profile_path(id);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Create profile dir {:?}", dir))?;

        let file = ProfileFile {
            game_version: compatibility.game_version.clone(),
            loader: compatibility.loader.clone(),
            install_dir,
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(dir.join(PROFILE_FILENAME), json)
            .await
            .with_context(|| format!("Write profile {}", id))?;

        let profile = Self::resolve(id, dir, file);
        fs::create_dir_all(&profile.install_dir)
            .await
            .with_context(|| format!("Create install dir {:?}", profile.install_dir))?;
        log::info!("[Profiles] Created profile {} ({})", id, profile.compatibility);
        Ok(profile)
    }

    pub async fn list(&self) -> anyhow::Result<Vec<String>> {
        let mut ids = Vec::new();
        if !self.root.exists() {
            return Ok(ids);
        }
        let mut entries = fs::read_dir(&self.root)
            .await
            .with_context(|| format!("Read profiles dir {:?}", self.root))?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().join(PROFILE_FILENAME).exists() {
                ids.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn resolve(id: &str, dir: PathBuf, file: ProfileFile) -> Profile {
        let compatibility = CompatibilityTags::new(file.game_version, file.loader);
        let profile = Profile::new(id, dir.clone(), compatibility);
        match file.install_dir {
            Some(custom) if custom.is_absolute() => profile.with_install_dir(custom),
            Some(custom) => profile.with_install_dir(dir.join(custom)),
            None => profile,
        }
    }
}

#[async_trait]
impl ProfileManager for DirectoryProfileManager {
    async fn profile(&self, id: &str) -> Result<Profile, UpdateError> {
        let dir = self.profile_path(id);
        let path = dir.join(PROFILE_FILENAME);
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(UpdateError::ProfileNotFound { id: id.to_string() });
            }
            Err(e) => {
                return Err(UpdateError::fs(
                    crate::error::UpdateStep::Scan,
                    anyhow::Error::new(e).context(format!("Read profile {:?}", path)),
                ));
            }
        };

        let file: ProfileFile = serde_json::from_str(&contents).map_err(|e| {
            UpdateError::fs(
                crate::error::UpdateStep::Scan,
                anyhow::Error::new(e).context(format!("Parse profile {:?}", path)),
            )
        })?;

        Ok(Self::resolve(id, dir, file))
    }

    fn profile_path(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_paths_live_under_profile_root() {
        let profile = Profile::new("survival", "/data/survival", CompatibilityTags::new("1.20.1", "fabric"));
        assert_eq!(profile.install_dir, PathBuf::from("/data/survival/mods"));
        assert_eq!(profile.backup_dir(), PathBuf::from("/data/survival/backups"));
        assert_eq!(profile.work_dir(), PathBuf::from("/data/survival/tmp"));
        assert_eq!(
            profile.registry_path(),
            PathBuf::from("/data/survival/mod_registry.json")
        );
    }

    #[tokio::test]
    async fn create_then_resolve() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let manager = DirectoryProfileManager::new(dir.path());

        let created = manager
            .create("creative", CompatibilityTags::new("1.21.1", "NeoForge"), None)
            .await?;
        let loaded = manager.profile("creative").await?;

        assert_eq!(created, loaded);
        assert_eq!(loaded.compatibility.loader, "neoforge");
        assert!(loaded.install_dir.is_dir());
        assert_eq!(manager.list().await?, vec!["creative".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn relative_install_dir_is_resolved() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let manager = DirectoryProfileManager::new(dir.path());
        manager
            .create(
                "server",
                CompatibilityTags::new("1.20.1", "fabric"),
                Some(PathBuf::from("game/mods")),
            )
            .await?;

        let profile = manager.profile("server").await?;
        assert_eq!(profile.install_dir, dir.path().join("server").join("game/mods"));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_profile_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = DirectoryProfileManager::new(dir.path());
        let err = manager.profile("nope").await.unwrap_err();
        assert_eq!(err, UpdateError::ProfileNotFound { id: "nope".into() });
    }
}
