//! Update engine for mods installed into game profiles.
//!
//! [`updater::Updater`] is the entry point: it checks every tracked mod of a
//! profile against a [`catalog::CatalogClient`] and replaces outdated files
//! with a backup / download / swap / commit sequence that rolls back on
//! failure.

pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod profile;
pub mod registry;
pub mod updater;
pub mod utils;

pub use catalog::{CatalogClient, DownloadStream, ModrinthCatalog};
pub use config::UpdaterConfig;
pub use error::{CatalogError, UpdateError, UpdateStep};
pub use models::{
    CatalogFile, CatalogVersion, CompatibilityTags, InstalledArtifact, UpdateReport,
    UpdateResult, UpdatedArtifact,
};
pub use profile::{DirectoryProfileManager, Profile, ProfileManager};
pub use registry::{ArtifactRegistry, RegistryEntry};
pub use updater::{
    Backup, CancelToken, ChannelListener, FanOutListener, SilentListener, UpdateEvent,
    UpdateListener, Updater,
};
pub use utils::{compare_versions, Version};
