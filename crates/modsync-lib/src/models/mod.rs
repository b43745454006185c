pub mod artifact;
pub mod catalog;
pub mod common;

pub use artifact::{InstalledArtifact, UpdateReport, UpdateResult, UpdatedArtifact};
pub use catalog::{CatalogFile, CatalogVersion};
pub use common::CompatibilityTags;
