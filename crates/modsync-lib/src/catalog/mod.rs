use crate::error::CatalogError;
use crate::models::{CatalogVersion, CompatibilityTags};
use async_trait::async_trait;
use futures::stream::BoxStream;

pub mod modrinth;

pub use modrinth::ModrinthCatalog;

/// Byte stream of a download plus the length the server announced, if any.
pub struct DownloadStream {
    pub total_bytes: Option<u64>,
    pub chunks: BoxStream<'static, Result<Vec<u8>, CatalogError>>,
}

/// Remote source of truth for mod versions.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Latest version of `catalog_id` for the given compatibility tags.
    ///
    /// Implementations prefer a version matching every tag and fall back to
    /// the first version returned, so a report can still be produced.
    async fn latest_version(
        &self,
        catalog_id: &str,
        tags: &CompatibilityTags,
    ) -> Result<CatalogVersion, CatalogError>;

    async fn download(&self, url: &str) -> Result<DownloadStream, CatalogError>;
}

/// Pick the newest exact match from `versions` (ordered newest first by the
/// catalog), falling back to the first entry.
pub fn select_latest(
    catalog_id: &str,
    versions: Vec<CatalogVersion>,
    tags: &CompatibilityTags,
) -> Result<CatalogVersion, CatalogError> {
    let exact = versions.iter().position(|v| v.matches(tags));
    let mut versions = versions;

    match exact {
        Some(index) => Ok(versions.swap_remove(index)),
        None if !versions.is_empty() => {
            log::debug!(
                "[Catalog] No exact {} match for {}, using first listed version",
                tags,
                catalog_id
            );
            Ok(versions.swap_remove(0))
        }
        None => Err(CatalogError::NoCompatibleVersion {
            catalog_id: catalog_id.to_string(),
            game_version: tags.game_version.clone(),
            loader: tags.loader.clone(),
        }),
    }
}
