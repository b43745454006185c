use super::{select_latest, CatalogClient, DownloadStream};
use crate::config::UpdaterConfig;
use crate::error::CatalogError;
use crate::models::{CatalogFile, CatalogVersion, CompatibilityTags};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Url};
use serde::Deserialize;

#[derive(Deserialize)]
struct ModrinthVersion {
    id: String,
    project_id: String,
    version_number: String,
    game_versions: Vec<String>,
    loaders: Vec<String>,
    files: Vec<ModrinthFile>,
    #[serde(default)]
    changelog: Option<String>,
}

#[derive(Deserialize)]
struct ModrinthFile {
    url: String,
    filename: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    primary: bool,
}

impl From<ModrinthVersion> for CatalogVersion {
    fn from(v: ModrinthVersion) -> Self {
        CatalogVersion {
            version_id: v.id,
            project_id: v.project_id,
            version_number: v.version_number,
            game_versions: v.game_versions,
            loaders: v.loaders,
            files: v
                .files
                .into_iter()
                .map(|f| CatalogFile {
                    url: f.url,
                    file_name: f.filename,
                    size: f.size,
                    primary: f.primary,
                })
                .collect(),
            changelog: v.changelog,
        }
    }
}

/// Catalog client for the Modrinth v2 REST API.
pub struct ModrinthCatalog {
    client: Client,
    base: String,
}

impl ModrinthCatalog {
    pub fn new(config: &UpdaterConfig) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base: config.catalog_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn versions_url(&self, catalog_id: &str) -> Result<Url, CatalogError> {
        let raw = format!("{}/v2/project/{}/version", self.base, catalog_id);
        Url::parse(&raw).map_err(|source| CatalogError::InvalidUrl { url: raw, source })
    }
}

#[async_trait]
impl CatalogClient for ModrinthCatalog {
    async fn latest_version(
        &self,
        catalog_id: &str,
        tags: &CompatibilityTags,
    ) -> Result<CatalogVersion, CatalogError> {
        let url = self.versions_url(catalog_id)?;
        let params = [
            ("game_versions", format!("[\"{}\"]", tags.game_version)),
            ("loaders", format!("[\"{}\"]", tags.loader.to_lowercase())),
        ];

        log::debug!("[Modrinth] Fetching versions of {} for {}", catalog_id, tags);
        let response = self.client.get(url.clone()).query(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                status,
                url: url.to_string(),
                body,
            });
        }

        let data = response.bytes().await?;
        let versions: Vec<ModrinthVersion> =
            serde_json::from_slice(&data).map_err(|source| CatalogError::Decode {
                context: format!("versions of {}", catalog_id),
                source,
            })?;

        select_latest(
            catalog_id,
            versions.into_iter().map(CatalogVersion::from).collect(),
            tags,
        )
    }

    async fn download(&self, url: &str) -> Result<DownloadStream, CatalogError> {
        let parsed = Url::parse(url).map_err(|source| CatalogError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let response = self.client.get(parsed).send().await?;
        if !response.status().is_success() {
            return Err(CatalogError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
                body: String::new(),
            });
        }

        let total_bytes = response.content_length();
        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(CatalogError::from))
            .boxed();

        Ok(DownloadStream {
            total_bytes,
            chunks,
        })
    }
}
