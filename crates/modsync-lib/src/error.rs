use serde::Serialize;
use thiserror::Error;

/// Step of the update state machine an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStep {
    Scan,
    Backup,
    Download,
    Swap,
    Commit,
    Rollback,
    Registry,
}

impl UpdateStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateStep::Scan => "scan",
            UpdateStep::Backup => "backup",
            UpdateStep::Download => "download",
            UpdateStep::Swap => "swap",
            UpdateStep::Commit => "commit",
            UpdateStep::Rollback => "rollback",
            UpdateStep::Registry => "registry",
        }
    }
}

impl std::fmt::Display for UpdateStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors surfaced by the update engine.
///
/// Every variant carries a human readable message so it can be attached to
/// the artifact it concerns and shipped to the UI as-is.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum UpdateError {
    #[error("catalog unavailable: {message}")]
    CatalogUnavailable { message: String },

    #[error("no update available for {name}")]
    NoUpdateAvailable { name: String },

    #[error("file system failure during {step}: {message}")]
    FileSystem { step: UpdateStep, message: String },

    #[error("{file_name} is already installed")]
    AlreadyInstalled { file_name: String },

    #[error("no backup found for {file_name}")]
    BackupNotFound { file_name: String },

    #[error("catalog file name {file_name:?} is not a plain file name")]
    InvalidFileName { file_name: String },

    #[error("{file_name} is not tracked by the registry")]
    NotTracked { file_name: String },

    #[error("profile not found: {id}")]
    ProfileNotFound { id: String },

    #[error("update cancelled")]
    Cancelled,
}

impl UpdateError {
    /// Wrap an internal `anyhow` chain as a file system failure for `step`.
    pub fn fs(step: UpdateStep, err: anyhow::Error) -> Self {
        UpdateError::FileSystem {
            step,
            message: format!("{:#}", err),
        }
    }
}

impl From<CatalogError> for UpdateError {
    fn from(err: CatalogError) -> Self {
        UpdateError::CatalogUnavailable {
            message: err.to_string(),
        }
    }
}

/// Failures reported by a [`crate::catalog::CatalogClient`].
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("catalog returned status {status} for {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    #[error("failed to decode catalog response for {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no version of {catalog_id} is compatible with {game_version}/{loader}")]
    NoCompatibleVersion {
        catalog_id: String,
        game_version: String,
        loader: String,
    },

    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("download ended after {received} of {expected} bytes")]
    IncompleteDownload { received: u64, expected: u64 },

    #[error("{0}")]
    Other(String),
}
