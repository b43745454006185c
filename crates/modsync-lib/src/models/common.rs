use serde::{Deserialize, Serialize};

/// Environment descriptors a catalog version must match to be installable
/// into a profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompatibilityTags {
    /// Minecraft version ID (e.g., "1.20.1")
    pub game_version: String,

    /// Modloader name as used by the catalog (e.g., "fabric", "neoforge")
    pub loader: String,
}

impl CompatibilityTags {
    pub fn new(game_version: impl Into<String>, loader: impl Into<String>) -> Self {
        Self {
            game_version: game_version.into(),
            loader: loader.into().to_lowercase(),
        }
    }
}

impl std::fmt::Display for CompatibilityTags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.game_version, self.loader)
    }
}
