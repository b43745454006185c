use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "modsync", version, about = "Keep the mods of your game profiles up to date")]
pub struct Cli {
    /// Config file, defaults to the platform config directory
    #[arg(short, long, env = "MODSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding one sub-directory per profile
    #[arg(long, env = "MODSYNC_PROFILES_DIR")]
    pub profiles_dir: Option<PathBuf>,

    /// Print machine readable JSON instead of tables
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Check every tracked mod of a profile for updates
    Check { profile: String },

    /// Update outdated mods
    Update {
        profile: String,

        /// Update every mod that has a newer version
        #[arg(long, default_value_t = false, conflicts_with = "files")]
        all: bool,

        /// File names of the mods to update
        #[arg(required_unless_present = "all")]
        files: Vec<String>,
    },

    /// Install a catalog project into a profile
    Install {
        profile: String,
        catalog_id: String,

        /// Display name recorded in the registry
        #[arg(long)]
        name: Option<String>,
    },

    /// Delete a tracked mod and forget it
    Remove { profile: String, file_name: String },

    /// Restore the most recent backup of a mod file
    Rollback { profile: String, file_name: String },

    /// List the backups of a profile
    Backups {
        profile: String,
        file_name: Option<String>,
    },

    /// Forget registry entries whose file was deleted by hand
    Prune { profile: String },

    #[command(subcommand)]
    Profile(ProfileCommand),
}

#[derive(Debug, Clone, Subcommand)]
pub enum ProfileCommand {
    /// Create or overwrite a profile definition
    Create {
        id: String,

        #[arg(long)]
        game_version: String,

        #[arg(long)]
        loader: String,

        /// Mods directory, relative paths are resolved against the profile
        #[arg(long)]
        install_dir: Option<PathBuf>,
    },

    /// List known profiles
    List,
}
