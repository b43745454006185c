mod args;
mod console;

use anyhow::{Context, Result};
use clap::Parser as _;
use directories::ProjectDirs;
use modsync_lib::updater::Backup;
use modsync_lib::{
    CancelToken, CompatibilityTags, DirectoryProfileManager, ModrinthCatalog, SilentListener,
    UpdateListener, UpdateReport, UpdateResult, Updater, UpdaterConfig,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::args::{Cli, Command, ProfileCommand};
use crate::console::ConsoleListener;

const CONFIG_FILENAME: &str = "config.json";

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt.block_on(async_main(cli)),
        Err(err) => {
            log::error!("Failed to create tokio runtime: {:?}", err);
            std::process::exit(1);
        }
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("MODSYNC_LOG", default))
        .format_timestamp(None)
        .init();
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "modsync", "modsync")
}

fn config_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => project_dirs()
            .map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
            .context("Could not determine a config directory, pass --config"),
    }
}

fn profiles_dir(cli: &Cli, config: &UpdaterConfig) -> Result<PathBuf> {
    if let Some(dir) = cli.profiles_dir.clone().or_else(|| config.profiles_dir.clone()) {
        return Ok(dir);
    }
    project_dirs()
        .map(|dirs| dirs.data_dir().join("profiles"))
        .context("Could not determine a data directory, pass --profiles-dir")
}

/// Returns `false` when some per-mod operation failed.
async fn async_main(cli: Cli) -> Result<bool> {
    log::trace!("args = {:#?}", cli);

    let config = UpdaterConfig::load(&config_path(&cli)?).await?;
    let profiles = Arc::new(DirectoryProfileManager::new(profiles_dir(&cli, &config)?));

    if let Command::Profile(command) = &cli.command {
        return run_profile_command(&profiles, command, cli.json).await;
    }

    let catalog = Arc::new(ModrinthCatalog::new(&config).context("Create catalog client")?);
    let listener: Arc<dyn UpdateListener> = if cli.json {
        Arc::new(SilentListener)
    } else {
        Arc::new(ConsoleListener::new())
    };
    let updater = Updater::new(config, catalog, profiles, listener);

    match cli.command {
        Command::Check { profile } => {
            let reports = updater.check_for_updates(&profile).await?;
            if cli.json {
                print_json(&reports)?;
            } else {
                print_reports(&reports);
            }
            Ok(reports.iter().all(|r| r.error.is_none()))
        }
        Command::Update {
            profile,
            all,
            files,
        } => {
            let cancel = cancel_on_ctrl_c();
            let results = if all {
                updater.update_all(&profile, &cancel).await?
            } else {
                updater.update_selected(&profile, &files, &cancel).await?
            };
            if cli.json {
                print_json(&results)?;
            } else {
                print_results(&results);
            }
            Ok(results.iter().all(UpdateResult::is_success))
        }
        Command::Install {
            profile,
            catalog_id,
            name,
        } => {
            let entry = updater
                .install(&profile, &catalog_id, name.as_deref())
                .await?;
            if cli.json {
                print_json(&entry)?;
            } else {
                println!(
                    "installed {} {} as {}",
                    entry.display_name, entry.version_number, entry.file_name
                );
            }
            Ok(true)
        }
        Command::Remove { profile, file_name } => {
            let entry = updater.remove_artifact(&profile, &file_name).await?;
            if cli.json {
                print_json(&entry)?;
            } else {
                println!("removed {} ({})", entry.display_name, entry.file_name);
            }
            Ok(true)
        }
        Command::Rollback { profile, file_name } => {
            let backup = updater.rollback(&profile, &file_name).await?;
            if cli.json {
                print_json(&backup)?;
            } else {
                println!(
                    "restored {} from backup taken {}",
                    backup.file_name,
                    backup.created_at().format("%Y-%m-%d %H:%M:%S")
                );
            }
            Ok(true)
        }
        Command::Backups { profile, file_name } => {
            let backups = updater.list_backups(&profile, file_name.as_deref()).await?;
            if cli.json {
                print_json(&backups)?;
            } else {
                print_backups(&backups);
            }
            Ok(true)
        }
        Command::Prune { profile } => {
            let dropped = updater.prune_registry(&profile).await?;
            if cli.json {
                print_json(&dropped)?;
            } else if dropped.is_empty() {
                println!("registry is clean");
            } else {
                for entry in &dropped {
                    println!("forgot {} ({})", entry.display_name, entry.file_name);
                }
            }
            Ok(true)
        }
        Command::Profile(_) => Ok(true),
    }
}

async fn run_profile_command(
    profiles: &DirectoryProfileManager,
    command: &ProfileCommand,
    json: bool,
) -> Result<bool> {
    match command {
        ProfileCommand::Create {
            id,
            game_version,
            loader,
            install_dir,
        } => {
            let profile = profiles
                .create(
                    id,
                    CompatibilityTags::new(game_version.clone(), loader.clone()),
                    install_dir.clone(),
                )
                .await?;
            println!(
                "created profile {} ({}) installing into {}",
                profile.id,
                profile.compatibility,
                profile.install_dir.display()
            );
        }
        ProfileCommand::List => {
            let ids = profiles.list().await?;
            if json {
                print_json(&ids)?;
            } else if ids.is_empty() {
                println!("no profiles in {}", profiles.root().display());
            } else {
                for id in ids {
                    println!("{}", id);
                }
            }
        }
    }
    Ok(true)
}

/// Cancel the running batch on the first Ctrl-C. The mod being updated
/// still finishes.
fn cancel_on_ctrl_c() -> CancelToken {
    let (tx, cancel) = CancelToken::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Cancelling after the current mod...");
            tx.send_replace(true);
        }
    });
    cancel
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_reports(reports: &[UpdateReport]) {
    if reports.is_empty() {
        println!("no tracked mods");
        return;
    }

    let width = reports.iter().map(|r| r.name().len()).max().unwrap_or(0);
    for report in reports {
        let status = match (&report.error, &report.latest_version) {
            (Some(error), _) => format!("error: {}", error),
            (None, Some(latest)) if report.has_update => format!(
                "{} -> {} ({})",
                report.artifact.current_version,
                latest.version_number,
                human_size(report.update_size_bytes)
            ),
            _ => format!("{} (up to date)", report.artifact.current_version),
        };
        println!("{:width$}  {}", report.name(), status, width = width);
    }

    let available = reports.iter().filter(|r| r.has_update).count();
    println!("\n{} of {} mods can be updated", available, reports.len());
}

fn print_results(results: &[UpdateResult]) {
    let updated = results.iter().filter(|r| r.is_success()).count();
    for result in results.iter().filter(|r| !r.is_success()) {
        if let Some(error) = result.error() {
            println!("{}: {}", result.name(), error);
        }
    }
    println!("{} updated, {} failed", updated, results.len() - updated);
}

fn print_backups(backups: &[Backup]) {
    if backups.is_empty() {
        println!("no backups");
        return;
    }
    for backup in backups {
        println!(
            "{}  {}  {}",
            backup.created_at().format("%Y-%m-%d %H:%M:%S"),
            backup.file_name,
            display_name(&backup.path)
        );
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
