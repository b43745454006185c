use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

/// Move a file, falling back to copy + delete when the rename crosses devices.
pub async fn move_file(src: &Path, dest: &Path) -> Result<()> {
    match fs::rename(src, dest).await {
        Ok(_) => Ok(()),
        Err(err) if is_cross_device_link(&err) => {
            fs::copy(src, dest)
                .await
                .with_context(|| format!("Copy file {:?} -> {:?}", src, dest))?;
            fs::remove_file(src)
                .await
                .with_context(|| format!("Remove source file {:?}", src))?;
            Ok(())
        }
        Err(err) => Err(err).with_context(|| format!("Move file {:?} -> {:?}", src, dest)),
    }
}

/// Remove a file if it exists. Returns whether something was removed.
pub async fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path).await {
        Ok(_) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err).with_context(|| format!("Remove file {:?}", path)),
    }
}

fn is_cross_device_link(err: &std::io::Error) -> bool {
    #[cfg(target_family = "unix")]
    {
        // EXDEV
        err.raw_os_error() == Some(18)
    }

    #[cfg(not(target_family = "unix"))]
    {
        let _ = err;
        false
    }
}
