use crate::error::{ModelFinderError, Result};
use std::path::Path;
use std::process::Command;

/// Name of the program that shows a folder in the desktop file manager.
pub fn launcher() -> &'static str {
    if cfg!(target_os = "windows") {
        "explorer"
    } else if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    }
}

pub fn open_directory(path: &Path) -> Result<()> {
    if !path.is_dir() {
        return Err(ModelFinderError::MissingDirectory {
            path: path.display().to_string(),
        });
    }

    let mut child = Command::new(launcher())
        .arg(path)
        .spawn()
        .map_err(|e| ModelFinderError::OpenFailed {
            path: path.display().to_string(),
            message: format!("could not start {}: {}", launcher(), e),
        })?;

    // explorer.exe exits with 1 even when the window opened
    if cfg!(target_os = "windows") {
        tracing::info!("Opened directory: {}", path.display());
        return Ok(());
    }

    let status = child.wait().map_err(|e| ModelFinderError::OpenFailed {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    if !status.success() {
        return Err(ModelFinderError::OpenFailed {
            path: path.display().to_string(),
            message: format!("{} exited with {}", launcher(), status),
        });
    }

    tracing::info!("Opened directory: {}", path.display());
    Ok(())
}
