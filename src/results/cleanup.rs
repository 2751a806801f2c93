use crate::error::Result;
use chrono::NaiveDate;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    pub base: PathBuf,
    pub retention_days: u32,
    pub removed: Vec<PathBuf>,
    pub failures: Vec<CleanupFailure>,
    pub base_missing: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanupFailure {
    pub path: PathBuf,
    pub error: String,
}

impl CleanupReport {
    fn new(base: &Path, retention_days: u32) -> Self {
        Self {
            base: base.to_path_buf(),
            retention_days,
            ..Self::default()
        }
    }

    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Which top-level directories a cleanup pass may consider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupScope {
    /// Every directory; used for the application's own results folder
    AllDirectories,
    /// Only `YYYY-MM-DD` directories; used when the base is user-supplied
    DatedOnly,
}

impl CleanupScope {
    fn admits(self, name: &str) -> bool {
        match self {
            CleanupScope::AllDirectories => true,
            CleanupScope::DatedOnly => is_dated_name(name),
        }
    }
}

pub fn is_dated_name(name: &str) -> bool {
    name.len() == 10 && NaiveDate::parse_from_str(name, "%Y-%m-%d").is_ok()
}

pub fn retention_window(retention_days: u32) -> Duration {
    Duration::from_secs(u64::from(retention_days) * SECONDS_PER_DAY)
}

/// Top-level directories of `base` whose age at `now` is at least `retention_days`.
///
/// Symlinks and plain files are ignored, as are directories outside `scope`.
/// Entries with a modification time in the future count as age zero.
pub fn expired_directories(
    base: &Path,
    retention_days: u32,
    now: SystemTime,
    scope: CleanupScope,
) -> Result<Vec<PathBuf>> {
    let window = retention_window(retention_days);
    let mut expired = Vec::new();

    for entry in fs::read_dir(base)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry in {}: {}", base.display(), e);
                continue;
            }
        };

        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir || !scope.admits(&entry.file_name().to_string_lossy()) {
            continue;
        }

        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                tracing::warn!(
                    "Cannot read modification time of {}: {}",
                    entry.path().display(),
                    e
                );
                continue;
            }
        };

        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age >= window {
            expired.push(entry.path());
        }
    }

    expired.sort();
    Ok(expired)
}

/// Removes expired directories under `base`. Never fails; problems end up in the report.
pub fn cleanup_directory(
    base: &Path,
    retention_days: u32,
    now: SystemTime,
    scope: CleanupScope,
) -> CleanupReport {
    let mut report = CleanupReport::new(base, retention_days);

    if !base.exists() {
        tracing::warn!("Results directory does not exist: {}", base.display());
        report.base_missing = true;
        return report;
    }

    let candidates = match expired_directories(base, retention_days, now, scope) {
        Ok(candidates) => candidates,
        Err(e) => {
            tracing::error!("Error listing results directory {}: {}", base.display(), e);
            report.failures.push(CleanupFailure {
                path: base.to_path_buf(),
                error: e.to_string(),
            });
            return report;
        }
    };

    for dir in candidates {
        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                tracing::info!("Cleaned old results directory: {}", dir.display());
                report.removed.push(dir);
            }
            Err(e) => {
                tracing::error!("Error cleaning directory {}: {}", dir.display(), e);
                report.failures.push(CleanupFailure {
                    path: dir,
                    error: e.to_string(),
                });
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;
    use tempfile::TempDir;

    fn age_directory(path: &Path, days: u64) {
        let then = SystemTime::now() - Duration::from_secs(days * SECONDS_PER_DAY);
        filetime::set_file_mtime(path, FileTime::from_system_time(then)).unwrap();
    }

    #[test]
    fn test_retention_window() {
        assert_eq!(retention_window(0), Duration::ZERO);
        assert_eq!(retention_window(2), Duration::from_secs(172_800));
    }

    #[test]
    fn test_only_old_directories_are_expired() {
        let temp_dir = TempDir::new().unwrap();
        let old = temp_dir.path().join("2020-01-01");
        let fresh = temp_dir.path().join("2020-02-01");
        fs::create_dir(&old).unwrap();
        fs::create_dir(&fresh).unwrap();
        age_directory(&old, 45);
        age_directory(&fresh, 2);

        let expired = expired_directories(temp_dir.path(), 30, SystemTime::now(), CleanupScope::AllDirectories).unwrap();
        assert_eq!(expired, vec![old]);
    }

    #[test]
    fn test_files_are_never_candidates() {
        let temp_dir = TempDir::new().unwrap();
        let stray = temp_dir.path().join("notes.txt");
        fs::write(&stray, "keep me").unwrap();
        age_directory(&stray, 400);

        let report = cleanup_directory(temp_dir.path(), 0, SystemTime::now(), CleanupScope::AllDirectories);
        assert_eq!(report.removed_count(), 0);
        assert!(stray.exists());
    }

    #[test]
    fn test_zero_retention_removes_everything() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["2024-01-01", "2024-01-02", "2024-01-03"] {
            let dir = temp_dir.path().join(name);
            fs::create_dir(&dir).unwrap();
            fs::write(dir.join("out.bin"), b"data").unwrap();
        }

        let report = cleanup_directory(temp_dir.path(), 0, SystemTime::now(), CleanupScope::AllDirectories);
        assert_eq!(report.removed_count(), 3);
        assert!(report.is_clean());
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_future_mtime_counts_as_fresh() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("later");
        fs::create_dir(&dir).unwrap();
        let future = SystemTime::now() + Duration::from_secs(3 * SECONDS_PER_DAY);
        filetime::set_file_mtime(&dir, FileTime::from_system_time(future)).unwrap();

        let expired = expired_directories(temp_dir.path(), 1, SystemTime::now(), CleanupScope::AllDirectories).unwrap();
        assert!(expired.is_empty());
    }

    #[test]
    fn test_dated_scope_keeps_other_directories() {
        let temp_dir = TempDir::new().unwrap();
        let dated = temp_dir.path().join("2020-01-01");
        let project = temp_dir.path().join("my-project");
        let near_miss = temp_dir.path().join("2020-1-1");
        for dir in [&dated, &project, &near_miss] {
            fs::create_dir(dir).unwrap();
        }

        let report = cleanup_directory(temp_dir.path(), 0, SystemTime::now(), CleanupScope::DatedOnly);
        assert_eq!(report.removed, vec![dated]);
        assert!(project.exists());
        assert!(near_miss.exists());

        let report = cleanup_directory(temp_dir.path(), 0, SystemTime::now(), CleanupScope::AllDirectories);
        assert_eq!(report.removed_count(), 2);
        assert!(!project.exists());
    }

    #[test]
    fn test_dated_names() {
        assert!(is_dated_name("2024-02-29"));
        assert!(!is_dated_name("2023-02-29"));
        assert!(!is_dated_name("2024-2-9"));
        assert!(!is_dated_name("2024-02-29-old"));
        assert!(!is_dated_name("results"));
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_removal_is_reported_and_others_continue() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let stuck = temp_dir.path().join("2020-01-01");
        let locked = stuck.join("locked");
        let other = temp_dir.path().join("2020-01-02");
        fs::create_dir_all(&locked).unwrap();
        fs::write(locked.join("out.bin"), b"data").unwrap();
        fs::create_dir(&other).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        // Permission bits do not bind a privileged user
        if fs::write(locked.join("check"), b"").is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let report = cleanup_directory(temp_dir.path(), 0, SystemTime::now(), CleanupScope::DatedOnly);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(report.removed, vec![other.clone()]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, stuck);
        assert!(!report.failures[0].error.is_empty());
        assert!(!report.is_clean());
        assert!(!other.exists());
    }

    #[test]
    fn test_missing_base_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("does-not-exist");

        let report = cleanup_directory(&missing, 0, SystemTime::now(), CleanupScope::AllDirectories);
        assert_eq!(report.removed_count(), 0);
        assert!(report.base_missing);
        assert!(report.is_clean());
    }
}
