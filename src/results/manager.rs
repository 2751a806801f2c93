use crate::config::ResultsConfig;
use crate::error::{ModelFinderError, Result};
use crate::results::cleanup::{self, CleanupReport, CleanupScope};
use crate::results::locator::{select_locator, DocumentsLocator, LocatorKind};
use crate::results::resolved::{PathOrigin, ResolvedPath};
use chrono::{Local, NaiveDate};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::Span;

const WORKING_DIRECTORY_FOLDER: &str = "results";
const UNNAMED_OUTPUT: &str = "unnamed";

/// Hands out dated, writable results directories and prunes old ones.
///
/// Every operation re-reads the filesystem; nothing is cached between calls.
/// Failures never reach the caller: each degraded step falls back to the next
/// candidate and ends at `<temp>/<folder_name>`, which is reported through
/// [`ResolvedPath::origin`].
pub struct OutputDirectoryManager {
    config: ResultsConfig,
    locator: Box<dyn DocumentsLocator>,
    temp_root: PathBuf,
    span: Span,
}

impl OutputDirectoryManager {
    pub fn new(config: ResultsConfig) -> Self {
        Self::with_locator(config, select_locator())
    }

    pub fn with_locator(config: ResultsConfig, locator: Box<dyn DocumentsLocator>) -> Self {
        let span = tracing::info_span!("results", folder = %config.folder_name);
        Self {
            config,
            locator,
            temp_root: std::env::temp_dir(),
            span,
        }
    }

    pub fn with_temp_root<P: Into<PathBuf>>(mut self, temp_root: P) -> Self {
        self.temp_root = temp_root.into();
        self
    }

    pub fn config(&self) -> &ResultsConfig {
        &self.config
    }

    /// `<temp>/<folder_name>`
    pub fn temp_fallback_base(&self) -> PathBuf {
        self.temp_root.join(&self.config.folder_name)
    }

    pub fn resolve_base_path(&self) -> ResolvedPath {
        let _enter = self.span.enter();
        let mut rejected: Vec<String> = Vec::new();

        if let Some(ref configured) = self.config.base_directory {
            match ensure_writable(configured) {
                Ok(()) => return ResolvedPath::new(configured.clone(), PathOrigin::Configured),
                Err(e) => {
                    tracing::warn!("Configured results directory unusable: {}", e);
                    rejected.push(e.to_string());
                }
            }
        }

        match self.locator.locate() {
            Ok(root) => {
                let candidate = root.join(&self.config.folder_name);
                let origin = match self.locator.kind() {
                    LocatorKind::Native => PathOrigin::Documents,
                    LocatorKind::Fixed => PathOrigin::FixedRoot,
                };
                match ensure_writable(&candidate) {
                    Ok(()) => {
                        tracing::debug!("Results directory: {}", candidate.display());
                        return ResolvedPath::new(candidate, origin)
                            .with_fallback_reason(join_reasons(&rejected));
                    }
                    Err(e) => {
                        tracing::warn!("Results directory under {} unusable: {}", root.display(), e);
                        rejected.push(e.to_string());
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Documents folder lookup failed: {}", e);
                rejected.push(e.to_string());
            }
        }

        if self.config.working_directory_fallback {
            match std::env::current_dir() {
                Ok(cwd) => {
                    let candidate = cwd.join(WORKING_DIRECTORY_FOLDER);
                    match ensure_writable(&candidate) {
                        Ok(()) => {
                            tracing::warn!("Using working directory for results: {}", candidate.display());
                            return ResolvedPath::new(candidate, PathOrigin::WorkingDirectory)
                                .with_fallback_reason(join_reasons(&rejected));
                        }
                        Err(e) => {
                            tracing::warn!("Working directory results folder unusable: {}", e);
                            rejected.push(e.to_string());
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Cannot determine working directory: {}", e);
                    rejected.push(e.to_string());
                }
            }
        }

        let temp = self.temp_fallback_base();
        tracing::warn!("Using temporary results directory: {}", temp.display());
        if let Err(e) = ensure_writable(&temp) {
            tracing::error!("Temporary results directory unusable: {}", e);
        }
        ResolvedPath::new(temp, PathOrigin::TempFallback).with_fallback_reason(join_reasons(&rejected))
    }

    /// `<base>/<YYYY-MM-DD>` for today's local date.
    pub fn create_dated_directory(&self) -> ResolvedPath {
        self.create_dated_directory_for(Local::now().date_naive())
    }

    pub fn create_dated_directory_for(&self, date: NaiveDate) -> ResolvedPath {
        let base = self.resolve_base_path();
        let _enter = self.span.enter();
        let folder = dated_folder_name(date);
        let dated = base.path().join(&folder);

        match ensure_writable(&dated) {
            Ok(()) => base.map_path(dated),
            Err(e) => {
                let fallback = self.temp_fallback_base().join(&folder);
                tracing::error!(
                    "Error creating output directory {}: {}, using temporary directory: {}",
                    dated.display(),
                    e,
                    fallback.display()
                );
                if let Err(e) = ensure_writable(&fallback) {
                    tracing::error!("Temporary output directory unusable: {}", e);
                }
                ResolvedPath::new(fallback, PathOrigin::TempFallback)
                    .with_fallback_reason(Some(e.to_string()))
            }
        }
    }

    pub fn derive_output_path(&self, original_name: &str, extension: Option<&str>) -> ResolvedPath {
        self.derive_output_path_with_prefix(original_name, extension, None)
    }

    pub fn derive_output_path_with_prefix(
        &self,
        original_name: &str,
        extension: Option<&str>,
        prefix: Option<&str>,
    ) -> ResolvedPath {
        let dated = self.create_dated_directory();
        let file_name = output_file_name(original_name, extension, prefix);
        dated.map_path(dated.path().join(file_name))
    }

    pub fn cleanup_old_directories(&self, retention_days: u32) -> CleanupReport {
        self.cleanup_old_directories_at(retention_days, SystemTime::now())
    }

    /// Cleanup using `results.retention_days`.
    pub fn cleanup_expired(&self) -> CleanupReport {
        self.cleanup_old_directories(self.config.retention_days)
    }

    pub fn cleanup_old_directories_at(&self, retention_days: u32, now: SystemTime) -> CleanupReport {
        let base = self.resolve_base_path();
        let _enter = self.span.enter();
        let report = cleanup::cleanup_directory(base.path(), retention_days, now, cleanup_scope(&base));
        tracing::debug!(
            "Cleanup of {} removed {} directories ({} failures)",
            base.path().display(),
            report.removed_count(),
            report.failures.len()
        );
        report
    }

    /// What [`cleanup_old_directories`](Self::cleanup_old_directories) would remove.
    pub fn expired_directories(&self, retention_days: u32) -> Vec<PathBuf> {
        let base = self.resolve_base_path();
        let _enter = self.span.enter();
        cleanup::expired_directories(base.path(), retention_days, SystemTime::now(), cleanup_scope(&base))
            .unwrap_or_else(|e| {
                tracing::error!("Error listing results directory {}: {}", base.path().display(), e);
                Vec::new()
            })
    }
}

/// A user-supplied base may hold unrelated folders, so only dated ones are pruned there.
fn cleanup_scope(base: &ResolvedPath) -> CleanupScope {
    match base.origin {
        PathOrigin::Configured => CleanupScope::DatedOnly,
        _ => CleanupScope::AllDirectories,
    }
}

pub fn dated_folder_name(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// File name for an output derived from `original_name`.
///
/// Only the last path segment is used (`/` and `\` both separate). A given
/// extension replaces the last one; a prefix is prepended verbatim except for
/// separators, which become `_`.
pub fn output_file_name(original_name: &str, extension: Option<&str>, prefix: Option<&str>) -> String {
    let base = original_name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or("");
    let base = match base {
        "" | "." | ".." => UNNAMED_OUTPUT,
        other => other,
    };

    let extension = extension
        .map(|ext| replace_separators(ext.trim_start_matches('.')))
        .filter(|ext| !ext.is_empty());

    let mut name = match extension {
        Some(ext) => {
            let stem = Path::new(base)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| base.to_string());
            format!("{}.{}", stem, ext)
        }
        None => base.to_string(),
    };

    if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
        name = format!("{}{}", replace_separators(prefix), name);
    }

    name
}

fn replace_separators(s: &str) -> String {
    s.chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect()
}

/// Creates `dir` if needed and proves it accepts new files.
fn ensure_writable(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| ModelFinderError::Permission {
        path: format!("Cannot create directory {}: {}", dir.display(), e),
    })?;

    tempfile::Builder::new()
        .prefix(".modelfinder_write_test")
        .tempfile_in(dir)
        .map_err(|e| ModelFinderError::Permission {
            path: format!("No write permission for directory {}: {}", dir.display(), e),
        })?;

    Ok(())
}

fn join_reasons(reasons: &[String]) -> Option<String> {
    if reasons.is_empty() {
        None
    } else {
        Some(reasons.join("; "))
    }
}
