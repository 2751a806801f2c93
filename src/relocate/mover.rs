use crate::config::{is_contained_relative, is_single_folder_name, ModelEntry, RelocationConfig};
use crate::error::{ModelFinderError, Result};
use crate::ui::GracefulShutdown;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct RelocationProgress {
    pub files_copied: usize,
    pub total_files: usize,
    pub bytes_copied: u64,
    pub total_bytes: u64,
    pub current_file: Option<String>,
    pub start_time: Instant,
    pub errors: Vec<String>,
}

impl RelocationProgress {
    pub fn new(total_files: usize, total_bytes: u64) -> Self {
        Self {
            files_copied: 0,
            total_files,
            bytes_copied: 0,
            total_bytes,
            current_file: None,
            start_time: Instant::now(),
            errors: Vec::new(),
        }
    }

    pub fn update_file(&mut self, filename: String, bytes: u64) {
        self.files_copied += 1;
        self.bytes_copied += bytes;
        self.current_file = Some(filename);
    }

    pub fn add_error<S: Into<String>>(&mut self, error: S) {
        self.errors.push(error.into());
    }

    pub fn percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            0.0
        } else {
            (self.bytes_copied as f64 / self.total_bytes as f64) * 100.0
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Callbacks fired while model folders are copied. All methods default to no-ops.
pub trait RelocationObserver {
    fn relocation_started(&self, _total_files: usize, _total_bytes: u64) {}

    fn model_started(&self, _index: usize, _total: usize, _model: &PlannedModel) {}

    fn file_copied(&self, _progress: &RelocationProgress) {}

    fn large_file_started(&self, _name: &str, _size: u64) {}

    fn large_file_advanced(&self, _bytes: u64) {}

    fn large_file_finished(&self) {}

    fn model_finished(&self, _outcome: &ModelOutcome) {}
}

pub struct NoopObserver;

impl RelocationObserver for NoopObserver {}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedModel {
    pub name: String,
    pub source: PathBuf,
    pub target: PathBuf,
    pub total_files: usize,
    pub total_bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelocationPlan {
    pub downloads_dir: PathBuf,
    pub install_root: PathBuf,
    pub present: Vec<PlannedModel>,
    pub missing: Vec<ModelEntry>,
}

impl RelocationPlan {
    pub fn total_files(&self) -> usize {
        self.present.iter().map(|m| m.total_files).sum()
    }

    pub fn total_bytes(&self) -> u64 {
        self.present.iter().map(|m| m.total_bytes).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    Copied,
    /// Some files failed to copy
    Partial,
    /// `download_folder` not found in the downloads directory
    Missing,
    /// Target folder could not be created; nothing was copied
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelOutcome {
    pub name: String,
    pub source: PathBuf,
    pub target: PathBuf,
    pub status: ModelStatus,
    pub files_copied: usize,
    pub bytes_copied: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelocationReport {
    pub downloads_dir: PathBuf,
    pub install_root: PathBuf,
    pub models: Vec<ModelOutcome>,
    pub files_copied: usize,
    pub bytes_copied: u64,
    pub duration: Duration,
    pub finished_at: DateTime<Utc>,
    pub errors: Vec<String>,
}

impl RelocationReport {
    pub fn copied_count(&self) -> usize {
        self.models
            .iter()
            .filter(|m| m.status == ModelStatus::Copied)
            .count()
    }

    pub fn missing(&self) -> impl Iterator<Item = &ModelOutcome> {
        self.models.iter().filter(|m| m.status == ModelStatus::Missing)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Copies downloaded model folders into an install root following the manifest.
pub struct ModelMover {
    models: Vec<ModelEntry>,
    overwrite_existing: bool,
    large_file_threshold: u64,
    buffer_size: usize,
    shutdown: Option<GracefulShutdown>,
}

impl ModelMover {
    pub fn new(models: Vec<ModelEntry>) -> Self {
        let defaults = RelocationConfig::default();
        Self {
            models,
            overwrite_existing: defaults.overwrite_existing,
            large_file_threshold: defaults.large_file_threshold,
            buffer_size: 1024 * 1024, // 1MB chunks
            shutdown: None,
        }
    }

    pub fn from_config(config: &RelocationConfig) -> Self {
        Self::new(config.models.clone())
            .with_overwrite_existing(config.overwrite_existing)
            .with_large_file_threshold(config.large_file_threshold)
    }

    pub fn with_overwrite_existing(mut self, overwrite: bool) -> Self {
        self.overwrite_existing = overwrite;
        self
    }

    pub fn with_large_file_threshold(mut self, threshold: u64) -> Self {
        self.large_file_threshold = threshold;
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(4096); // Minimum 4KB buffer
        self
    }

    pub fn with_shutdown(mut self, shutdown: GracefulShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Which manifest entries exist under `downloads_dir`, without copying anything.
    pub fn plan(&self, downloads_dir: &Path, install_root: &Path) -> Result<RelocationPlan> {
        require_directory(downloads_dir)?;
        require_directory(install_root)?;

        let mut present = Vec::new();
        let mut missing = Vec::new();

        for model in &self.models {
            if !is_contained_relative(&model.target_path) {
                return Err(ModelFinderError::InvalidPath {
                    path: format!(
                        "target_path for '{}' escapes the install root: {}",
                        model.name,
                        model.target_path.display()
                    ),
                });
            }

            if !is_single_folder_name(&model.download_folder) {
                return Err(ModelFinderError::InvalidPath {
                    path: format!(
                        "download_folder for '{}' is not a folder name: {}",
                        model.name, model.download_folder
                    ),
                });
            }

            let source = downloads_dir.join(&model.download_folder);
            if !source.is_dir() {
                tracing::warn!("Source directory {} does not exist, skipping", source.display());
                missing.push(model.clone());
                continue;
            }

            let (total_files, total_bytes) = tree_stats(&source);
            present.push(PlannedModel {
                name: model.name.clone(),
                target: install_root.join(&model.target_path),
                source,
                total_files,
                total_bytes,
            });
        }

        Ok(RelocationPlan {
            downloads_dir: downloads_dir.to_path_buf(),
            install_root: install_root.to_path_buf(),
            present,
            missing,
        })
    }

    pub fn relocate(
        &self,
        downloads_dir: &Path,
        install_root: &Path,
        observer: &dyn RelocationObserver,
    ) -> Result<RelocationReport> {
        let plan = self.plan(downloads_dir, install_root)?;

        if plan.present.is_empty() {
            return Err(ModelFinderError::NoModelsFound {
                path: downloads_dir.display().to_string(),
                expected_folders: self
                    .models
                    .iter()
                    .map(|m| m.download_folder.clone())
                    .collect(),
            });
        }

        let mut progress = RelocationProgress::new(plan.total_files(), plan.total_bytes());
        observer.relocation_started(progress.total_files, progress.total_bytes);

        let mut outcomes = Vec::with_capacity(self.models.len());
        let total = plan.present.len();

        for (index, planned) in plan.present.iter().enumerate() {
            self.check_shutdown()?;
            observer.model_started(index, total, planned);
            tracing::info!(
                "[{}/{}] Copying {} from {} to {}",
                index + 1,
                total,
                planned.name,
                planned.source.display(),
                planned.target.display()
            );

            let outcome = self.copy_model(planned, &mut progress, observer)?;
            observer.model_finished(&outcome);
            outcomes.push(outcome);
        }

        for model in &plan.missing {
            outcomes.push(ModelOutcome {
                name: model.name.clone(),
                source: downloads_dir.join(&model.download_folder),
                target: install_root.join(&model.target_path),
                status: ModelStatus::Missing,
                files_copied: 0,
                bytes_copied: 0,
            });
        }

        Ok(RelocationReport {
            downloads_dir: plan.downloads_dir,
            install_root: plan.install_root,
            models: outcomes,
            files_copied: progress.files_copied,
            bytes_copied: progress.bytes_copied,
            duration: progress.elapsed(),
            finished_at: Utc::now(),
            errors: progress.errors,
        })
    }

    fn copy_model(
        &self,
        planned: &PlannedModel,
        progress: &mut RelocationProgress,
        observer: &dyn RelocationObserver,
    ) -> Result<ModelOutcome> {
        let errors_before = progress.errors.len();
        let mut files_copied = 0;
        let mut bytes_copied = 0;

        if let Err(e) = fs::create_dir_all(&planned.target) {
            let message = format!("Failed to create {}: {}", planned.target.display(), e);
            tracing::error!("{}", message);
            progress.add_error(message);
            return Ok(ModelOutcome {
                name: planned.name.clone(),
                source: planned.source.clone(),
                target: planned.target.clone(),
                status: ModelStatus::Failed,
                files_copied: 0,
                bytes_copied: 0,
            });
        }

        for entry in WalkDir::new(&planned.source).min_depth(1).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    progress.add_error(format!("Failed to read {}: {}", planned.source.display(), e));
                    continue;
                }
            };

            let relative = match entry.path().strip_prefix(&planned.source) {
                Ok(relative) => relative,
                Err(_) => continue,
            };
            let dest = planned.target.join(relative);
            let file_type = entry.file_type();

            if file_type.is_dir() {
                if let Err(e) = fs::create_dir_all(&dest) {
                    progress.add_error(format!("Failed to create {}: {}", dest.display(), e));
                }
                continue;
            }

            if !file_type.is_file() {
                tracing::warn!("Skipping non-regular file {}", entry.path().display());
                continue;
            }

            self.check_shutdown()?;

            match self.copy_file(entry.path(), &dest, observer) {
                Ok(bytes) => {
                    files_copied += 1;
                    bytes_copied += bytes;
                    progress.update_file(relative.display().to_string(), bytes);
                    observer.file_copied(progress);
                }
                Err(e) => {
                    let message = format!("Failed to copy {}: {}", entry.path().display(), e);
                    tracing::error!("{}", message);
                    progress.add_error(message);
                }
            }
        }

        let status = if progress.errors.len() > errors_before {
            ModelStatus::Partial
        } else {
            ModelStatus::Copied
        };

        Ok(ModelOutcome {
            name: planned.name.clone(),
            source: planned.source.clone(),
            target: planned.target.clone(),
            status,
            files_copied,
            bytes_copied,
        })
    }

    fn copy_file(&self, source: &Path, dest: &Path, observer: &dyn RelocationObserver) -> Result<u64> {
        if dest.exists() && !self.overwrite_existing {
            return Err(ModelFinderError::InvalidPath {
                path: format!("Destination already exists: {}", dest.display()),
            });
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let size = fs::metadata(source)?.len();
        let large = size > self.large_file_threshold;
        if large {
            let name = source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            observer.large_file_started(&name, size);
        }

        let result = self.copy_with_buffer(source, dest, |bytes| {
            if large {
                observer.large_file_advanced(bytes);
            }
        });

        if large {
            observer.large_file_finished();
        }

        result
    }

    fn copy_with_buffer<F: FnMut(u64)>(&self, source: &Path, dest: &Path, mut on_chunk: F) -> Result<u64> {
        let source_file = fs::File::open(source)?;
        let dest_file = fs::File::create(dest)?;

        let mut reader = BufReader::with_capacity(self.buffer_size, source_file);
        let mut writer = BufWriter::with_capacity(self.buffer_size, dest_file);

        let mut total_bytes = 0u64;
        let mut buffer = vec![0u8; self.buffer_size];

        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }

            writer.write_all(&buffer[..bytes_read])?;
            total_bytes += bytes_read as u64;
            on_chunk(bytes_read as u64);
        }

        writer.flush()?;

        if let Ok(modified_time) = fs::metadata(source).and_then(|m| m.modified()) {
            let _ = filetime::set_file_mtime(dest, filetime::FileTime::from_system_time(modified_time));
        }

        Ok(total_bytes)
    }

    fn check_shutdown(&self) -> Result<()> {
        match self.shutdown {
            Some(ref shutdown) => shutdown.check_shutdown(),
            None => Ok(()),
        }
    }
}

fn require_directory(path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(ModelFinderError::MissingDirectory {
            path: path.display().to_string(),
        })
    }
}

/// Regular-file count and total size below `path`. Unreadable entries are skipped.
pub fn tree_stats(path: &Path) -> (usize, u64) {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .fold((0, 0), |(files, bytes), metadata| (files + 1, bytes + metadata.len()))
}
