use crate::relocate::{ModelOutcome, ModelStatus, PlannedModel, RelocationObserver, RelocationProgress};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::cell::RefCell;
use std::time::Duration;

pub struct ProgressManager {
    multi_progress: MultiProgress,
    enabled: bool,
}

impl ProgressManager {
    pub fn new(enabled: bool) -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            enabled,
        }
    }

    pub fn create_file_progress(&self, total_files: u64) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = self.multi_progress.add(ProgressBar::new(total_files));
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>7}/{len:7} files {msg}"
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-")
        );
        pb.set_message("Copying files...");
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    pub fn create_bytes_progress(&self, total_bytes: u64, message: &str) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = self.multi_progress.add(ProgressBar::new(total_bytes));
        pb.set_style(
            ProgressStyle::with_template(
                "  [{elapsed_precise}] [{bar:40.magenta/blue}] {bytes:>7}/{total_bytes:7} {bytes_per_sec} {msg}"
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
        );
        pb.set_message(message.to_string());
        pb
    }

    pub fn suspend<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if self.enabled {
            self.multi_progress.suspend(f)
        } else {
            f()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new(true)
    }
}

pub fn update_file_progress(pb: &ProgressBar, progress: &RelocationProgress) {
    pb.set_position(progress.files_copied as u64);

    match progress.current_file {
        Some(ref current_file) => pb.set_message(format!(
            "{} ({:.0}%)",
            current_file,
            progress.percentage()
        )),
        None => pb.set_message("Copying files..."),
    }
}

pub fn finish_progress_with_summary(pb: &ProgressBar, message: &str, duration: Duration) {
    let final_message = format!("{} (completed in {})", message, format_duration(duration));
    pb.finish_with_message(final_message);
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", duration.as_millis())
    }
}

/// Terminal progress for a relocation: one bar for the file count, plus a
/// byte bar while a file above the large-file threshold is being copied.
pub struct RelocationProgressBars<'a> {
    manager: &'a ProgressManager,
    files: RefCell<Option<ProgressBar>>,
    large_file: RefCell<Option<ProgressBar>>,
}

impl<'a> RelocationProgressBars<'a> {
    pub fn new(manager: &'a ProgressManager) -> Self {
        Self {
            manager,
            files: RefCell::new(None),
            large_file: RefCell::new(None),
        }
    }

    pub fn finish(&self, message: &str, duration: Duration) {
        if let Some(pb) = self.files.borrow_mut().take() {
            finish_progress_with_summary(&pb, message, duration);
        }
    }

    pub fn abandon(&self) {
        if let Some(pb) = self.large_file.borrow_mut().take() {
            pb.abandon();
        }
        if let Some(pb) = self.files.borrow_mut().take() {
            pb.abandon_with_message("Relocation interrupted");
        }
    }
}

impl RelocationObserver for RelocationProgressBars<'_> {
    fn relocation_started(&self, total_files: usize, _total_bytes: u64) {
        *self.files.borrow_mut() = Some(self.manager.create_file_progress(total_files as u64));
    }

    fn model_started(&self, index: usize, total: usize, model: &PlannedModel) {
        if let Some(ref pb) = *self.files.borrow() {
            pb.set_message(format!("[{}/{}] {}", index + 1, total, model.name));
        }
    }

    fn file_copied(&self, progress: &RelocationProgress) {
        if let Some(ref pb) = *self.files.borrow() {
            update_file_progress(pb, progress);
        }
    }

    fn large_file_started(&self, name: &str, size: u64) {
        *self.large_file.borrow_mut() = Some(self.manager.create_bytes_progress(size, name));
    }

    fn large_file_advanced(&self, bytes: u64) {
        if let Some(ref pb) = *self.large_file.borrow() {
            pb.inc(bytes);
        }
    }

    fn large_file_finished(&self) {
        if let Some(pb) = self.large_file.borrow_mut().take() {
            pb.finish_and_clear();
        }
    }

    fn model_finished(&self, outcome: &ModelOutcome) {
        let message = match outcome.status {
            ModelStatus::Partial => format!("{} copied with errors", outcome.name),
            ModelStatus::Failed => format!("{} could not be copied", outcome.name),
            ModelStatus::Copied | ModelStatus::Missing => return,
        };
        self.manager.suspend(|| tracing::warn!("{}", message));
    }
}
