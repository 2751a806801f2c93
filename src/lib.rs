pub mod cli;
pub mod config;
pub mod error;
pub mod relocate;
pub mod results;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, Command, OutputFormat};
pub use config::{CliOverrides, Config, LoggingConfig, ModelEntry, RelocationConfig, ResultsConfig};
pub use error::{ModelFinderError, Result, UserFriendlyError};

pub use relocate::{ModelMover, ModelStatus, RelocationPlan, RelocationReport};
pub use results::{
    open_directory, CleanupReport, DocumentsLocator, OutputDirectoryManager, PathOrigin, ResolvedPath,
};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressManager};

use chrono::Local;
use std::path::{Path, PathBuf};
use ui::RelocationProgressBars;

/// Main library interface tying configuration, results directories and relocation together
pub struct ModelFinder {
    config: Config,
    results: OutputDirectoryManager,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
}

impl ModelFinder {
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let shutdown = GracefulShutdown::new()?;
        Ok(Self::assemble(config, output_mode, verbose, quiet, shutdown))
    }

    /// Instance without the Ctrl+C handler, which may only be installed once per process
    pub fn new_for_test(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        Self::assemble(config, output_mode, verbose, quiet, GracefulShutdown::new_for_test())
    }

    fn assemble(
        config: Config,
        output_mode: OutputMode,
        verbose: u8,
        quiet: bool,
        shutdown: GracefulShutdown,
    ) -> Self {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);
        let results = OutputDirectoryManager::new(config.results.clone());

        Self {
            config,
            results,
            output_formatter,
            progress_manager,
            shutdown,
        }
    }

    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        Self::new(config, output_mode_for(&cli_args.output_format), cli_args.verbose, cli_args.quiet)
    }

    /// Replace the results manager, e.g. with one using a custom locator
    pub fn with_results_manager(mut self, results: OutputDirectoryManager) -> Self {
        self.results = results;
        self
    }

    pub fn results(&self) -> &OutputDirectoryManager {
        &self.results
    }

    /// Remove expired dated folders. `retention_days` defaults to the configured value.
    pub fn cleanup(&self, retention_days: Option<u32>) -> CleanupReport {
        let days = retention_days.unwrap_or(self.config.results.retention_days);
        self.results.cleanup_old_directories(days)
    }

    pub fn plan_relocation(&self, downloads: &Path, install_root: &Path) -> Result<RelocationPlan> {
        self.mover().plan(downloads, install_root)
    }

    /// Copy every configured model folder found under `downloads` into `install_root`.
    ///
    /// With `write_report`, a JSON copy of the report lands in today's results
    /// directory; failing to write it only produces a warning.
    pub fn relocate(&self, downloads: &Path, install_root: &Path, write_report: bool) -> Result<RelocationReport> {
        self.shutdown.check_shutdown()?;
        self.output_formatter.start_operation("Relocating model folders");

        let bars = RelocationProgressBars::new(&self.progress_manager);
        let report = match self.mover().relocate(downloads, install_root, &bars) {
            Ok(report) => report,
            Err(e) => {
                bars.abandon();
                return Err(e);
            }
        };
        bars.finish(
            &format!("Copied {} model folder(s)", report.copied_count()),
            report.duration,
        );

        for missing in report.missing() {
            self.output_formatter.warning(&format!(
                "Skipped {}: {} not found",
                missing.name,
                missing.source.display()
            ));
        }

        if write_report {
            match self.save_relocation_report(&report) {
                Ok(path) => self
                    .output_formatter
                    .info(&format!("Saved relocation report: {}", path.display())),
                Err(e) => self
                    .output_formatter
                    .warning(&format!("Could not save relocation report: {}", e.user_message())),
            }
        }

        Ok(report)
    }

    fn mover(&self) -> ModelMover {
        ModelMover::from_config(&self.config.relocation).with_shutdown(self.shutdown.clone())
    }

    fn save_relocation_report(&self, report: &RelocationReport) -> Result<PathBuf> {
        let prefix = Local::now().format("%H%M%S_").to_string();
        let target = self
            .results
            .derive_output_path_with_prefix("relocation_report", Some("json"), Some(&prefix));

        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(target.path(), json)?;
        Ok(target.into_path())
    }

    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config)?;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    pub fn handle_error(&self, error: &ModelFinderError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

pub fn output_mode_for(format: &OutputFormat) -> OutputMode {
    match format {
        OutputFormat::Human => OutputMode::Human,
        OutputFormat::Json => OutputMode::Json,
        OutputFormat::Plain => OutputMode::Plain,
    }
}

pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
        build_date: option_env!("BUILD_DATE").unwrap_or("unknown"),
        target: std::env::consts::ARCH.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_date: &'static str,
    pub target: String,
}

impl std::fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ModelFinder {} ({}) built on {} for {}",
            self.version, self.git_hash, self.build_date, self.target
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::FixedFallback;
    use std::fs;
    use tempfile::TempDir;

    fn test_config(results_dir: &Path) -> Config {
        let mut config = Config::default();
        config.results.base_directory = Some(results_dir.to_path_buf());
        config.relocation.models = vec![ModelEntry::new("siglip", "siglip-so400m", "models/clip/siglip")];
        config
    }

    #[test]
    fn test_modelfinder_creation() {
        let temp_dir = TempDir::new().unwrap();
        let finder = ModelFinder::new_for_test(test_config(temp_dir.path()), OutputMode::Plain, 0, true);

        assert!(finder.is_running());
        assert_eq!(finder.config().results.retention_days, 30);
        assert_eq!(finder.results().resolve_base_path().path(), temp_dir.path());
    }

    #[test]
    fn test_relocate_writes_report_into_dated_directory() {
        let results = TempDir::new().unwrap();
        let downloads = TempDir::new().unwrap();
        let install = TempDir::new().unwrap();
        fs::create_dir_all(downloads.path().join("siglip-so400m")).unwrap();
        fs::write(downloads.path().join("siglip-so400m/model.bin"), b"weights").unwrap();

        let finder = ModelFinder::new_for_test(test_config(results.path()), OutputMode::Plain, 0, true);
        let report = finder.relocate(downloads.path(), install.path(), true).unwrap();

        assert_eq!(report.copied_count(), 1);
        assert!(install.path().join("models/clip/siglip/model.bin").exists());

        let dated = finder.results().create_dated_directory();
        let reports: Vec<_> = fs::read_dir(dated.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with("relocation_report.json"))
            .collect();
        assert_eq!(reports.len(), 1);
    }

    #[test]
    fn test_relocate_after_shutdown_is_cancelled() {
        let temp_dir = TempDir::new().unwrap();
        let finder = ModelFinder::new_for_test(test_config(temp_dir.path()), OutputMode::Plain, 0, true);
        finder.request_shutdown();

        let result = finder.relocate(temp_dir.path(), temp_dir.path(), false);
        assert!(matches!(result, Err(ModelFinderError::Cancelled)));
    }

    #[test]
    fn test_cleanup_uses_configured_retention() {
        let results = TempDir::new().unwrap();
        fs::create_dir(results.path().join("2020-01-01")).unwrap();

        let mut config = test_config(results.path());
        config.results.retention_days = 0;
        let finder = ModelFinder::new_for_test(config, OutputMode::Plain, 0, true);

        let report = finder.cleanup(None);
        assert_eq!(report.removed_count(), 1);
    }

    #[test]
    fn test_custom_results_manager() {
        let root = TempDir::new().unwrap();
        let config = Config::default();
        let manager = OutputDirectoryManager::with_locator(
            config.results.clone(),
            Box::new(FixedFallback::new(root.path())),
        );
        let finder = ModelFinder::new_for_test(config, OutputMode::Plain, 0, true).with_results_manager(manager);

        let base = finder.results().resolve_base_path();
        assert_eq!(base.origin, PathOrigin::FixedRoot);
        assert_eq!(base.path(), root.path().join("ModelFinder_Results"));
    }

    #[test]
    fn test_sample_config_generation() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("sample.toml");

        ModelFinder::generate_sample_config(&config_path).unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[results]"));
        assert!(content.contains("[[relocation.models]]"));
    }

    #[test]
    fn test_version_info() {
        assert!(!version_info().is_empty());
        assert!(build_info().to_string().starts_with("ModelFinder "));
    }
}
