use clap::Parser;
use modelfinder::{
    open_directory, output_mode_for, Cli, Command, Config, ModelFinder, ModelFinderError, OutputFormatter,
    OutputMode, UserFriendlyError,
};
use std::path::Path;
use std::process;
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::prelude::*;

fn main() {
    let exit_code = run();
    process::exit(exit_code);
}

fn run() -> i32 {
    let cli = Cli::parse();

    if let Command::InitConfig { ref path, force } = cli.command {
        return handle_init_config(path, force);
    }

    let finder = match ModelFinder::from_cli(&cli) {
        Ok(finder) => finder,
        Err(e) => {
            init_logging(&Config::default(), &cli);
            print_startup_error(&e, output_mode_for(&cli.output_format));
            return exit_code_for(&e);
        }
    };

    init_logging(finder.config(), &cli);
    tracing::debug!("{}", modelfinder::build_info());

    cleanup_on_start(&cli.command, &finder);

    match execute(&cli.command, &finder) {
        Ok(code) => code,
        Err(e) => {
            finder.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

/// Prunes expired result folders before `command` when `results.cleanup_on_start` is set.
/// Returns how many folders were removed.
fn cleanup_on_start(command: &Command, finder: &ModelFinder) -> usize {
    if !finder.config().results.cleanup_on_start || matches!(command, Command::Cleanup { .. }) {
        return 0;
    }

    let report = finder.cleanup(None);
    if report.removed_count() > 0 {
        finder.output_formatter().info(&format!(
            "Removed {} expired result folder(s)",
            report.removed_count()
        ));
    }
    report.removed_count()
}

fn execute(command: &Command, finder: &ModelFinder) -> modelfinder::Result<i32> {
    let formatter = finder.output_formatter();
    let results = finder.results();

    match command {
        Command::Base => {
            formatter.print_path("Results base", &results.resolve_base_path());
            Ok(0)
        }
        Command::Dated { date } => {
            let dated = match date {
                Some(date) => results.create_dated_directory_for(*date),
                None => results.create_dated_directory(),
            };
            formatter.print_path("Results directory", &dated);
            Ok(0)
        }
        Command::OutputPath {
            name,
            extension,
            prefix,
        } => {
            let output = results.derive_output_path_with_prefix(name, extension.as_deref(), prefix.as_deref());
            formatter.print_path("Output path", &output);
            Ok(0)
        }
        Command::Cleanup { dry_run, .. } => {
            let retention_days = finder.config().results.retention_days;
            if *dry_run {
                let base = results.resolve_base_path();
                let candidates = results.expired_directories(retention_days);
                formatter.print_cleanup_candidates(base.path(), retention_days, &candidates);
                return Ok(0);
            }

            let report = finder.cleanup(Some(retention_days));
            formatter.print_cleanup_report(&report);
            Ok(if report.is_clean() { 0 } else { 2 })
        }
        Command::Relocate {
            downloads,
            install_root,
            dry_run,
            no_report,
            ..
        } => {
            if *dry_run {
                let plan = finder.plan_relocation(downloads, install_root)?;
                formatter.print_relocation_plan(&plan);
                return Ok(0);
            }

            let report = finder.relocate(downloads, install_root, !no_report)?;
            formatter.print_relocation_report(&report);
            Ok(if report.has_errors() { 2 } else { 0 })
        }
        Command::Open => {
            let dated = results.create_dated_directory();
            open_directory(dated.path())?;
            formatter.success(&format!("Opened {}", dated.path().display()));
            Ok(0)
        }
        Command::InitConfig { path, force } => Ok(handle_init_config(path, *force)),
    }
}

/// Log records go to stderr so stdout stays usable for paths and JSON output.
fn init_logging(config: &Config, cli: &Cli) {
    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => config.log_level(),
            1 => config.log_level().max(Level::INFO),
            2 => config.log_level().max(Level::DEBUG),
            _ => Level::TRACE,
        }
    };
    let filter = LevelFilter::from_level(level);
    let json = config.logging.json || cli.log_json;

    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter)
    });
    let text_layer = (!json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .with_filter(filter)
    });

    tracing_subscriber::registry()
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .ok();
}

fn handle_init_config(path: &Path, force: bool) -> i32 {
    if path.exists() && !force {
        eprintln!(
            "Configuration file already exists: {} (use --force to overwrite)",
            path.display()
        );
        return 1;
    }

    match ModelFinder::generate_sample_config(path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", path.display());
            println!("\nTo use this configuration:");
            println!("  modelfinder --config {} dated", path.display());
            println!("\nEdit [[relocation.models]] to list the model folders you download.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn exit_code_for(error: &ModelFinderError) -> i32 {
    match error {
        ModelFinderError::Cancelled => 130, // Interrupted (SIGINT)
        ModelFinderError::Config { .. } => 3,
        ModelFinderError::MissingDirectory { .. } => 4,
        ModelFinderError::NoModelsFound { .. } => 5,
        ModelFinderError::Permission { .. } => 6,
        _ => 1,
    }
}

fn print_startup_error(error: &ModelFinderError, mode: OutputMode) {
    let formatter = OutputFormatter::new(mode, 0, false);
    formatter.print_user_friendly_error(error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelfinder::ModelEntry;
    use std::fs;
    use tempfile::TempDir;

    fn finder_for(results_dir: &Path) -> ModelFinder {
        let mut config = Config::default();
        config.results.base_directory = Some(results_dir.to_path_buf());
        config.relocation.models = vec![ModelEntry::new("m", "m-download", "models/m")];
        ModelFinder::new_for_test(config, OutputMode::Plain, 0, true)
    }

    #[test]
    fn test_init_config_command() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("modelfinder.toml");

        assert_eq!(handle_init_config(&config_path, false), 0);
        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[relocation]"));

        // Existing file is left alone without --force
        assert_eq!(handle_init_config(&config_path, false), 1);
        assert_eq!(handle_init_config(&config_path, true), 0);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code_for(&ModelFinderError::Cancelled), 130);
        assert_eq!(
            exit_code_for(&ModelFinderError::MissingDirectory {
                path: "x".to_string()
            }),
            4
        );
        assert_eq!(
            exit_code_for(&ModelFinderError::NoModelsFound {
                path: "x".to_string(),
                expected_folders: Vec::new(),
            }),
            5
        );
        assert_eq!(
            exit_code_for(&ModelFinderError::Serialization {
                message: "x".to_string()
            }),
            1
        );
    }

    #[test]
    fn test_dated_command_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let finder = finder_for(temp_dir.path());
        let date = chrono::NaiveDate::from_ymd_opt(2024, 5, 17);

        let code = execute(&Command::Dated { date }, &finder).unwrap();
        assert_eq!(code, 0);
        assert!(temp_dir.path().join("2024-05-17").is_dir());
    }

    #[test]
    fn test_relocate_with_no_models_found() {
        let results = TempDir::new().unwrap();
        let downloads = TempDir::new().unwrap();
        let install = TempDir::new().unwrap();
        let finder = finder_for(results.path());

        let command = Command::Relocate {
            downloads: downloads.path().to_path_buf(),
            install_root: install.path().to_path_buf(),
            dry_run: false,
            no_report: true,
            no_overwrite: false,
        };

        let error = execute(&command, &finder).unwrap_err();
        assert_eq!(exit_code_for(&error), 5);
    }

    #[test]
    fn test_cleanup_on_start_runs_before_other_commands() {
        let temp_dir = TempDir::new().unwrap();
        let old = temp_dir.path().join("2020-01-01");
        fs::create_dir(&old).unwrap();
        let mut config = finder_for(temp_dir.path()).config().clone();
        config.results.retention_days = 0;

        let disabled = ModelFinder::new_for_test(config.clone(), OutputMode::Plain, 0, true);
        assert_eq!(cleanup_on_start(&Command::Base, &disabled), 0);
        assert!(old.exists());

        config.results.cleanup_on_start = true;
        let finder = ModelFinder::new_for_test(config, OutputMode::Plain, 0, true);
        let cleanup = Command::Cleanup {
            retention_days: None,
            dry_run: true,
        };
        assert_eq!(cleanup_on_start(&cleanup, &finder), 0);
        assert!(old.exists());

        assert_eq!(cleanup_on_start(&Command::Base, &finder), 1);
        assert!(!old.exists());
    }

    #[test]
    fn test_cleanup_dry_run_keeps_directories() {
        let temp_dir = TempDir::new().unwrap();
        let old = temp_dir.path().join("2020-01-01");
        fs::create_dir(&old).unwrap();
        let mut finder_config = finder_for(temp_dir.path()).config().clone();
        finder_config.results.retention_days = 0;
        let finder = ModelFinder::new_for_test(finder_config, OutputMode::Plain, 0, true);

        let code = execute(
            &Command::Cleanup {
                retention_days: None,
                dry_run: true,
            },
            &finder,
        )
        .unwrap();

        assert_eq!(code, 0);
        assert!(old.exists());
    }
}
