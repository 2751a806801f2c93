use crate::config::{CliOverrides, Config};
use crate::error::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "modelfinder")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Manage dated results folders and relocate downloaded models")]
#[command(
    long_about = "ModelFinder keeps per-day results folders under your Documents directory \
                  (falling back to the temp directory when needed), prunes old ones, and \
                  copies downloaded model folders into an application's install tree."
)]
#[command(before_help = "📁 ModelFinder - Results & Model Relocation Tool")]
#[command(after_help = "EXAMPLES:\n  \
    modelfinder dated\n  \
    modelfinder output-path photo.png --extension json --prefix caption_\n  \
    modelfinder cleanup --retention-days 7 --dry-run\n  \
    modelfinder relocate --downloads ~/Downloads/models --install-root ./app\n  \
    modelfinder init-config modelfinder.toml")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file path
    #[arg(short, long, global = true, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Use this directory as the results base instead of Documents
    #[arg(long, global = true, env = "MODELFINDER_RESULTS_DIR")]
    pub results_dir: Option<PathBuf>,

    /// Output format for results
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Emit log records as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the resolved results base directory
    Base,

    /// Create (if needed) and print the dated results directory
    Dated {
        /// Date to use instead of today (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },

    /// Print the output path for a file inside today's results directory
    OutputPath {
        /// Original file name or path; only the final component is used
        name: String,

        /// Replace the file extension
        #[arg(short, long)]
        extension: Option<String>,

        /// Prepend to the file name
        #[arg(short, long)]
        prefix: Option<String>,
    },

    /// Remove dated results directories older than the retention period
    Cleanup {
        /// Override results.retention_days
        #[arg(long)]
        retention_days: Option<u32>,

        /// List what would be removed without deleting anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Copy downloaded model folders into the install tree
    Relocate {
        /// Directory containing the downloaded model folders
        #[arg(long, value_parser = parse_user_path)]
        downloads: PathBuf,

        /// Application root the target paths are relative to
        #[arg(long, value_parser = parse_user_path)]
        install_root: PathBuf,

        /// Show what would be copied without copying
        #[arg(long)]
        dry_run: bool,

        /// Skip writing relocation_report.json into the results directory
        #[arg(long)]
        no_report: bool,

        /// Keep files that already exist in the install tree
        #[arg(long)]
        no_overwrite: bool,
    },

    /// Open today's results directory in the system file manager
    Open,

    /// Write a sample configuration file
    InitConfig {
        /// Where to write the file
        #[arg(default_value = "modelfinder.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        let (retention_days, overwrite_existing) = match self.command {
            Command::Cleanup { retention_days, .. } => (retention_days, None),
            Command::Relocate { no_overwrite, .. } => (None, no_overwrite.then_some(false)),
            _ => (None, None),
        };

        CliOverrides::new()
            .with_results_dir(self.results_dir.clone())
            .with_retention_days(retention_days)
            .with_overwrite_existing(overwrite_existing)
            .with_log_json(self.log_json)
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose > 0 && !self.quiet
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

pub fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| format!("Invalid date '{}': expected YYYY-MM-DD", s))
}

/// Accepts pasted paths, which often arrive wrapped in quotes.
pub fn parse_user_path(s: &str) -> std::result::Result<PathBuf, String> {
    let trimmed = s.trim().trim_matches(|c| c == '"' || c == '\'').trim();

    if trimmed.is_empty() {
        return Err("Path must not be empty".to_string());
    }

    Ok(PathBuf::from(trimmed))
}
