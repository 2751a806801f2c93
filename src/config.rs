use crate::error::{ModelFinderError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

pub const DEFAULT_RESULTS_FOLDER: &str = "ModelFinder_Results";
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub results: ResultsConfig,
    pub relocation: RelocationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResultsConfig {
    /// Folder created under the documents or temp directory
    pub folder_name: String,
    pub retention_days: u32,
    pub cleanup_on_start: bool,
    /// Try `<cwd>/results` before the temp directory
    pub working_directory_fallback: bool,
    /// Skips the documents lookup when set
    pub base_directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelocationConfig {
    pub large_file_threshold: u64,
    pub overwrite_existing: bool,
    pub models: Vec<ModelEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ModelEntry {
    pub name: String,
    pub download_folder: String,
    pub target_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            folder_name: DEFAULT_RESULTS_FOLDER.to_string(),
            retention_days: DEFAULT_RETENTION_DAYS,
            cleanup_on_start: false,
            working_directory_fallback: false,
            base_directory: None,
        }
    }
}

impl Default for RelocationConfig {
    fn default() -> Self {
        Self {
            large_file_threshold: 50 * 1024 * 1024, // 50MB
            overwrite_existing: true,
            models: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

impl ModelEntry {
    pub fn new<N, F, T>(name: N, download_folder: F, target_path: T) -> Self
    where
        N: Into<String>,
        F: Into<String>,
        T: Into<PathBuf>,
    {
        Self {
            name: name.into(),
            download_folder: download_folder.into(),
            target_path: target_path.into(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ModelFinderError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ModelFinderError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ModelFinderError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["modelfinder.toml", ".modelfinder.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref dir) = cli_args.results_dir {
            self.results.base_directory = Some(dir.clone());
        }

        if let Some(days) = cli_args.retention_days {
            self.results.retention_days = days;
        }

        if let Some(overwrite) = cli_args.overwrite_existing {
            self.relocation.overwrite_existing = overwrite;
        }

        if cli_args.log_json {
            self.logging.json = true;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| ModelFinderError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| ModelFinderError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let folder = self.results.folder_name.trim();
        if folder.is_empty() {
            return Err(ModelFinderError::Config {
                message: "results.folder_name must not be empty".to_string(),
            });
        }

        if !is_single_folder_name(folder) {
            return Err(ModelFinderError::Config {
                message: format!(
                    "results.folder_name must be a single folder name, got '{}'",
                    folder
                ),
            });
        }

        for model in &self.relocation.models {
            if model.name.trim().is_empty() || model.download_folder.trim().is_empty() {
                return Err(ModelFinderError::Config {
                    message: "Every relocation model needs a name and a download_folder"
                        .to_string(),
                });
            }

            if !is_single_folder_name(&model.download_folder) {
                return Err(ModelFinderError::Config {
                    message: format!(
                        "download_folder for '{}' must be a single folder name, got '{}'",
                        model.name, model.download_folder
                    ),
                });
            }

            if !is_contained_relative(&model.target_path) {
                return Err(ModelFinderError::Config {
                    message: format!(
                        "target_path for '{}' must be relative to the install root: {}",
                        model.name,
                        model.target_path.display()
                    ),
                });
            }
        }

        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(ModelFinderError::Config {
                message: format!("Unknown log level: {}", self.logging.level),
            });
        }

        Ok(())
    }

    pub fn log_level(&self) -> tracing::Level {
        self.logging.level.parse().unwrap_or(tracing::Level::WARN)
    }

    pub fn create_sample_config() -> String {
        let mut sample_config = Self::default();
        sample_config.relocation.models = vec![
            ModelEntry::new(
                "google/siglip-so400m-patch14-384",
                "siglip-so400m-patch14-384",
                "models/clip/siglip-so400m-patch14-384",
            ),
            ModelEntry::new(
                "unsloth/Meta-Llama-3.1-8B-Instruct-bnb-4bit",
                "Meta-Llama-3.1-8B-Instruct-bnb-4bit",
                "models/LLM/Meta-Llama-3.1-8B-Instruct-bnb-4bit",
            ),
            ModelEntry::new(
                "Joy-Caption-alpha-two",
                "joy-caption-alpha-two",
                "models/Joy_caption_two",
            ),
        ];
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

/// One plain path component: no separators, not `.` or `..`, no drive prefix.
pub(crate) fn is_single_folder_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    !name.contains(['/', '\\'])
        && matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none()
}

/// True when `path` is non-empty, relative, and never climbs out via `..`.
pub(crate) fn is_contained_relative(path: &Path) -> bool {
    if path.as_os_str().is_empty() {
        return false;
    }
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub results_dir: Option<PathBuf>,
    pub retention_days: Option<u32>,
    pub overwrite_existing: Option<bool>,
    pub log_json: bool,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results_dir(mut self, results_dir: Option<PathBuf>) -> Self {
        self.results_dir = results_dir;
        self
    }

    pub fn with_retention_days(mut self, days: Option<u32>) -> Self {
        self.retention_days = days;
        self
    }

    pub fn with_overwrite_existing(mut self, overwrite: Option<bool>) -> Self {
        self.overwrite_existing = overwrite;
        self
    }

    pub fn with_log_json(mut self, json: bool) -> Self {
        self.log_json = json;
        self
    }
}
