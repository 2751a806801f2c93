use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelFinderError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Permission denied: {path}")]
    Permission { path: String },

    #[error("Platform folder lookup failed: {message}")]
    PlatformLookup { message: String },

    #[error("Path validation failed: {path}")]
    InvalidPath { path: String },

    #[error("Directory does not exist: {path}")]
    MissingDirectory { path: String },

    #[error("No model folders found in {path}")]
    NoModelsFound {
        path: String,
        expected_folders: Vec<String>,
    },

    #[error("Operation was cancelled by user")]
    Cancelled,

    #[error("Failed to open directory {path}: {message}")]
    OpenFailed { path: String, message: String },

    #[error("Serialization failed: {message}")]
    Serialization { message: String },
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for ModelFinderError {
    fn user_message(&self) -> String {
        match self {
            ModelFinderError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            ModelFinderError::Permission { path } => {
                format!("Permission denied accessing: {}", path)
            }
            ModelFinderError::PlatformLookup { message } => {
                format!("Could not locate the documents folder: {}", message)
            }
            ModelFinderError::InvalidPath { path } => {
                format!("Invalid file path: {}", path)
            }
            ModelFinderError::MissingDirectory { path } => {
                format!("Directory not found: {}", path)
            }
            ModelFinderError::NoModelsFound {
                path,
                expected_folders,
            } => {
                if expected_folders.is_empty() {
                    format!("No model folders are configured for relocation (searched {})", path)
                } else {
                    format!(
                        "No model folders found in {} (expected: {})",
                        path,
                        expected_folders.join(", ")
                    )
                }
            }
            ModelFinderError::Cancelled => "Operation was cancelled by user".to_string(),
            ModelFinderError::OpenFailed { path, message } => {
                format!("Could not open {}: {}", path, message)
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            ModelFinderError::Config { .. } => Some(
                "Check your configuration file syntax, or regenerate one with `modelfinder init-config`.".to_string()
            ),
            ModelFinderError::Permission { .. } => Some(
                "Ensure you have the necessary read/write permissions for the target directory.".to_string()
            ),
            ModelFinderError::MissingDirectory { .. } => Some(
                "Check the path for typos. Paths copied with surrounding quotes are accepted.".to_string()
            ),
            ModelFinderError::NoModelsFound { .. } => Some(
                "Make sure the downloaded archives are extracted and the folders keep their original names.".to_string()
            ),
            ModelFinderError::OpenFailed { .. } => Some(
                "Open the printed path manually in your file manager.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for ModelFinderError {
    fn from(error: toml::de::Error) -> Self {
        ModelFinderError::Config {
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for ModelFinderError {
    fn from(error: serde_json::Error) -> Self {
        ModelFinderError::Serialization {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelFinderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_friendly_messages() {
        let error = ModelFinderError::MissingDirectory {
            path: "/nowhere".to_string(),
        };
        assert!(error.user_message().contains("/nowhere"));
        assert!(error.suggestion().is_some());
    }

    #[test]
    fn test_no_models_message_lists_expected_folders() {
        let error = ModelFinderError::NoModelsFound {
            path: "/downloads".to_string(),
            expected_folders: vec!["siglip".to_string(), "llama".to_string()],
        };
        let message = error.user_message();
        assert!(message.contains("siglip, llama"));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_error = toml::from_str::<toml::Value>("= broken").unwrap_err();
        let error = ModelFinderError::from(toml_error);
        assert!(matches!(error, ModelFinderError::Config { .. }));
    }

    #[test]
    fn test_cancelled_has_no_suggestion() {
        assert!(ModelFinderError::Cancelled.suggestion().is_none());
    }
}
