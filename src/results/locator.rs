//! Lookup of the user's documents folder.
//!
//! The platform lookup sits behind [`DocumentsLocator`] so the manager never
//! branches on the host itself. [`select_locator`] picks an implementation once
//! at startup.

use crate::error::{ModelFinderError, Result};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorKind {
    Native,
    Fixed,
}

pub trait DocumentsLocator: Send + Sync {
    fn kind(&self) -> LocatorKind;

    /// Root folder results should live under. Not created here.
    fn locate(&self) -> Result<PathBuf>;
}

/// Asks the platform for the documents folder (`~/Documents`,
/// `%USERPROFILE%\Documents`, `$XDG_DOCUMENTS_DIR`).
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeDocuments;

impl DocumentsLocator for NativeDocuments {
    fn kind(&self) -> LocatorKind {
        LocatorKind::Native
    }

    fn locate(&self) -> Result<PathBuf> {
        dirs::document_dir().ok_or_else(|| ModelFinderError::PlatformLookup {
            message: format!(
                "no documents folder is defined on this host ({})",
                std::env::consts::OS
            ),
        })
    }
}

/// Always answers with the same root.
#[derive(Debug, Clone)]
pub struct FixedFallback {
    root: PathBuf,
}

impl FixedFallback {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

impl Default for FixedFallback {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl DocumentsLocator for FixedFallback {
    fn kind(&self) -> LocatorKind {
        LocatorKind::Fixed
    }

    fn locate(&self) -> Result<PathBuf> {
        Ok(self.root.clone())
    }
}

/// Native lookup when the host reports a documents folder, fixed temp root otherwise.
pub fn select_locator() -> Box<dyn DocumentsLocator> {
    match dirs::document_dir() {
        Some(dir) => {
            tracing::debug!("Using native documents lookup ({})", dir.display());
            Box::new(NativeDocuments)
        }
        None => {
            let fallback = FixedFallback::default();
            tracing::debug!(
                "No documents folder on {}, using fixed root {}",
                std::env::consts::OS,
                fallback.root.display()
            );
            Box::new(fallback)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_fallback_returns_root() {
        let locator = FixedFallback::new("/some/root");
        assert_eq!(locator.kind(), LocatorKind::Fixed);
        assert_eq!(locator.locate().unwrap(), PathBuf::from("/some/root"));
    }

    #[test]
    fn test_fixed_fallback_defaults_to_temp() {
        let locator = FixedFallback::default();
        assert_eq!(locator.locate().unwrap(), std::env::temp_dir());
    }

    #[test]
    fn test_select_locator_matches_host() {
        let locator = select_locator();
        match dirs::document_dir() {
            Some(dir) => {
                assert_eq!(locator.kind(), LocatorKind::Native);
                assert_eq!(locator.locate().unwrap(), dir);
            }
            None => assert_eq!(locator.kind(), LocatorKind::Fixed),
        }
    }

    #[test]
    fn test_native_lookup_agrees_with_dirs() {
        let result = NativeDocuments.locate();
        assert_eq!(result.is_ok(), dirs::document_dir().is_some());
    }
}
