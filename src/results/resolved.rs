use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Where a results path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathOrigin {
    /// Base directory given in config, flag or environment
    Configured,
    /// Platform documents folder
    Documents,
    /// Root handed out by a fixed locator on hosts without a documents folder
    FixedRoot,
    /// `<cwd>/results`
    WorkingDirectory,
    /// `<temp>/<folder_name>`, the last resort
    TempFallback,
}

impl PathOrigin {
    pub fn is_fallback(&self) -> bool {
        !matches!(self, PathOrigin::Configured | PathOrigin::Documents)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PathOrigin::Configured => "configured",
            PathOrigin::Documents => "documents folder",
            PathOrigin::FixedRoot => "fixed root",
            PathOrigin::WorkingDirectory => "working directory",
            PathOrigin::TempFallback => "temp fallback",
        }
    }
}

impl fmt::Display for PathOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A path handed out by the results manager together with how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPath {
    pub path: PathBuf,
    pub origin: PathOrigin,
    /// Why the preferred candidates were rejected, when any were
    pub fallback_reason: Option<String>,
}

impl ResolvedPath {
    pub fn new(path: PathBuf, origin: PathOrigin) -> Self {
        Self {
            path,
            origin,
            fallback_reason: None,
        }
    }

    pub fn with_fallback_reason<S: Into<String>>(mut self, reason: Option<S>) -> Self {
        self.fallback_reason = reason.map(Into::into);
        self
    }

    pub fn is_fallback(&self) -> bool {
        self.origin.is_fallback()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }

    /// Same origin, different path. Used when descending into a child.
    pub(crate) fn map_path(&self, path: PathBuf) -> Self {
        Self {
            path,
            origin: self.origin,
            fallback_reason: self.fallback_reason.clone(),
        }
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_classification() {
        assert!(!PathOrigin::Configured.is_fallback());
        assert!(!PathOrigin::Documents.is_fallback());
        assert!(PathOrigin::FixedRoot.is_fallback());
        assert!(PathOrigin::WorkingDirectory.is_fallback());
        assert!(PathOrigin::TempFallback.is_fallback());
    }

    #[test]
    fn test_map_path_keeps_origin() {
        let base = ResolvedPath::new(PathBuf::from("/r"), PathOrigin::TempFallback)
            .with_fallback_reason(Some("no documents folder"));
        let child = base.map_path(PathBuf::from("/r/2024-01-02"));

        assert_eq!(child.origin, PathOrigin::TempFallback);
        assert_eq!(child.fallback_reason.as_deref(), Some("no documents folder"));
        assert_eq!(child.path(), Path::new("/r/2024-01-02"));
    }
}
