pub mod cleanup;
pub mod locator;
pub mod manager;
pub mod open;
pub mod resolved;

pub use cleanup::{cleanup_directory, expired_directories, CleanupFailure, CleanupReport, CleanupScope};
pub use locator::{select_locator, DocumentsLocator, FixedFallback, LocatorKind, NativeDocuments};
pub use manager::{output_file_name, OutputDirectoryManager};
pub use open::open_directory;
pub use resolved::{PathOrigin, ResolvedPath};
