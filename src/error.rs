use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    // Recoverable: the subtree is skipped, the scan continues
    #[error("permission denied")]
    PermissionDenied(PathBuf),

    // Fatal traversal failures
    #[error("could not resolve file type")]
    UnknownFileType(PathBuf),

    #[error("directory enumeration failed")]
    Enumeration {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("path exceeds the maximum supported length")]
    PathTooLong { path: PathBuf, limit: usize },

    #[error("cannot open directory")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    // Config
    #[error("search root lies outside the manifest base")]
    RootOutsideBase { root: PathBuf, base: PathBuf },

    #[error("no search root provided")]
    NoRoots,
}

impl ScanError {
    /// The path this error occurred at, if applicable.
    /// Callers use this to present "skipped: <path>" without pattern matching on variants.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::PermissionDenied(p) | Self::UnknownFileType(p) => Some(p),
            Self::Enumeration { path, .. }
            | Self::PathTooLong { path, .. }
            | Self::Open { path, .. }
            | Self::RootOutsideBase { root: path, .. } => Some(path),
            Self::NoRoots => None,
        }
    }

    /// Whether the scan can continue after this error.
    ///
    /// Permission-denied directories are skipped with an optional warning and
    /// contribute zero files; everything else aborts the whole scan.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }

    /// The raw operating-system error code, when the failure came from a
    /// syscall. Lets callers map fatal errors onto exit codes.
    pub fn os_error_code(&self) -> Option<i32> {
        match self {
            Self::Enumeration { source, .. } | Self::Open { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}
