use std::path::Path;

/// Sink for scan output.
///
/// Implement this to do something other than print — collect into a
/// structure, feed a UI, stream over a socket, or count.
///
/// # Thread Safety
///
/// `Send + Sync` are required — when the builder runs roots on multiple
/// threads they share one reporter, and the reporter boundary is where that
/// parallelism serializes.
///
/// # Example
///
/// ```rust
/// use std::path::{Path, PathBuf};
/// use std::sync::Mutex;
/// use stray::Reporter;
///
/// struct Collecting(Mutex<Vec<PathBuf>>);
///
/// impl Reporter for Collecting {
///     fn on_untracked(&self, path: &Path) {
///         self.0.lock().unwrap().push(path.to_path_buf());
///     }
/// }
/// ```
pub trait Reporter: Send + Sync {
    /// Called synchronously, once per untracked file, in traversal order.
    /// `path` is the full path, root included.
    fn on_untracked(&self, path: &Path);

    /// Called when a directory is skipped because opening it was denied.
    /// Never called on a silent scan. The default does nothing.
    fn on_denied(&self, _path: &Path) {}
}
