//! # stray
//!
//! Fast untracked-file scanner — syscall-lean, embeddable, zero opinions.
//!
//! stray reports files on disk that no installed package owns. The caller
//! supplies search roots and a [`TrackedSet`] built from a package manifest;
//! stray owns the traversal engine — descriptor-anchored enumeration with
//! batched reads, type hints with a stat fallback, and an in-place path
//! buffer — plus the membership test and the error policy. It does **not**
//! own manifest acquisition, CLI parsing, or output formatting beyond a
//! default line-per-path reporter — those belong to the caller.
//!
//! # Quick Start
//!
//! ```rust
//! use stray::TrackedSet;
//!
//! let dir = tempfile::tempdir().unwrap();
//! std::fs::write(dir.path().join("owned.conf"), "").unwrap();
//! std::fs::write(dir.path().join("orphan.cache"), "").unwrap();
//!
//! // normally loaded from your package manager's file list
//! let tracked = TrackedSet::from_paths(["owned.conf"]);
//!
//! let results = stray::scan()
//!     .root(dir.path())
//!     .tracked(tracked)
//!     .collect_paths(true)
//!     .run()
//!     .unwrap();
//!
//! assert_eq!(results.untracked, 1);
//! assert!(results.paths[0].ends_with("orphan.cache"));
//! ```
//!
//! # Custom Reporters
//!
//! By default every untracked path goes to stdout, one per line. Implement
//! [`Reporter`] to send output anywhere else:
//!
//! ```rust
//! use std::path::{Path, PathBuf};
//! use std::sync::Mutex;
//! use stray::Reporter;
//!
//! #[derive(Default)]
//! struct Collecting(Mutex<Vec<PathBuf>>);
//!
//! impl Reporter for Collecting {
//!     fn on_untracked(&self, path: &Path) {
//!         self.0.lock().unwrap().push(path.to_path_buf());
//!     }
//! }
//! ```
//!
//! # Error policy
//!
//! A directory the scan is not permitted to open is skipped with a warning
//! (suppressed by `.silent(true)`) and the rest of the tree proceeds. Every
//! other failure — unopenable directory, mid-stream enumeration error, a
//! file type that cannot be resolved, a path that would overflow the buffer
//! — aborts the whole scan with a [`ScanError`] carrying the failing path
//! and the OS error code.

#![forbid(unsafe_code)]

#[cfg(not(unix))]
compile_error!("stray relies on Unix directory semantics (openat, dirent type hints)");

mod builder;
mod engine;
mod entry;
mod error;
mod path;
mod reader;
mod results;
mod tracked;
mod traits;

// ── Public re-exports ─────────────────────────────────────────────────────────

pub use builder::{ScanBuilder, StdoutReporter};
pub use error::ScanError;
pub use results::{Results, ScanStats};
pub use tracked::TrackedSet;
pub use traits::Reporter;

// ── Entry point ───────────────────────────────────────────────────────────────

/// Create a new [`ScanBuilder`] to configure and run a scan.
///
/// # Example
///
/// ```rust
/// let dir = tempfile::tempdir().unwrap();
/// std::fs::write(dir.path().join("a.txt"), "").unwrap();
///
/// // no tracked set: every file is untracked
/// let results = stray::scan()
///     .root(dir.path())
///     .collect_paths(true)
///     .run()
///     .unwrap();
///
/// assert_eq!(results.untracked, 1);
/// ```
pub fn scan() -> ScanBuilder {
    ScanBuilder::default()
}
