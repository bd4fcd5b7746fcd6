use std::io::{self, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use crate::engine::{run, EngineOptions, Policy};
use crate::error::ScanError;
use crate::results::Results;
use crate::tracked::TrackedSet;
use crate::traits::Reporter;

// ---------------------------------------------------------------------------
// ScanBuilder
// ---------------------------------------------------------------------------

/// Entry point for configuring and executing a scan.
///
/// Created via [`stray::scan()`](crate::scan). Configure with chained builder
/// methods, then call [`run()`](ScanBuilder::run) to execute.
///
/// # Example
///
/// ```rust,ignore
/// let results = stray::scan()
///     .root("/etc")
///     .root("/usr")
///     .base("/")
///     .tracked(manifest)
///     .include_symlinks(false)
///     .collect_paths(true)
///     .run()?;
/// ```
pub struct ScanBuilder {
    roots: Vec<PathBuf>,
    base: Option<PathBuf>,
    tracked: TrackedSet,
    include_symlinks: bool,
    silent: bool,
    threads: usize,
    collect_paths: bool,
    collect_errors: bool,
    reporter: Option<Box<dyn Reporter>>,
}

impl Default for ScanBuilder {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            base: None,
            tracked: TrackedSet::new(),
            include_symlinks: true,
            silent: false,
            threads: 1,
            collect_paths: false,
            collect_errors: false,
            reporter: None,
        }
    }
}

impl ScanBuilder {
    // ── Roots ─────────────────────────────────────────────────────────────

    /// Add one search root. Relative paths are resolved against the working
    /// directory; a trailing slash makes no difference.
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.roots.push(path.into());
        self
    }

    /// Add several search roots at once.
    pub fn roots<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.roots.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Directory the manifest paths are relative to.
    ///
    /// Every root must then equal the base or sit below it, and membership
    /// lookups use base-relative paths — searching `/usr` against a manifest
    /// rooted at `/` matches keys like `usr/bin/bar`. By default each root is
    /// its own base.
    pub fn base(mut self, path: impl Into<PathBuf>) -> Self {
        self.base = Some(path.into());
        self
    }

    // ── Manifest ──────────────────────────────────────────────────────────

    /// Set the tracked set built from the package manifest. Defaults to an
    /// empty set, under which every file is untracked.
    pub fn tracked(mut self, tracked: TrackedSet) -> Self {
        self.tracked = tracked;
        self
    }

    // ── Policy ────────────────────────────────────────────────────────────

    /// Whether symlinks are checked and reported like regular files.
    /// Enabled by default.
    pub fn include_symlinks(mut self, yes: bool) -> Self {
        self.include_symlinks = yes;
        self
    }

    /// Suppress the per-directory warning emitted when a subtree cannot be
    /// opened. Affects only those warnings — fatal errors still propagate
    /// and `.collect_errors(true)` still records the skips.
    pub fn silent(mut self, yes: bool) -> Self {
        self.silent = yes;
        self
    }

    // ── Options ───────────────────────────────────────────────────────────

    /// Number of threads scanning roots concurrently.
    ///
    /// Defaults to 1: roots are walked sequentially, in the order given.
    /// Each root always stays on a single thread — parallelism is across
    /// roots, serializing only at the reporter. `0` selects the logical CPU
    /// count.
    pub fn threads(mut self, n: usize) -> Self {
        self.threads = n;
        self
    }

    /// Collect untracked paths into [`Results::paths`].
    ///
    /// Disabled by default to avoid allocation overhead when the reporter is
    /// the only consumer.
    pub fn collect_paths(mut self, yes: bool) -> Self {
        self.collect_paths = yes;
        self
    }

    /// Collect skipped-subtree errors into [`Results::skipped`].
    ///
    /// Disabled by default. When enabled, permission-denied directories are
    /// recorded rather than only warned about.
    pub fn collect_errors(mut self, yes: bool) -> Self {
        self.collect_errors = yes;
        self
    }

    /// Replace the default [`StdoutReporter`] with a custom sink.
    pub fn with_reporter(mut self, reporter: impl Reporter + 'static) -> Self {
        self.reporter = Some(Box::new(reporter));
        self
    }

    // ── Execute ───────────────────────────────────────────────────────────

    /// Execute the scan and return results.
    ///
    /// Blocks until every root completes or the first fatal error aborts the
    /// whole scan.
    ///
    /// # Errors
    ///
    /// Returns `Err` for configuration errors (no roots, a root outside the
    /// base) and for fatal traversal failures (unopenable directory,
    /// enumeration failure, unresolvable file type, overlong path).
    /// Permission-denied subtrees are not errors: they are skipped, warned
    /// about unless `.silent(true)`, and recorded when
    /// `.collect_errors(true)` is set.
    pub fn run(self) -> Result<Results, ScanError> {
        let Self {
            roots,
            base,
            tracked,
            include_symlinks,
            silent,
            threads,
            collect_paths,
            collect_errors,
            reporter,
        } = self;

        let reporter: Box<dyn Reporter> = match reporter {
            Some(r) => r,
            None => Box::new(StdoutReporter),
        };

        let opts = EngineOptions {
            roots,
            base,
            policy: Policy {
                include_symlinks,
                silent,
            },
            threads: if threads == 0 { num_cpus() } else { threads },
            collect_paths,
            collect_errors,
        };

        run(opts, &tracked, reporter.as_ref())
    }
}

// ---------------------------------------------------------------------------
// Built-in reporter (stray ships this as the default)
// ---------------------------------------------------------------------------

/// Writes one untracked path per line to stdout, raw bytes, and a
/// human-readable warning per unreadable directory to stderr.
pub struct StdoutReporter;

impl Reporter for StdoutReporter {
    fn on_untracked(&self, path: &Path) {
        let mut out = io::stdout().lock();
        let _ = out.write_all(path.as_os_str().as_bytes());
        let _ = out.write_all(b"\n");
    }

    fn on_denied(&self, path: &Path) {
        let _ = writeln!(
            io::stderr().lock(),
            "cannot open directory '{}': permission denied",
            path.display()
        );
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Get the logical CPU count, with a safe fallback.
fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
