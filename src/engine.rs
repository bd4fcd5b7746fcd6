use std::env;
use std::ffi::OsStr;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Instant;

use rustix::io::Errno;
use tracing::debug;

use crate::entry::{EntryType, RawEntry};
use crate::error::ScanError;
use crate::path::{Mark, PathBuffer};
use crate::reader::{DirReader, HintResolver, StatResolver, TypeResolver, BATCH_CAPACITY};
use crate::results::{Results, ScanStats};
use crate::tracked::TrackedSet;
use crate::traits::Reporter;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Traversal policy, fixed for the lifetime of a scan.
///
/// `pub(crate)` — callers configure these via the builder methods
/// (`.include_symlinks()`, `.silent()`).
pub(crate) struct Policy {
    pub include_symlinks: bool,
    pub silent: bool,
}

// ---------------------------------------------------------------------------
// Engine options
// ---------------------------------------------------------------------------

/// Internal options passed from the builder to `run()`.
pub(crate) struct EngineOptions {
    pub roots: Vec<PathBuf>,
    pub base: Option<PathBuf>,
    pub policy: Policy,
    pub threads: usize,
    pub collect_paths: bool,
    pub collect_errors: bool,
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Everything the per-root walks share: the immutable tracked set, the
/// reporter boundary, relaxed counters, opt-in collectors, and the
/// cancellation flag a fatal error raises to stop sibling roots.
struct Shared<'a> {
    tracked: &'a TrackedSet,
    reporter: &'a dyn Reporter,
    policy: Policy,
    collect_paths: bool,
    collect_errors: bool,
    files: AtomicUsize,
    dirs: AtomicUsize,
    untracked: AtomicUsize,
    paths: Mutex<Vec<PathBuf>>,
    skipped: Mutex<Vec<ScanError>>,
    cancel: AtomicBool,
}

// ---------------------------------------------------------------------------
// run()
// ---------------------------------------------------------------------------

/// Execute a scan over every configured root.
///
/// This is the core engine. Roots run sequentially by default; with
/// `threads > 1` they run concurrently, each root on one thread with its own
/// path buffer and descriptor chain. The first fatal error cancels the rest.
pub(crate) fn run(
    opts: EngineOptions,
    tracked: &TrackedSet,
    reporter: &dyn Reporter,
) -> Result<Results, ScanError> {
    if opts.roots.is_empty() {
        return Err(ScanError::NoRoots);
    }

    let base = match &opts.base {
        Some(base) => Some(normalize_root(base)?),
        None => None,
    };

    let mut roots = Vec::with_capacity(opts.roots.len());
    for root in &opts.roots {
        let root = normalize_root(root)?;
        if let Some(base) = &base {
            if !within(&root, base) {
                return Err(ScanError::RootOutsideBase {
                    root: bytes_path(&root),
                    base: bytes_path(base),
                });
            }
        }
        roots.push(root);
    }

    let shared = Shared {
        tracked,
        reporter,
        policy: opts.policy,
        collect_paths: opts.collect_paths,
        collect_errors: opts.collect_errors,
        files: AtomicUsize::new(0),
        dirs: AtomicUsize::new(0),
        untracked: AtomicUsize::new(0),
        paths: Mutex::new(Vec::new()),
        skipped: Mutex::new(Vec::new()),
        cancel: AtomicBool::new(false),
    };

    let start = Instant::now();

    let workers = opts.threads.min(roots.len());
    if workers == 1 {
        for root in &roots {
            walk_root(root, base.as_deref(), &shared)?;
        }
    } else {
        let next = AtomicUsize::new(0);
        let fatal: Mutex<Option<ScanError>> = Mutex::new(None);

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    if shared.cancel.load(Ordering::Relaxed) {
                        break;
                    }
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(root) = roots.get(index) else { break };
                    if let Err(err) = walk_root(root, base.as_deref(), &shared) {
                        shared.cancel.store(true, Ordering::Relaxed);
                        if let Ok(mut slot) = fatal.lock() {
                            if slot.is_none() {
                                *slot = Some(err);
                            }
                        }
                        break;
                    }
                });
            }
        });

        if let Some(err) = fatal.into_inner().unwrap_or(None) {
            return Err(err);
        }
    }

    let duration = start.elapsed();

    let files = shared.files.load(Ordering::Relaxed);
    let dirs = shared.dirs.load(Ordering::Relaxed);
    let untracked = shared.untracked.load(Ordering::Relaxed);
    let paths = shared.paths.into_inner().unwrap_or_default();
    let skipped = shared.skipped.into_inner().unwrap_or_default();

    Ok(Results {
        untracked,
        paths,
        stats: ScanStats::compute(files, dirs, duration),
        skipped,
    })
}

// ---------------------------------------------------------------------------
// Per-root walk
// ---------------------------------------------------------------------------

/// One open directory on the descent: its reader (descriptor + enumeration
/// cursor), the unconsumed remainder of the current batch, and the path mark
/// to pop when the frame completes. The root frame pushed no segment, so it
/// carries no mark.
struct Frame {
    reader: DirReader,
    batch: Vec<RawEntry>,
    mark: Option<Mark>,
}

impl Frame {
    fn root(reader: DirReader) -> Self {
        Self {
            reader,
            batch: Vec::with_capacity(BATCH_CAPACITY),
            mark: None,
        }
    }

    fn child(reader: DirReader, mark: Mark) -> Self {
        Self {
            reader,
            batch: Vec::with_capacity(BATCH_CAPACITY),
            mark: Some(mark),
        }
    }
}

/// Depth-first walk of a single root over an explicit frame stack.
///
/// Live descriptors equal the current depth — one per frame — so resource
/// use is bounded by tree depth, not breadth.
fn walk_root(root: &[u8], base: Option<&[u8]>, shared: &Shared<'_>) -> Result<(), ScanError> {
    let base = base.unwrap_or(root);
    let mut path = PathBuffer::new(base, root)?;
    debug!(root = %path.full().display(), "scanning root");

    let reader = match DirReader::open_root(path.full()) {
        Ok(reader) => reader,
        Err(Errno::ACCESS) => {
            denied(&path, shared);
            return Ok(());
        }
        Err(err) => {
            return Err(ScanError::Open {
                path: path.to_path_buf(),
                source: err.into(),
            });
        }
    };
    shared.dirs.fetch_add(1, Ordering::Relaxed);

    let mut stack = vec![Frame::root(reader)];

    while let Some(frame) = stack.last_mut() {
        let Some(entry) = frame.batch.pop() else {
            // Batch refills are the frame boundary — also where a sibling
            // root's fatal error is observed.
            if shared.cancel.load(Ordering::Relaxed) {
                return Ok(());
            }
            match frame.reader.next_batch(&mut frame.batch) {
                Ok(true) => continue,
                Ok(false) => {
                    if let Some(done) = stack.pop() {
                        if let Some(mark) = done.mark {
                            path.pop(mark);
                        }
                    }
                    continue;
                }
                Err(err) => {
                    return Err(ScanError::Enumeration {
                        path: path.to_path_buf(),
                        source: err.into(),
                    });
                }
            }
        };

        if entry.is_dot() {
            continue;
        }

        let mark = path.push(entry.name.to_bytes())?;

        let hint = HintResolver(entry.hint);
        let resolver: &dyn TypeResolver = if entry.hint == EntryType::Unknown {
            &StatResolver
        } else {
            &hint
        };
        let kind = resolver.resolve(&frame.reader, &entry.name);

        let mut descend = None;
        match kind {
            EntryType::Unknown => {
                return Err(ScanError::UnknownFileType(path.to_path_buf()));
            }

            EntryType::Directory => match frame.reader.open_child(&entry.name) {
                Ok(reader) => {
                    shared.dirs.fetch_add(1, Ordering::Relaxed);
                    descend = Some(reader);
                }
                Err(Errno::ACCESS) => {
                    denied(&path, shared);
                    path.pop(mark);
                }
                Err(err) => {
                    return Err(ScanError::Open {
                        path: path.to_path_buf(),
                        source: err.into(),
                    });
                }
            },

            EntryType::Regular | EntryType::Symlink => {
                shared.files.fetch_add(1, Ordering::Relaxed);
                let eligible = kind == EntryType::Regular || shared.policy.include_symlinks;
                if eligible && !shared.tracked.contains_bytes(path.rel()) {
                    shared.untracked.fetch_add(1, Ordering::Relaxed);
                    shared.reporter.on_untracked(path.full());
                    if shared.collect_paths {
                        if let Ok(mut paths) = shared.paths.lock() {
                            paths.push(path.to_path_buf());
                        }
                    }
                }
                path.pop(mark);
            }

            // devices, fifos, sockets: no side effect
            EntryType::Other => path.pop(mark),
        }

        if let Some(reader) = descend {
            stack.push(Frame::child(reader, mark));
        }
    }

    Ok(())
}

/// Absorb a permission-denied directory: warn through the reporter unless
/// the scan is silent, collect the error when asked, contribute zero files.
fn denied(path: &PathBuffer, shared: &Shared<'_>) {
    debug!(path = %path.full().display(), "skipping unreadable directory");
    if !shared.policy.silent {
        shared.reporter.on_denied(path.full());
    }
    if shared.collect_errors {
        if let Ok(mut skipped) = shared.skipped.lock() {
            skipped.push(ScanError::PermissionDenied(path.to_path_buf()));
        }
    }
}

// ---------------------------------------------------------------------------
// Root normalization
// ---------------------------------------------------------------------------

/// Absolutize against the working directory and strip trailing slashes, so a
/// root given with or without one produces identical results. A bare `/`
/// stays as-is.
fn normalize_root(path: &Path) -> Result<Vec<u8>, ScanError> {
    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = env::current_dir().map_err(|source| ScanError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        cwd.join(path)
    };
    let mut bytes = abs.into_os_string().into_vec();
    while bytes.len() > 1 && bytes.last() == Some(&b'/') {
        bytes.pop();
    }
    Ok(bytes)
}

/// Whether `root` equals `base` or lies under it.
fn within(root: &[u8], base: &[u8]) -> bool {
    if base == b"/" {
        return root.first() == Some(&b'/');
    }
    root == base || (root.starts_with(base) && root.get(base.len()) == Some(&b'/'))
}

fn bytes_path(bytes: &[u8]) -> PathBuf {
    PathBuf::from(OsStr::from_bytes(bytes).to_os_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_respects_component_boundaries() {
        assert!(within(b"/srv", b"/srv"));
        assert!(within(b"/srv/etc", b"/srv"));
        assert!(within(b"/srv", b"/"));
        assert!(!within(b"/srvx", b"/srv"));
        assert!(!within(b"/opt", b"/srv"));
    }

    #[test]
    fn trailing_slashes_are_stripped_but_root_survives() {
        assert_eq!(normalize_root(Path::new("/srv/")).unwrap(), b"/srv");
        assert_eq!(normalize_root(Path::new("/srv")).unwrap(), b"/srv");
        assert_eq!(normalize_root(Path::new("/")).unwrap(), b"/");
    }
}
