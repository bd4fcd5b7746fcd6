use std::io::{self, BufRead};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use rustc_hash::FxHashSet;

/// The set of paths owned by installed packages.
///
/// Keys are canonical manifest-relative paths: no leading slash, no trailing
/// slash, matched byte-for-byte and case-sensitively. Built once before any
/// scan and read-only afterwards — every walk queries it, none mutates it, so
/// parallel roots share one set with no synchronization.
#[derive(Debug, Clone, Default)]
pub struct TrackedSet {
    set: FxHashSet<Box<[u8]>>,
}

impl TrackedSet {
    /// An empty set. Scanning against it reports every file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an iterator of manifest paths.
    ///
    /// Paths are normalized on the way in (leading and trailing slashes
    /// stripped); duplicate insertions are idempotent.
    ///
    /// # Example
    ///
    /// ```rust
    /// use stray::TrackedSet;
    ///
    /// let tracked = TrackedSet::from_paths(["etc/foo.conf", "/etc/foo.conf/"]);
    /// assert_eq!(tracked.len(), 1);
    /// assert!(tracked.contains("etc/foo.conf"));
    /// ```
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut set = FxHashSet::default();
        for path in paths {
            let norm = normalize(path.as_ref().as_os_str().as_bytes());
            if !norm.is_empty() {
                set.insert(Box::from(norm));
            }
        }
        Self { set }
    }

    /// Build from a newline-delimited manifest stream, one relative path per
    /// line, empty lines skipped. Works for any package manager whose file
    /// list can be dumped as text.
    pub fn from_lines<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut set = FxHashSet::default();
        for line in reader.lines() {
            let line = line?;
            let norm = normalize(line.as_bytes());
            if !norm.is_empty() {
                set.insert(Box::from(norm));
            }
        }
        Ok(Self { set })
    }

    /// Membership test by manifest-relative path. The argument is normalized
    /// the same way construction normalizes keys.
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.contains_bytes(normalize(path.as_ref().as_os_str().as_bytes()))
    }

    /// Hot-path lookup: `rel` is already canonical.
    pub(crate) fn contains_bytes(&self, rel: &[u8]) -> bool {
        self.set.contains(rel)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

/// Strip leading and trailing slashes; membership is byte-exact beyond that.
fn normalize(mut bytes: &[u8]) -> &[u8] {
    while let Some(rest) = bytes.strip_prefix(b"/") {
        bytes = rest;
    }
    while let Some(rest) = bytes.strip_suffix(b"/") {
        bytes = rest;
    }
    bytes
}
