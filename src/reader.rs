use std::ffi::CStr;
use std::os::fd::OwnedFd;
use std::path::Path;

use rustix::fs::{openat, statat, AtFlags, Dir, FileType as RawFileType, Mode, OFlags, CWD};
use rustix::io::Errno;

use crate::entry::{EntryType, RawEntry};

/// Entries handed to the walker per enumeration round. Comparable to an
/// 8 KiB getdents buffer at typical dirent sizes.
pub(crate) const BATCH_CAPACITY: usize = 128;

/// One open directory: a descriptor anchoring `openat`/`fstatat` for its
/// children, plus the enumeration cursor over its dirent stream.
///
/// Enumeration is batched — the walker drains a batch before asking for the
/// next one — which amortizes syscall overhead across trees with many small
/// directories.
pub(crate) struct DirReader {
    fd: OwnedFd,
    dir: Dir,
}

impl DirReader {
    pub(crate) fn open_root(path: &Path) -> Result<Self, Errno> {
        let fd = openat(
            CWD,
            path,
            OFlags::RDONLY | OFlags::DIRECTORY | OFlags::CLOEXEC,
            Mode::empty(),
        )?;
        Self::from_fd(fd)
    }

    /// Open `name` relative to this directory's descriptor. NOFOLLOW: the
    /// entry was classified a directory, so a symlink here means the tree
    /// changed underneath us.
    pub(crate) fn open_child(&self, name: &CStr) -> Result<Self, Errno> {
        let fd = openat(
            &self.fd,
            name,
            OFlags::RDONLY | OFlags::DIRECTORY | OFlags::CLOEXEC | OFlags::NOFOLLOW,
            Mode::empty(),
        )?;
        Self::from_fd(fd)
    }

    fn from_fd(fd: OwnedFd) -> Result<Self, Errno> {
        let dir = Dir::read_from(&fd)?;
        Ok(Self { fd, dir })
    }

    /// Fill `batch` with the next run of entries, up to [`BATCH_CAPACITY`].
    /// `Ok(false)` signals end-of-directory. Order is whatever the kernel
    /// yields — callers must not assume sorting.
    pub(crate) fn next_batch(&mut self, batch: &mut Vec<RawEntry>) -> Result<bool, Errno> {
        while batch.len() < BATCH_CAPACITY {
            match self.dir.next() {
                Some(Ok(entry)) => batch.push(RawEntry {
                    name: entry.file_name().to_owned(),
                    hint: EntryType::from_raw(entry.file_type()),
                }),
                Some(Err(err)) => return Err(err),
                None => break,
            }
        }
        Ok(!batch.is_empty())
    }
}

/// How an entry's type gets determined. Two implementations, selected per
/// entry: the hint the dirent stream already carries, or an explicit inode
/// query when that hint is absent. The query costs a syscall per entry, so
/// it only runs as a fallback.
pub(crate) trait TypeResolver {
    fn resolve(&self, parent: &DirReader, name: &CStr) -> EntryType;
}

/// Trusts the d_type hint the enumeration produced.
pub(crate) struct HintResolver(pub EntryType);

impl TypeResolver for HintResolver {
    fn resolve(&self, _parent: &DirReader, _name: &CStr) -> EntryType {
        self.0
    }
}

/// Queries the inode when no usable hint exists (some filesystems never fill
/// d_type). A failed query — the entry vanished between enumeration and
/// lookup, or an I/O error — stays `Unknown`, which the walker treats as
/// fatal.
pub(crate) struct StatResolver;

impl TypeResolver for StatResolver {
    fn resolve(&self, parent: &DirReader, name: &CStr) -> EntryType {
        match statat(&parent.fd, name, AtFlags::SYMLINK_NOFOLLOW) {
            Ok(stat) => EntryType::from_raw(RawFileType::from_raw_mode(stat.st_mode)),
            Err(_) => EntryType::Unknown,
        }
    }
}
