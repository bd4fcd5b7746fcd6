use std::ffi::CString;

use rustix::fs::FileType as RawFileType;

/// Classification of a directory entry.
///
/// `Unknown` is never a terminal state: the walker resolves it through the
/// stat fallback before handling the entry, and fails the scan if the
/// fallback cannot classify it either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryType {
    /// A regular file.
    Regular,

    /// A directory.
    Directory,

    /// A symbolic link.
    Symlink,

    /// Anything else (device files, pipes, sockets). Never reported.
    Other,

    /// The enumeration gave no usable type hint.
    Unknown,
}

impl EntryType {
    pub(crate) fn from_raw(raw: RawFileType) -> Self {
        match raw {
            RawFileType::RegularFile => Self::Regular,
            RawFileType::Directory => Self::Directory,
            RawFileType::Symlink => Self::Symlink,
            RawFileType::Unknown => Self::Unknown,
            _ => Self::Other,
        }
    }
}

/// One enumerated entry: the name plus whatever type hint the kernel
/// embedded in the dirent stream.
pub(crate) struct RawEntry {
    pub name: CString,
    pub hint: EntryType,
}

impl RawEntry {
    /// The `.` and `..` pseudo-entries every directory listing yields.
    pub(crate) fn is_dot(&self) -> bool {
        let bytes = self.name.to_bytes();
        bytes == b"." || bytes == b".."
    }
}
