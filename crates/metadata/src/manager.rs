//! The [`FileAttributeManager`] capability: the only way the transfer core
//! touches filesystem metadata.

use std::io;
use std::path::Path;

/// The subset of `stat(2)` fields a transfer needs to decide whether a
/// destination file already matches the source.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FileStat {
    /// POSIX permission and type bits.
    pub mode: u32,
    /// File size in bytes.
    pub size: u64,
    /// Last modification time, Unix seconds (signed so dates before 1970
    /// and past the 2038 wraparound both round-trip).
    pub mtime: i64,
    /// Owning user id.
    pub uid: u32,
    /// Owning group id.
    pub gid: u32,
}

/// An attribute-setting operation failed.
///
/// Per the error taxonomy these failures are reported as `ERROR_XFER` and
/// never abort the session; callers accumulate them rather than
/// propagating with `?` into a fatal path.
#[derive(Debug, thiserror::Error)]
#[error("setting attribute on {path}: {source}")]
pub struct AttributeError {
    path: String,
    #[source]
    source: io::Error,
}

impl AttributeError {
    /// Wraps an I/O error with the path that failed.
    #[must_use]
    pub fn new(path: &Path, source: io::Error) -> Self {
        Self {
            path: path.display().to_string(),
            source,
        }
    }

    /// The path the failing operation targeted.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The underlying I/O error.
    #[must_use]
    pub fn source_error(&self) -> &io::Error {
        &self.source
    }
}

/// Filesystem attribute access, isolated behind a capability so the
/// transfer core stays testable without touching a real filesystem.
///
/// Every mutating method can fail independently; none of the failures are
/// fatal to the session (see the error handling design's `ERROR_XFER`
/// classification). `stat` itself returns `Ok(None)` for "path does not
/// exist" rather than an error, since that's an expected, common case
/// (deciding whether a destination file is new).
pub trait FileAttributeManager {
    /// Reads `path`'s metadata without following a trailing symlink.
    ///
    /// # Errors
    ///
    /// Returns an error for I/O failures other than "not found".
    fn stat(&self, path: &Path) -> io::Result<Option<FileStat>>;

    /// Sets `path`'s permission bits.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError`] if the underlying syscall fails.
    fn set_file_mode(&self, path: &Path, mode: u32) -> Result<(), AttributeError>;

    /// Sets `path`'s modification time, in Unix seconds.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError`] if the underlying syscall fails.
    fn set_last_modified_time(&self, path: &Path, mtime: i64) -> Result<(), AttributeError>;

    /// Sets both `path`'s owning user and group in one call.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError`] if the underlying syscall fails.
    fn set_owner(&self, path: &Path, uid: u32, gid: u32) -> Result<(), AttributeError>;

    /// Sets `path`'s owning user, leaving its group untouched.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError`] if the underlying syscall fails.
    fn set_user_id(&self, path: &Path, uid: u32) -> Result<(), AttributeError>;

    /// Sets `path`'s owning group, leaving its user untouched.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError`] if the underlying syscall fails.
    fn set_group_id(&self, path: &Path, gid: u32) -> Result<(), AttributeError>;

    /// Alias for [`Self::set_group_id`]: rsync's attribute vocabulary
    /// names this operation separately from `setGroupId`, but on a purely
    /// numeric id (no group-name resolution), the two coincide.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError`] if the underlying syscall fails.
    fn set_group(&self, path: &Path, gid: u32) -> Result<(), AttributeError> {
        self.set_group_id(path, gid)
    }
}
