//! [`PosixAttributeManager`]: the concrete [`FileAttributeManager`] backend
//! for Unix-like systems, built on `rustix` and `filetime`.

use std::fs;
use std::io;
use std::os::unix::fs::chown;
use std::path::Path;

use filetime::FileTime;

use crate::manager::{AttributeError, FileAttributeManager, FileStat};

/// Reads and writes file metadata through direct POSIX syscalls.
#[derive(Clone, Copy, Debug, Default)]
pub struct PosixAttributeManager;

impl PosixAttributeManager {
    /// Creates a new backend. Stateless: every method opens and closes its
    /// own syscalls per call.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
impl FileAttributeManager for PosixAttributeManager {
    fn stat(&self, path: &Path) -> io::Result<Option<FileStat>> {
        use std::os::unix::fs::MetadataExt;

        match fs::symlink_metadata(path) {
            Ok(meta) => Ok(Some(FileStat {
                mode: meta.mode(),
                size: meta.size(),
                mtime: meta.mtime(),
                uid: meta.uid(),
                gid: meta.gid(),
            })),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set_file_mode(&self, path: &Path, mode: u32) -> Result<(), AttributeError> {
        let mode = rustix::fs::Mode::from_bits_truncate(mode);
        rustix::fs::chmod(path, mode).map_err(|errno| AttributeError::new(path, errno.into()))
    }

    fn set_last_modified_time(&self, path: &Path, mtime: i64) -> Result<(), AttributeError> {
        let time = FileTime::from_unix_time(mtime, 0);
        filetime::set_file_mtime(path, time).map_err(|source| AttributeError::new(path, source))
    }

    fn set_owner(&self, path: &Path, uid: u32, gid: u32) -> Result<(), AttributeError> {
        chown(path, Some(uid), Some(gid)).map_err(|source| AttributeError::new(path, source))
    }

    fn set_user_id(&self, path: &Path, uid: u32) -> Result<(), AttributeError> {
        chown(path, Some(uid), None).map_err(|source| AttributeError::new(path, source))
    }

    fn set_group_id(&self, path: &Path, gid: u32) -> Result<(), AttributeError> {
        chown(path, None, Some(gid)).map_err(|source| AttributeError::new(path, source))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn stat_reports_none_for_a_missing_path() {
        let manager = PosixAttributeManager::new();
        assert!(manager.stat(Path::new("/nonexistent/definitely/not/here")).unwrap().is_none());
    }

    #[test]
    fn stat_reports_size_and_mode_for_a_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.txt");
        fs::write(&path, b"hello").unwrap();

        let manager = PosixAttributeManager::new();
        let stat = manager.stat(&path).unwrap().unwrap();
        assert_eq!(stat.size, 5);
    }

    #[test]
    fn set_file_mode_changes_permission_bits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.txt");
        fs::write(&path, b"hello").unwrap();

        let manager = PosixAttributeManager::new();
        manager.set_file_mode(&path, 0o600).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn set_last_modified_time_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.txt");
        fs::write(&path, b"hello").unwrap();

        let manager = PosixAttributeManager::new();
        manager.set_last_modified_time(&path, 1_000_000).unwrap();

        let stat = manager.stat(&path).unwrap().unwrap();
        assert_eq!(stat.mtime, 1_000_000);
    }
}
