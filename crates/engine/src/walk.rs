//! One-level directory expansion shared by the Sender's initial and
//! stub-directory expansion steps.
//!
//! Incremental recursion never descends more than one directory at a time —
//! every subdirectory discovered becomes its own stub, queued for later
//! expansion by a separate call — so there is no general-purpose recursive
//! walker here, unlike a whole-tree listing tool.

use std::fs;
use std::io;
use std::path::Path;

use flist::attributes::{Attributes, FileMode, IdName};
use flist::{DeviceKind, FileInfo, FileKind};
use metadata::FileAttributeManager;

/// Builds the [`FileInfo`] for a single filesystem entry at `path`, naming
/// it `relative_name` on the wire.
///
/// Returns `Ok(None)` if the path no longer exists (vanished between
/// directory listing and stat).
///
/// # Errors
///
/// Propagates I/O errors other than "not found" from `stat` or, for
/// symlinks, from reading the link target.
pub fn stat_entry(
    manager: &dyn FileAttributeManager,
    path: &Path,
    relative_name: Vec<u8>,
) -> io::Result<Option<FileInfo>> {
    let Some(stat) = manager.stat(path)? else {
        return Ok(None);
    };

    let mode = FileMode::new(stat.mode);
    let attrs = Attributes::new(
        mode,
        stat.size,
        u64::try_from(stat.mtime).unwrap_or(0),
        IdName::by_id(stat.uid),
        IdName::by_id(stat.gid),
    );

    let kind = if mode.is_symlink() {
        FileKind::Symlink {
            attrs,
            target: read_link_bytes(path)?,
        }
    } else if let Some(device_kind) = classify_device(mode) {
        // `FileAttributeManager::stat` exposes only (mode, size, mtime,
        // user, group), matching the documented filesystem boundary; it
        // carries no raw device number, so major/minor cannot be
        // recovered through the capability alone.
        FileKind::Device {
            attrs,
            kind: device_kind,
            major: 0,
            minor: 0,
        }
    } else {
        FileKind::Regular(attrs)
    };

    Ok(Some(FileInfo::new(relative_name, kind).with_locatable(path.to_path_buf())))
}

fn classify_device(mode: FileMode) -> Option<DeviceKind> {
    if mode.is_block_device() {
        Some(DeviceKind::Block)
    } else if mode.is_char_device() {
        Some(DeviceKind::Char)
    } else if mode.is_fifo() {
        Some(DeviceKind::Fifo)
    } else if mode.is_socket() {
        Some(DeviceKind::Socket)
    } else {
        None
    }
}

#[cfg(unix)]
fn read_link_bytes(path: &Path) -> io::Result<Vec<u8>> {
    use std::os::unix::ffi::OsStrExt;
    Ok(fs::read_link(path)?.as_os_str().as_bytes().to_vec())
}

#[cfg(not(unix))]
fn read_link_bytes(path: &Path) -> io::Result<Vec<u8>> {
    Ok(fs::read_link(path)?.to_string_lossy().into_owned().into_bytes())
}

/// One child of an expanded directory: its entry plus, for subdirectories,
/// whether it should itself be queued as a new stub.
pub struct ExpandedEntry {
    /// The built file-list entry.
    pub info: FileInfo,
}

/// Lists `dir`'s immediate children, building a [`FileInfo`] for each and
/// sorting the result into wire order (dot-directory first, files before
/// directories, byte-lexicographic within a type).
///
/// Entries that vanish between being listed and stat'd are silently
/// dropped, matching the "file vanished after listing" non-fatal case.
///
/// # Errors
///
/// Returns an error if `dir` itself cannot be read.
pub fn expand_directory(
    manager: &dyn FileAttributeManager,
    dir: &Path,
    relative_prefix: &[u8],
) -> io::Result<Vec<ExpandedEntry>> {
    let mut infos = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let mut relative_name = relative_prefix.to_vec();
        if !relative_name.is_empty() {
            relative_name.push(b'/');
        }
        relative_name.extend_from_slice(name_bytes(&name));

        if let Some(info) = stat_entry(manager, &entry.path(), relative_name)? {
            infos.push(info);
        }
    }
    infos.sort();
    Ok(infos.into_iter().map(|info| ExpandedEntry { info }).collect())
}

#[cfg(unix)]
fn name_bytes(name: &std::ffi::OsStr) -> &[u8] {
    use std::os::unix::ffi::OsStrExt;
    name.as_bytes()
}

#[cfg(not(unix))]
fn name_bytes(name: &std::ffi::OsStr) -> Vec<u8> {
    name.to_string_lossy().into_owned().into_bytes()
}

/// Builds the root entry for one of the transfer's source paths, resolving
/// whether it should itself be treated as a stub directory to expand.
///
/// # Errors
///
/// Propagates I/O errors from `stat`.
pub fn stat_root(manager: &dyn FileAttributeManager, root: &Path) -> io::Result<Option<FileInfo>> {
    let name = root
        .file_name()
        .map(|n| name_bytes_owned(n))
        .unwrap_or_else(|| b".".to_vec());
    stat_entry(manager, root, name)
}

#[cfg(unix)]
fn name_bytes_owned(name: &std::ffi::OsStr) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    name.as_bytes().to_vec()
}

#[cfg(not(unix))]
fn name_bytes_owned(name: &std::ffi::OsStr) -> Vec<u8> {
    name.to_string_lossy().into_owned().into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use metadata::PosixAttributeManager;
    use std::fs;

    #[test]
    fn expand_directory_sorts_files_before_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("zzz_dir")).unwrap();
        fs::write(dir.path().join("aaa_file"), b"x").unwrap();

        let manager = PosixAttributeManager::new();
        let entries = expand_directory(&manager, dir.path(), b"").unwrap();
        assert_eq!(entries.len(), 2);
        assert!(!entries[0].info.is_directory());
        assert!(entries[1].info.is_directory());
    }

    #[test]
    fn stat_entry_reports_none_for_a_vanished_path() {
        let manager = PosixAttributeManager::new();
        let result = stat_entry(&manager, Path::new("/nonexistent/path/here"), b"x".to_vec()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn relative_name_nests_under_its_prefix() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("child"), b"x").unwrap();
        let manager = PosixAttributeManager::new();
        let entries = expand_directory(&manager, dir.path(), b"parent").unwrap();
        assert_eq!(entries[0].info.path(), b"parent/child");
    }

    #[test]
    fn symlink_entry_carries_its_target() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("target.txt"), b"hi").unwrap();
        std::os::unix::fs::symlink("target.txt", dir.path().join("link")).unwrap();

        let manager = PosixAttributeManager::new();
        let entries = expand_directory(&manager, dir.path(), b"").unwrap();
        let link = entries.iter().find(|e| e.info.path() == b"link").unwrap();
        match link.info.kind() {
            FileKind::Symlink { target, .. } => assert_eq!(target, b"target.txt"),
            other => panic!("expected symlink, got {other:?}"),
        }
    }
}
