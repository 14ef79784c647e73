//! [`FileInfo`], the transferable unit of a file list.

use std::cmp::Ordering;
use std::path::PathBuf;

use crate::attributes::Attributes;

/// The specific device file types `mknod` distinguishes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceKind {
    /// Block device.
    Block,
    /// Character device.
    Char,
    /// Named pipe.
    Fifo,
    /// Unix domain socket.
    Socket,
}

/// The type-specific payload of a [`FileInfo`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FileKind {
    /// A plain file or directory (distinguished by the file-type bits in
    /// [`Attributes::mode`]).
    Regular(Attributes),
    /// A block, character, FIFO, or socket special file.
    Device {
        /// Shared attributes (mode carries the specific device type too).
        attrs: Attributes,
        /// Which kind of special file this is.
        kind: DeviceKind,
        /// Device major number.
        major: u32,
        /// Device minor number.
        minor: u32,
    },
    /// A symbolic link.
    Symlink {
        /// Shared attributes.
        attrs: Attributes,
        /// Raw target path bytes (not necessarily valid UTF-8).
        target: Vec<u8>,
    },
    /// A path kept only to preserve indexing; it cannot itself be
    /// transferred (e.g. an unsupported special file on a platform that
    /// lacks the capability to recreate it).
    Untransferrable,
}

/// The transferable unit of a file list: a path plus type-specific metadata.
///
/// Ordering places the current-directory entry (`.`) first, then files
/// before directories at the same level, then byte-lexicographic order
/// within a type with directory names treated as though trailed by `/`.
/// Equality is by path bytes only, matching upstream's index-dedup
/// semantics.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileInfo {
    path: Vec<u8>,
    kind: FileKind,
    locatable: Option<PathBuf>,
}

impl FileInfo {
    /// Builds a new file-list entry.
    #[must_use]
    pub fn new(path: Vec<u8>, kind: FileKind) -> Self {
        Self {
            path,
            kind,
            locatable: None,
        }
    }

    /// Attaches a resolved absolute local path, making this entry
    /// "Locatable" per the data model.
    #[must_use]
    pub fn with_locatable(mut self, local_path: PathBuf) -> Self {
        self.locatable = Some(local_path);
        self
    }

    /// Returns the raw path bytes.
    #[must_use]
    pub fn path(&self) -> &[u8] {
        &self.path
    }

    /// Returns the type-specific payload.
    #[must_use]
    pub fn kind(&self) -> &FileKind {
        &self.kind
    }

    /// Returns the resolved local path, if this entry is Locatable.
    #[must_use]
    pub fn locatable(&self) -> Option<&PathBuf> {
        self.locatable.as_ref()
    }

    /// Returns the shared attributes, if this variant carries any
    /// (everything but [`FileKind::Untransferrable`]).
    #[must_use]
    pub fn attributes(&self) -> Option<&Attributes> {
        match &self.kind {
            FileKind::Regular(attrs) | FileKind::Device { attrs, .. } | FileKind::Symlink { attrs, .. } => {
                Some(attrs)
            }
            FileKind::Untransferrable => None,
        }
    }

    /// Returns whether this entry's file-type bits mark it as a directory.
    #[must_use]
    pub fn is_directory(&self) -> bool {
        matches!(&self.kind, FileKind::Regular(attrs) if attrs.mode().is_dir())
    }

    /// Returns whether this path is the current-directory entry (`.`).
    #[must_use]
    pub fn is_dot_directory(&self) -> bool {
        self.path == b"."
    }
}

impl PartialEq for FileInfo {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for FileInfo {}

/// Produces the byte-lexicographic sort key for a path, appending a
/// trailing `/` for directories so that, e.g., `"foo"` sorts before
/// `"foo.bak"` but after the directory `"foo/"` would if compared naively.
fn sort_key(info: &FileInfo) -> Vec<u8> {
    let mut key = info.path.clone();
    if info.is_directory() {
        key.push(b'/');
    }
    key
}

impl PartialOrd for FileInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FileInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_dot_directory(), other.is_dot_directory()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }

        match (self.is_directory(), other.is_directory()) {
            (false, true) => return Ordering::Less,
            (true, false) => return Ordering::Greater,
            _ => {}
        }

        sort_key(self).cmp(&sort_key(other))
    }
}

/// Remembers the previous entry written to, or read from, the wire, so the
/// codec can collapse fields that repeat across consecutive entries into
/// `SAME_*` flag bits.
#[derive(Debug, Default)]
pub struct FileInfoCache {
    name: Vec<u8>,
    mode: Option<u32>,
    mtime: Option<u64>,
    uid: Option<u32>,
    user_name: String,
    gid: Option<u32>,
    group_name: String,
    dev_major: Option<u32>,
}

impl FileInfoCache {
    /// Builds an empty cache, as at the start of a file-list stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates the cache to reflect `info` having just been written/read.
    pub fn update(&mut self, info: &FileInfo) {
        self.name = info.path.clone();
        if let Some(attrs) = info.attributes() {
            self.mode = Some(attrs.mode().raw());
            self.mtime = Some(attrs.mtime());
            self.uid = Some(attrs.user().id());
            self.user_name = attrs.user().name().to_owned();
            self.gid = Some(attrs.group().id());
            self.group_name = attrs.group().name().to_owned();
        }
        if let FileKind::Device { major, .. } = &info.kind {
            self.dev_major = Some(*major);
        }
    }

    /// Returns the previous entry's name bytes.
    #[must_use]
    pub fn previous_name(&self) -> &[u8] {
        &self.name
    }

    /// Returns whether `mode` matches the previous entry's mode.
    #[must_use]
    pub fn same_mode(&self, mode: u32) -> bool {
        self.mode == Some(mode)
    }

    /// Returns whether `mtime` matches the previous entry's mtime.
    #[must_use]
    pub fn same_mtime(&self, mtime: u64) -> bool {
        self.mtime == Some(mtime)
    }

    /// Returns whether `uid` matches the previous entry's uid.
    #[must_use]
    pub fn same_uid(&self, uid: u32) -> bool {
        self.uid == Some(uid)
    }

    /// Returns whether `gid` matches the previous entry's gid.
    #[must_use]
    pub fn same_gid(&self, gid: u32) -> bool {
        self.gid == Some(gid)
    }

    /// Returns whether `major` matches the previous entry's device major.
    #[must_use]
    pub fn same_dev_major(&self, major: u32) -> bool {
        self.dev_major == Some(major)
    }

    /// Returns the previous entry's mode, for decoders reconstructing an
    /// entry whose wire form omitted it via `SAME_MODE`.
    #[must_use]
    pub fn previous_mode(&self) -> u32 {
        self.mode.unwrap_or(0)
    }

    /// Returns the previous entry's mtime, for `SAME_TIME` reconstruction.
    #[must_use]
    pub fn previous_mtime(&self) -> u64 {
        self.mtime.unwrap_or(0)
    }

    /// Returns the previous entry's uid, for `SAME_UID` reconstruction.
    #[must_use]
    pub fn previous_uid(&self) -> u32 {
        self.uid.unwrap_or(0)
    }

    /// Returns the previous entry's gid, for `SAME_GID` reconstruction.
    #[must_use]
    pub fn previous_gid(&self) -> u32 {
        self.gid.unwrap_or(0)
    }

    /// Returns the previous entry's device major, for `SAME_RDEV_MAJOR`
    /// reconstruction.
    #[must_use]
    pub fn previous_dev_major(&self) -> u32 {
        self.dev_major.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{mode_bits, FileMode, IdName};

    fn regular_file(path: &str, size: u64) -> FileInfo {
        let attrs = Attributes::new(
            FileMode::new(mode_bits::S_IFREG | 0o644),
            size,
            0,
            IdName::by_id(1000),
            IdName::by_id(1000),
        );
        FileInfo::new(path.as_bytes().to_vec(), FileKind::Regular(attrs))
    }

    fn directory(path: &str) -> FileInfo {
        let attrs = Attributes::new(
            FileMode::new(mode_bits::S_IFDIR | 0o755),
            0,
            0,
            IdName::by_id(1000),
            IdName::by_id(1000),
        );
        FileInfo::new(path.as_bytes().to_vec(), FileKind::Regular(attrs))
    }

    #[test]
    fn dot_directory_sorts_first() {
        let mut entries = vec![regular_file("zzz", 1), directory("."), regular_file("aaa", 1)];
        entries.sort();
        assert!(entries[0].is_dot_directory());
    }

    #[test]
    fn files_sort_before_directories_at_same_level() {
        let mut entries = vec![directory("alpha"), regular_file("alpha_file", 1)];
        entries.sort();
        assert!(!entries[0].is_directory());
        assert!(entries[1].is_directory());
    }

    #[test]
    fn equality_ignores_attributes() {
        let a = regular_file("same", 10);
        let b = regular_file("same", 9999);
        assert_eq!(a, b);
    }

    #[test]
    fn cache_tracks_previous_entry_fields() {
        let mut cache = FileInfoCache::new();
        let file = regular_file("x", 5);
        cache.update(&file);
        assert!(cache.same_mode(mode_bits::S_IFREG | 0o644));
        assert!(cache.same_uid(1000));
        assert!(!cache.same_gid(2000));
        assert_eq!(cache.previous_name(), b"x");
    }
}
