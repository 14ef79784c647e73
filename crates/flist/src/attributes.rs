//! File metadata carried alongside every transferable path.

/// POSIX file-type bits packed into the high bits of [`Attributes::mode`].
pub mod mode_bits {
    /// `S_IFDIR`
    pub const S_IFDIR: u32 = 0o040000;
    /// `S_IFREG`
    pub const S_IFREG: u32 = 0o100000;
    /// `S_IFLNK`
    pub const S_IFLNK: u32 = 0o120000;
    /// `S_IFBLK`
    pub const S_IFBLK: u32 = 0o060000;
    /// `S_IFCHR`
    pub const S_IFCHR: u32 = 0o020000;
    /// `S_IFIFO`
    pub const S_IFIFO: u32 = 0o010000;
    /// `S_IFSOCK`
    pub const S_IFSOCK: u32 = 0o140000;
    /// Mask isolating the file-type bits from permission bits.
    pub const S_IFMT: u32 = 0o170000;
}

/// A POSIX file mode: file-type bits plus permission bits.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileMode(u32);

impl FileMode {
    /// Wraps a raw mode value as read from `stat`.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw mode value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns whether the file-type bits name a directory.
    #[must_use]
    pub const fn is_dir(self) -> bool {
        self.0 & mode_bits::S_IFMT == mode_bits::S_IFDIR
    }

    /// Returns whether the file-type bits name a symlink.
    #[must_use]
    pub const fn is_symlink(self) -> bool {
        self.0 & mode_bits::S_IFMT == mode_bits::S_IFLNK
    }

    /// Returns whether the file-type bits name a plain regular file.
    #[must_use]
    pub const fn is_regular(self) -> bool {
        self.0 & mode_bits::S_IFMT == mode_bits::S_IFREG
    }

    /// Returns whether the file-type bits name a block device.
    #[must_use]
    pub const fn is_block_device(self) -> bool {
        self.0 & mode_bits::S_IFMT == mode_bits::S_IFBLK
    }

    /// Returns whether the file-type bits name a character device.
    #[must_use]
    pub const fn is_char_device(self) -> bool {
        self.0 & mode_bits::S_IFMT == mode_bits::S_IFCHR
    }

    /// Returns whether the file-type bits name a FIFO.
    #[must_use]
    pub const fn is_fifo(self) -> bool {
        self.0 & mode_bits::S_IFMT == mode_bits::S_IFIFO
    }

    /// Returns whether the file-type bits name a Unix domain socket.
    #[must_use]
    pub const fn is_socket(self) -> bool {
        self.0 & mode_bits::S_IFMT == mode_bits::S_IFSOCK
    }

    /// Returns the permission bits only (lower 12 bits).
    #[must_use]
    pub const fn permission_bits(self) -> u32 {
        self.0 & 0o7777
    }
}

/// A numeric id paired with the name it resolves to, if known.
///
/// Per the data model, the id is always authoritative for on-wire
/// transmission; an empty name means "resolve by id on the receiving side".
#[derive(Clone, Debug, Eq, PartialEq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IdName {
    id: u32,
    name: String,
}

impl IdName {
    /// Builds an id/name pair, clamping `id` into the 16-bit range the wire
    /// format actually carries.
    #[must_use]
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id: id.min(u32::from(u16::MAX)),
            name: name.into(),
        }
    }

    /// Builds an id with no resolved name; the receiver resolves by id.
    #[must_use]
    pub const fn by_id(id: u32) -> Self {
        Self { id, name: String::new() }
    }

    /// Returns the numeric id.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Returns the resolved name, or an empty string if unresolved.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns whether a name was resolved.
    #[must_use]
    pub fn has_name(&self) -> bool {
        !self.name.is_empty()
    }
}

/// Metadata carried by every [`crate::FileInfo`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attributes {
    mode: FileMode,
    size: u64,
    mtime: u64,
    user: IdName,
    group: IdName,
}

impl Attributes {
    /// Builds an attribute set from its components.
    #[must_use]
    pub const fn new(mode: FileMode, size: u64, mtime: u64, user: IdName, group: IdName) -> Self {
        Self {
            mode,
            size,
            mtime,
            user,
            group,
        }
    }

    /// Returns the file mode.
    #[must_use]
    pub const fn mode(&self) -> FileMode {
        self.mode
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Returns the last-modified time, in whole seconds since the epoch.
    #[must_use]
    pub const fn mtime(&self) -> u64 {
        self.mtime
    }

    /// Returns the owning user.
    #[must_use]
    pub const fn user(&self) -> &IdName {
        &self.user
    }

    /// Returns the owning group.
    #[must_use]
    pub const fn group(&self) -> &IdName {
        &self.group
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_mode_classifies_directory() {
        let mode = FileMode::new(mode_bits::S_IFDIR | 0o755);
        assert!(mode.is_dir());
        assert!(!mode.is_regular());
        assert_eq!(mode.permission_bits(), 0o755);
    }

    #[test]
    fn file_mode_classifies_symlink_and_devices() {
        assert!(FileMode::new(mode_bits::S_IFLNK | 0o777).is_symlink());
        assert!(FileMode::new(mode_bits::S_IFBLK).is_block_device());
        assert!(FileMode::new(mode_bits::S_IFCHR).is_char_device());
        assert!(FileMode::new(mode_bits::S_IFIFO).is_fifo());
        assert!(FileMode::new(mode_bits::S_IFSOCK).is_socket());
    }

    #[test]
    fn id_name_clamps_to_u16_range() {
        let id = IdName::new(100_000, "nobody");
        assert_eq!(id.id(), u32::from(u16::MAX));
    }

    #[test]
    fn id_name_by_id_has_no_name() {
        let id = IdName::by_id(1000);
        assert!(!id.has_name());
        assert_eq!(id.name(), "");
    }
}
