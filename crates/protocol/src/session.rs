//! Session-wide configuration and end-of-transfer counters.
//!
//! These two structs are threaded through a transfer by value (or behind a
//! mutex/atomic for the statistics) rather than read from process-global
//! state, so a test can run two sessions with different defaults in the
//! same process.

/// Fallback identity and permission bits applied when a transferred file's
/// own attributes cannot be resolved or preserved on the local side (e.g.
/// an unknown remote uid with no matching local user).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionDefaults {
    /// User name to record when a numeric uid has no resolvable name.
    pub default_user: String,
    /// Group name to record when a numeric gid has no resolvable name.
    pub default_group: String,
    /// Permission bits applied to newly created regular files when the
    /// source's own mode is not being preserved.
    pub file_perms: u32,
    /// Permission bits applied to newly created directories when the
    /// source's own mode is not being preserved.
    pub dir_perms: u32,
}

impl SessionDefaults {
    /// The conventional rsync defaults: unnamed `nobody`/`nobody`, files at
    /// `0644`, directories at `0755`.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            default_user: "nobody".to_owned(),
            default_group: "nobody".to_owned(),
            file_perms: 0o644,
            dir_perms: 0o755,
        }
    }
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self::standard()
    }
}

/// The counters a session reports at teardown.
///
/// Every field accumulates monotonically over the session; there is no
/// reset operation because a session's statistics are meaningful only once,
/// at the end of its one transfer phase.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Statistics {
    /// Bytes read from the duplex channel.
    pub total_bytes_read: u64,
    /// Bytes written to the duplex channel.
    pub total_bytes_written: u64,
    /// Sum of every transferred file's declared size.
    pub total_file_size: u64,
    /// Wire size of the serialized file list.
    pub total_file_list_size: u64,
    /// Sum of literal bytes sent across all files.
    pub total_literal_size: u64,
    /// Sum of bytes reconstructed from matched blocks across all files.
    pub total_matched_size: u64,
    /// Total number of file-list entries processed (all kinds).
    pub num_files: u64,
    /// Number of regular files whose body was actually transferred.
    pub num_transferred_files: u64,
    /// Sum of sizes of files whose body was actually transferred.
    pub total_transferred_size: u64,
    /// Wall-clock time spent building the file list, in milliseconds.
    pub file_list_build_time_ms: u64,
    /// Wall-clock time spent transferring the file list, in milliseconds.
    pub file_list_transfer_time_ms: u64,
}

impl Statistics {
    /// A zeroed set of counters, as at the start of a session.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            total_bytes_read: 0,
            total_bytes_written: 0,
            total_file_size: 0,
            total_file_list_size: 0,
            total_literal_size: 0,
            total_matched_size: 0,
            num_files: 0,
            num_transferred_files: 0,
            total_transferred_size: 0,
            file_list_build_time_ms: 0,
            file_list_transfer_time_ms: 0,
        }
    }

    /// Folds another session's counters into this one, field by field.
    pub fn merge(&mut self, other: &Self) {
        self.total_bytes_read += other.total_bytes_read;
        self.total_bytes_written += other.total_bytes_written;
        self.total_file_size += other.total_file_size;
        self.total_file_list_size += other.total_file_list_size;
        self.total_literal_size += other.total_literal_size;
        self.total_matched_size += other.total_matched_size;
        self.num_files += other.num_files;
        self.num_transferred_files += other.num_transferred_files;
        self.total_transferred_size += other.total_transferred_size;
        self.file_list_build_time_ms += other.file_list_build_time_ms;
        self.file_list_transfer_time_ms += other.file_list_transfer_time_ms;
    }
}
