//! On-wire encoding of file-list entries.
//!
//! Each entry is an `xflags` byte (optionally extended to 16 bits), a
//! dedup-friendly name encoding, and a handful of conditionally-present
//! fields depending on which flags are set and which [`FileKind`] the mode
//! bits name. A zero flag byte, read by the caller before calling
//! [`read_entry`], ends the sequence.

use std::io::{self, Read, Write};

use protocol::varint::{read_varint, write_varint};

use crate::attributes::{Attributes, FileMode, IdName};
use crate::file_info::{DeviceKind, FileInfo, FileInfoCache, FileKind};

/// Shared-prefix-with-previous-name optimization is in effect.
pub const SAME_NAME: u8 = 0x01;
/// The name suffix length is varint-encoded rather than a single byte.
pub const LONG_NAME: u8 = 0x02;
/// A second (high) flags byte follows, carrying [`TOP_DIR`] /
/// [`USER_NAME_FOLLOWS`] / [`GROUP_NAME_FOLLOWS`].
pub const EXTENDED_FLAGS: u8 = 0x04;
/// mtime is identical to the previous entry's and is omitted.
pub const SAME_TIME: u8 = 0x08;
/// mode is identical to the previous entry's and is omitted.
pub const SAME_MODE: u8 = 0x10;
/// uid is identical to the previous entry's and is omitted.
pub const SAME_UID: u8 = 0x20;
/// gid is identical to the previous entry's and is omitted.
pub const SAME_GID: u8 = 0x40;
/// Device major number is identical to the previous entry's and is omitted.
pub const SAME_RDEV_MAJOR: u8 = 0x80;

/// This entry is one of the transfer's root arguments.
pub const TOP_DIR: u16 = 0x01 << 8;
/// A resolved user name follows the uid.
pub const USER_NAME_FOLLOWS: u16 = 0x02 << 8;
/// A resolved group name follows the gid.
pub const GROUP_NAME_FOLLOWS: u16 = 0x04 << 8;

/// Errors raised while encoding or decoding a file-list entry.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// Underlying I/O failure.
    #[error("file-list entry I/O error: {0}")]
    Io(#[from] io::Error),
    /// [`FileKind::Untransferrable`] has no wire representation.
    #[error("cannot write an untransferrable entry to the wire")]
    Untransferrable,
    /// A name suffix was not valid UTF-8 where the codec requires text
    /// (user/group names only; path bytes themselves are opaque).
    #[error("name field was not valid UTF-8")]
    InvalidUtf8,
}

/// A decoded file-list entry plus the `TOP_DIR` bit, which carries session
/// semantics ("this was one of the transfer's root arguments") rather than
/// being part of [`FileInfo`] itself.
#[derive(Debug)]
pub struct DecodedEntry {
    /// The decoded entry.
    pub file_info: FileInfo,
    /// Whether the `TOP_DIR` flag was set.
    pub top_dir: bool,
}

fn device_kind_from_mode(mode: FileMode) -> Option<DeviceKind> {
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

/// Writes one file-list entry (the non-zero flag byte and everything that
/// follows it; the caller writes the terminating zero byte after the last
/// entry).
///
/// # Errors
///
/// Returns [`WireError::Untransferrable`] for [`FileKind::Untransferrable`],
/// or propagates I/O errors.
pub fn write_entry<W: Write>(
    writer: &mut W,
    info: &FileInfo,
    top_dir: bool,
    cache: &mut FileInfoCache,
) -> Result<(), WireError> {
    let attrs = match info.kind() {
        FileKind::Untransferrable => return Err(WireError::Untransferrable),
        FileKind::Regular(attrs) => attrs,
        FileKind::Device { attrs, .. } | FileKind::Symlink { attrs, .. } => attrs,
    };

    let path = info.path();
    let prev = cache.previous_name();
    let prefix_len = path.iter().zip(prev).take_while(|(a, b)| a == b).count().min(255);
    let suffix = &path[prefix_len..];

    let mut flags: u16 = 0;
    if prefix_len > 0 {
        flags |= u16::from(SAME_NAME);
    }
    if suffix.len() > 255 {
        flags |= u16::from(LONG_NAME);
    }
    if cache.same_mtime(attrs.mtime()) {
        flags |= u16::from(SAME_TIME);
    }
    if cache.same_mode(attrs.mode().raw()) {
        flags |= u16::from(SAME_MODE);
    }
    if cache.same_uid(attrs.user().id()) {
        flags |= u16::from(SAME_UID);
    }
    if cache.same_gid(attrs.group().id()) {
        flags |= u16::from(SAME_GID);
    }
    let is_device = matches!(info.kind(), FileKind::Device { .. });
    if is_device {
        if let FileKind::Device { major, .. } = info.kind() {
            if cache.same_dev_major(*major) {
                flags |= u16::from(SAME_RDEV_MAJOR);
            }
        }
    }
    if top_dir {
        flags |= TOP_DIR;
    }
    if attrs.user().has_name() {
        flags |= USER_NAME_FOLLOWS;
    }
    if attrs.group().has_name() {
        flags |= GROUP_NAME_FOLLOWS;
    }
    if flags & 0xFF00 != 0 {
        flags |= u16::from(EXTENDED_FLAGS);
    }

    writer.write_all(&[flags as u8])?;
    if flags & u16::from(EXTENDED_FLAGS) != 0 {
        writer.write_all(&[(flags >> 8) as u8])?;
    }

    if flags & u16::from(SAME_NAME) != 0 {
        writer.write_all(&[prefix_len as u8])?;
    }
    if flags & u16::from(LONG_NAME) != 0 {
        write_varint(writer, suffix.len() as u64, 1)?;
    } else {
        writer.write_all(&[suffix.len() as u8])?;
    }
    writer.write_all(suffix)?;

    write_varint(writer, attrs.size(), 3)?;
    if flags & u16::from(SAME_TIME) == 0 {
        write_varint(writer, attrs.mtime(), 4)?;
    }
    if flags & u16::from(SAME_MODE) == 0 {
        writer.write_all(&attrs.mode().raw().to_le_bytes())?;
    }
    if flags & u16::from(SAME_UID) == 0 {
        writer.write_all(&(attrs.user().id() as u16).to_le_bytes())?;
        if flags & USER_NAME_FOLLOWS != 0 {
            write_short_string(writer, attrs.user().name())?;
        }
    }
    if flags & u16::from(SAME_GID) == 0 {
        writer.write_all(&(attrs.group().id() as u16).to_le_bytes())?;
        if flags & GROUP_NAME_FOLLOWS != 0 {
            write_short_string(writer, attrs.group().name())?;
        }
    }

    if let FileKind::Device { major, minor, .. } = info.kind() {
        if flags & u16::from(SAME_RDEV_MAJOR) == 0 {
            writer.write_all(&major.to_le_bytes())?;
        }
        writer.write_all(&minor.to_le_bytes())?;
    }

    if let FileKind::Symlink { target, .. } = info.kind() {
        write_varint(writer, target.len() as u64, 1)?;
        writer.write_all(target)?;
    }

    cache.update(info);
    Ok(())
}

fn write_short_string<W: Write>(writer: &mut W, s: &str) -> io::Result<()> {
    let bytes = s.as_bytes();
    writer.write_all(&[bytes.len().min(255) as u8])?;
    writer.write_all(&bytes[..bytes.len().min(255)])
}

fn read_short_string<R: Read>(reader: &mut R) -> Result<String, WireError> {
    let mut len = [0u8; 1];
    reader.read_exact(&mut len)?;
    let mut buf = vec![0u8; len[0] as usize];
    reader.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|_| WireError::InvalidUtf8)
}

/// Reads one file-list entry, given the already-consumed, non-zero base
/// flag byte.
///
/// # Errors
///
/// Propagates I/O errors, or returns [`WireError::InvalidUtf8`] if a
/// user/group name is not valid UTF-8.
pub fn read_entry<R: Read>(
    reader: &mut R,
    base_flags: u8,
    cache: &mut FileInfoCache,
) -> Result<DecodedEntry, WireError> {
    let mut flags = u16::from(base_flags);
    if base_flags & EXTENDED_FLAGS != 0 {
        let mut ext = [0u8; 1];
        reader.read_exact(&mut ext)?;
        flags |= u16::from(ext[0]) << 8;
    }

    let prefix_len = if flags & u16::from(SAME_NAME) != 0 {
        let mut b = [0u8; 1];
        reader.read_exact(&mut b)?;
        b[0] as usize
    } else {
        0
    };

    let suffix_len = if flags & u16::from(LONG_NAME) != 0 {
        read_varint(reader, 1)? as usize
    } else {
        let mut b = [0u8; 1];
        reader.read_exact(&mut b)?;
        b[0] as usize
    };
    let mut suffix = vec![0u8; suffix_len];
    reader.read_exact(&mut suffix)?;

    let mut path = cache.previous_name()[..prefix_len.min(cache.previous_name().len())].to_vec();
    path.extend_from_slice(&suffix);

    let size = read_varint(reader, 3)?;
    let mtime = if flags & u16::from(SAME_TIME) != 0 {
        cache.previous_mtime()
    } else {
        read_varint(reader, 4)?
    };

    let mode_raw = if flags & u16::from(SAME_MODE) != 0 {
        cache.previous_mode()
    } else {
        let mut b = [0u8; 4];
        reader.read_exact(&mut b)?;
        u32::from_le_bytes(b)
    };
    let mode = FileMode::new(mode_raw);

    let (uid, user_name) = if flags & u16::from(SAME_UID) != 0 {
        (cache.previous_uid(), String::new())
    } else {
        let mut b = [0u8; 2];
        reader.read_exact(&mut b)?;
        let uid = u32::from(u16::from_le_bytes(b));
        let name = if flags & USER_NAME_FOLLOWS != 0 {
            read_short_string(reader)?
        } else {
            String::new()
        };
        (uid, name)
    };
    let user = if user_name.is_empty() {
        IdName::by_id(uid)
    } else {
        IdName::new(uid, user_name)
    };

    let (gid, group_name) = if flags & u16::from(SAME_GID) != 0 {
        (cache.previous_gid(), String::new())
    } else {
        let mut b = [0u8; 2];
        reader.read_exact(&mut b)?;
        let gid = u32::from(u16::from_le_bytes(b));
        let name = if flags & GROUP_NAME_FOLLOWS != 0 {
            read_short_string(reader)?
        } else {
            String::new()
        };
        (gid, name)
    };
    let group = if group_name.is_empty() {
        IdName::by_id(gid)
    } else {
        IdName::new(gid, group_name)
    };

    let attrs = Attributes::new(mode, size, mtime, user, group);

    let kind = if mode.is_symlink() {
        let target_len = read_varint(reader, 1)? as usize;
        let mut target = vec![0u8; target_len];
        reader.read_exact(&mut target)?;
        FileKind::Symlink { attrs, target }
    } else if let Some(device_kind) = device_kind_from_mode(mode) {
        let major = if flags & u16::from(SAME_RDEV_MAJOR) != 0 {
            cache.previous_dev_major()
        } else {
            let mut b = [0u8; 4];
            reader.read_exact(&mut b)?;
            u32::from_le_bytes(b)
        };
        let mut b = [0u8; 4];
        reader.read_exact(&mut b)?;
        let minor = u32::from_le_bytes(b);
        FileKind::Device {
            attrs,
            kind: device_kind,
            major,
            minor,
        }
    } else {
        FileKind::Regular(attrs)
    };

    let file_info = FileInfo::new(path, kind);
    cache.update(&file_info);

    Ok(DecodedEntry {
        file_info,
        top_dir: flags & TOP_DIR != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::mode_bits;

    fn regular(path: &str, size: u64, mtime: u64, mode: u32, uid: u32, gid: u32) -> FileInfo {
        let attrs = Attributes::new(
            FileMode::new(mode_bits::S_IFREG | mode),
            size,
            mtime,
            IdName::by_id(uid),
            IdName::by_id(gid),
        );
        FileInfo::new(path.as_bytes().to_vec(), FileKind::Regular(attrs))
    }

    fn round_trip(entries: &[(FileInfo, bool)]) -> Vec<DecodedEntry> {
        let mut buf = Vec::new();
        let mut write_cache = FileInfoCache::new();
        for (info, top_dir) in entries {
            write_entry(&mut buf, info, *top_dir, &mut write_cache).unwrap();
        }

        let mut cursor = io::Cursor::new(buf);
        let mut read_cache = FileInfoCache::new();
        let mut decoded = Vec::new();
        for _ in entries {
            let mut flag_byte = [0u8; 1];
            cursor.read_exact(&mut flag_byte).unwrap();
            decoded.push(read_entry(&mut cursor, flag_byte[0], &mut read_cache).unwrap());
        }
        decoded
    }

    #[test]
    fn single_entry_round_trips() {
        let info = regular("hello.txt", 1234, 1_700_000_000, 0o644, 1000, 1000);
        let decoded = round_trip(&[(info.clone(), true)]);
        assert_eq!(decoded[0].file_info, info);
        assert_eq!(decoded[0].file_info.attributes(), info.attributes());
        assert!(decoded[0].top_dir);
    }

    #[test]
    fn consecutive_entries_share_name_prefix_and_mode() {
        let a = regular("dir/alpha.txt", 10, 1000, 0o644, 1, 1);
        let b = regular("dir/beta.txt", 20, 1000, 0o644, 1, 1);
        let decoded = round_trip(&[(a.clone(), false), (b.clone(), false)]);
        assert_eq!(decoded[0].file_info, a);
        assert_eq!(decoded[0].file_info.attributes(), a.attributes());
        assert_eq!(decoded[1].file_info, b);
        assert_eq!(decoded[1].file_info.attributes(), b.attributes());
    }

    #[test]
    fn symlink_round_trips_target() {
        let attrs = Attributes::new(
            FileMode::new(mode_bits::S_IFLNK | 0o777),
            0,
            1000,
            IdName::by_id(0),
            IdName::by_id(0),
        );
        let info = FileInfo::new(
            b"link".to_vec(),
            FileKind::Symlink {
                attrs,
                target: b"/etc/target".to_vec(),
            },
        );
        let decoded = round_trip(&[(info.clone(), false)]);
        assert_eq!(decoded[0].file_info, info);
        match decoded[0].file_info.kind() {
            FileKind::Symlink { target, .. } => assert_eq!(target, b"/etc/target"),
            other => panic!("expected symlink, got {other:?}"),
        }
    }

    #[test]
    fn writing_untransferrable_entry_is_rejected() {
        let info = FileInfo::new(b"weird".to_vec(), FileKind::Untransferrable);
        let mut buf = Vec::new();
        let mut cache = FileInfoCache::new();
        let err = write_entry(&mut buf, &info, false, &mut cache).unwrap_err();
        assert!(matches!(err, WireError::Untransferrable));
    }
}
