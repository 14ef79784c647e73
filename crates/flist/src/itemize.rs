//! Itemize flags: the 16-bit bitfield a Generator sends alongside a file
//! index to announce what, if anything, changed and whether a body
//! transfer follows.

use std::io::{self, Read, Write};

/// The entry was not previously present at the destination.
pub const IS_NEW: u16 = 0x0001;
/// At least one reported attribute differs from the destination's copy.
pub const REPORT_CHANGE: u16 = 0x0002;
/// The destination's permission bits will change.
pub const REPORT_PERMS: u16 = 0x0040;
/// The destination's owning group will change.
pub const REPORT_GROUP: u16 = 0x0010;
/// The destination's owning user will change.
pub const REPORT_OWNER: u16 = 0x0020;
/// The destination's modification time will change.
pub const REPORT_TIME: u16 = 0x0080;
/// The destination's size will change.
pub const REPORT_SIZE: u16 = 0x0100;
/// A body transfer (checksum header, token stream, digest) follows.
pub const TRANSFER: u16 = 0x0800;
/// The change was applied without a network transfer (e.g. a rename).
pub const LOCAL_CHANGE: u16 = 0x4000;
/// No change at all; sent so the peer can still acknowledge the index.
pub const NO_CHANGE: u16 = 0x0000;

/// The itemize bitfield attached to one file-list index.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ItemizeFlags(u16);

impl ItemizeFlags {
    /// No attributes changed and no transfer follows.
    pub const NONE: Self = Self(NO_CHANGE);

    /// Wraps a raw bitfield value, e.g. one just read off the wire.
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Returns the raw bitfield value.
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Returns a copy with `flag` set.
    #[must_use]
    pub const fn with(self, flag: u16) -> Self {
        Self(self.0 | flag)
    }

    /// Returns whether every bit in `flag` is set.
    #[must_use]
    pub const fn contains(self, flag: u16) -> bool {
        self.0 & flag == flag
    }

    /// Returns whether [`TRANSFER`] is set: a `Checksum.Header`, token
    /// stream, and whole-file digest follow this index on the wire.
    #[must_use]
    pub const fn requires_transfer(self) -> bool {
        self.contains(TRANSFER)
    }
}

/// Writes `flags` as a little-endian `u16`.
///
/// # Errors
///
/// Propagates I/O errors from `writer`.
pub fn write_itemize_flags<W: Write>(writer: &mut W, flags: ItemizeFlags) -> io::Result<()> {
    writer.write_all(&flags.bits().to_le_bytes())
}

/// Reads an [`ItemizeFlags`] value previously written by
/// [`write_itemize_flags`].
///
/// # Errors
///
/// Propagates I/O errors from `reader`.
pub fn read_itemize_flags<R: Read>(reader: &mut R) -> io::Result<ItemizeFlags> {
    let mut bytes = [0u8; 2];
    reader.read_exact(&mut bytes)?;
    Ok(ItemizeFlags::from_bits(u16::from_le_bytes(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_a_combined_flag_set() {
        let flags = ItemizeFlags::NONE.with(IS_NEW).with(TRANSFER);
        let mut buf = Vec::new();
        write_itemize_flags(&mut buf, flags).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded = read_itemize_flags(&mut cursor).unwrap();
        assert_eq!(decoded, flags);
        assert!(decoded.requires_transfer());
        assert!(decoded.contains(IS_NEW));
        assert!(!decoded.contains(REPORT_PERMS));
    }

    #[test]
    fn no_change_requires_no_transfer() {
        assert!(!ItemizeFlags::NONE.requires_transfer());
    }
}
