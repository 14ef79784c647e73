//! Variable-length integer encoding used for file sizes, timestamps, and
//! string lengths on the wire.
//!
//! Every value is written as `min_bytes` little-endian bytes; if the
//! high bit of the last of those bytes is set, one extra "extension" byte
//! follows carrying the remaining high-order bits. This lets small values
//! (the overwhelming majority of file sizes and timestamps) stay compact
//! while still supporting the full 64-bit range.

use std::io::{self, Read, Write};

/// Largest `min_bytes` this encoding supports (the extension byte itself
/// contributes 8 more bits, so `min_bytes` tops out well short of 8).
const MAX_MIN_BYTES: u32 = 7;

/// Writes `value` using the varint scheme with `min_bytes` baseline bytes.
///
/// # Panics
///
/// Panics if `min_bytes` is 0 or greater than [`MAX_MIN_BYTES`]; both are
/// programmer errors (the caller always passes a compile-time constant).
///
/// # Errors
///
/// Propagates I/O errors from `writer`.
pub fn write_varint<W: Write>(writer: &mut W, value: u64, min_bytes: u32) -> io::Result<()> {
    assert!(
        (1..=MAX_MIN_BYTES).contains(&min_bytes),
        "min_bytes must be in 1..={MAX_MIN_BYTES}"
    );

    let bytes = value.to_le_bytes();
    let min_bytes = min_bytes as usize;

    // Does the value fit in `min_bytes` bytes without the top bit set?
    let high_bits_zero = bytes[min_bytes..].iter().all(|&b| b == 0);
    let top_bit_clear = bytes[min_bytes - 1] & 0x80 == 0;

    if high_bits_zero && top_bit_clear {
        writer.write_all(&bytes[..min_bytes])?;
        return Ok(());
    }

    // Extension path: mark the last baseline byte's top bit and append one
    // more byte carrying the next 8 bits of the value.
    let mut baseline = [0u8; MAX_MIN_BYTES as usize];
    baseline[..min_bytes].copy_from_slice(&bytes[..min_bytes]);
    baseline[min_bytes - 1] |= 0x80;
    writer.write_all(&baseline[..min_bytes])?;
    writer.write_all(&[bytes[min_bytes]])?;
    Ok(())
}

/// Reads a varint previously written by [`write_varint`] with the same
/// `min_bytes`.
///
/// # Errors
///
/// Propagates I/O errors from `reader`, including `UnexpectedEof` if the
/// stream ends mid-value.
pub fn read_varint<R: Read>(reader: &mut R, min_bytes: u32) -> io::Result<u64> {
    assert!(
        (1..=MAX_MIN_BYTES).contains(&min_bytes),
        "min_bytes must be in 1..={MAX_MIN_BYTES}"
    );
    let min_bytes = min_bytes as usize;

    let mut baseline = [0u8; MAX_MIN_BYTES as usize];
    reader.read_exact(&mut baseline[..min_bytes])?;

    let extended = baseline[min_bytes - 1] & 0x80 != 0;
    let mut bytes = [0u8; 8];
    bytes[..min_bytes].copy_from_slice(&baseline[..min_bytes]);

    if extended {
        bytes[min_bytes - 1] &= 0x7f;
        let mut extra = [0u8; 1];
        reader.read_exact(&mut extra)?;
        bytes[min_bytes] = extra[0];
    }

    Ok(u64::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    fn round_trip(value: u64, min_bytes: u32) -> u64 {
        let mut buf = Vec::new();
        write_varint(&mut buf, value, min_bytes).unwrap();
        let mut cursor = Cursor::new(buf);
        read_varint(&mut cursor, min_bytes).unwrap()
    }

    #[test]
    fn small_values_stay_within_min_bytes() {
        let mut buf = Vec::new();
        write_varint(&mut buf, 42, 3).unwrap();
        assert_eq!(buf.len(), 3);
        assert_eq!(round_trip(42, 3), 42);
    }

    #[test]
    fn value_requiring_extension_byte_round_trips() {
        // 3-byte baseline tops out at 0x7fffff without extension.
        let value = 0x00ff_ffff;
        let mut buf = Vec::new();
        write_varint(&mut buf, value, 3).unwrap();
        assert_eq!(buf.len(), 4);
        assert_eq!(round_trip(value, 3), value);
    }

    #[test]
    fn zero_round_trips_for_every_min_bytes() {
        for min_bytes in 1..=6 {
            assert_eq!(round_trip(0, min_bytes), 0);
        }
    }

    #[test]
    fn truncated_stream_is_unexpected_eof() {
        let mut cursor = Cursor::new(vec![0x01]);
        let err = read_varint(&mut cursor, 3).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    proptest! {
        #[test]
        fn round_trip_matches_for_min_bytes_4(value in 0u64..=u32::MAX as u64) {
            prop_assert_eq!(round_trip(value, 4), value);
        }

        #[test]
        fn round_trip_matches_for_min_bytes_3(value in 0u64..=u32::MAX as u64) {
            prop_assert_eq!(round_trip(value, 3), value);
        }
    }
}
