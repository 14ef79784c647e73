//! Stateful, variable-length signed index encoding used for file-list
//! indices ("NDX" in upstream terminology).
//!
//! The encoding remembers the previous positive and previous negative index
//! separately and encodes each new index as a delta from whichever baseline
//! applies, so that monotonically increasing indices (the common case)
//! collapse to a single byte on the wire.

use std::io::{self, Read, Write};

/// Sentinel meaning "the current file-list segment is complete".
pub const NDX_DONE: i32 = -1;

/// Sentinel meaning "no further segments; recursion has ended".
pub const NDX_FLIST_EOF: i32 = -2;

/// Baseline subtracted from a stub directory's index to encode "expand this
/// directory" requests as negative wire values (`OFFSET - stub_index`).
pub const NDX_FLIST_OFFSET: i32 = -101;

/// Stateful encoder/decoder for the index codec.
///
/// One `NdxCodec` must be shared by a single direction of a stream (the
/// sender's writer, or the receiver's reader); mixing encode state between
/// unrelated streams corrupts the delta baselines.
#[derive(Clone, Copy, Debug, Default)]
pub struct NdxCodec {
    prev_positive: i32,
    prev_negative: i32,
}

impl NdxCodec {
    /// Creates a codec with a fresh (zeroed) baseline state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            prev_positive: 0,
            prev_negative: 0,
        }
    }

    /// Writes `index` to `writer`, updating the internal baseline.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from `writer`.
    pub fn write<W: Write>(&mut self, writer: &mut W, index: i32) -> io::Result<()> {
        if index == NDX_DONE {
            writer.write_all(&[0x00])?;
            return Ok(());
        }

        let negative = index < 0;
        let base = if negative {
            self.prev_negative
        } else {
            self.prev_positive
        };
        // `diff` is conceptually `|index| - |base|` but computed in i64 to
        // avoid overflow when the two sides straddle i32::MIN/MAX.
        let diff = if negative {
            i64::from(-index) - i64::from(-base)
        } else {
            i64::from(index) - i64::from(base)
        };

        if negative {
            writer.write_all(&[0xFF])?;
        }

        if (1..0xFE).contains(&diff) {
            writer.write_all(&[diff as u8])?;
        } else if (0..=0x7FFF).contains(&diff) {
            writer.write_all(&[0xFE])?;
            writer.write_all(&[(diff >> 8) as u8, diff as u8])?;
        } else {
            let magnitude = if negative { -index } else { index } as u32;
            writer.write_all(&[0xFE, 0x80 | ((magnitude >> 24) as u8 & 0x7F)])?;
            writer.write_all(&[
                (magnitude >> 16) as u8,
                (magnitude >> 8) as u8,
                magnitude as u8,
            ])?;
        }

        if negative {
            self.prev_negative = index;
        } else {
            self.prev_positive = index;
        }
        Ok(())
    }

    /// Reads the next index from `reader`, updating the internal baseline.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from `reader`, including `UnexpectedEof`.
    pub fn read<R: Read>(&mut self, reader: &mut R) -> io::Result<i32> {
        let mut byte = [0u8; 1];
        reader.read_exact(&mut byte)?;
        let b = byte[0];

        if b == 0x00 {
            return Ok(NDX_DONE);
        }

        let negative = b == 0xFF;
        let b = if negative {
            reader.read_exact(&mut byte)?;
            byte[0]
        } else {
            b
        };

        let base = if negative {
            self.prev_negative
        } else {
            self.prev_positive
        };

        let magnitude: i64 = if b == 0xFE {
            let mut b1 = [0u8; 1];
            reader.read_exact(&mut b1)?;
            if b1[0] & 0x80 != 0 {
                let mut rest = [0u8; 3];
                reader.read_exact(&mut rest)?;
                let abs = (u32::from(b1[0] & 0x7F) << 24)
                    | (u32::from(rest[0]) << 16)
                    | (u32::from(rest[1]) << 8)
                    | u32::from(rest[2]);
                // Absolute encoding carries the magnitude directly, not a
                // delta from the baseline.
                let value = if negative { -(abs as i64) } else { i64::from(abs) };
                if negative {
                    self.prev_negative = value as i32;
                } else {
                    self.prev_positive = value as i32;
                }
                return Ok(value as i32);
            }
            let mut b2 = [0u8; 1];
            reader.read_exact(&mut b2)?;
            (i64::from(b1[0]) << 8) | i64::from(b2[0])
        } else {
            i64::from(b)
        };

        let base_magnitude = if negative { i64::from(-base) } else { i64::from(base) };
        let value_magnitude = base_magnitude + magnitude;
        let value = if negative {
            -value_magnitude
        } else {
            value_magnitude
        } as i32;

        if negative {
            self.prev_negative = value;
        } else {
            self.prev_positive = value;
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn round_trip(indices: &[i32]) -> Vec<i32> {
        let mut buf = Vec::new();
        let mut writer = NdxCodec::new();
        for &index in indices {
            writer.write(&mut buf, index).unwrap();
        }

        let mut cursor = Cursor::new(buf);
        let mut reader = NdxCodec::new();
        indices
            .iter()
            .map(|_| reader.read(&mut cursor).unwrap())
            .collect()
    }

    #[test]
    fn monotonic_positive_indices_round_trip() {
        let indices: Vec<i32> = (0..2000).collect();
        assert_eq!(round_trip(&indices), indices);
    }

    #[test]
    fn done_sentinel_round_trips() {
        assert_eq!(round_trip(&[5, NDX_DONE, 6]), vec![5, NDX_DONE, 6]);
    }

    #[test]
    fn stub_expand_offsets_round_trip() {
        let indices = [NDX_FLIST_OFFSET, NDX_FLIST_OFFSET - 1, NDX_FLIST_OFFSET - 500];
        assert_eq!(round_trip(&indices), indices);
    }

    #[test]
    fn large_forward_jump_round_trips() {
        let indices = [0, 100_000, 5];
        assert_eq!(round_trip(&indices), indices);
    }

    #[test]
    fn eof_sentinel_round_trips() {
        assert_eq!(round_trip(&[NDX_FLIST_EOF]), vec![NDX_FLIST_EOF]);
    }

    #[test]
    fn very_large_index_round_trips() {
        let indices = [i32::MAX / 2, 0];
        assert_eq!(round_trip(&indices), indices);
    }

    proptest::proptest! {
        #[test]
        fn round_trip_matches_for_arbitrary_sequences(indices in proptest::collection::vec(-5000i32..5_000_000i32, 1..64)) {
            proptest::prop_assert_eq!(round_trip(&indices), indices);
        }
    }
}
