//! [`ChecksumHeader`]: how a file was split for block matching.

use crate::block_size::{block_length, digest_length};

/// Describes how a file's checksum signature is laid out: how many blocks,
/// how long each is, the size of the (possibly short) final block, and how
/// many strong-hash bytes were kept per block.
///
/// `block_length == 0` is a sentinel meaning "treat the file as entirely
/// new" — there is nothing to match against, so no chunks follow.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChecksumHeader {
    chunk_count: u32,
    block_length: u32,
    remainder: u32,
    digest_length: u32,
}

impl ChecksumHeader {
    /// Builds a header from its four wire components directly, e.g. when
    /// decoding one sent by the peer.
    #[must_use]
    pub const fn new(chunk_count: u32, block_length: u32, remainder: u32, digest_length: u32) -> Self {
        Self {
            chunk_count,
            block_length,
            remainder,
            digest_length,
        }
    }

    /// Derives the header a sender would compute for a local file of
    /// `file_size` bytes, using the standard block- and digest-length
    /// sizing formulas.
    #[must_use]
    pub fn for_file_size(file_size: u64) -> Self {
        let block_length = block_length(file_size);
        if block_length == 0 {
            return Self::new(0, 0, 0, 0);
        }
        let digest_length = digest_length(file_size, block_length);
        let block_length_u64 = u64::from(block_length);
        let remainder = (file_size % block_length_u64) as u32;
        let chunk_count = if remainder == 0 {
            file_size / block_length_u64
        } else {
            file_size / block_length_u64 + 1
        } as u32;
        Self::new(chunk_count, block_length, remainder, digest_length)
    }

    /// Number of checksum chunks the file was split into.
    #[must_use]
    pub const fn chunk_count(&self) -> u32 {
        self.chunk_count
    }

    /// Length of every block except possibly the last.
    #[must_use]
    pub const fn block_length(&self) -> u32 {
        self.block_length
    }

    /// Length of the final block, if it differs from `block_length` (`0`
    /// means every block is uniform).
    #[must_use]
    pub const fn remainder(&self) -> u32 {
        self.remainder
    }

    /// Number of leading bytes of each block's strong hash that were kept.
    #[must_use]
    pub const fn digest_length(&self) -> u32 {
        self.digest_length
    }

    /// Returns whether this header carries no blocks (the file is treated
    /// as entirely new).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.block_length == 0
    }

    /// Returns the length, in bytes, of the block at `chunk_index`.
    #[must_use]
    pub fn block_len_at(&self, chunk_index: u32) -> u32 {
        if self.remainder != 0 && chunk_index + 1 == self.chunk_count {
            self.remainder
        } else {
            self.block_length
        }
    }
}
