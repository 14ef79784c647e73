//! Block- and digest-length sizing for a file's checksum signature.

/// Shortest strong-hash prefix ever negotiated.
pub const MIN_DIGEST_LEN: u32 = 2;
/// Longest strong-hash prefix; the full width of the underlying MD5 digest.
pub const MAX_DIGEST_LEN: u32 = 16;
/// Smallest block length ever chosen, regardless of file size.
pub const MIN_BLOCK_LEN: u32 = 512;

/// Largest power of two not exceeding `value`, or 0 for `value == 0`.
fn nearest_lower_power_of_two(value: u64) -> u64 {
    if value == 0 {
        return 0;
    }
    1u64 << (63 - value.leading_zeros())
}

/// Chooses the block length for a file of `file_size` bytes.
///
/// `0` means the file is small enough (or empty) that it should be treated
/// as entirely new rather than split into blocks.
#[must_use]
pub fn block_length(file_size: u64) -> u32 {
    if file_size == 0 {
        return 0;
    }
    let sqrt_size = (file_size as f64).sqrt() as u64;
    let candidate = nearest_lower_power_of_two(sqrt_size);
    candidate.max(u64::from(MIN_BLOCK_LEN)) as u32
}

/// Chooses how many bytes of the strong hash to keep per block, given the
/// file size and the block length already chosen for it.
///
/// The raw expression can go negative for small files relative to their
/// block length; it is clamped to `[MIN_DIGEST_LEN, MAX_DIGEST_LEN]`.
#[must_use]
pub fn digest_length(file_size: u64, block_length: u32) -> u32 {
    if block_length == 0 {
        return 0;
    }
    let log2_file = (file_size.max(1) as f64).log2();
    let log2_block = f64::from(block_length).log2();
    let raw = (10.0 + 2.0 * log2_file - log2_block - 24.0) / 8.0;
    let rounded = raw.round() as i64;
    rounded.clamp(i64::from(MIN_DIGEST_LEN), i64::from(MAX_DIGEST_LEN)) as u32
}
