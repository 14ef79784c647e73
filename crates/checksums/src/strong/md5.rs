use digest::Digest;

use super::StrongDigest;

/// Streaming, unseeded MD5 hasher.
#[derive(Clone, Debug)]
pub struct Md5 {
    inner: md5::Md5,
}

impl Default for Md5 {
    fn default() -> Self {
        Self::new()
    }
}

impl Md5 {
    /// Creates a hasher with an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: md5::Md5::new(),
        }
    }

    /// Feeds additional bytes into the digest state.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalises the digest and returns the 128-bit MD5 output.
    #[must_use]
    pub fn finalize(self) -> [u8; 16] {
        self.inner.finalize().into()
    }

    /// Convenience helper that computes the MD5 digest for `data` in one shot.
    #[must_use]
    pub fn digest(data: &[u8]) -> [u8; 16] {
        let mut hasher = Self::new();
        hasher.update(data);
        hasher.finalize()
    }
}

impl StrongDigest for Md5 {
    type Digest = [u8; 16];
    const DIGEST_LEN: usize = 16;

    fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    fn finalize(self) -> Self::Digest {
        self.inner.finalize().into()
    }
}

/// MD5 hasher mixed with the session's 32-bit checksum seed.
///
/// The seed is appended as little-endian bytes at `finalize` time, after all
/// caller-supplied data, matching how the protocol authenticates block and
/// whole-file digests against a session: `MD5(data || seed)`. Appending at
/// finalize rather than prepending at construction means a caller can stream
/// arbitrarily large files through [`Self::update`] without buffering.
#[derive(Clone, Debug)]
pub struct SeededMd5 {
    inner: md5::Md5,
    seed: u32,
}

impl SeededMd5 {
    /// Creates a hasher seeded with the session's checksum seed.
    #[must_use]
    pub fn new(seed: u32) -> Self {
        Self {
            inner: md5::Md5::new(),
            seed,
        }
    }

    /// Feeds additional bytes into the digest state.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalises the digest, mixing in the seed, and returns the 128-bit output.
    #[must_use]
    pub fn finalize(mut self) -> [u8; 16] {
        self.inner.update(self.seed.to_le_bytes());
        self.inner.finalize().into()
    }

    /// Convenience helper that computes `MD5(data || seed)` in one call.
    #[must_use]
    pub fn digest(seed: u32, data: &[u8]) -> [u8; 16] {
        let mut hasher = Self::new(seed);
        hasher.update(data);
        hasher.finalize()
    }
}
