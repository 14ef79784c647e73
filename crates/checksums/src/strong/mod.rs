//! Strong checksum used to confirm weak-checksum matches and verify files.
//!
//! The protocol authenticates every block match and every whole-file
//! transfer with an MD5 digest mixed with a per-session seed, so a replayed
//! or guessed weak-checksum collision from a different session cannot be
//! mistaken for a real match.

mod md5;

pub use md5::{Md5, SeededMd5};

/// Trait implemented by strong checksum algorithms used during delta transfer.
///
/// Implementors provide a streaming interface: callers feed data
/// incrementally via [`Self::update`] and then obtain the final digest
/// through [`Self::finalize`]. [`DIGEST_LEN`](Self::DIGEST_LEN) exposes the
/// byte width of the full digest; callers typically only compare a
/// negotiated *prefix* of it (see the signature crate's `digest_length`).
pub trait StrongDigest: Sized {
    /// Type returned when finalising the digest.
    type Digest: AsRef<[u8]> + Copy;

    /// Length of the full digest in bytes.
    const DIGEST_LEN: usize;

    /// Feeds additional bytes into the digest state.
    fn update(&mut self, data: &[u8]);

    /// Finalises the digest and returns the resulting hash.
    fn finalize(self) -> Self::Digest;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_trait_round_trip_matches_inherent_api() {
        let input = b"trait-check";

        let mut via_trait = Md5::new();
        via_trait.update(input);
        let trait_digest = via_trait.finalize();

        assert_eq!(trait_digest.as_ref(), Md5::digest(input).as_ref());
    }

    #[test]
    fn seeded_md5_differs_from_unseeded() {
        let mut plain = Md5::new();
        plain.update(b"same bytes");
        let plain_digest = plain.finalize();

        let mut seeded = SeededMd5::new(42);
        seeded.update(b"same bytes");
        let seeded_digest = seeded.finalize();

        assert_ne!(plain_digest, seeded_digest);
    }

    #[test]
    fn seeded_md5_is_deterministic_per_seed() {
        let mut a = SeededMd5::new(7);
        a.update(b"payload");
        let a = a.finalize();

        let mut b = SeededMd5::new(7);
        b.update(b"pay");
        b.update(b"load");
        let b = b.finalize();

        assert_eq!(a, b);
    }
}
