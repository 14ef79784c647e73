//! [`ChecksumChunk`] and the [`ChecksumTable`] lookup structure used by the
//! sender's matching algorithm.

use rustc_hash::FxHashMap;

/// One block's weak and (prefix of) strong checksum, as sent in a peer's
/// signature.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChecksumChunk {
    index: u32,
    weak_hash: u32,
    strong_prefix: Vec<u8>,
}

impl ChecksumChunk {
    /// Builds a chunk from its wire components.
    #[must_use]
    pub fn new(index: u32, weak_hash: u32, strong_prefix: Vec<u8>) -> Self {
        Self {
            index,
            weak_hash,
            strong_prefix,
        }
    }

    /// Position of this block within the file, in block-length units.
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Packed rolling checksum value.
    #[must_use]
    pub const fn weak_hash(&self) -> u32 {
        self.weak_hash
    }

    /// The negotiated-length prefix of the block's strong hash.
    #[must_use]
    pub fn strong_prefix(&self) -> &[u8] {
        &self.strong_prefix
    }
}

/// Indexes a peer's checksum chunks by weak hash, so the matching loop can
/// look up candidates for a rolling-hash value in O(1) instead of scanning
/// every chunk for every window position.
#[derive(Clone, Debug, Default)]
pub struct ChecksumTable {
    by_weak_hash: FxHashMap<u32, Vec<u32>>,
    chunks: Vec<ChecksumChunk>,
}

impl ChecksumTable {
    /// Builds a lookup table over `chunks`.
    #[must_use]
    pub fn new(chunks: Vec<ChecksumChunk>) -> Self {
        let mut by_weak_hash: FxHashMap<u32, Vec<u32>> = FxHashMap::with_capacity_and_hasher(chunks.len(), Default::default());
        for chunk in &chunks {
            by_weak_hash.entry(chunk.weak_hash).or_default().push(chunk.index);
        }
        Self { by_weak_hash, chunks }
    }

    /// Returns the chunk at `index`, if any.
    #[must_use]
    pub fn chunk(&self, index: u32) -> Option<&ChecksumChunk> {
        self.chunks.get(index as usize)
    }

    /// Returns the number of chunks indexed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns whether the table holds no chunks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Returns candidate chunk indices sharing `weak_hash`, ordered so that
    /// `preferred_index` (the peer's last matched chunk + 1, biasing toward
    /// in-order matches) is tried first when present among the candidates.
    #[must_use]
    pub fn candidates(&self, weak_hash: u32, preferred_index: Option<u32>) -> Vec<u32> {
        let Some(indices) = self.by_weak_hash.get(&weak_hash) else {
            return Vec::new();
        };
        let mut ordered = indices.clone();
        if let Some(preferred) = preferred_index {
            if let Some(pos) = ordered.iter().position(|&i| i == preferred) {
                ordered.swap(0, pos);
            }
        }
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: u32, weak: u32) -> ChecksumChunk {
        ChecksumChunk::new(index, weak, vec![0u8; 8])
    }

    #[test]
    fn candidates_are_grouped_by_weak_hash() {
        let table = ChecksumTable::new(vec![chunk(0, 10), chunk(1, 20), chunk(2, 10)]);
        let mut found = table.candidates(10, None);
        found.sort_unstable();
        assert_eq!(found, vec![0, 2]);
        assert!(table.candidates(99, None).is_empty());
    }

    #[test]
    fn preferred_index_is_tried_first() {
        let table = ChecksumTable::new(vec![chunk(0, 10), chunk(5, 10), chunk(9, 10)]);
        let found = table.candidates(10, Some(9));
        assert_eq!(found[0], 9);
    }

    #[test]
    fn chunk_lookup_is_by_position_not_weak_hash() {
        let table = ChecksumTable::new(vec![chunk(0, 10), chunk(1, 20)]);
        assert_eq!(table.chunk(1).unwrap().weak_hash(), 20);
        assert!(table.chunk(5).is_none());
    }
}
