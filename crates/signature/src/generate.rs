//! Whole-file signature generation: splitting a file into blocks and
//! computing each block's weak and seeded-strong checksum.

use std::io::{self, Read};

use checksums::strong::SeededMd5;
use checksums::RollingChecksum;
use protocol::ChecksumSeed;
use rayon::prelude::*;

use crate::chunk::ChecksumChunk;
use crate::header::ChecksumHeader;

/// Reads all of `reader`'s contents into fixed-size blocks according to
/// `header`, computing each block's weak hash and `digest_length`-byte
/// strong-hash prefix.
///
/// Per-block checksums are computed in parallel once the file is fully
/// buffered, since each block's digest is independent of its neighbours.
///
/// # Errors
///
/// Propagates I/O errors from `reader`.
pub fn generate<R: Read>(reader: &mut R, header: ChecksumHeader, seed: ChecksumSeed) -> io::Result<Vec<ChecksumChunk>> {
    if header.is_empty() {
        return Ok(Vec::new());
    }

    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;

    let digest_len = header.digest_length() as usize;
    let chunks: Vec<ChecksumChunk> = (0..header.chunk_count())
        .into_par_iter()
        .map(|index| {
            let start = index as usize * header.block_length() as usize;
            let len = header.block_len_at(index) as usize;
            let block = &data[start..start + len];

            let mut weak = RollingChecksum::new();
            weak.update_from_block(block);

            let mut strong = SeededMd5::new(seed.get());
            strong.update(block);
            let digest = strong.finalize();

            ChecksumChunk::new(index, weak.value(), digest[..digest_len].to_vec())
        })
        .collect();

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Seek, SeekFrom, Write};

    #[test]
    fn generates_one_chunk_per_block() {
        let data = vec![7u8; 2048];
        let header = ChecksumHeader::for_file_size(data.len() as u64);
        let mut cursor = Cursor::new(data);
        let chunks = generate(&mut cursor, header, ChecksumSeed::new(1)).unwrap();
        assert_eq!(chunks.len() as u32, header.chunk_count());
        for chunk in &chunks {
            assert_eq!(chunk.strong_prefix().len(), header.digest_length() as usize);
        }
    }

    #[test]
    fn identical_blocks_share_checksums() {
        let mut data = vec![1u8; 512];
        data.extend(vec![1u8; 512]);
        let header = ChecksumHeader::for_file_size(data.len() as u64);
        let mut cursor = Cursor::new(data);
        let chunks = generate(&mut cursor, header, ChecksumSeed::new(99)).unwrap();
        assert_eq!(chunks[0].weak_hash(), chunks[1].weak_hash());
        assert_eq!(chunks[0].strong_prefix(), chunks[1].strong_prefix());
    }

    #[test]
    fn empty_file_yields_no_chunks() {
        let header = ChecksumHeader::for_file_size(0);
        let mut cursor = Cursor::new(Vec::new());
        let chunks = generate(&mut cursor, header, ChecksumSeed::new(0)).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn different_blocks_produce_different_weak_hashes() {
        let mut data = vec![1u8; 512];
        data.extend(vec![2u8; 512]);
        let header = ChecksumHeader::for_file_size(data.len() as u64);
        let mut cursor = Cursor::new(data);
        let chunks = generate(&mut cursor, header, ChecksumSeed::new(5)).unwrap();
        assert_ne!(chunks[0].weak_hash(), chunks[1].weak_hash());
    }

    #[test]
    fn generates_from_a_real_file_on_disk() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(&vec![42u8; 4096]).unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();

        let header = ChecksumHeader::for_file_size(4096);
        let chunks = generate(&mut file, header, ChecksumSeed::new(3)).unwrap();
        assert_eq!(chunks.len() as u32, header.chunk_count());
    }
}
