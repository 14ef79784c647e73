//! On-wire encoding of a [`ChecksumHeader`] and its [`ChecksumChunk`]s.
//!
//! The header is four little-endian `u32` fields; each chunk is a
//! little-endian weak hash followed by exactly `digest_length` bytes of
//! strong-hash prefix (the length the header already negotiated, so it is
//! never repeated per chunk).

use std::io::{self, Read, Write};

use crate::chunk::ChecksumChunk;
use crate::header::ChecksumHeader;

/// Writes `header`'s four fields as little-endian `u32`s.
///
/// # Errors
///
/// Propagates I/O errors from `writer`.
pub fn write_header<W: Write>(writer: &mut W, header: &ChecksumHeader) -> io::Result<()> {
    writer.write_all(&header.chunk_count().to_le_bytes())?;
    writer.write_all(&header.block_length().to_le_bytes())?;
    writer.write_all(&header.remainder().to_le_bytes())?;
    writer.write_all(&header.digest_length().to_le_bytes())
}

/// Reads a [`ChecksumHeader`] previously written by [`write_header`].
///
/// # Errors
///
/// Propagates I/O errors from `reader`.
pub fn read_header<R: Read>(reader: &mut R) -> io::Result<ChecksumHeader> {
    let chunk_count = read_u32(reader)?;
    let block_length = read_u32(reader)?;
    let remainder = read_u32(reader)?;
    let digest_length = read_u32(reader)?;
    Ok(ChecksumHeader::new(chunk_count, block_length, remainder, digest_length))
}

/// Writes every chunk in `chunks`, in index order, using `digest_length`
/// bytes of strong-hash prefix per chunk (as negotiated by the header that
/// precedes them on the wire).
///
/// # Errors
///
/// Propagates I/O errors from `writer`.
pub fn write_chunks<W: Write>(writer: &mut W, chunks: &[ChecksumChunk]) -> io::Result<()> {
    for chunk in chunks {
        writer.write_all(&chunk.weak_hash().to_le_bytes())?;
        writer.write_all(chunk.strong_prefix())?;
    }
    Ok(())
}

/// Reads `header.chunk_count()` chunks, each carrying `header.digest_length()`
/// bytes of strong-hash prefix.
///
/// # Errors
///
/// Propagates I/O errors from `reader`.
pub fn read_chunks<R: Read>(reader: &mut R, header: &ChecksumHeader) -> io::Result<Vec<ChecksumChunk>> {
    let digest_len = header.digest_length() as usize;
    let mut chunks = Vec::with_capacity(header.chunk_count() as usize);
    for index in 0..header.chunk_count() {
        let weak_hash = read_u32(reader)?;
        let mut strong_prefix = vec![0u8; digest_len];
        reader.read_exact(&mut strong_prefix)?;
        chunks.push(ChecksumChunk::new(index, weak_hash, strong_prefix));
    }
    Ok(chunks)
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn header_round_trips() {
        let header = ChecksumHeader::for_file_size(10_000);
        let mut buf = Vec::new();
        write_header(&mut buf, &header).unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(read_header(&mut cursor).unwrap(), header);
    }

    #[test]
    fn chunks_round_trip_with_negotiated_digest_length() {
        let header = ChecksumHeader::new(2, 512, 0, 4);
        let chunks = vec![
            ChecksumChunk::new(0, 0xAABB_CCDD, vec![1, 2, 3, 4]),
            ChecksumChunk::new(1, 0x1122_3344, vec![5, 6, 7, 8]),
        ];
        let mut buf = Vec::new();
        write_chunks(&mut buf, &chunks).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded = read_chunks(&mut cursor, &header).unwrap();
        assert_eq!(decoded, chunks);
    }

    #[test]
    fn empty_header_round_trips_with_no_chunks() {
        let header = ChecksumHeader::for_file_size(0);
        let mut buf = Vec::new();
        write_header(&mut buf, &header).unwrap();
        write_chunks(&mut buf, &[]).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded_header = read_header(&mut cursor).unwrap();
        let decoded_chunks = read_chunks(&mut cursor, &decoded_header).unwrap();
        assert!(decoded_chunks.is_empty());
    }
}
