//! The sender side of block matching: walk a local file against a peer's
//! [`ChecksumTable`], emitting a token stream plus a whole-file digest.

use std::io::{self, Read};

use checksums::strong::SeededMd5;
use checksums::RollingChecksum;
use protocol::ChecksumSeed;
use signature::{ChecksumHeader, ChecksumTable};

use crate::file_view::{FileView, DEFAULT_BUFFER_SIZE};
use crate::token::{push_literal_tokens, Token};

/// The result of matching a file against a peer's signature: the token
/// stream describing how to reconstruct it, and the whole-file strong
/// digest the receiver uses to confirm the reconstruction was correct.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MatchResult {
    /// Literal and match tokens, in file order.
    pub tokens: Vec<Token>,
    /// Seeded MD5 of the entire file, computed alongside the match.
    pub file_digest: [u8; 16],
}

/// Walks `reader` against `table`, producing a [`MatchResult`].
///
/// `table` and `header` describe the receiver's existing copy of the file:
/// `header.block_len_at(index)` gives the exact length expected for each
/// candidate block, which is checked before the (more expensive) strong
/// hash comparison so a weak-hash collision against a differently-sized
/// block is rejected cheaply.
///
/// When `header.is_empty()` (the peer has no usable copy), the whole file
/// is emitted as literal tokens.
///
/// # Errors
///
/// Propagates I/O errors encountered while reading `reader`.
pub fn match_file<R: Read>(reader: R, file_size: u64, header: &ChecksumHeader, table: &ChecksumTable) -> io::Result<MatchResult> {
    match_file_with_seed(reader, file_size, header, table, ChecksumSeed::new(0))
}

/// As [`match_file`], but with an explicit checksum seed for the whole-file
/// digest and any strong-hash comparisons.
///
/// # Errors
///
/// Propagates I/O errors encountered while reading `reader`.
pub fn match_file_with_seed<R: Read>(
    mut reader: R,
    file_size: u64,
    header: &ChecksumHeader,
    table: &ChecksumTable,
    seed: ChecksumSeed,
) -> io::Result<MatchResult> {
    let mut tokens = Vec::new();
    let mut file_hash = SeededMd5::new(seed.get());

    if header.is_empty() || table.is_empty() {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        file_hash.update(&data);
        push_literal_tokens(&mut tokens, &data);
        return Ok(MatchResult {
            tokens,
            file_digest: file_hash.finalize(),
        });
    }

    let window_length = header.block_length() as usize;
    let mut view = FileView::new(reader, file_size, window_length, DEFAULT_BUFFER_SIZE.max(window_length * 4));
    let mut preferred_index: Option<u32> = None;

    let mut window = view.window();
    let mut weak = RollingChecksum::new();
    weak.update_from_block(&window);

    while !window.is_empty() {
        let matched = find_match(&window, weak.value(), header, table, preferred_index, seed);

        if let Some(index) = matched {
            let literal = view.literal_bytes();
            file_hash.update(&literal);
            push_literal_tokens(&mut tokens, &literal);
            tokens.push(Token::Match(index));
            preferred_index = Some(index + 1);
            view.slide(window.len() as u64);
            view.advance_mark_to_start();
            window = view.window();
            weak.update_from_block(&window);
        } else {
            if view.would_overflow() {
                let literal = view.literal_bytes();
                file_hash.update(&literal);
                push_literal_tokens(&mut tokens, &literal);
                view.advance_mark_to_start();
            }
            let outgoing = window[0];
            let incoming = view.byte_after_window();
            view.slide(1);
            window = view.window();
            match incoming {
                Some(incoming) => weak.roll(outgoing, incoming).expect("weak checksum window is already seeded"),
                None => weak.update_from_block(&window),
            }
        }
    }

    let literal = view.literal_bytes();
    file_hash.update(&literal);
    push_literal_tokens(&mut tokens, &literal);
    view.close()?;

    Ok(MatchResult {
        tokens,
        file_digest: file_hash.finalize(),
    })
}

fn find_match(window: &[u8], weak_value: u32, header: &ChecksumHeader, table: &ChecksumTable, preferred_index: Option<u32>, seed: ChecksumSeed) -> Option<u32> {
    for candidate in table.candidates(weak_value, preferred_index) {
        let Some(chunk) = table.chunk(candidate) else {
            continue;
        };
        if header.block_len_at(candidate) as usize != window.len() {
            continue;
        }
        let digest_len = chunk.strong_prefix().len();
        let mut strong = SeededMd5::new(seed.get());
        strong.update(window);
        let full = strong.finalize();
        if &full[..digest_len] == chunk.strong_prefix() {
            return Some(candidate);
        }
    }
    None
}
