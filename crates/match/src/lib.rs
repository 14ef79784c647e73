//! Block matching: comparing a local file against a peer's checksum
//! signature to produce a compact delta.
//!
//! # Overview
//!
//! Given a [`signature::ChecksumHeader`] and [`signature::ChecksumTable`]
//! describing a peer's existing copy of a file, [`sender::match_file`] walks
//! a local reader with a sliding window ([`file_view::FileView`]), looking
//! up each window's rolling checksum against the table and confirming
//! candidates with a strong-hash comparison before emitting a
//! [`token::Token::Match`]. Bytes that never match any block are emitted as
//! [`token::Token::Literal`] runs, chunked to [`token::CHUNK_SIZE`] bytes.
//! The whole-file seeded MD5 is accumulated alongside the token stream so
//! the receiver can confirm the reconstruction without a second pass over
//! the file.
//!
//! # Design
//!
//! - [`file_view`] implements the sliding window itself, including the
//!   mark/start offset split that lets unmatched literal bytes accumulate
//!   behind the active window without being re-buffered on every slide.
//! - [`token`] defines the wire-shaped output of a match: literal chunks and
//!   match references.
//! - [`sender`] drives the matching loop and owns the whole-file digest.
//!
//! # See also
//!
//! [`signature`] for how the peer's table is built in the first place, and
//! [`checksums`] for the rolling and strong hash primitives used here.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod file_view;
pub mod sender;
pub mod token;
pub mod wire;

pub use file_view::{FileView, DEFAULT_BUFFER_SIZE};
pub use sender::{match_file, match_file_with_seed, MatchResult};
pub use token::{push_literal_tokens, Token, CHUNK_SIZE};
pub use wire::{read_token, read_tokens, write_token, write_tokens};
