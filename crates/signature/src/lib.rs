//! Checksum signatures: how a file is split into blocks for delta matching.
//!
//! # Overview
//!
//! Before the sender can diff a file against a remote replica, the receiver
//! side (acting as the Generator) chooses a block size, reads the local
//! candidate file, and computes a weak + seeded-strong checksum per block.
//! This crate owns that signature: its sizing formulas ([`block_size`]),
//! its wire shape ([`header`], [`chunk`]), and its generation
//! ([`generate`]).
//!
//! # Design
//!
//! - [`block_size`] picks `blockLength` and `digestLength` from a file's
//!   size, per the standard sizing formulas.
//! - [`header::ChecksumHeader`] carries the chosen sizing plus the derived
//!   chunk count and final-block remainder.
//! - [`chunk::ChecksumChunk`] and [`chunk::ChecksumTable`] are a peer's
//!   received signature, indexed by weak hash for the matching algorithm's
//!   candidate lookup.
//! - [`generate::generate`] computes a signature for a local file, using
//!   [`checksums`] for the per-block hashing and `rayon` to parallelize
//!   across blocks.
//!
//! # See also
//!
//! The `matching` crate consumes [`chunk::ChecksumTable`] to drive its
//! sliding-window search; [`checksums`] supplies the hash primitives this
//! crate wraps into whole-file signatures.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod block_size;
pub mod chunk;
pub mod generate;
pub mod header;
pub mod wire;

pub use block_size::{block_length, digest_length, MAX_DIGEST_LEN, MIN_BLOCK_LEN, MIN_DIGEST_LEN};
pub use chunk::{ChecksumChunk, ChecksumTable};
pub use generate::generate as generate_signature;
pub use header::ChecksumHeader;
pub use wire::{read_chunks, read_header, write_chunks, write_header};
