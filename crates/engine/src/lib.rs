//! The Sender role: expanding directories into file-list segments and
//! matching local files against a peer's checksum signature.
//!
//! # Overview
//!
//! `engine` is the half of a transfer that reads from the local filesystem
//! and only ever produces bytes for the wire; it never writes to disk. It
//! covers the Sender responsibilities: initial and incremental directory
//! expansion (stub directories, queued one level at a time), per-file
//! metadata emission, and the matching-algorithm hot path that turns a
//! peer's block signature into a token stream.
//!
//! # Design
//!
//! - [`walk`] expands one directory level into sorted [`flist::FileInfo`]
//!   entries, through the [`metadata::FileAttributeManager`] capability.
//! - [`sender`] drives the transfer-phase state machine: the incremental
//!   expansion loop, the index/checksum-header/token-stream exchange per
//!   file, and end-of-phase statistics.
//!
//! # See also
//!
//! The `transfer` crate implements the opposite number (Generator and
//! Receiver), which this crate's wire types ([`protocol`], [`flist`],
//! [`signature`], [`matching`]) are shared with.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod sender;
pub mod walk;

pub use sender::{Sender, SenderConfig, TransferPhase};
