//! The Generator and Receiver roles: expanding a peer's file list against
//! the local destination and reconstructing whatever changed.
//!
//! # Overview
//!
//! `transfer` is the opposite number to the `engine` crate: it reads
//! segments and token streams the peer sends and only ever writes to disk,
//! never walking a source tree of its own. It covers the two destination
//! responsibilities: the Generator's per-file policy decisions and delta
//! requests, and the Receiver's file-list decoding and body reconstruction.
//!
//! # Design
//!
//! - [`job`] replaces the deferred-work queue with a plain tagged enum,
//!   dispatched by [`generator::Generator::dispatch`] rather than by
//!   invoking closures.
//! - [`generator`] decides, per entry, whether the destination already
//!   matches the peer's announced attributes and whether a body transfer
//!   is needed; attribute-only changes are deferred until the transfer
//!   phase ends.
//! - [`receiver`] decodes file-list segments off the wire and reconstructs
//!   file bodies, using the file already at the destination as the match
//!   source for the peer's token stream.
//! - [`session`] wires the two together for one full transfer.
//!
//! # See also
//!
//! The `engine` crate's [`protocol`], [`flist`], [`signature`], and
//! [`matching`] wire types are shared with this crate.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod generator;
pub mod job;
pub mod path;
pub mod receiver;
pub mod session;

pub use generator::{Generator, GeneratorConfig, PendingTransfer};
pub use job::GeneratorJob;
pub use receiver::{BodyOutcome, Receiver};
pub use session::run_update;
