//! File-list construction, ordering, and wire encoding.
//!
//! # Overview
//!
//! An rsync transfer exchanges a *file list*: an ordered sequence of
//! [`FileInfo`] entries describing every path under the transfer's roots.
//! With incremental recursion, the list is not sent as one block; it is
//! built and consumed as a FIFO of [`Segment`]s, each expanded on demand
//! from a "stub directory" entry in an earlier segment. [`Filelist`] holds
//! that queue and hands out the global, monotonically increasing indices
//! ([`Index`]) both sides use to name entries on the wire.
//!
//! # Design
//!
//! - [`attributes`] — the metadata every transferable entry carries
//!   (mode, size, mtime, owning user/group).
//! - [`file_info`] — [`FileInfo`] itself, its sort order, and
//!   [`FileInfoCache`], which drives the `SAME_*` wire dedup.
//! - [`segment`] — the FIFO of [`Segment`]s and the [`Filelist`] that owns
//!   index assignment and stub-directory expansion order.
//! - [`wire`] — encodes and decodes one [`FileInfo`] entry at a time against
//!   a [`FileInfoCache`], matching the xflags layout described for
//!   file-list entries.
//! - [`itemize`] — the 16-bit flag word a Generator attaches to an index to
//!   announce what changed and whether a body transfer follows.
//!
//! # See also
//!
//! [`protocol::ndx`] for the signed-index codec that carries [`Index`]
//! values across the wire once a file list entry has been assigned one.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod attributes;
pub mod file_info;
pub mod itemize;
pub mod segment;
pub mod wire;

pub use attributes::{Attributes, FileMode, IdName};
pub use file_info::{DeviceKind, FileInfo, FileInfoCache, FileKind};
pub use itemize::{
    read_itemize_flags, write_itemize_flags, ItemizeFlags, IS_NEW, LOCAL_CHANGE, NO_CHANGE, REPORT_CHANGE,
    REPORT_GROUP, REPORT_OWNER, REPORT_PERMS, REPORT_SIZE, REPORT_TIME, TRANSFER,
};
pub use segment::{FlistError, Index, Segment, Filelist, DONE, EOF, OFFSET};
pub use wire::{read_entry, write_entry, DecodedEntry, WireError};
