//! The tagged job variants dispatched by [`crate::generator::Generator`].
//!
//! Upstream expresses the generator's deferred work as anonymous inner
//! classes queued for later execution. Here that queue is a plain enum,
//! matched by a simple loop in [`crate::generator::Generator::dispatch`].

use std::path::PathBuf;

use flist::{FileInfo, Index};
use protocol::envelope::MessageCode;

/// One unit of work for the generator loop.
#[derive(Debug)]
pub enum GeneratorJob {
    /// Decide the per-file policy for every entry in a freshly-expanded
    /// segment rooted at `target_dir`.
    ListSegment {
        /// Local directory the segment's entries live under.
        target_dir: PathBuf,
        /// Indices assigned by the receiver's file list, paired with their
        /// decoded entries.
        entries: Vec<(Index, FileInfo)>,
    },
    /// Re-request a single file's transfer, e.g. after a failed digest
    /// verification.
    GenerateFile {
        /// Local directory the entry lives under.
        target_dir: PathBuf,
        /// The entry's file-list index.
        index: Index,
        /// The entry itself.
        info: FileInfo,
    },
    /// Drop bookkeeping for an index the receiver has fully resolved.
    ///
    /// Bookkeeping for live indices lives in the receiver's [`flist::Filelist`]
    /// rather than in the generator, so this is a no-op placeholder kept for
    /// parity with the job vocabulary; nothing currently sends it.
    PurgeFile {
        /// The index to forget.
        index: Index,
    },
    /// Apply a deferred attribute update once the transfer phase ends.
    UpdateAttrs {
        /// Local path to update.
        path: PathBuf,
        /// Entry carrying the attributes to apply.
        info: FileInfo,
    },
    /// Write raw bytes straight to the outbound channel.
    SendBytes {
        /// Bytes to write.
        bytes: Vec<u8>,
    },
    /// Write a framed protocol message.
    SendMessage {
        /// Message code.
        code: MessageCode,
        /// UTF-8 message text.
        text: String,
    },
    /// Flush every deferred attribute update queued by [`Self::UpdateAttrs`].
    ProcessDeferred,
    /// Signal the end of the transfer phase.
    Stop,
}
