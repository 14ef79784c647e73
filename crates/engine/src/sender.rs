//! The Sender role: walks the local filesystem, emits file-list segments,
//! and answers the peer Generator's checksum requests with token streams.

use std::io::{self, Read};
use std::path::PathBuf;

use flist::{FileInfo, FileInfoCache, Filelist, Index, DONE, EOF, OFFSET};
use matching::{match_file_with_seed, wire::write_tokens, Token};
use metadata::FileAttributeManager;
use protocol::envelope::MessageCode;
use protocol::multiplex::{ChannelReader, ChannelWriter};
use protocol::{ChecksumSeed, FramedReader, FramedWriter, MessageHandler, NdxCodec, Statistics};
use signature::{wire::read_chunks, wire::read_header, ChecksumTable};

use crate::walk;

/// Ceiling on in-flight (not yet reconciled) file-list entries before the
/// incremental expansion loop pauses to let the peer catch up.
pub const PARTIAL_FILE_LIST_SIZE: usize = 1024;

/// The Sender's transfer-phase state machine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransferPhase {
    /// Normal operation: expanding directories and matching files.
    Transfer,
    /// First tear-down step after the file list is exhausted.
    TearDown1,
    /// Second tear-down step; statistics are exchanged here.
    TearDown2,
    /// The session has ended.
    Stop,
}

/// Configuration for one Sender run.
#[derive(Clone, Debug)]
pub struct SenderConfig {
    /// Source paths to expand into the initial file-list segment.
    pub roots: Vec<PathBuf>,
    /// Session checksum seed, mixed into every strong-hash comparison.
    pub checksum_seed: ChecksumSeed,
    /// Whether to exchange a statistics message at the end of the phase.
    pub collect_statistics: bool,
}

/// Drives the Sender side of a transfer over a framed duplex channel.
pub struct Sender<'a, R, W> {
    reader: FramedReader<R>,
    writer: FramedWriter<W>,
    manager: &'a dyn FileAttributeManager,
    list: Filelist,
    read_ndx: NdxCodec,
    write_ndx: NdxCodec,
    cache: FileInfoCache,
    phase: TransferPhase,
    stats: Statistics,
    config: SenderConfig,
}

impl<'a, R: Read, W: io::Write> Sender<'a, R, W> {
    /// Builds a new Sender over an already-negotiated channel.
    pub fn new(reader: FramedReader<R>, writer: FramedWriter<W>, manager: &'a dyn FileAttributeManager, config: SenderConfig) -> Self {
        Self {
            reader,
            writer,
            manager,
            list: Filelist::new(),
            read_ndx: NdxCodec::new(),
            write_ndx: NdxCodec::new(),
            cache: FileInfoCache::new(),
            phase: TransferPhase::Transfer,
            stats: Statistics::new(),
            config,
        }
    }

    /// Returns the current transfer phase.
    #[must_use]
    pub const fn phase(&self) -> TransferPhase {
        self.phase
    }

    /// Expands every root path and emits the initial file-list segment
    /// (segment 0). A root that is itself a directory is expanded one
    /// level immediately, matching a dot-directory argument; any
    /// subdirectory discovered this way is queued as a stub for later
    /// expansion.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from stat'ing the roots, expanding a
    /// directory, or writing the resulting entries to the wire.
    pub fn initial_expansion(&mut self, handler: &mut dyn MessageHandler) -> io::Result<()> {
        let mut infos = Vec::new();
        let mut root_is_dir = Vec::new();
        for root in self.config.roots.clone() {
            let Some(info) = walk::stat_root(self.manager, &root)? else {
                continue;
            };
            if info.is_directory() {
                let children = walk::expand_directory(self.manager, &root, info.path())?;
                root_is_dir.push(infos.len());
                infos.push(info);
                for child in children {
                    infos.push(child.info);
                }
            } else {
                infos.push(info);
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(roots = self.config.roots.len(), entries = infos.len(), "initial expansion complete");

        self.stats.num_files = infos.len() as u64;
        let assigned = self.list.new_segment(None, infos);
        self.queue_new_directories(&assigned, &root_is_dir);
        self.emit_first_unsent_segment(handler)
    }

    /// Queues every assigned index whose entry is a directory, except the
    /// indices in `already_expanded` (the transfer's own root arguments,
    /// which [`initial_expansion`](Self::initial_expansion) has already
    /// expanded one level).
    fn queue_new_directories(&mut self, assigned: &[Index], already_expanded: &[usize]) {
        for (position, &index) in assigned.iter().enumerate() {
            if already_expanded.contains(&position) {
                continue;
            }
            if matches!(self.list.file(index).map(FileInfo::is_directory), Some(true)) {
                self.list.queue_stub_directory(index);
            }
        }
    }

    /// Expands queued stub directories while the in-flight entry count
    /// stays under half of [`PARTIAL_FILE_LIST_SIZE`] and the transfer
    /// phase has not ended.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from expanding a directory or writing its
    /// segment.
    pub fn expand_pending_stubs(&mut self, handler: &mut dyn MessageHandler) -> io::Result<()> {
        while self.phase != TransferPhase::Stop
            && self.list.is_expandable()
            && self.in_flight_count() < PARTIAL_FILE_LIST_SIZE / 2
        {
            let Some(stub_index) = self.list.pop_stub_directory() else {
                break;
            };
            self.write_ndx.write(&mut ChannelWriter::new(&mut self.writer), OFFSET - stub_index)?;
            self.expand_stub(stub_index, handler)?;
        }
        Ok(())
    }

    fn in_flight_count(&self) -> usize {
        self.list.total_entries()
    }

    fn expand_stub(&mut self, stub_index: Index, handler: &mut dyn MessageHandler) -> io::Result<()> {
        let Some(stub) = self.list.file(stub_index) else {
            self.list.new_segment(Some(stub_index), Vec::new());
            return self.emit_first_unsent_segment(handler);
        };
        let Some(local_path) = stub.locatable().cloned() else {
            self.list.new_segment(Some(stub_index), Vec::new());
            return self.emit_first_unsent_segment(handler);
        };
        let path = stub.path().to_vec();
        let children = walk::expand_directory(self.manager, &local_path, &path)?;
        let infos: Vec<_> = children.into_iter().map(|c| c.info).collect();

        #[cfg(feature = "tracing")]
        tracing::trace!(stub_index, entries = infos.len(), "expanded stub directory");

        self.stats.num_files += infos.len() as u64;
        let assigned = self.list.new_segment(Some(stub_index), infos);
        self.queue_new_directories(&assigned, &[]);
        self.emit_first_unsent_segment(handler)
    }

    fn emit_first_unsent_segment(&mut self, _handler: &mut dyn MessageHandler) -> io::Result<()> {
        let Some(segment) = self.list.first_segment() else {
            return Ok(());
        };
        let is_root_segment = segment.stub_directory().is_none();
        for (_, info) in segment.iter() {
            flist::write_entry(&mut ChannelWriter::new(&mut self.writer), info, is_root_segment, &mut self.cache)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))?;
        }
        self.writer.put(&[0u8])?;
        self.writer.flush()
    }

    /// Runs the transfer loop: reads indices from the peer, answering
    /// `DONE`, stub-expansion requests, and checksum-header-driven matches
    /// until the phase advances to [`TransferPhase::Stop`].
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the channel or from reading local files
    /// during matching.
    pub fn run_transfer_loop(&mut self, handler: &mut dyn MessageHandler) -> io::Result<Statistics> {
        loop {
            let index = {
                let mut channel_reader = ChannelReader::new(&mut self.reader, handler);
                self.read_ndx.read(&mut channel_reader)?
            };

            if index == DONE {
                if let Some(segment) = self.list.first_segment() {
                    if segment.is_finished() {
                        let _ = self.list.delete_first_segment();
                    }
                }
                if self.list.first_segment().is_none() && !self.list.is_expandable() {
                    self.phase = TransferPhase::TearDown1;
                }
                if self.phase == TransferPhase::TearDown1 {
                    self.phase = TransferPhase::TearDown2;
                    if self.config.collect_statistics {
                        self.send_statistics()?;
                    }
                    self.phase = TransferPhase::Stop;
                    return Ok(self.stats);
                }
                self.expand_pending_stubs(handler)?;
                continue;
            }

            if index == EOF {
                self.list.mark_eof();
                continue;
            }

            if index <= OFFSET {
                let stub_index = OFFSET - index;
                self.expand_stub(stub_index, handler)?;
                continue;
            }

            self.handle_file_request(index, handler)?;
        }
    }

    fn handle_file_request(&mut self, index: Index, handler: &mut dyn MessageHandler) -> io::Result<()> {
        let itemize = {
            let mut channel_reader = ChannelReader::new(&mut self.reader, handler);
            flist::read_itemize_flags(&mut channel_reader)?
        };

        if !itemize.requires_transfer() {
            self.list.remove_file(index);
            return Ok(());
        }

        let header = {
            let mut channel_reader = ChannelReader::new(&mut self.reader, handler);
            read_header(&mut channel_reader)?
        };
        let chunks = {
            let mut channel_reader = ChannelReader::new(&mut self.reader, handler);
            read_chunks(&mut channel_reader, &header)?
        };
        let table = ChecksumTable::new(chunks);

        let Some(info) = self.list.file(index) else {
            return Ok(());
        };
        let Some(local_path) = info.locatable().cloned() else {
            self.send_no_send(index)?;
            self.list.remove_file(index);
            return Ok(());
        };

        let file = match std::fs::File::open(&local_path) {
            Ok(file) => file,
            Err(_) => {
                self.send_no_send(index)?;
                self.list.remove_file(index);
                return Ok(());
            }
        };
        let file_size = file.metadata().map(|m| m.len()).unwrap_or(0);

        let result = match_file_with_seed(file, file_size, &header, &table, self.config.checksum_seed)?;

        let mut matched = 0u64;
        let mut literal = 0u64;
        for token in &result.tokens {
            match token {
                Token::Match(block) => matched += u64::from(header.block_len_at(*block)),
                Token::Literal(bytes) => literal += bytes.len() as u64,
            }
        }
        self.stats.total_matched_size += matched;
        self.stats.total_literal_size += literal;
        self.stats.num_transferred_files += 1;
        self.stats.total_transferred_size += file_size;

        write_tokens(&mut ChannelWriter::new(&mut self.writer), &result.tokens)?;
        self.writer.put(&result.file_digest)?;
        self.writer.flush()?;

        #[cfg(feature = "tracing")]
        tracing::debug!(index, matched, literal, "file matched and sent");

        self.list.remove_file(index);
        Ok(())
    }

    fn send_no_send(&mut self, index: Index) -> io::Result<()> {
        self.writer.put_message(MessageCode::NoSend, &index.to_le_bytes())
    }

    fn send_statistics(&mut self) -> io::Result<()> {
        let mut payload = Vec::with_capacity(11 * 8);
        for field in [
            self.stats.total_bytes_read,
            self.stats.total_bytes_written,
            self.stats.total_file_size,
            self.stats.total_file_list_size,
            self.stats.total_literal_size,
            self.stats.total_matched_size,
            self.stats.num_files,
            self.stats.num_transferred_files,
            self.stats.total_transferred_size,
            self.stats.file_list_build_time_ms,
            self.stats.file_list_transfer_time_ms,
        ] {
            payload.extend_from_slice(&field.to_le_bytes());
        }
        self.writer.put_message(MessageCode::Stats, &payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metadata::PosixAttributeManager;
    use protocol::NullMessageHandler;
    use std::io::Cursor;

    fn config(roots: Vec<PathBuf>) -> SenderConfig {
        SenderConfig {
            roots,
            checksum_seed: ChecksumSeed::new(0),
            collect_statistics: false,
        }
    }

    #[test]
    fn initial_expansion_of_a_single_file_produces_one_entry() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("a.txt");
        std::fs::write(&file_path, vec![0xBCu8; 257]).unwrap();

        let manager = PosixAttributeManager::new();
        let reader = FramedReader::new(Cursor::new(Vec::<u8>::new()));
        let writer = FramedWriter::new(Vec::new());
        let mut sender = Sender::new(reader, writer, &manager, config(vec![file_path]));
        let mut handler = NullMessageHandler;

        sender.initial_expansion(&mut handler).unwrap();
        assert_eq!(sender.stats.num_files, 1);
        assert_eq!(sender.list.first_segment().unwrap().len(), 1);
    }

    #[test]
    fn initial_expansion_of_a_directory_expands_one_level_and_queues_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("child.txt"), b"hi").unwrap();
        std::fs::create_dir(dir.path().join("child_dir")).unwrap();

        let manager = PosixAttributeManager::new();
        let reader = FramedReader::new(Cursor::new(Vec::<u8>::new()));
        let writer = FramedWriter::new(Vec::new());
        let mut sender = Sender::new(reader, writer, &manager, config(vec![dir.path().to_path_buf()]));
        let mut handler = NullMessageHandler;

        sender.initial_expansion(&mut handler).unwrap();
        // The root directory itself plus its file and subdirectory children.
        assert_eq!(sender.list.first_segment().unwrap().len(), 3);
        assert!(sender.list.is_expandable());
    }

    #[test]
    fn expand_pending_stubs_drains_the_queue() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/leaf.txt"), b"hi").unwrap();

        let manager = PosixAttributeManager::new();
        let reader = FramedReader::new(Cursor::new(Vec::<u8>::new()));
        let writer = FramedWriter::new(Vec::new());
        let mut sender = Sender::new(reader, writer, &manager, config(vec![dir.path().to_path_buf()]));
        let mut handler = NullMessageHandler;

        sender.initial_expansion(&mut handler).unwrap();
        assert!(sender.list.is_expandable());
        sender.expand_pending_stubs(&mut handler).unwrap();
        assert!(!sender.list.is_expandable());
    }
}
