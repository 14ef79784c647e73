//! The local Receiver role: decodes file-list segments off the wire and
//! reconstructs file bodies from a peer's token stream.
//!
//! The Receiver owns the inbound half of the duplex channel. It drives the
//! index loop (stub-directory expansion, `DONE`/`EOF` bookkeeping) and, once
//! the generator has requested a transfer for a given index, reads that
//! file's token stream against the copy already at the destination.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use checksums::strong::SeededMd5;
use flist::{read_entry, FileInfo, FileInfoCache, Filelist, Index, DONE, EOF, OFFSET};
use matching::{read_tokens, Token};
use metadata::FileAttributeManager;
use protocol::multiplex::{ChannelReader, FramedReader, MessageHandler};
use protocol::ndx::NdxCodec;
use protocol::session::Statistics;
use protocol::version::ChecksumSeed;
use signature::ChecksumHeader;

use crate::job::GeneratorJob;
use crate::path::{relative_path_from_bytes, safe_join};

/// Outcome of reconstructing and verifying one file's body.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum BodyOutcome {
    /// The reconstruction matched the peer's digest and was applied. Any
    /// attribute-setting failures (non-fatal) are carried along for the
    /// caller to report as `ERROR_XFER`.
    Applied(Vec<String>),
    /// The digest mismatched; the caller should request one retry.
    Retry,
    /// The digest mismatched on a second attempt; give up on this index.
    Failed,
}

/// Decodes file-list segments and reconstructs file bodies at `destination_root`.
pub struct Receiver<'a, R> {
    reader: FramedReader<R>,
    read_ndx: NdxCodec,
    manager: &'a dyn FileAttributeManager,
    destination_root: PathBuf,
    seed: ChecksumSeed,
    cache: FileInfoCache,
    list: Filelist,
    pending_segments: usize,
    failed_attempts: HashMap<Index, u8>,
    stats: Statistics,
}

impl<'a, R: Read> Receiver<'a, R> {
    /// Builds a receiver reading over `reader`, reconstructing files under
    /// `destination_root`.
    #[must_use]
    pub fn new(reader: R, manager: &'a dyn FileAttributeManager, destination_root: PathBuf, seed: ChecksumSeed) -> Self {
        Self {
            reader: FramedReader::new(reader),
            read_ndx: NdxCodec::new(),
            manager,
            destination_root,
            seed,
            cache: FileInfoCache::new(),
            list: Filelist::new(),
            pending_segments: 0,
            failed_attempts: HashMap::new(),
            stats: Statistics::new(),
        }
    }

    /// The accumulated session counters, valid once [`Self::run`] returns.
    #[must_use]
    pub const fn stats(&self) -> Statistics {
        self.stats
    }

    /// Drives the index loop to completion, pushing a [`GeneratorJob::ListSegment`]
    /// job for every segment it decodes and a final [`GeneratorJob::Stop`]
    /// once the file list is exhausted and every dispatched segment has
    /// been acknowledged.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the underlying channel or local
    /// filesystem.
    pub fn run(&mut self, jobs: &crossbeam_channel::Sender<GeneratorJob>, handler: &mut dyn MessageHandler) -> io::Result<()> {
        self.receive_segment(None, jobs, handler)?;
        loop {
            let index = self.read_ndx.read(&mut ChannelReader::new(&mut self.reader, handler))?;
            if index == DONE {
                self.pending_segments = self.pending_segments.saturating_sub(1);
                if self.pending_segments == 0 && self.list.is_eof() {
                    let _ = jobs.send(GeneratorJob::ProcessDeferred);
                    let _ = jobs.send(GeneratorJob::Stop);
                    break;
                }
            } else if index == EOF {
                self.list.mark_eof();
                if self.pending_segments == 0 {
                    let _ = jobs.send(GeneratorJob::ProcessDeferred);
                    let _ = jobs.send(GeneratorJob::Stop);
                    break;
                }
            } else if index <= OFFSET {
                self.receive_segment(Some(OFFSET - index), jobs, handler)?;
            }
        }
        Ok(())
    }

    fn receive_segment(
        &mut self,
        stub_index: Option<Index>,
        jobs: &crossbeam_channel::Sender<GeneratorJob>,
        handler: &mut dyn MessageHandler,
    ) -> io::Result<()> {
        let target_dir = match stub_index {
            None => self.destination_root.clone(),
            Some(stub) => {
                let info = self
                    .list
                    .file(stub)
                    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, format!("unknown stub directory index {stub}")))?;
                let relative = relative_path_from_bytes(info.path())?;
                safe_join(&self.destination_root, &relative)?
            }
        };

        let entries = self.read_segment_entries(handler)?;
        self.stats.num_files += entries.len() as u64;
        let assigned = self.list.new_segment(stub_index, entries.clone());
        self.pending_segments += 1;
        let job_entries = assigned.into_iter().zip(entries).collect();
        let _ = jobs.send(GeneratorJob::ListSegment { target_dir, entries: job_entries });
        Ok(())
    }

    fn read_segment_entries(&mut self, handler: &mut dyn MessageHandler) -> io::Result<Vec<FileInfo>> {
        let mut entries = Vec::new();
        loop {
            let flag = self.reader.get_byte(handler)?;
            if flag == 0 {
                break;
            }
            let decoded = read_entry(&mut ChannelReader::new(&mut self.reader, handler), flag, &mut self.cache)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))?;
            entries.push(decoded.file_info);
        }
        Ok(entries)
    }

    /// Reads one file's token stream and whole-file digest, reconstructs it
    /// against its current copy at the destination, and applies it on a
    /// digest match.
    ///
    /// The file already at the destination doubles as the match source: the
    /// generator built its signature from that same file, so [`Token::Match`]
    /// block indices are read back from it while the new body accumulates in
    /// a sibling temporary file, which is renamed over the destination only
    /// once the digest checks out.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors reading the channel or touching the local
    /// filesystem.
    pub fn receive_body(&mut self, index: Index, header: &ChecksumHeader, handler: &mut dyn MessageHandler) -> io::Result<BodyOutcome> {
        let info = self
            .list
            .file(index)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, format!("unknown index {index}")))?;
        let relative = relative_path_from_bytes(info.path())?;
        let destination = safe_join(&self.destination_root, &relative)?;

        let tokens = read_tokens(&mut ChannelReader::new(&mut self.reader, handler))?;
        let digest_bytes = self.reader.get(16, handler)?;

        let mut replica = fs::File::open(&destination).ok();
        let mut hash = SeededMd5::new(self.seed.get());
        let temp_path = temp_path_for(&destination);
        let mut written = 0u64;
        let mut literal_bytes = 0u64;
        let mut matched_bytes = 0u64;

        let write_result = (|| -> io::Result<()> {
            let mut temp = fs::File::create(&temp_path)?;
            for token in &tokens {
                match token {
                    Token::Literal(bytes) => {
                        temp.write_all(bytes)?;
                        hash.update(bytes);
                        written += bytes.len() as u64;
                        literal_bytes += bytes.len() as u64;
                    }
                    Token::Match(block_index) => {
                        let file = replica
                            .as_mut()
                            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "match token with no local replica present"))?;
                        let len = header.block_len_at(*block_index) as usize;
                        let offset = u64::from(header.block_length()) * u64::from(*block_index);
                        let mut block = vec![0u8; len];
                        file.seek(SeekFrom::Start(offset))?;
                        file.read_exact(&mut block)?;
                        temp.write_all(&block)?;
                        hash.update(&block);
                        written += len as u64;
                        matched_bytes += len as u64;
                    }
                }
            }
            Ok(())
        })();

        if let Err(err) = write_result {
            let _ = fs::remove_file(&temp_path);
            return Err(err);
        }

        let computed = hash.finalize();
        if computed.as_slice() != digest_bytes.as_slice() {
            let _ = fs::remove_file(&temp_path);
            let attempts = self.failed_attempts.entry(index).or_insert(0);
            *attempts += 1;
            return Ok(if *attempts >= 2 { BodyOutcome::Failed } else { BodyOutcome::Retry });
        }

        fs::rename(&temp_path, &destination)?;
        let failures = self.apply_attributes(&destination, &info);
        self.list.remove_file(index);
        self.failed_attempts.remove(&index);
        self.stats.num_transferred_files += 1;
        self.stats.total_transferred_size += written;
        self.stats.total_literal_size += literal_bytes;
        self.stats.total_matched_size += matched_bytes;
        if let Some(attrs) = info.attributes() {
            self.stats.total_file_size += attrs.size();
        }
        Ok(BodyOutcome::Applied(failures))
    }

    fn apply_attributes(&self, path: &Path, info: &FileInfo) -> Vec<String> {
        let Some(attrs) = info.attributes() else { return Vec::new() };
        let mut failures = Vec::new();
        if let Err(err) = self.manager.set_file_mode(path, attrs.mode().raw()) {
            failures.push(err.to_string());
        }
        if let Err(err) = self.manager.set_last_modified_time(path, i64::try_from(attrs.mtime()).unwrap_or(i64::MAX)) {
            failures.push(err.to_string());
        }
        if let Err(err) = self.manager.set_owner(path, attrs.user().id(), attrs.group().id()) {
            failures.push(err.to_string());
        }
        failures
    }
}

fn temp_path_for(destination: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from(".");
    name.push(destination.file_name().unwrap_or_default());
    name.push(".rsynctmp");
    destination.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_path_sits_next_to_the_destination_file() {
        let destination = Path::new("/tmp/dest/sub/file.txt");
        let temp = temp_path_for(destination);
        assert_eq!(temp, PathBuf::from("/tmp/dest/sub/.file.txt.rsynctmp"));
    }
}
