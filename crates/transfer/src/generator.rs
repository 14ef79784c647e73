//! The local Generator role: decides per-file policy and drives the delta
//! request side of a transfer.
//!
//! The Generator owns the outbound half of the duplex channel. For every
//! entry in a segment handed to it, it compares the peer's announced
//! attributes against whatever already lives at the destination, decides
//! whether a body transfer is needed, and if so writes a checksum signature
//! built from the file already on disk there. Attribute-only updates that
//! could invalidate a later in-place write are deferred until
//! [`GeneratorJob::ProcessDeferred`] runs, once the transfer phase ends.

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use flist::{
    FileInfo, FileKind, FileMode, Index, ItemizeFlags, DONE, IS_NEW, REPORT_GROUP, REPORT_OWNER,
    REPORT_PERMS, REPORT_SIZE, REPORT_TIME, TRANSFER,
};
use metadata::FileAttributeManager;
use protocol::envelope::MessageCode;
use protocol::multiplex::{ChannelWriter, FramedWriter};
use protocol::ndx::NdxCodec;
use protocol::version::ChecksumSeed;
use signature::wire::{write_chunks, write_header};
use signature::{generate_signature, ChecksumChunk, ChecksumHeader};

use crate::job::GeneratorJob;
use crate::path::{bytes_of, os_string_from_bytes, relative_path_from_bytes, safe_join};

/// Policy knobs that affect every entry the generator processes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GeneratorConfig {
    /// Remove destination entries that are no longer present in the
    /// corresponding source directory.
    pub delete: bool,
    /// Treat every regular file as needing a transfer, regardless of size
    /// or modification time agreement.
    pub ignore_times: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self { delete: false, ignore_times: false }
    }
}

/// A regular-file transfer the generator has requested and is waiting on.
#[derive(Debug)]
pub struct PendingTransfer {
    /// Local directory the entry lives under, for a retry's `GenerateFile` job.
    pub target_dir: PathBuf,
    /// The entry's file-list index.
    pub index: Index,
    /// The entry itself, for a retry's `GenerateFile` job.
    pub info: FileInfo,
    /// The signature header written alongside the request.
    pub header: ChecksumHeader,
}

/// Decides per-file transfer policy and writes delta requests.
pub struct Generator<'a, W> {
    writer: FramedWriter<W>,
    write_ndx: NdxCodec,
    manager: &'a dyn FileAttributeManager,
    filters: &'a filters::FilterSet,
    seed: ChecksumSeed,
    config: GeneratorConfig,
    delete_enabled: bool,
    deferred: Vec<(PathBuf, FileInfo)>,
}

impl<'a, W: Write> Generator<'a, W> {
    /// Builds a generator writing over `writer`.
    #[must_use]
    pub fn new(
        writer: FramedWriter<W>,
        manager: &'a dyn FileAttributeManager,
        filters: &'a filters::FilterSet,
        seed: ChecksumSeed,
        config: GeneratorConfig,
    ) -> Self {
        Self {
            writer,
            write_ndx: NdxCodec::new(),
            manager,
            filters,
            seed,
            config,
            delete_enabled: true,
            deferred: Vec::new(),
        }
    }

    /// Dispatches one job, returning any regular-file transfers it
    /// requested so the caller can hand them to the receiver.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors writing to the outbound channel or touching
    /// the local filesystem.
    pub fn dispatch(&mut self, job: GeneratorJob) -> io::Result<Vec<PendingTransfer>> {
        match job {
            GeneratorJob::ListSegment { target_dir, entries } => self.list_segment(&target_dir, &entries),
            GeneratorJob::GenerateFile { target_dir, index, info } => {
                let pending = self.generate_entry(&target_dir, index, &info)?;
                Ok(pending.into_iter().collect())
            }
            GeneratorJob::PurgeFile { .. } => Ok(Vec::new()),
            GeneratorJob::UpdateAttrs { path, info } => {
                self.deferred.push((path, info));
                Ok(Vec::new())
            }
            GeneratorJob::SendBytes { bytes } => {
                self.writer.put(&bytes)?;
                self.writer.flush()?;
                Ok(Vec::new())
            }
            GeneratorJob::SendMessage { code, text } => {
                self.writer.put_message(code, text.as_bytes())?;
                Ok(Vec::new())
            }
            GeneratorJob::ProcessDeferred => {
                self.process_deferred()?;
                Ok(Vec::new())
            }
            GeneratorJob::Stop => {
                self.write_ndx.write(&mut ChannelWriter::new(&mut self.writer), DONE)?;
                self.writer.flush()?;
                Ok(Vec::new())
            }
        }
    }

    /// Reports a file's transfer as unrecoverably failed after exhausting
    /// the single retry.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors writing the error message.
    pub fn report_failed_transfer(&mut self, index: Index, info: &FileInfo) -> io::Result<()> {
        let name = os_string_from_bytes(info.path());
        self.writer.put_message(
            MessageCode::ErrorXfer,
            format!("digest mismatch transferring {} (index {index})", name.to_string_lossy()).as_bytes(),
        )
    }

    /// Reports a non-fatal failure (e.g. an attribute update that could not
    /// be applied) as `ERROR_XFER`.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors writing the error message.
    pub fn report_error(&mut self, text: &str) -> io::Result<()> {
        self.writer.put_message(MessageCode::ErrorXfer, text.as_bytes())
    }

    fn list_segment(&mut self, target_dir: &Path, entries: &[(Index, FileInfo)]) -> io::Result<Vec<PendingTransfer>> {
        if self.config.delete && self.delete_enabled {
            if let Err(err) = self.delete_extraneous(target_dir, entries) {
                self.writer.put_message(MessageCode::Error, err.to_string().as_bytes())?;
                self.delete_enabled = false;
            }
        }

        let mut pending = Vec::new();
        for (index, info) in entries {
            pending.extend(self.generate_entry(target_dir, *index, info)?);
        }
        self.write_ndx.write(&mut ChannelWriter::new(&mut self.writer), DONE)?;
        self.writer.flush()?;
        Ok(pending)
    }

    fn delete_extraneous(&self, target_dir: &Path, entries: &[(Index, FileInfo)]) -> io::Result<()> {
        let Ok(read_dir) = fs::read_dir(target_dir) else {
            return Ok(());
        };

        let keep: HashSet<PathBuf> = entries
            .iter()
            .filter_map(|(_, info)| relative_path_from_bytes(info.path()).ok())
            .map(|relative| target_dir.join(relative))
            .collect();

        for entry in read_dir.flatten() {
            let path = entry.path();
            if keep.contains(&path) {
                continue;
            }
            let Ok(relative) = path.strip_prefix(target_dir) else {
                continue;
            };
            let is_dir = path.is_dir();
            if !self.filters.allows(relative, is_dir) || self.filters.protects(relative) {
                continue;
            }
            if is_dir {
                let _ = fs::remove_dir_all(&path);
            } else {
                let _ = fs::remove_file(&path);
            }
        }
        Ok(())
    }

    fn generate_entry(&mut self, target_dir: &Path, index: Index, info: &FileInfo) -> io::Result<Option<PendingTransfer>> {
        let relative = relative_path_from_bytes(info.path())?;
        let destination = safe_join(target_dir, &relative)?;

        match info.kind() {
            FileKind::Regular(attrs) if attrs.mode().is_dir() => {
                self.generate_directory(index, info, &destination)?;
                Ok(None)
            }
            FileKind::Regular(_) => self.generate_regular(index, info, &destination),
            FileKind::Symlink { .. } => {
                self.generate_symlink(index, info, &destination)?;
                Ok(None)
            }
            FileKind::Device { .. } => {
                self.generate_device(index, &destination)?;
                Ok(None)
            }
            FileKind::Untransferrable => {
                self.write_itemize(index, ItemizeFlags::NONE)?;
                Ok(None)
            }
        }
    }

    fn generate_directory(&mut self, index: Index, info: &FileInfo, destination: &Path) -> io::Result<()> {
        let existed = destination.is_dir();
        if !existed {
            fs::create_dir_all(destination)?;
        }
        let flags = if existed { ItemizeFlags::NONE } else { ItemizeFlags::NONE.with(IS_NEW) };
        self.deferred.push((destination.to_path_buf(), info.clone()));
        self.write_itemize(index, flags)
    }

    fn generate_symlink(&mut self, index: Index, info: &FileInfo, destination: &Path) -> io::Result<()> {
        let FileKind::Symlink { target, .. } = info.kind() else {
            unreachable!("generate_symlink called with a non-symlink entry")
        };

        let existing = fs::read_link(destination).ok();
        let is_new = existing.is_none();
        let matches = existing
            .as_deref()
            .is_some_and(|current| bytes_of(current.as_os_str()) == target.as_slice());

        let mut flags = ItemizeFlags::NONE;
        if is_new {
            flags = flags.with(IS_NEW);
        }
        if !matches {
            if existing.is_some() {
                let _ = fs::remove_file(destination);
            }
            symlink(&os_string_from_bytes(target), destination)?;
            if !is_new {
                flags = flags.with(flist::REPORT_CHANGE);
            }
        }
        self.write_itemize(index, flags)
    }

    fn generate_device(&mut self, index: Index, destination: &Path) -> io::Result<()> {
        self.writer.put_message(
            MessageCode::ErrorXfer,
            format!("cannot create device nodes: {}", destination.display()).as_bytes(),
        )?;
        self.write_itemize(index, ItemizeFlags::NONE)
    }

    fn generate_regular(&mut self, index: Index, info: &FileInfo, destination: &Path) -> io::Result<Option<PendingTransfer>> {
        let attrs = info.attributes().expect("regular entries carry attributes");
        let local = self.manager.stat(destination)?;

        let mut flags = ItemizeFlags::NONE;
        let needs_transfer = match local {
            None => {
                flags = flags.with(IS_NEW);
                true
            }
            Some(stat) => {
                let type_changed = !FileMode::new(stat.mode).is_regular();
                if type_changed {
                    let _ = fs::remove_file(destination);
                }
                let size_differs = stat.size != attrs.size();
                let time_differs = stat.mtime != mtime_as_i64(attrs.mtime());
                if size_differs {
                    flags = flags.with(REPORT_SIZE);
                }
                if time_differs {
                    flags = flags.with(REPORT_TIME);
                }
                if stat.mode & 0o7777 != attrs.mode().permission_bits() {
                    flags = flags.with(REPORT_PERMS);
                }
                if stat.uid != attrs.user().id() {
                    flags = flags.with(REPORT_OWNER);
                }
                if stat.gid != attrs.group().id() {
                    flags = flags.with(REPORT_GROUP);
                }
                type_changed || size_differs || time_differs || self.config.ignore_times
            }
        };

        if needs_transfer {
            flags = flags.with(TRANSFER);
        } else if flags != ItemizeFlags::NONE {
            self.deferred.push((destination.to_path_buf(), info.clone()));
        }

        self.write_itemize(index, flags)?;
        if !needs_transfer {
            return Ok(None);
        }

        let header = self.local_signature_header(destination)?;
        write_header(&mut ChannelWriter::new(&mut self.writer), &header)?;
        let chunks = self.local_signature_chunks(destination, &header)?;
        write_chunks(&mut ChannelWriter::new(&mut self.writer), &chunks)?;
        self.writer.flush()?;

        Ok(Some(PendingTransfer {
            target_dir: destination.parent().map_or_else(|| destination.to_path_buf(), Path::to_path_buf),
            index,
            info: info.clone(),
            header,
        }))
    }

    fn local_signature_header(&self, destination: &Path) -> io::Result<ChecksumHeader> {
        match fs::metadata(destination) {
            Ok(meta) => Ok(ChecksumHeader::for_file_size(meta.len())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(ChecksumHeader::for_file_size(0)),
            Err(err) => Err(err),
        }
    }

    fn local_signature_chunks(&self, destination: &Path, header: &ChecksumHeader) -> io::Result<Vec<ChecksumChunk>> {
        if header.is_empty() {
            return Ok(Vec::new());
        }
        let mut file = fs::File::open(destination)?;
        generate_signature(&mut file, header.clone(), self.seed)
    }

    fn write_itemize(&mut self, index: Index, flags: ItemizeFlags) -> io::Result<()> {
        self.write_ndx.write(&mut ChannelWriter::new(&mut self.writer), index)?;
        flist::write_itemize_flags(&mut ChannelWriter::new(&mut self.writer), flags)?;
        if !flags.requires_transfer() {
            self.writer.flush()?;
        }
        Ok(())
    }

    fn process_deferred(&mut self) -> io::Result<()> {
        for (path, info) in self.deferred.drain(..) {
            let Some(attrs) = info.attributes() else { continue };
            let mut failures = Vec::new();
            if let Err(err) = self.manager.set_file_mode(&path, attrs.mode().raw()) {
                failures.push(err.to_string());
            }
            if let Err(err) = self.manager.set_last_modified_time(&path, mtime_as_i64(attrs.mtime())) {
                failures.push(err.to_string());
            }
            if let Err(err) = self.manager.set_owner(&path, attrs.user().id(), attrs.group().id()) {
                failures.push(err.to_string());
            }
            for failure in failures {
                self.writer.put_message(MessageCode::ErrorXfer, failure.as_bytes())?;
            }
        }
        Ok(())
    }
}

#[cfg(unix)]
fn symlink(target: &std::ffi::OsStr, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn symlink(_target: &std::ffi::OsStr, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "symlinks are not supported on this platform"))
}

fn mtime_as_i64(mtime: u64) -> i64 {
    i64::try_from(mtime).unwrap_or(i64::MAX)
}
