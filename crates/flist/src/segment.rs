//! Ordered, lazily-expanded file-list segments.

use std::collections::{BTreeMap, VecDeque};

use crate::file_info::FileInfo;

/// Wire-level file-list index. Signed because negative values encode
/// stub-directory expansion requests and sentinels (see [`protocol::ndx`]).
pub type Index = i32;

/// Sentinel meaning "the current segment is complete".
pub const DONE: Index = protocol::ndx::NDX_DONE;
/// Sentinel meaning "no further segments; recursion has ended".
pub const EOF: Index = protocol::ndx::NDX_FLIST_EOF;
/// Baseline subtracted from a stub directory's index to form its wire value.
pub const OFFSET: Index = protocol::ndx::NDX_FLIST_OFFSET;

/// Errors raised by [`Filelist`] operations that violate its invariants.
#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum FlistError {
    /// [`Filelist::delete_first_segment`] was called with no segments, or
    /// the head segment still has entries.
    #[error("cannot delete first segment: {0}")]
    CannotDeleteFirstSegment(&'static str),
    /// An index was looked up that names no live segment, either because it
    /// was never assigned or its segment has already been deleted.
    #[error("index {0} does not belong to any live segment")]
    UnknownIndex(Index),
}

/// A FIFO-ordered group of file-list entries sharing a common stub
/// directory (the directory whose expansion produced them), or `None` for
/// the initial segment built from the transfer's root paths.
#[derive(Debug, Default)]
pub struct Segment {
    stub_directory: Option<Index>,
    files: BTreeMap<Index, FileInfo>,
}

impl Segment {
    /// Returns the index of the stub directory this segment expanded, if any.
    #[must_use]
    pub const fn stub_directory(&self) -> Option<Index> {
        self.stub_directory
    }

    /// Returns whether every entry in this segment has been reconciled and
    /// removed (the segment is ready to be deleted).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.files.is_empty()
    }

    /// Returns the entry at `index`, if it belongs to this segment.
    #[must_use]
    pub fn get(&self, index: Index) -> Option<&FileInfo> {
        self.files.get(&index)
    }

    /// Removes and returns the entry at `index`, if present.
    pub fn remove(&mut self, index: Index) -> Option<FileInfo> {
        self.files.remove(&index)
    }

    /// Iterates the segment's entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = (Index, &FileInfo)> {
        self.files.iter().map(|(&index, info)| (index, info))
    }

    /// Returns the number of live entries remaining in this segment.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns whether the segment holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// The ordered collection of [`Segment`]s that make up an in-progress
/// incremental-recursion file list.
///
/// Indices are assigned from a single global, monotonically increasing
/// counter shared across every segment, so an index unambiguously names one
/// entry for the lifetime of the session.
#[derive(Debug, Default)]
pub struct Filelist {
    segments: VecDeque<Segment>,
    next_index: Index,
    pending_stub_dirs: VecDeque<Index>,
    eof: bool,
}

impl Filelist {
    /// Builds an empty file list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a new segment for `files`, assigning each a fresh global
    /// index, and appends it to the FIFO. Returns the indices assigned, in
    /// the same order as `files`.
    pub fn new_segment(&mut self, stub_directory: Option<Index>, files: Vec<FileInfo>) -> Vec<Index> {
        let mut assigned = Vec::with_capacity(files.len());
        let mut map = BTreeMap::new();
        for file in files {
            let index = self.next_index;
            self.next_index += 1;
            assigned.push(index);
            map.insert(index, file);
        }
        self.segments.push_back(Segment {
            stub_directory,
            files: map,
        });
        assigned
    }

    /// Queues `index` (which must name a directory entry already present in
    /// some segment) for later expansion into its own segment.
    pub fn queue_stub_directory(&mut self, index: Index) {
        self.pending_stub_dirs.push_back(index);
    }

    /// Pops the next stub directory awaiting expansion, in FIFO order.
    pub fn pop_stub_directory(&mut self) -> Option<Index> {
        self.pending_stub_dirs.pop_front()
    }

    /// Returns whether any stub directories remain to be expanded.
    #[must_use]
    pub fn is_expandable(&self) -> bool {
        !self.pending_stub_dirs.is_empty()
    }

    /// Returns the head segment, if any.
    #[must_use]
    pub fn first_segment(&self) -> Option<&Segment> {
        self.segments.front()
    }

    /// Returns a mutable reference to the head segment, if any.
    pub fn first_segment_mut(&mut self) -> Option<&mut Segment> {
        self.segments.front_mut()
    }

    /// Removes the head segment.
    ///
    /// # Errors
    ///
    /// Returns [`FlistError::CannotDeleteFirstSegment`] if there are no
    /// segments, or if the head segment still has live entries.
    pub fn delete_first_segment(&mut self) -> Result<(), FlistError> {
        match self.segments.front() {
            None => Err(FlistError::CannotDeleteFirstSegment("no segments present")),
            Some(segment) if !segment.is_finished() => {
                Err(FlistError::CannotDeleteFirstSegment("head segment has live entries"))
            }
            Some(_) => {
                self.segments.pop_front();
                Ok(())
            }
        }
    }

    /// Returns the segment holding `index`, if it is still live.
    #[must_use]
    pub fn segment_with_index(&self, index: Index) -> Option<&Segment> {
        self.segments.iter().find(|segment| segment.files.contains_key(&index))
    }

    /// Returns a mutable reference to the segment holding `index`.
    pub fn segment_with_index_mut(&mut self, index: Index) -> Option<&mut Segment> {
        self.segments
            .iter_mut()
            .find(|segment| segment.files.contains_key(&index))
    }

    /// Returns the entry at `index`, searching every live segment.
    #[must_use]
    pub fn file(&self, index: Index) -> Option<&FileInfo> {
        self.segment_with_index(index).and_then(|segment| segment.get(index))
    }

    /// Removes and returns the entry at `index` from whichever segment
    /// holds it.
    pub fn remove_file(&mut self, index: Index) -> Option<FileInfo> {
        self.segment_with_index_mut(index).and_then(|segment| segment.remove(index))
    }

    /// Returns the number of live segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Returns the total number of live entries across every segment, the
    /// count an incremental expansion loop caps against its in-flight limit.
    #[must_use]
    pub fn total_entries(&self) -> usize {
        self.segments.iter().map(Segment::len).sum()
    }

    /// Marks recursion as complete; subsequent [`Self::is_expandable`]
    /// checks remain meaningful but no further segments should be created.
    pub fn mark_eof(&mut self) {
        self.eof = true;
    }

    /// Returns whether recursion has ended.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.eof
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{mode_bits, Attributes, FileMode, IdName};
    use crate::file_info::FileKind;

    fn file(name: &str) -> FileInfo {
        let attrs = Attributes::new(
            FileMode::new(mode_bits::S_IFREG | 0o644),
            0,
            0,
            IdName::by_id(0),
            IdName::by_id(0),
        );
        FileInfo::new(name.as_bytes().to_vec(), FileKind::Regular(attrs))
    }

    #[test]
    fn indices_are_assigned_globally_and_never_repeat() {
        let mut list = Filelist::new();
        let first = list.new_segment(None, vec![file("a"), file("b")]);
        let second = list.new_segment(None, vec![file("c")]);
        assert_eq!(first, vec![0, 1]);
        assert_eq!(second, vec![2]);
    }

    #[test]
    fn delete_first_segment_requires_empty_head() {
        let mut list = Filelist::new();
        list.new_segment(None, vec![file("a")]);
        let err = list.delete_first_segment().unwrap_err();
        assert!(matches!(err, FlistError::CannotDeleteFirstSegment(_)));

        list.remove_file(0);
        list.delete_first_segment().unwrap();
        assert_eq!(list.segment_count(), 0);
    }

    #[test]
    fn deleted_segment_indices_become_unknown() {
        let mut list = Filelist::new();
        list.new_segment(None, vec![file("a")]);
        list.remove_file(0);
        list.delete_first_segment().unwrap();
        assert!(list.file(0).is_none());
    }

    #[test]
    fn stub_directories_expand_in_fifo_order() {
        let mut list = Filelist::new();
        list.queue_stub_directory(5);
        list.queue_stub_directory(9);
        assert!(list.is_expandable());
        assert_eq!(list.pop_stub_directory(), Some(5));
        assert_eq!(list.pop_stub_directory(), Some(9));
        assert!(!list.is_expandable());
    }

    #[test]
    fn total_entries_sums_every_live_segment() {
        let mut list = Filelist::new();
        list.new_segment(None, vec![file("a"), file("b")]);
        list.new_segment(Some(0), vec![file("c")]);
        assert_eq!(list.total_entries(), 3);
        list.remove_file(0);
        assert_eq!(list.total_entries(), 2);
    }

    #[test]
    fn segment_with_index_finds_the_owning_segment() {
        let mut list = Filelist::new();
        list.new_segment(None, vec![file("a")]);
        list.new_segment(Some(0), vec![file("b")]);
        let segment = list.segment_with_index(1).unwrap();
        assert_eq!(segment.stub_directory(), Some(0));
    }
}
