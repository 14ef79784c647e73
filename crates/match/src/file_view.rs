//! [`FileView`]: a sliding window over a local file, as consumed by the
//! block-matching loop.

use std::collections::VecDeque;
use std::io::{self, Read};

/// Default buffer capacity when the caller has no stronger opinion. Large
/// enough to hold several maximum-sized blocks' worth of pending literal
/// data before a flush is forced.
pub const DEFAULT_BUFFER_SIZE: usize = 128 * 1024;

/// A sliding window over a file being matched against a peer's signature.
///
/// The window tracks two offsets into the file: `start_offset` (the left
/// edge of the block currently being hashed) and `mark_offset` (the left
/// edge of literal bytes not yet handed to the caller, which can lag behind
/// `start_offset` when several windows in a row fail to match). The
/// in-memory buffer only ever needs to hold the span `[mark_offset,
/// start_offset + window_length)`; [`Self::would_overflow`] tells the
/// caller when that span is about to exceed the configured buffer size, so
/// it can flush literals and advance the mark before sliding further.
///
/// I/O errors encountered while refilling are recorded rather than
/// propagated immediately, matching the deferred-error handling described
/// for the file view: the caller observes them only when it calls
/// [`Self::close`].
pub struct FileView<R> {
    reader: R,
    buffer: VecDeque<u8>,
    buffer_size: usize,
    mark_offset: u64,
    start_offset: u64,
    window_length: usize,
    remaining_bytes: u64,
    io_error: Option<io::Error>,
}

impl<R: Read> FileView<R> {
    /// Opens a view over `reader`, which is assumed to have `file_size`
    /// bytes remaining, with an initial window of `window_length` bytes.
    #[must_use]
    pub fn new(reader: R, file_size: u64, window_length: usize, buffer_size: usize) -> Self {
        let buffer_size = buffer_size.max(window_length);
        let mut view = Self {
            reader,
            buffer: VecDeque::with_capacity(buffer_size.min(1 << 20)),
            buffer_size,
            mark_offset: 0,
            start_offset: 0,
            window_length,
            remaining_bytes: file_size,
            io_error: None,
        };
        view.fill_to(window_length);
        view
    }

    fn fill_to(&mut self, target: usize) {
        let target = target.min(self.buffer_size);
        while self.buffer.len() < target && self.remaining_bytes > 0 {
            let want = (target - self.buffer.len()).min(self.remaining_bytes as usize).min(8192);
            let mut chunk = vec![0u8; want];
            match self.reader.read(&mut chunk) {
                Ok(0) => {
                    self.remaining_bytes = 0;
                }
                Ok(n) => {
                    self.buffer.extend(chunk[..n].iter().copied());
                    self.remaining_bytes -= n as u64;
                }
                Err(e) => {
                    self.io_error.get_or_insert(e);
                    self.remaining_bytes = 0;
                }
            }
        }
    }

    fn offset_in_buffer(&self) -> usize {
        (self.start_offset - self.mark_offset) as usize
    }

    /// Returns the bytes currently in the window, starting at
    /// [`Self::start_offset`]. Shorter than the configured window length
    /// once the file's remaining bytes run out.
    #[must_use]
    pub fn window(&mut self) -> Vec<u8> {
        let start = self.offset_in_buffer().min(self.buffer.len());
        let end = (start + self.window_length).min(self.buffer.len());
        self.buffer.make_contiguous()[start..end].to_vec()
    }

    /// Returns the bytes between [`Self::mark_offset`] and
    /// [`Self::start_offset`] (pending literal data not yet emitted).
    #[must_use]
    pub fn literal_bytes(&mut self) -> Vec<u8> {
        let end = self.offset_in_buffer().min(self.buffer.len());
        self.buffer.make_contiguous()[..end].to_vec()
    }

    /// Left edge of unsent literal bytes.
    #[must_use]
    pub const fn mark_offset(&self) -> u64 {
        self.mark_offset
    }

    /// Left edge of the active window.
    #[must_use]
    pub const fn start_offset(&self) -> u64 {
        self.start_offset
    }

    /// Bytes of the file not yet read into the buffer.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.remaining_bytes
    }

    /// The single byte just past the current window, i.e. the byte a
    /// one-byte [`Self::slide`] would bring into view. `None` once the
    /// window already runs up against the end of the file, which is the
    /// signal to recompute the weak checksum from scratch rather than roll
    /// it forward.
    #[must_use]
    pub fn byte_after_window(&mut self) -> Option<u8> {
        let start = self.offset_in_buffer().min(self.buffer.len());
        let idx = start + self.window_length;
        self.fill_to(idx + 1);
        self.buffer.make_contiguous().get(idx).copied()
    }

    /// Moves the mark up to the current window start, discarding now-dead
    /// buffered bytes before it.
    pub fn advance_mark_to_start(&mut self) {
        let drop_count = self.offset_in_buffer().min(self.buffer.len());
        self.buffer.drain(..drop_count);
        self.mark_offset = self.start_offset;
    }

    /// Returns whether advancing the window by one more byte without first
    /// moving the mark would need more buffer space than configured.
    #[must_use]
    pub fn would_overflow(&self) -> bool {
        self.offset_in_buffer() + self.window_length + 1 > self.buffer_size
    }

    /// Shifts the window's start forward by `n` bytes, refilling the
    /// buffer up to the window length.
    pub fn slide(&mut self, n: u64) {
        self.start_offset += n;
        let needed = self.offset_in_buffer() + self.window_length;
        self.fill_to(needed);
    }

    /// Consumes the view, returning any I/O error deferred during refills.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error observed while reading the file, if any.
    pub fn close(mut self) -> io::Result<()> {
        self.io_error.take().map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn initial_window_matches_configured_length() {
        let data = b"abcdefghijklmnop".to_vec();
        let mut view = FileView::new(Cursor::new(data), 16, 4, 64);
        assert_eq!(view.window(), b"abcd");
    }

    #[test]
    fn sliding_moves_the_window_forward() {
        let data = b"abcdefghijklmnop".to_vec();
        let mut view = FileView::new(Cursor::new(data), 16, 4, 64);
        view.slide(4);
        assert_eq!(view.start_offset(), 4);
        assert_eq!(view.window(), b"efgh");
    }

    #[test]
    fn window_shrinks_near_end_of_file() {
        let data = b"abcdefg".to_vec();
        let mut view = FileView::new(Cursor::new(data), 7, 4, 64);
        view.slide(4);
        assert_eq!(view.window(), b"efg");
        assert_eq!(view.remaining(), 0);
    }

    #[test]
    fn mark_lags_behind_start_until_advanced() {
        let data = b"abcdefghij".to_vec();
        let mut view = FileView::new(Cursor::new(data), 10, 2, 64);
        view.slide(2);
        view.slide(2);
        assert_eq!(view.literal_bytes(), b"abcd");
        view.advance_mark_to_start();
        assert_eq!(view.mark_offset(), view.start_offset());
        assert!(view.literal_bytes().is_empty());
    }

    #[test]
    fn overflow_is_detected_before_buffer_exceeds_capacity() {
        let data = vec![0u8; 100];
        let mut view = FileView::new(Cursor::new(data), 100, 4, 8);
        for _ in 0..4 {
            assert!(!view.would_overflow());
            view.slide(1);
        }
        assert!(view.would_overflow());
    }

    #[test]
    fn byte_after_window_is_the_next_byte_to_slide_in() {
        let data = b"abcdefgh".to_vec();
        let mut view = FileView::new(Cursor::new(data), 8, 4, 64);
        assert_eq!(view.byte_after_window(), Some(b'e'));
        view.slide(1);
        assert_eq!(view.byte_after_window(), Some(b'f'));
    }

    #[test]
    fn byte_after_window_is_none_at_end_of_file() {
        let data = b"abcd".to_vec();
        let mut view = FileView::new(Cursor::new(data), 4, 4, 64);
        assert_eq!(view.byte_after_window(), None);
    }

    #[test]
    fn close_without_errors_is_ok() {
        let data = b"abcd".to_vec();
        let view = FileView::new(Cursor::new(data), 4, 4, 16);
        assert!(view.close().is_ok());
    }
}
