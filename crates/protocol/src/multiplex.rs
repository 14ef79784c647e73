//! Framed duplex channel: buffered, tagged output and demultiplexing,
//! prefetching input over a single byte stream.
//!
//! Every flush on the output side is preceded by exactly one [`MessageHeader`]
//! naming its code and length; the input side strips those headers back out,
//! routing anything other than [`MessageCode::Data`] to a [`MessageHandler`]
//! instead of the application byte stream. This lets control messages
//! (errors, log lines, statistics) interleave with file data on one
//! connection without either side needing a separate channel.

use std::io::{self, Read, Write};

use crate::envelope::{EnvelopeError, MessageCode, MessageHeader, HEADER_LEN};

/// Default size of the output buffer's payload region, and the input side's
/// demultiplexed read-ahead buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

fn envelope_to_io(err: EnvelopeError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err.to_string())
}

/// A full-duplex byte stream: readable and writable, ownable by a single
/// reader task and a single writer task respectively.
///
/// Implemented automatically for any type that is both [`Read`] and
/// [`Write`]; a TLS-wrapped TCP socket, an SSH-tunnelled pipe, or an
/// in-memory duplex pipe used in tests all satisfy it without extra
/// boilerplate.
pub trait DuplexByteChannel: Read + Write {}
impl<T: Read + Write> DuplexByteChannel for T {}

/// Receives payloads for message codes other than [`MessageCode::Data`].
///
/// The handler never sees `Data` payloads; those advance the application
/// byte stream returned by [`FramedReader::get`] instead.
pub trait MessageHandler {
    /// Called once per non-`Data` frame, in wire order.
    ///
    /// # Errors
    ///
    /// Returning an error aborts the read that triggered the dispatch.
    fn handle(&mut self, code: MessageCode, payload: &[u8]) -> io::Result<()>;
}

/// A [`MessageHandler`] that ignores every message (useful in tests that
/// only care about the `Data` channel).
#[derive(Debug, Default)]
pub struct NullMessageHandler;

impl MessageHandler for NullMessageHandler {
    fn handle(&mut self, _code: MessageCode, _payload: &[u8]) -> io::Result<()> {
        Ok(())
    }
}

/// Buffered, tagged output side of the framed duplex channel.
pub struct FramedWriter<W> {
    inner: W,
    buffer: Vec<u8>,
    capacity: usize,
}

impl<W: Write> FramedWriter<W> {
    /// Wraps `inner` with the default buffer capacity.
    pub fn new(inner: W) -> Self {
        Self::with_capacity(inner, DEFAULT_BUFFER_SIZE)
    }

    /// Wraps `inner` with an explicit payload buffer capacity.
    pub fn with_capacity(inner: W, capacity: usize) -> Self {
        Self {
            inner,
            buffer: Vec::with_capacity(capacity + HEADER_LEN),
            capacity,
        }
    }

    /// Appends `bytes` to the pending `Data` frame, flushing first if the
    /// buffer is full.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors raised while flushing.
    pub fn put(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut remaining = bytes;
        while !remaining.is_empty() {
            if self.buffer.is_empty() {
                self.buffer.extend_from_slice(&[0u8; HEADER_LEN]);
            }
            let room = self.capacity.saturating_sub(self.buffer.len() - HEADER_LEN);
            let take = room.min(remaining.len());
            self.buffer.extend_from_slice(&remaining[..take]);
            remaining = &remaining[take..];

            if self.buffer.len() - HEADER_LEN >= self.capacity {
                self.flush()?;
            }
        }
        Ok(())
    }

    /// Seals any pending `Data` frame, then writes `payload` tagged with
    /// `code` as its own frame.
    ///
    /// A control message is never split across frames: it is flushed
    /// immediately rather than folded into the buffered `Data` region.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors, or an error if `payload` exceeds the maximum
    /// frame length.
    pub fn put_message(&mut self, code: MessageCode, payload: &[u8]) -> io::Result<()> {
        self.flush()?;
        let header = MessageHeader::new(code, payload.len() as u32).map_err(envelope_to_io)?;
        self.inner.write_all(&header.encode())?;
        self.inner.write_all(payload)?;
        self.inner.flush()
    }

    /// Flushes any pending `Data` frame to the underlying stream.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return self.inner.flush();
        }
        let payload_len = (self.buffer.len() - HEADER_LEN) as u32;
        let header = MessageHeader::new(MessageCode::Data, payload_len).map_err(envelope_to_io)?;
        self.buffer[..HEADER_LEN].copy_from_slice(&header.encode());
        self.inner.write_all(&self.buffer)?;
        self.inner.flush()?;
        self.buffer.clear();
        Ok(())
    }

    /// Returns the underlying stream, flushing first.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors raised while flushing.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.flush()?;
        Ok(self.inner)
    }
}

/// Prefetching, demultiplexing input side of the framed duplex channel.
pub struct FramedReader<R> {
    inner: R,
    buffer: Vec<u8>,
    pos: usize,
}

impl<R: Read> FramedReader<R> {
    /// Wraps `inner`. The read-ahead buffer starts empty and grows lazily.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: Vec::with_capacity(DEFAULT_BUFFER_SIZE),
            pos: 0,
        }
    }

    /// Returns the number of `Data` bytes already demultiplexed and waiting
    /// to be consumed, without blocking on the stream.
    #[must_use]
    pub fn available(&self) -> usize {
        self.buffer.len() - self.pos
    }

    /// Reads and decodes the next tag frame, appending `Data` payloads to
    /// the read-ahead buffer and dispatching everything else to `handler`.
    ///
    /// Returns `Ok(false)` on a clean end-of-stream between frames, and an
    /// error for EOF in the middle of one (a malformed/truncated frame).
    fn refill(&mut self, handler: &mut dyn MessageHandler) -> io::Result<bool> {
        loop {
            let mut header_bytes = [0u8; HEADER_LEN];
            match read_exact_or_clean_eof(&mut self.inner, &mut header_bytes)? {
                None => return Ok(false),
                Some(()) => {}
            }
            let header = MessageHeader::decode(&header_bytes).map_err(envelope_to_io)?;
            let mut payload = vec![0u8; header.payload_len() as usize];
            self.inner.read_exact(&mut payload)?;

            match header.code() {
                MessageCode::Data => {
                    self.buffer.extend_from_slice(&payload);
                    return Ok(true);
                }
                other => {
                    handler.handle(other, &payload)?;
                }
            }
        }
    }

    fn ensure_available(&mut self, n: usize, handler: &mut dyn MessageHandler) -> io::Result<()> {
        while self.available() < n {
            if !self.refill(handler)? {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "channel closed before requested bytes arrived",
                ));
            }
        }
        Ok(())
    }

    fn compact(&mut self) {
        if self.pos > DEFAULT_BUFFER_SIZE && self.pos * 2 > self.buffer.len() {
            self.buffer.drain(..self.pos);
            self.pos = 0;
        }
    }

    /// Reads exactly `n` application (`Data`) bytes, transparently spanning
    /// tag frames and dispatching any interleaved control messages to
    /// `handler`.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedEof` if the stream ends before `n` bytes of data
    /// have arrived, or a protocol error for a malformed frame.
    pub fn get(&mut self, n: usize, handler: &mut dyn MessageHandler) -> io::Result<Vec<u8>> {
        self.ensure_available(n, handler)?;
        let out = self.buffer[self.pos..self.pos + n].to_vec();
        self.pos += n;
        self.compact();
        Ok(out)
    }

    /// Reads a single byte.
    ///
    /// # Errors
    ///
    /// See [`Self::get`].
    pub fn get_byte(&mut self, handler: &mut dyn MessageHandler) -> io::Result<u8> {
        Ok(self.get(1, handler)?[0])
    }

    /// Reads a little-endian `i32`.
    ///
    /// # Errors
    ///
    /// See [`Self::get`].
    pub fn get_int(&mut self, handler: &mut dyn MessageHandler) -> io::Result<i32> {
        let bytes = self.get(4, handler)?;
        Ok(i32::from_le_bytes(bytes.try_into().unwrap()))
    }

    /// Skips `n` application bytes without returning them.
    ///
    /// # Errors
    ///
    /// See [`Self::get`].
    pub fn skip(&mut self, n: usize, handler: &mut dyn MessageHandler) -> io::Result<()> {
        self.ensure_available(n, handler)?;
        self.pos += n;
        self.compact();
        Ok(())
    }
}

/// Adapts a [`FramedReader`] and its [`MessageHandler`] into a plain
/// [`Read`], so callers elsewhere in the workspace (file-list, signature,
/// and token-stream codecs) can read straight off the multiplexed channel
/// without knowing about tag frames.
pub struct ChannelReader<'a, R> {
    inner: &'a mut FramedReader<R>,
    handler: &'a mut dyn MessageHandler,
}

impl<'a, R> ChannelReader<'a, R> {
    /// Borrows `reader` and `handler` for the duration of one decode call.
    pub fn new(reader: &'a mut FramedReader<R>, handler: &'a mut dyn MessageHandler) -> Self {
        Self { inner: reader, handler }
    }
}

impl<R: Read> Read for ChannelReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let data = self.inner.get(buf.len(), self.handler)?;
        buf.copy_from_slice(&data);
        Ok(buf.len())
    }
}

/// Adapts a [`FramedWriter`] into a plain [`Write`], folding every write
/// into the buffered `Data` frame stream.
pub struct ChannelWriter<'a, W> {
    inner: &'a mut FramedWriter<W>,
}

impl<'a, W> ChannelWriter<'a, W> {
    /// Borrows `writer` for the duration of one encode call.
    pub fn new(writer: &'a mut FramedWriter<W>) -> Self {
        Self { inner: writer }
    }
}

impl<W: Write> Write for ChannelWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.put(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Reads exactly `buf.len()` bytes, distinguishing a clean EOF (zero bytes
/// read before any progress) from a truncated frame.
fn read_exact_or_clean_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<Option<()>> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream ended mid-frame",
                ))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(Some(()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[derive(Default)]
    struct RecordingHandler {
        messages: Vec<(MessageCode, Vec<u8>)>,
    }

    impl MessageHandler for RecordingHandler {
        fn handle(&mut self, code: MessageCode, payload: &[u8]) -> io::Result<()> {
            self.messages.push((code, payload.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn plain_data_round_trips() {
        let mut writer = FramedWriter::new(Vec::new());
        writer.put(b"hello ").unwrap();
        writer.put(b"world").unwrap();
        let bytes = writer.into_inner().unwrap();

        let mut reader = FramedReader::new(Cursor::new(bytes));
        let mut handler = NullMessageHandler;
        let got = reader.get(11, &mut handler).unwrap();
        assert_eq!(&got, b"hello world");
    }

    #[test]
    fn control_message_is_demultiplexed_and_does_not_advance_data_stream() {
        let mut writer = FramedWriter::new(Vec::new());
        writer.put(b"before").unwrap();
        writer.put_message(MessageCode::Info, b"status update").unwrap();
        writer.put(b"after").unwrap();
        let bytes = writer.into_inner().unwrap();

        let mut reader = FramedReader::new(Cursor::new(bytes));
        let mut handler = RecordingHandler::default();
        let got = reader.get(11, &mut handler).unwrap();
        assert_eq!(&got, b"beforeafter");
        assert_eq!(
            handler.messages,
            vec![(MessageCode::Info, b"status update".to_vec())]
        );
    }

    #[test]
    fn get_spans_multiple_flushed_frames() {
        let mut writer = FramedWriter::with_capacity(Vec::new(), 4);
        writer.put(b"abcdefgh").unwrap(); // forces at least two frames
        let bytes = writer.into_inner().unwrap();

        let mut reader = FramedReader::new(Cursor::new(bytes));
        let mut handler = NullMessageHandler;
        let got = reader.get(8, &mut handler).unwrap();
        assert_eq!(&got, b"abcdefgh");
    }

    #[test]
    fn truncated_stream_mid_frame_is_unexpected_eof() {
        let mut writer = FramedWriter::new(Vec::new());
        writer.put(b"hello").unwrap();
        let mut bytes = writer.into_inner().unwrap();
        bytes.truncate(bytes.len() - 2); // drop trailing payload bytes

        let mut reader = FramedReader::new(Cursor::new(bytes));
        let mut handler = NullMessageHandler;
        let err = reader.get(5, &mut handler).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn unknown_code_in_stream_is_protocol_error() {
        let mut bytes = Vec::new();
        // (0x40 + MPLEX_BASE) as the high byte names an unknown code.
        let tag = ((0x40u32 + u32::from(crate::envelope::MPLEX_BASE)) << 24) | 0;
        bytes.extend_from_slice(&tag.to_le_bytes());

        let mut reader = FramedReader::new(Cursor::new(bytes));
        let mut handler = NullMessageHandler;
        let err = reader.get(1, &mut handler).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn channel_writer_and_reader_round_trip_arbitrary_bytes() {
        let mut buf = Vec::new();
        let mut writer = FramedWriter::new(&mut buf);
        {
            let mut channel_writer = ChannelWriter::new(&mut writer);
            channel_writer.write_all(b"varint-sized payload").unwrap();
        }
        writer.flush().unwrap();

        let mut reader = FramedReader::new(Cursor::new(buf));
        let mut handler = NullMessageHandler;
        let mut channel_reader = ChannelReader::new(&mut reader, &mut handler);
        let mut out = [0u8; 20];
        channel_reader.read_exact(&mut out).unwrap();
        assert_eq!(&out, b"varint-sized payload");
    }

    #[test]
    fn get_byte_and_get_int_read_little_endian() {
        let mut writer = FramedWriter::new(Vec::new());
        writer.put(&[0x2A]).unwrap();
        writer.put(&42i32.to_le_bytes()).unwrap();
        let bytes = writer.into_inner().unwrap();

        let mut reader = FramedReader::new(Cursor::new(bytes));
        let mut handler = NullMessageHandler;
        assert_eq!(reader.get_byte(&mut handler).unwrap(), 0x2A);
        assert_eq!(reader.get_int(&mut handler).unwrap(), 42);
    }
}
