#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `protocol` implements the wire-level plumbing of the rsync protocol
//! (version 30 and above): the line-based daemon handshake, the tagged
//! multiplexed framing that carries file data and control messages over one
//! duplex stream, and the two integer encodings ([`varint`] and [`ndx`])
//! used throughout the file list and token stream.
//!
//! # Design
//!
//! - [`version`] negotiates and validates the protocol version, compat
//!   flags, and checksum seed.
//! - [`negotiation`] drives the `@RSYNCD:` handshake line-by-line, with
//!   module resolution and authentication left to caller-supplied traits.
//! - [`envelope`] defines [`MessageCode`] and [`MessageHeader`], the tagged
//!   4-byte frame prefix.
//! - [`multiplex`] layers a buffered, tagging writer and a demultiplexing,
//!   prefetching reader on top of any [`multiplex::DuplexByteChannel`].
//! - [`varint`] and [`ndx`] are the two integer wire encodings; the file
//!   list crate and the delta engine both depend on them directly.
//!
//! None of these modules perform filesystem I/O; they operate purely on
//! byte streams and are independent of any particular transport (TCP, an
//! SSH-tunnelled pipe, or an in-process pipe used for local-copy transfers).
//!
//! # See also
//!
//! [`checksums`] for the session checksum seed's consumer, and the
//! `flist`/`engine`/`transfer` crates for the protocol phases built on top
//! of this one.

pub mod envelope;
pub mod multiplex;
pub mod ndx;
pub mod negotiation;
pub mod session;
pub mod varint;
pub mod version;

pub use envelope::{EnvelopeError, MessageCode, MessageHeader, HEADER_LEN, MPLEX_BASE};
pub use multiplex::{
    ChannelReader, ChannelWriter, DuplexByteChannel, FramedReader, FramedWriter, MessageHandler, NullMessageHandler,
};
pub use ndx::{NdxCodec, NDX_DONE, NDX_FLIST_EOF, NDX_FLIST_OFFSET};
pub use negotiation::{
    negotiate_client, negotiate_server, ModuleAuthenticator, NegotiatedSession, NegotiationError,
};
pub use session::{SessionDefaults, Statistics};
pub use varint::{read_varint, write_varint};
pub use version::{ChecksumSeed, CompatFlags, ProtocolVersion, VersionError, MIN_PROTOCOL_VERSION};
