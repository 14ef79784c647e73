//! Tagged message envelope used to multiplex control messages onto the
//! transfer stream.
//!
//! Every buffered flush on the wire is preceded by a 4-byte tag: the high
//! byte names a message code (offset by [`MPLEX_BASE`]) and the low 24 bits
//! carry the payload length. `MessageCode::Data` is the transport-level code
//! used for ordinary file-transfer bytes; every other code is demultiplexed
//! to a side channel instead of the application byte stream.

use std::fmt;

/// Offset added to a message code before it is packed into the tag's high byte.
///
/// Upstream reserves low values so a tag can never be confused with a
/// legitimate large length field.
pub const MPLEX_BASE: u8 = 7;

/// Number of bytes in an encoded [`MessageHeader`].
pub const HEADER_LEN: usize = 4;

/// Largest payload length representable in the tag's 24-bit length field.
pub const MAX_PAYLOAD_LEN: u32 = 0x00FF_FFFF;

/// Message codes carried by the multiplexed envelope.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum MessageCode {
    /// Ordinary file-transfer payload; advances the application byte stream.
    Data,
    /// Non-fatal per-file transfer error (`ERROR_XFER`).
    ErrorXfer,
    /// Informational message for the user.
    Info,
    /// Fatal error message.
    Error,
    /// Non-fatal warning.
    Warning,
    /// Verbose/debug log line.
    Log,
    /// Whole-session statistics payload.
    Stats,
    /// Generic success acknowledgement.
    Success,
    /// Non-fatal I/O error on a single file.
    IoError,
    /// Sender could not open or no longer has the requested file.
    NoSend,
}

impl MessageCode {
    /// Returns every known message code, sorted by numeric value.
    #[must_use]
    pub const fn all() -> &'static [MessageCode] {
        &[
            MessageCode::Data,
            MessageCode::ErrorXfer,
            MessageCode::Info,
            MessageCode::Error,
            MessageCode::Warning,
            MessageCode::Log,
            MessageCode::Stats,
            MessageCode::Success,
            MessageCode::IoError,
            MessageCode::NoSend,
        ]
    }

    /// Returns the wire value of this code (added to [`MPLEX_BASE`] when tagging).
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            MessageCode::Data => 0,
            MessageCode::ErrorXfer => 1,
            MessageCode::Info => 2,
            MessageCode::Error => 3,
            MessageCode::Warning => 4,
            MessageCode::Log => 5,
            MessageCode::Stats => 6,
            MessageCode::Success => 7,
            MessageCode::IoError => 22,
            MessageCode::NoSend => 102,
        }
    }

    /// Parses a wire value into a known message code.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(MessageCode::Data),
            1 => Some(MessageCode::ErrorXfer),
            2 => Some(MessageCode::Info),
            3 => Some(MessageCode::Error),
            4 => Some(MessageCode::Warning),
            5 => Some(MessageCode::Log),
            6 => Some(MessageCode::Stats),
            7 => Some(MessageCode::Success),
            22 => Some(MessageCode::IoError),
            102 => Some(MessageCode::NoSend),
            _ => None,
        }
    }

    /// Returns the `MSG_*`-style name used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            MessageCode::Data => "MSG_DATA",
            MessageCode::ErrorXfer => "MSG_ERROR_XFER",
            MessageCode::Info => "MSG_INFO",
            MessageCode::Error => "MSG_ERROR",
            MessageCode::Warning => "MSG_WARNING",
            MessageCode::Log => "MSG_LOG",
            MessageCode::Stats => "MSG_STATS",
            MessageCode::Success => "MSG_SUCCESS",
            MessageCode::IoError => "MSG_IO_ERROR",
            MessageCode::NoSend => "MSG_NO_SEND",
        }
    }
}

impl From<MessageCode> for u8 {
    fn from(code: MessageCode) -> Self {
        code.as_u8()
    }
}

impl TryFrom<u8> for MessageCode {
    type Error = EnvelopeError;

    fn try_from(value: u8) -> Result<Self, <Self as TryFrom<u8>>::Error> {
        MessageCode::from_u8(value).ok_or(EnvelopeError::UnknownMessageCode(value))
    }
}

impl std::str::FromStr for MessageCode {
    type Err = UnknownMessageCodeName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageCode::all()
            .iter()
            .copied()
            .find(|code| code.name() == s)
            .ok_or_else(|| UnknownMessageCodeName(s.to_owned()))
    }
}

/// Returned when parsing an unrecognised `MSG_*` name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnknownMessageCodeName(String);

impl UnknownMessageCodeName {
    /// Returns the name that failed to parse.
    #[must_use]
    pub fn invalid_name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnknownMessageCodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown multiplexed message code name: {:?}", self.0)
    }
}

impl std::error::Error for UnknownMessageCodeName {}

/// Errors raised while decoding an envelope tag.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EnvelopeError {
    /// The tag's high byte was below [`MPLEX_BASE`], so it cannot name a code.
    InvalidTag(u32),
    /// The tag named a high byte with no corresponding [`MessageCode`].
    UnknownMessageCode(u8),
    /// The payload length exceeds [`MAX_PAYLOAD_LEN`].
    PayloadTooLarge(u32),
}

impl fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvelopeError::InvalidTag(tag) => write!(f, "invalid multiplex tag: {tag:#010x}"),
            EnvelopeError::UnknownMessageCode(code) => {
                write!(f, "unknown multiplexed message code: {code:#04x}")
            }
            EnvelopeError::PayloadTooLarge(len) => {
                write!(f, "multiplexed payload length {len} exceeds 24-bit limit")
            }
        }
    }
}

impl std::error::Error for EnvelopeError {}

/// A decoded 4-byte tag: message code plus payload length.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MessageHeader {
    code: MessageCode,
    payload_len: u32,
}

impl MessageHeader {
    /// Builds a header, rejecting payload lengths that overflow the 24-bit field.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::PayloadTooLarge`] if `payload_len` exceeds
    /// [`MAX_PAYLOAD_LEN`].
    pub const fn new(code: MessageCode, payload_len: u32) -> Result<Self, EnvelopeError> {
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(EnvelopeError::PayloadTooLarge(payload_len));
        }
        Ok(Self { code, payload_len })
    }

    /// Returns the message code.
    #[must_use]
    pub const fn code(&self) -> MessageCode {
        self.code
    }

    /// Returns the payload length in bytes.
    #[must_use]
    pub const fn payload_len(&self) -> u32 {
        self.payload_len
    }

    /// Packs the header into its 32-bit little-endian wire representation.
    #[must_use]
    pub const fn encode_raw(&self) -> u32 {
        ((self.code.as_u8() as u32 + MPLEX_BASE as u32) << 24) | self.payload_len
    }

    /// Encodes the header as 4 little-endian bytes.
    #[must_use]
    pub const fn encode(&self) -> [u8; HEADER_LEN] {
        self.encode_raw().to_le_bytes()
    }

    /// Writes the encoded header into the start of `buffer`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if `buffer` is shorter than [`HEADER_LEN`].
    pub fn encode_into_slice(&self, buffer: &mut [u8]) -> std::io::Result<()> {
        if buffer.len() < HEADER_LEN {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "buffer shorter than envelope header",
            ));
        }
        buffer[..HEADER_LEN].copy_from_slice(&self.encode());
        Ok(())
    }

    /// Decodes a header from its raw 32-bit little-endian wire value.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::InvalidTag`] if the high byte is below
    /// [`MPLEX_BASE`], or [`EnvelopeError::UnknownMessageCode`] if it does not
    /// name a known code.
    pub fn from_raw(raw: u32) -> Result<Self, EnvelopeError> {
        let high = (raw >> 24) as u8;
        let offset = high
            .checked_sub(MPLEX_BASE)
            .ok_or(EnvelopeError::InvalidTag(raw))?;
        let code = MessageCode::from_u8(offset).ok_or(EnvelopeError::UnknownMessageCode(offset))?;
        let payload_len = raw & MAX_PAYLOAD_LEN;
        Ok(Self { code, payload_len })
    }

    /// Decodes a header from its 4-byte little-endian encoding.
    ///
    /// # Errors
    ///
    /// See [`Self::from_raw`].
    pub fn decode(bytes: &[u8; HEADER_LEN]) -> Result<Self, EnvelopeError> {
        Self::from_raw(u32::from_le_bytes(*bytes))
    }
}

impl TryFrom<[u8; HEADER_LEN]> for MessageHeader {
    type Error = EnvelopeError;

    fn try_from(bytes: [u8; HEADER_LEN]) -> Result<Self, Self::Error> {
        Self::decode(&bytes)
    }
}

impl TryFrom<&[u8; HEADER_LEN]> for MessageHeader {
    type Error = EnvelopeError;

    fn try_from(bytes: &[u8; HEADER_LEN]) -> Result<Self, Self::Error> {
        Self::decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips_for_info_message() {
        let header = MessageHeader::new(MessageCode::Info, 123).expect("constructible header");
        let decoded = MessageHeader::decode(&header.encode()).expect("decode succeeds");
        assert_eq!(decoded, header);
    }

    #[test]
    fn message_header_from_raw_rejects_invalid_tag() {
        let raw = 0x0000_0001u32;
        let err = MessageHeader::from_raw(raw).expect_err("invalid tag must fail");
        assert_eq!(err, EnvelopeError::InvalidTag(raw));
    }

    #[test]
    fn message_header_from_raw_rejects_unknown_code() {
        let raw = ((u32::from(MPLEX_BASE) + 0x40) << 24) | 0x0000_00FF;
        let err = MessageHeader::from_raw(raw).expect_err("unknown code must fail");
        assert_eq!(err, EnvelopeError::UnknownMessageCode(0x40));
    }

    #[test]
    fn message_code_variants_round_trip_through_try_from() {
        for &code in MessageCode::all() {
            let raw = code.as_u8();
            let decoded = MessageCode::try_from(raw).expect("known code");
            assert_eq!(decoded, code);
        }
    }

    #[test]
    fn message_code_from_str_rejects_unknown_names() {
        let err = "MSG_SOMETHING_ELSE".parse::<MessageCode>().unwrap_err();
        assert_eq!(err.invalid_name(), "MSG_SOMETHING_ELSE");
    }

    #[test]
    fn payload_too_large_is_rejected() {
        let err = MessageHeader::new(MessageCode::Data, MAX_PAYLOAD_LEN + 1)
            .expect_err("must reject oversized payload");
        assert_eq!(err, EnvelopeError::PayloadTooLarge(MAX_PAYLOAD_LEN + 1));
    }
}
