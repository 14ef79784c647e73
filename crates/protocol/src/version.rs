//! Protocol version and compatibility-flag handling.
//!
//! The wire format this crate speaks is fixed at protocol version 30; older
//! peers are rejected outright rather than downgraded to, since this crate
//! implements none of the legacy framing those versions require.

use std::fmt;

/// Lowest protocol version this implementation will negotiate.
pub const MIN_PROTOCOL_VERSION: u32 = 30;

/// A negotiated protocol version.
///
/// Construction is the only validation point: once built, a `ProtocolVersion`
/// is guaranteed to be at least [`MIN_PROTOCOL_VERSION`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion(u32);

impl ProtocolVersion {
    /// Wraps `major` as a negotiated version.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::TooOld`] if `major` is below
    /// [`MIN_PROTOCOL_VERSION`].
    pub const fn new(major: u32) -> Result<Self, VersionError> {
        if major < MIN_PROTOCOL_VERSION {
            return Err(VersionError::TooOld(major));
        }
        Ok(Self(major))
    }

    /// Returns the raw major version number.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.0", self.0)
    }
}

/// Errors raised while negotiating a protocol version.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VersionError {
    /// The peer advertised a version below [`MIN_PROTOCOL_VERSION`].
    TooOld(u32),
    /// The `@RSYNCD: <major>.<minor>` greeting line was not well formed.
    Malformed,
}

impl fmt::Display for VersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionError::TooOld(major) => {
                write!(f, "peer protocol version {major} is older than minimum supported {MIN_PROTOCOL_VERSION}")
            }
            VersionError::Malformed => write!(f, "malformed @RSYNCD greeting line"),
        }
    }
}

impl std::error::Error for VersionError {}

/// Parses a `@RSYNCD: <major>.<minor>` greeting line (without the trailing
/// newline) into a negotiated [`ProtocolVersion`].
///
/// # Errors
///
/// Returns [`VersionError::Malformed`] if the line is not of the expected
/// shape, or [`VersionError::TooOld`] if the advertised major version is
/// below [`MIN_PROTOCOL_VERSION`].
pub fn parse_greeting(line: &str) -> Result<ProtocolVersion, VersionError> {
    let rest = line.strip_prefix("@RSYNCD: ").ok_or(VersionError::Malformed)?;
    let major_str = rest.split('.').next().ok_or(VersionError::Malformed)?;
    let major: u32 = major_str.parse().map_err(|_| VersionError::Malformed)?;
    ProtocolVersion::new(major)
}

/// Formats a greeting line for `version`, without a trailing newline.
#[must_use]
pub fn format_greeting(version: ProtocolVersion) -> String {
    format!("@RSYNCD: {version}")
}

/// Incremental (segment-at-a-time) file-list recursion is in use.
pub const CF_INC_RECURSE: u8 = 0x01;
/// Symlink targets carry their own length-prefixed encoding.
pub const CF_SYMLINK_TIMES: u8 = 0x02;
/// File-list indices use the safety-checked NDX encoding.
pub const CF_SAFE_FLIST: u8 = 0x04;
/// Peer understands the `AVOID_XATTR_OPTIM` refinement.
pub const CF_AVOID_XATTR_OPTIM: u8 = 0x08;

/// Server-advertised compatibility flags, sent as a single byte after
/// argument exchange.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct CompatFlags(u8);

impl CompatFlags {
    /// The empty flag set.
    pub const NONE: Self = Self(0);

    /// Wraps a raw compatibility byte as read off the wire.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Returns the raw compatibility byte.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns a copy with `flag` set.
    #[must_use]
    pub const fn with(self, flag: u8) -> Self {
        Self(self.0 | flag)
    }

    /// Returns whether every bit in `flag` is set.
    #[must_use]
    pub const fn contains(self, flag: u8) -> bool {
        self.0 & flag == flag
    }
}

/// The session's 32-bit checksum seed, mixed into every strong-checksum
/// computation so matches cannot be replayed across sessions.
///
/// See [`crate::envelope`] for how it interacts with the multiplexed
/// channel and `checksums::strong::SeededMd5` for how it is applied.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ChecksumSeed(u32);

impl ChecksumSeed {
    /// Wraps a raw 32-bit seed value.
    #[must_use]
    pub const fn new(seed: u32) -> Self {
        Self(seed)
    }

    /// Returns the raw seed value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Decodes a seed from its little-endian wire encoding (the value is
    /// transmitted via `putInt`, i.e. little-endian, even though upstream
    /// generates it from a big-endian view of the clock).
    #[must_use]
    pub const fn from_le_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_le_bytes(bytes))
    }

    /// Encodes the seed as 4 little-endian bytes.
    #[must_use]
    pub const fn to_le_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}
