//! Line-based daemon handshake performed before the multiplexed transfer
//! phase begins.
//!
//! The handshake itself only needs a byte stream that can produce and
//! consume `\n`-terminated lines; authentication and module-name resolution
//! are delegated to small traits so this crate never depends on how
//! credentials or module tables are stored.

use std::fmt;
use std::io::{self, BufRead, Write};

use crate::version::{self, ChecksumSeed, CompatFlags, ProtocolVersion, VersionError};

/// Resolves a client-supplied module name and authenticates a client, if
/// the module requires it.
///
/// A server that exposes no auth-gated modules can implement this with an
/// `Ok(None)` challenge and an authenticator that always succeeds.
pub trait ModuleAuthenticator {
    /// Returns the authentication challenge to send for `module`, or `None`
    /// if the module requires no authentication.
    fn challenge(&self, module: &str) -> Option<String>;

    /// Verifies a `<user> <md5-of-challenge+password>` response against the
    /// challenge previously returned for `module`.
    fn verify(&self, module: &str, user: &str, response_hex: &str) -> bool;
}

/// Errors raised while driving the handshake.
#[derive(Debug)]
pub enum NegotiationError {
    /// I/O failure reading or writing a handshake line.
    Io(io::Error),
    /// The peer's greeting line failed to parse or named a version this
    /// implementation refuses to speak.
    Version(VersionError),
    /// The peer closed the connection before completing the handshake.
    UnexpectedClose,
    /// The server rejected the request with `@ERROR: <msg>`.
    Rejected(String),
    /// Authentication failed.
    AuthFailed,
    /// A line exceeded the handshake's sanity length limit.
    LineTooLong,
}

impl fmt::Display for NegotiationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegotiationError::Io(e) => write!(f, "handshake I/O error: {e}"),
            NegotiationError::Version(e) => write!(f, "handshake version error: {e}"),
            NegotiationError::UnexpectedClose => {
                write!(f, "peer closed the connection during handshake")
            }
            NegotiationError::Rejected(msg) => write!(f, "server rejected session: {msg}"),
            NegotiationError::AuthFailed => write!(f, "module authentication failed"),
            NegotiationError::LineTooLong => write!(f, "handshake line exceeded length limit"),
        }
    }
}

impl std::error::Error for NegotiationError {}

impl From<io::Error> for NegotiationError {
    fn from(e: io::Error) -> Self {
        NegotiationError::Io(e)
    }
}

impl From<VersionError> for NegotiationError {
    fn from(e: VersionError) -> Self {
        NegotiationError::Version(e)
    }
}

/// Longest handshake line this implementation will read before giving up;
/// guards against a misbehaving peer never sending `\n`.
const MAX_LINE_LEN: usize = 4096;

fn read_line<R: BufRead>(reader: &mut R) -> Result<String, NegotiationError> {
    let mut line = String::new();
    let n = reader.read_line(&mut line)?;
    if n == 0 {
        return Err(NegotiationError::UnexpectedClose);
    }
    if line.len() > MAX_LINE_LEN {
        return Err(NegotiationError::LineTooLong);
    }
    if line.as_bytes().contains(&0) {
        return Err(NegotiationError::Rejected("null byte in handshake line".into()));
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(line)
}

fn write_line<W: Write>(writer: &mut W, line: &str) -> io::Result<()> {
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()
}

/// Outcome of a completed client-side handshake.
#[derive(Debug)]
pub struct NegotiatedSession {
    /// The protocol version both sides agreed to speak.
    pub version: ProtocolVersion,
    /// Compatibility flags advertised by the server.
    pub compat_flags: CompatFlags,
    /// The session's checksum seed.
    pub checksum_seed: ChecksumSeed,
}

/// Drives the client side of the daemon handshake over an already-connected
/// line-buffered stream.
///
/// `module` is the module name to request, or `""` to request a listing.
/// `auth_response` is called with the server's challenge (if any) and must
/// return the `<user> <md5-of-challenge+password>` line to send back.
///
/// # Errors
///
/// Returns [`NegotiationError`] for any I/O failure, version mismatch,
/// server rejection, or line that violates the handshake's framing rules.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(module)))]
pub fn negotiate_client<S, F>(
    stream: &mut S,
    module: &str,
    args: &[String],
    mut auth_response: F,
) -> Result<NegotiatedSession, NegotiationError>
where
    S: BufRead + Write,
    F: FnMut(&str) -> String,
{
    write_line(stream, &version::format_greeting(ProtocolVersion::new(version::MIN_PROTOCOL_VERSION)?))?;
    let server_greeting = read_line(stream)?;
    let _server_version = version::parse_greeting(&server_greeting)?;

    write_line(stream, module)?;

    loop {
        let line = read_line(stream)?;
        if let Some(challenge) = line.strip_prefix("@RSYNCD: AUTHREQD ") {
            let response = auth_response(challenge);
            write_line(stream, &response)?;
            continue;
        }
        if line == "@RSYNCD: OK" {
            break;
        }
        if line == "@RSYNCD: EXIT" {
            return Err(NegotiationError::Rejected("server closed the module listing".into()));
        }
        if let Some(msg) = line.strip_prefix("@ERROR: ") {
            return Err(NegotiationError::Rejected(msg.to_owned()));
        }
        return Err(NegotiationError::Rejected(line));
    }

    for arg in args {
        stream.write_all(arg.as_bytes())?;
        stream.write_all(&[0])?;
    }
    stream.write_all(&[0])?;
    stream.flush()?;

    let mut flag_byte = [0u8; 1];
    read_exact(stream, &mut flag_byte)?;
    let compat_flags = CompatFlags::from_bits(flag_byte[0]);

    let mut seed_bytes = [0u8; 4];
    read_exact(stream, &mut seed_bytes)?;
    let checksum_seed = ChecksumSeed::from_le_bytes(seed_bytes);

    Ok(NegotiatedSession {
        version: ProtocolVersion::new(version::MIN_PROTOCOL_VERSION)?,
        compat_flags,
        checksum_seed,
    })
}

fn read_exact<R: BufRead>(reader: &mut R, buf: &mut [u8]) -> Result<(), NegotiationError> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            NegotiationError::UnexpectedClose
        } else {
            NegotiationError::Io(e)
        }
    })
}

/// Drives the server side of the daemon handshake.
///
/// `resolve_module` maps a requested module name to `Ok(())` if it exists
/// and is servable, or an error message to send as `@ERROR:`.
///
/// # Errors
///
/// See [`negotiate_client`].
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
pub fn negotiate_server<S>(
    stream: &mut S,
    authenticator: &dyn ModuleAuthenticator,
    resolve_module: impl FnOnce(&str) -> Result<(), String>,
    compat_flags: CompatFlags,
    checksum_seed: ChecksumSeed,
) -> Result<(String, Vec<String>), NegotiationError>
where
    S: BufRead + Write,
{
    write_line(stream, &version::format_greeting(ProtocolVersion::new(version::MIN_PROTOCOL_VERSION)?))?;
    let client_greeting = read_line(stream)?;
    let _client_version = version::parse_greeting(&client_greeting)?;

    let module = read_line(stream)?;

    if let Err(msg) = resolve_module(&module) {
        write_line(stream, &format!("@ERROR: {msg}"))?;
        return Err(NegotiationError::Rejected(msg));
    }

    if let Some(challenge) = authenticator.challenge(&module) {
        write_line(stream, &format!("@RSYNCD: AUTHREQD {challenge}"))?;
        let response = read_line(stream)?;
        let (user, response_hex) = response
            .split_once(' ')
            .ok_or_else(|| NegotiationError::Rejected("malformed auth response".into()))?;
        if !authenticator.verify(&module, user, response_hex) {
            write_line(stream, "@ERROR: auth failed")?;
            return Err(NegotiationError::AuthFailed);
        }
    }

    write_line(stream, "@RSYNCD: OK")?;

    let mut args = Vec::new();
    loop {
        let arg = read_null_terminated(stream)?;
        if arg.is_empty() {
            break;
        }
        args.push(arg);
    }

    stream.write_all(&[compat_flags.bits()])?;
    stream.write_all(&checksum_seed.to_le_bytes())?;
    stream.flush()?;

    Ok((module, args))
}

fn read_null_terminated<R: BufRead>(reader: &mut R) -> Result<String, NegotiationError> {
    let mut buf = Vec::new();
    reader.read_until(0, &mut buf)?;
    if buf.last() != Some(&0) {
        return Err(NegotiationError::UnexpectedClose);
    }
    buf.pop();
    String::from_utf8(buf).map_err(|_| NegotiationError::Rejected("non-UTF-8 argument".into()))
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    struct NoAuth;
    impl ModuleAuthenticator for NoAuth {
        fn challenge(&self, _module: &str) -> Option<String> {
            None
        }
        fn verify(&self, _module: &str, _user: &str, _response_hex: &str) -> bool {
            true
        }
    }

    struct RequireAuth {
        challenge: String,
        expected_user: String,
        expected_hex: String,
    }
    impl ModuleAuthenticator for RequireAuth {
        fn challenge(&self, _module: &str) -> Option<String> {
            Some(self.challenge.clone())
        }
        fn verify(&self, _module: &str, user: &str, response_hex: &str) -> bool {
            user == self.expected_user && response_hex == self.expected_hex
        }
    }

    /// Splits a `TcpStream` into a buffered reader half and a raw writer
    /// half sharing the same socket, so it can satisfy `BufRead + Write`.
    struct DuplexStream {
        reader: BufReader<TcpStream>,
        writer: TcpStream,
    }

    impl DuplexStream {
        fn new(stream: TcpStream) -> io::Result<Self> {
            let writer = stream.try_clone()?;
            Ok(Self {
                reader: BufReader::new(stream),
                writer,
            })
        }
    }

    impl io::Read for DuplexStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reader.read(buf)
        }
    }

    impl BufRead for DuplexStream {
        fn fill_buf(&mut self) -> io::Result<&[u8]> {
            self.reader.fill_buf()
        }
        fn consume(&mut self, amt: usize) {
            self.reader.consume(amt);
        }
    }

    impl Write for DuplexStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writer.write(buf)
        }
        fn flush(&mut self) -> io::Result<()> {
            self.writer.flush()
        }
    }

    #[test]
    fn client_and_server_complete_handshake_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut duplex = DuplexStream::new(stream).unwrap();
            negotiate_server(
                &mut duplex,
                &NoAuth,
                |name| if name == "mod" { Ok(()) } else { Err(format!("unknown module {name}")) },
                CompatFlags::from_bits(0x05),
                ChecksumSeed::new(0xCAFE_BABE),
            )
            .unwrap()
        });

        let client_stream = TcpStream::connect(addr).unwrap();
        let mut duplex = DuplexStream::new(client_stream).unwrap();
        let session = negotiate_client(
            &mut duplex,
            "mod",
            &["--server".to_owned()],
            |_challenge| String::new(),
        )
        .unwrap();

        let (module, args) = server.join().unwrap();
        assert_eq!(module, "mod");
        assert_eq!(args, vec!["--server".to_owned()]);
        assert_eq!(session.version.get(), 30);
        assert!(session.compat_flags.contains(version::CF_INC_RECURSE));
        assert!(session.compat_flags.contains(version::CF_SAFE_FLIST));
        assert_eq!(session.checksum_seed.get(), 0xCAFE_BABE);
    }

    #[test]
    fn client_sees_rejection_for_unknown_module() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut duplex = DuplexStream::new(stream).unwrap();
            negotiate_server(
                &mut duplex,
                &NoAuth,
                |name| Err(format!("unknown module {name}")),
                CompatFlags::from_bits(0),
                ChecksumSeed::new(0),
            )
        });

        let client_stream = TcpStream::connect(addr).unwrap();
        let mut duplex = DuplexStream::new(client_stream).unwrap();
        let err = negotiate_client(&mut duplex, "missing", &[], |_challenge| String::new())
            .unwrap_err();
        assert!(matches!(err, NegotiationError::Rejected(_)));

        let server_result = server.join().unwrap();
        assert!(matches!(server_result, Err(NegotiationError::Rejected(_))));
    }

    #[test]
    fn client_and_server_complete_handshake_with_auth() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let auth = RequireAuth {
            challenge: "abc123".to_owned(),
            expected_user: "alice".to_owned(),
            expected_hex: "deadbeef".to_owned(),
        };

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut duplex = DuplexStream::new(stream).unwrap();
            negotiate_server(
                &mut duplex,
                &auth,
                |_name| Ok(()),
                CompatFlags::from_bits(0),
                ChecksumSeed::new(7),
            )
            .unwrap()
        });

        let client_stream = TcpStream::connect(addr).unwrap();
        let mut duplex = DuplexStream::new(client_stream).unwrap();
        let session = negotiate_client(&mut duplex, "secure", &[], |challenge| {
            assert_eq!(challenge, "abc123");
            "alice deadbeef".to_owned()
        })
        .unwrap();

        let (module, _args) = server.join().unwrap();
        assert_eq!(module, "secure");
        assert_eq!(session.checksum_seed.get(), 7);
    }

    #[test]
    fn require_auth_authenticator_accepts_only_matching_response() {
        let auth = RequireAuth {
            challenge: "abc123".to_owned(),
            expected_user: "alice".to_owned(),
            expected_hex: "deadbeef".to_owned(),
        };
        assert!(auth.verify("mod", "alice", "deadbeef"));
        assert!(!auth.verify("mod", "alice", "wrong"));
    }

    #[test]
    fn version_parse_rejects_old_server() {
        let err = version::parse_greeting("@RSYNCD: 28.0").unwrap_err();
        assert_eq!(err, VersionError::TooOld(28));
    }
}
