//! On-wire encoding of a [`Token`] stream.
//!
//! Each token is a little-endian `i32`: zero terminates the stream, a
//! positive value is a literal run's length (that many bytes follow), and a
//! negative value is `-(block_index + 1)`, a reference into the peer's
//! signature.

use std::io::{self, Read, Write};

use crate::token::Token;

/// Writes `tokens` followed by the zero-length terminator.
///
/// # Errors
///
/// Propagates I/O errors from `writer`.
pub fn write_tokens<W: Write>(writer: &mut W, tokens: &[Token]) -> io::Result<()> {
    for token in tokens {
        write_token(writer, token)?;
    }
    writer.write_all(&0i32.to_le_bytes())
}

/// Writes a single non-terminating token.
///
/// # Errors
///
/// Propagates I/O errors from `writer`.
pub fn write_token<W: Write>(writer: &mut W, token: &Token) -> io::Result<()> {
    match token {
        Token::Literal(bytes) => {
            let len = i32::try_from(bytes.len()).map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "literal too long"))?;
            writer.write_all(&len.to_le_bytes())?;
            writer.write_all(bytes)
        }
        Token::Match(index) => {
            let code = i32::try_from(*index)
                .ok()
                .and_then(|i| i.checked_add(1))
                .map(|i| -i)
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "block index too large"))?;
            writer.write_all(&code.to_le_bytes())
        }
    }
}

/// Reads a full token stream up to and including its terminator, returning
/// the tokens before it.
///
/// # Errors
///
/// Propagates I/O errors from `reader`, including truncation mid-literal.
pub fn read_tokens<R: Read>(reader: &mut R) -> io::Result<Vec<Token>> {
    let mut tokens = Vec::new();
    while let Some(token) = read_token(reader)? {
        tokens.push(token);
    }
    Ok(tokens)
}

/// Reads a single token, returning `Ok(None)` at the stream terminator.
///
/// # Errors
///
/// Propagates I/O errors from `reader`, including truncation mid-literal.
pub fn read_token<R: Read>(reader: &mut R) -> io::Result<Option<Token>> {
    let code = read_i32(reader)?;
    if code == 0 {
        return Ok(None);
    }
    if code > 0 {
        let mut bytes = vec![0u8; code as usize];
        reader.read_exact(&mut bytes)?;
        Ok(Some(Token::Literal(bytes)))
    } else {
        let index = u32::try_from(-code - 1).map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "negative block index"))?;
        Ok(Some(Token::Match(index)))
    }
}

fn read_i32<R: Read>(reader: &mut R) -> io::Result<i32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(i32::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_a_mixed_token_stream() {
        let tokens = vec![Token::Literal(b"hello".to_vec()), Token::Match(3), Token::Literal(b"world".to_vec())];
        let mut buf = Vec::new();
        write_tokens(&mut buf, &tokens).unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(read_tokens(&mut cursor).unwrap(), tokens);
    }

    #[test]
    fn empty_stream_is_just_the_terminator() {
        let mut buf = Vec::new();
        write_tokens(&mut buf, &[]).unwrap();
        assert_eq!(buf, 0i32.to_le_bytes());
    }

    #[test]
    fn match_token_zero_encodes_as_negative_one() {
        let mut buf = Vec::new();
        write_token(&mut buf, &Token::Match(0)).unwrap();
        assert_eq!(buf, (-1i32).to_le_bytes());
    }

    #[test]
    fn truncated_literal_is_an_error() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&10i32.to_le_bytes());
        buf.extend_from_slice(b"short");
        let mut cursor = Cursor::new(buf);
        assert!(read_tokens(&mut cursor).is_err());
    }
}
