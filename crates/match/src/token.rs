//! The token stream a sender emits to describe how a file differs from a
//! peer's signature.

/// Literal byte runs are split into chunks no larger than this, so a single
/// unmatched region of a file doesn't force the receiver to buffer it
/// whole before forwarding it downstream.
pub const CHUNK_SIZE: usize = 8192;

/// One element of a sender's delta stream.
///
/// On the wire, a literal token is a positive little-endian `i32` length
/// followed by that many bytes; a match token is `-(block_index + 1)`; and
/// the stream ends with a zero-length token.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Token {
    /// Bytes not found in the peer's signature, to be sent verbatim.
    Literal(Vec<u8>),
    /// A reference to the peer's existing block at this index.
    Match(u32),
}

/// Splits `data` into `Token::Literal` chunks of at most [`CHUNK_SIZE`]
/// bytes, appending them to `tokens`. Emits nothing for empty input.
pub fn push_literal_tokens(tokens: &mut Vec<Token>, data: &[u8]) {
    for chunk in data.chunks(CHUNK_SIZE) {
        tokens.push(Token::Literal(chunk.to_vec()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_literal_emits_no_tokens() {
        let mut tokens = Vec::new();
        push_literal_tokens(&mut tokens, &[]);
        assert!(tokens.is_empty());
    }

    #[test]
    fn literal_longer_than_chunk_size_is_split() {
        let data = vec![9u8; CHUNK_SIZE + 100];
        let mut tokens = Vec::new();
        push_literal_tokens(&mut tokens, &data);
        assert_eq!(tokens.len(), 2);
        match &tokens[0] {
            Token::Literal(bytes) => assert_eq!(bytes.len(), CHUNK_SIZE),
            Token::Match(_) => panic!("expected literal"),
        }
        match &tokens[1] {
            Token::Literal(bytes) => assert_eq!(bytes.len(), 100),
            Token::Match(_) => panic!("expected literal"),
        }
    }

    #[test]
    fn small_literal_is_a_single_token() {
        let mut tokens = Vec::new();
        push_literal_tokens(&mut tokens, b"hello");
        assert_eq!(tokens, vec![Token::Literal(b"hello".to_vec())]);
    }
}
