use tinyvec::ArrayVec;

/// Message token for matching requests to responses.
///
/// Note that this is different from [`Id`](crate::Id), which uniquely
/// identifies a message that may be retransmitted.
///
/// For example, a client may send a confirmable request with id 1 and token
/// 321 multiple times, then the server confirms and sends a response with a
/// different id (because it's a different message), but token 321 (so the
/// client knows which request the response is responding to).
///
/// Between 0 and 8 opaque bytes.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Token(pub ArrayVec<[u8; 8]>);

impl Token {
  /// Whether this is the zero-length token
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl From<&[u8]> for Token {
  /// Copy up to 8 bytes into a token; extra bytes are discarded.
  fn from(bytes: &[u8]) -> Self {
    Token(bytes.iter().copied().take(8).collect())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn token_from_slice_truncates() {
    let token = Token::from(&[1u8, 2, 3, 4, 5, 6, 7, 8, 9][..]);
    assert_eq!(token.0.len(), 8);
    assert_eq!(token.0.as_slice(), &[1, 2, 3, 4, 5, 6, 7, 8]);
  }

  #[test]
  fn empty() {
    assert!(Token::default().is_empty());
    assert!(!Token::from(&[0u8][..]).is_empty());
  }
}
