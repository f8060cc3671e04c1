use super::MessageParseError;
use crate::cursor::Cursor;
use crate::from_bytes::TryConsumeBytes;

/// # Message ID
///
/// 16-bit unsigned integer in network byte order. Used to
/// detect message duplication and to match messages of type
/// Acknowledgement/Reset to messages of type Confirmable/Non-confirmable.
///
/// For the difference between [`Id`] and [`Token`](crate::Token), see
/// [`Token`](crate::Token): the id correlates a message with its direct
/// Ack/Reset at the transport-reliability layer, the token correlates a
/// request with its (possibly delayed) response.
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct Id(pub u16);

impl Id {
  /// Create an Id from a big-endian 2-byte unsigned int
  pub fn from_be_bytes(bs: [u8; 2]) -> Self {
    Self(u16::from_be_bytes(bs))
  }
}

impl From<Id> for [u8; 2] {
  fn from(id: Id) -> [u8; 2] {
    id.0.to_be_bytes()
  }
}

impl<Bytes: AsRef<[u8]>> TryConsumeBytes<Bytes> for Id {
  type Error = MessageParseError;

  fn try_consume_bytes(bytes: &mut Cursor<Bytes>) -> Result<Self, Self::Error> {
    match bytes.take_exact(2) {
      | Some(&[a, b]) => Ok(Id::from_be_bytes([a, b])),
      | _ => Err(MessageParseError::eof()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_id() {
    let mut bytes = Cursor::new(34u16.to_be_bytes());
    assert_eq!(Id::try_consume_bytes(&mut bytes).unwrap(), Id(34));
  }

  #[test]
  fn id_too_short() {
    let mut bytes = Cursor::new([0u8]);
    assert_eq!(Id::try_consume_bytes(&mut bytes),
               Err(MessageParseError::UnexpectedEndOfStream));
  }
}
