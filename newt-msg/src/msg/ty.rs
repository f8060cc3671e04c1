use super::MessageParseError;

/// Message type: Confirmable (0), Non-confirmable (1), Acknowledgement (2)
/// or Reset (3).
///
/// Confirmable messages are retransmitted until the peer returns an
/// Acknowledgement (or Reset) carrying the same message id; Non-confirmable
/// messages are fire-and-forget.
#[derive(Copy, Clone, Hash, Eq, Ord, PartialEq, PartialOrd, Debug)]
pub enum Type {
  /// Requires an Acknowledgement. When no packets are lost, each Confirmable
  /// message elicits exactly one return message of type Acknowledgement or
  /// Reset.
  Con,
  /// Does not require an acknowledgement. Appropriate for messages repeated
  /// regularly for application requirements, such as sensor readings.
  Non,
  /// Acknowledges that a specific Confirmable message arrived. May also carry
  /// a piggybacked response.
  Ack,
  /// Indicates that a specific message was received but some context is
  /// missing to process it, usually because the receiver has rebooted.
  Reset,
}

impl From<Type> for u8 {
  fn from(t: Type) -> u8 {
    use Type::*;
    match t {
      | Con => 0,
      | Non => 1,
      | Ack => 2,
      | Reset => 3,
    }
  }
}

impl TryFrom<u8> for Type {
  type Error = MessageParseError;

  fn try_from(b: u8) -> Result<Self, Self::Error> {
    match b {
      | 0 => Ok(Type::Con),
      | 1 => Ok(Type::Non),
      | 2 => Ok(Type::Ack),
      | 3 => Ok(Type::Reset),
      | _ => Err(MessageParseError::InvalidType(b)),
    }
  }
}
