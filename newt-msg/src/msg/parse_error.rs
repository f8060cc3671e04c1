/// Errors encounterable while parsing a message from bytes
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Eq, Ord)]
pub enum MessageParseError {
  /// Reached end of stream before parsing was finished
  UnexpectedEndOfStream,

  /// The version nibble was not 1.
  ///
  /// Datagrams with unknown versions must be silently ignored, so this is
  /// surfaced rather than guessed around.
  InvalidVersion(u8),

  /// Token length was > 8
  InvalidTokenLength(u8),

  /// The message type is invalid (see [`Type`](crate::Type) for valid values)
  InvalidType(u8),

  /// Error parsing option
  OptParseError(super::opt::parse_error::OptParseError),

  /// The payload marker (0xFF) was present but no payload bytes followed it
  PayloadMarkerWithoutPayload,
}

impl MessageParseError {
  /// Shorthand for [`MessageParseError::UnexpectedEndOfStream`]
  pub fn eof() -> Self {
    Self::UnexpectedEndOfStream
  }
}
