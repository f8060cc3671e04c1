/// Errors encounterable while parsing an option from bytes
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Eq, Ord)]
pub enum OptParseError {
  /// Reached end of stream before parsing was finished
  UnexpectedEndOfStream,

  /// Option delta nibble was set to the reserved value 15.
  ///
  /// 0xFF in the option-header position is the payload marker; a delta
  /// nibble of 15 with any other length nibble cannot be a marker and
  /// cannot be an option, so the message is malformed.
  OptionDeltaReservedValue(u8),

  /// Value length nibble was set to the reserved value 15.
  ValueLengthReservedValue(u8),
}

impl OptParseError {
  /// Shorthand for [`OptParseError::UnexpectedEndOfStream`]
  pub fn eof() -> Self {
    Self::UnexpectedEndOfStream
  }
}
