#[cfg(feature = "alloc")]
use std_alloc::vec::Vec;

/// Message Code
pub mod code;

/// Message ID
pub mod id;

/// Message parsing errors
pub mod parse_error;

/// Message Options
pub mod opt;

/// Message Token
pub mod token;

/// Message Type
pub mod ty;

/// Message Version
pub mod ver;

pub use code::*;
pub use id::*;
pub use opt::{EnumerateOptNumbers, Opt, OptDelta, OptNumber, OptValue};
pub use parse_error::*;
pub use token::*;
pub use ty::*;
pub use ver::*;

use crate::cursor::Cursor;
use crate::from_bytes::{TryConsumeBytes, TryFromBytes};

/// Low-level representation of the message payload.
///
/// Both requests and responses may include one, depending on the method or
/// response code. Present on the wire iff preceded by the 0xFF marker.
#[derive(Clone, Debug, PartialEq, PartialOrd, Default)]
pub struct Payload(pub Vec<u8>);

/// Struct representing the first byte of a message.
///
/// ```text
/// CoAP version
/// |
/// |  Message type (CON, NON, ACK, RST)
/// |  |
/// |  |  Length of token, in bytes (4-bit integer)
/// |  |  |
/// vv vv vvvv
/// 01 00 0000
/// ```
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub(crate) struct Byte1 {
  pub(crate) ver: Version,
  pub(crate) ty: Type,
  pub(crate) tkl: u8,
}

impl TryFrom<u8> for Byte1 {
  type Error = MessageParseError;

  fn try_from(b: u8) -> Result<Self, Self::Error> {
    let ver = b >> 6; // bits 0 & 1
    let ty = b >> 4 & 0b11; // bits 2 & 3
    let tkl = b & 0b1111; // last 4 bits

    Ok(Byte1 { ver: Version(ver),
               ty: Type::try_from(ty)?,
               tkl })
  }
}

impl From<Byte1> for u8 {
  fn from(b: Byte1) -> u8 {
    let ver = b.ver.0 << 6;
    let ty = u8::from(b.ty) << 4;
    let tkl = b.tkl;

    ver | ty | tkl
  }
}

/// # `Message` struct
/// Low-level representation of a CoAP message, very close to the actual byte
/// layout: the option sequence is stored delta-encoded, in wire order.
///
/// Parse with [`TryFromBytes`], serialize with `Vec::<u8>::from` or
/// [`Message::extend_bytes`].
///
/// ```
/// use newt_msg::{Code, Message, Payload, TryFromBytes};
///
/// # //                       version  token len  code (2.05 Content)
/// # //                       |        |          /
/// # //                       |  type  |         /  message ID
/// # //                       |  |     |        |   |
/// # //                       vv vv vvvv vvvvvvvv vvvvvvvvvvvvvvvv
/// # let header: [u8; 4] = 0b_01_00_0001_01000101_0000000000000001u32.to_be_bytes();
/// # let token: [u8; 1] = [254u8];
/// # let content_format: &[u8] = b"application/json";
/// # let options: [&[u8]; 2] = [&[0b_1100_1101u8, 0b00000011u8], content_format];
/// # let payload: [&[u8]; 2] = [&[0b_11111111u8], b"hello, world!"];
/// let packet: Vec<u8> = /* bytes! */
/// # [header.as_ref(), token.as_ref(), options.concat().as_ref(), payload.concat().as_ref()].concat();
///
/// let msg = Message::try_from_bytes(&packet).unwrap();
/// assert_eq!(msg.code, Code { class: 2, detail: 5 });
/// assert_eq!(msg.payload, Payload(b"hello, world!".to_vec()));
/// ```
#[derive(Clone, PartialEq, PartialOrd, Debug)]
pub struct Message {
  /// see [`Id`] for details
  pub id: Id,
  /// see [`Type`] for details
  pub ty: Type,
  /// see [`Version`] for details
  pub ver: Version,
  /// see [`Token`] for details
  pub token: Token,
  /// see [`Code`] for details
  pub code: Code,
  /// see [`Opt`] for details
  pub opts: Vec<Opt>,
  /// see [`Payload`]
  pub payload: Payload,
}

impl Message {
  /// Create the empty Acknowledgement for this message.
  ///
  /// Empty acks echo the message id (that is what correlates them) and
  /// carry no token, options or payload.
  pub fn ack(&self) -> Self {
    Self { id: self.id,
           token: Token::default(),
           ver: Default::default(),
           ty: Type::Ack,
           code: Code::new(0, 0),
           payload: Payload(Default::default()),
           opts: Default::default() }
  }

  /// Create the Reset for this message, e.g. in reply to a CoAP ping
  /// (an empty Confirmable message).
  pub fn reset(&self) -> Self {
    Self { ty: Type::Reset,
           ..self.ack() }
  }

  /// Get an option's value by number, when present exactly once this way.
  ///
  /// For repeatable options use
  /// [`EnumerateOptNumbers`] directly.
  pub fn get_option(&self, n: OptNumber) -> Option<&OptValue> {
    self.opts
        .iter()
        .enumerate_option_numbers()
        .find(|(num, _)| *num == n)
        .map(|(_, o)| &o.value)
  }
}

impl<Bytes: AsRef<[u8]>> TryFromBytes<Bytes> for Message {
  type Error = MessageParseError;

  fn try_from_bytes(bytes: Bytes) -> Result<Self, Self::Error> {
    let mut bytes = Cursor::new(bytes);

    let Byte1 { tkl, ty, ver } = bytes.next()
                                      .ok_or_else(MessageParseError::eof)?
                                      .try_into()?;

    if ver != Version::default() {
      return Err(MessageParseError::InvalidVersion(ver.0));
    }

    if tkl > 8 {
      return Err(MessageParseError::InvalidTokenLength(tkl));
    }

    let code: Code = bytes.next().ok_or_else(MessageParseError::eof)?.into();
    let id = Id::try_consume_bytes(&mut bytes)?;

    let token = bytes.take_exact(tkl as usize)
                     .ok_or_else(MessageParseError::eof)?;
    let token = Token::from(token);

    let (opts, saw_marker) =
      opt::try_consume_opts(&mut bytes).map_err(MessageParseError::OptParseError)?;

    let payload = Payload(bytes.take_until_end().to_vec());

    if saw_marker && payload.0.is_empty() {
      return Err(MessageParseError::PayloadMarkerWithoutPayload);
    }

    Ok(Message { id,
                 ty,
                 ver,
                 code,
                 token,
                 opts,
                 payload })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_msg;

  #[test]
  fn parse_msg() {
    let (expect, bytes) = test_msg();
    assert_eq!(Message::try_from_bytes(&bytes).unwrap(), expect)
  }

  #[test]
  fn parse_byte1() {
    let byte = 0b_01_10_0011u8;
    let byte = Byte1::try_from(byte).unwrap();
    assert_eq!(byte,
               Byte1 { ver: Version(1),
                       ty: Type::Ack,
                       tkl: 3 })
  }

  #[test]
  fn serialize_byte1() {
    let byte = Byte1 { ver: Version(1),
                       ty: Type::Ack,
                       tkl: 3 };
    assert_eq!(u8::from(byte), 0b_01_10_0011u8)
  }

  #[test]
  fn bad_version() {
    // version 2 in the top two bits
    let bytes = [0b_10_00_0000u8, 0x45, 0, 1];
    assert_eq!(Message::try_from_bytes(&bytes),
               Err(MessageParseError::InvalidVersion(2)));
  }

  #[test]
  fn bad_token_length() {
    // tkl 9 is outside [0, 8]
    let bytes = [0b_01_00_1001u8, 0x45, 0, 1];
    assert_eq!(Message::try_from_bytes(&bytes),
               Err(MessageParseError::InvalidTokenLength(9)));
  }

  #[test]
  fn truncated_header() {
    assert_eq!(Message::try_from_bytes(&[0b_0100_0000u8, 0x45]),
               Err(MessageParseError::UnexpectedEndOfStream));
  }

  #[test]
  fn truncated_token() {
    // tkl 2, only 1 token byte present
    let bytes = [0b_01_00_0010u8, 0x45, 0, 1, 0xAA];
    assert_eq!(Message::try_from_bytes(&bytes),
               Err(MessageParseError::UnexpectedEndOfStream));
  }

  #[test]
  fn truncated_mid_option_extension() {
    // option header announces a 2-byte delta extension, buffer ends after 1
    let bytes = [0b_01_00_0000u8, 0x45, 0, 1, 0b1110_0000, 0];
    assert_eq!(Message::try_from_bytes(&bytes),
               Err(MessageParseError::OptParseError(opt::OptParseError::UnexpectedEndOfStream)));
  }

  #[test]
  fn marker_without_payload() {
    let bytes = [0b_01_00_0000u8, 0x45, 0, 1, 0xFF];
    assert_eq!(Message::try_from_bytes(&bytes),
               Err(MessageParseError::PayloadMarkerWithoutPayload));
  }

  #[test]
  fn empty_payload_without_marker_is_fine() {
    let bytes = [0b_01_00_0000u8, 0x45, 0, 1];
    let msg = Message::try_from_bytes(&bytes).unwrap();
    assert!(msg.payload.0.is_empty());
    assert!(msg.opts.is_empty());
  }

  #[test]
  fn ack_echoes_id_only() {
    let (msg, _) = test_msg();
    let ack = msg.ack();
    assert_eq!(ack.id, msg.id);
    assert_eq!(ack.ty, Type::Ack);
    assert_eq!(ack.code, Code::new(0, 0));
    assert!(ack.token.is_empty());
    assert!(ack.payload.0.is_empty());
  }
}
