#[cfg(feature = "alloc")]
use std_alloc::vec::Vec;

use super::OptNumber;

/// Uri-Host; the host component of the request target
pub const URI_HOST: OptNumber = OptNumber(3);
/// Observe; subscription registration on requests, notification sequence
/// number on responses
pub const OBSERVE: OptNumber = OptNumber(6);
/// Uri-Port; the port component of the request target
pub const URI_PORT: OptNumber = OptNumber(7);
/// Location-Path; one segment per option of the location a POST created
pub const LOCATION_PATH: OptNumber = OptNumber(8);
/// Uri-Path; one segment per option of the request path
pub const URI_PATH: OptNumber = OptNumber(11);
/// Content-Format; numeric media type of the payload
pub const CONTENT_FORMAT: OptNumber = OptNumber(12);
/// Max-Age; response caching lifetime in seconds
pub const MAX_AGE: OptNumber = OptNumber(14);
/// Uri-Query; one `key=value` argument per option
pub const URI_QUERY: OptNumber = OptNumber(15);

/// Content formats this stack speaks, by their registered numbers.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum ContentFormat {
  /// `text/plain; charset=utf-8` (0)
  Text,
  /// `application/link-format` (40)
  LinkFormat,
  /// `application/octet-stream` (42)
  OctetStream,
  /// `application/json` (50)
  Json,
  /// A format this stack has no special knowledge of
  Other(u16),
}

impl ContentFormat {
  /// The registered numeric value for this format
  pub fn number(&self) -> u16 {
    use ContentFormat::*;
    match *self {
      | Text => 0,
      | LinkFormat => 40,
      | OctetStream => 42,
      | Json => 50,
      | Other(n) => n,
    }
  }

  /// Option value bytes for this format (uint, minimal width)
  pub fn value_bytes(&self) -> Vec<u8> {
    uint_to_bytes(self.number() as u32)
  }
}

impl From<u16> for ContentFormat {
  fn from(n: u16) -> Self {
    use ContentFormat::*;
    match n {
      | 0 => Text,
      | 40 => LinkFormat,
      | 42 => OctetStream,
      | 50 => Json,
      | n => Other(n),
    }
  }
}

/// Encode a CoAP `uint` option value: big-endian with leading zero bytes
/// removed, zero encoding as the empty string.
pub fn uint_to_bytes(n: u32) -> Vec<u8> {
  n.to_be_bytes()
   .into_iter()
   .skip_while(|b| *b == 0)
   .collect()
}

/// Decode a CoAP `uint` option value of up to 4 bytes.
///
/// Longer values yield `None` rather than silently truncating.
pub fn uint_from_bytes(bytes: &[u8]) -> Option<u32> {
  if bytes.len() > 4 {
    return None;
  }

  Some(bytes.iter().fold(0u32, |n, b| (n << 8) | *b as u32))
}

/// The Observe option is a 24-bit sequence number; notifications wrap their
/// counter at this bound.
pub const OBSERVE_SEQ_MODULUS: u32 = 1 << 24;
