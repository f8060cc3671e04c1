#[cfg(feature = "alloc")]
use std_alloc::vec::Vec;

use tinyvec::ArrayVec;

use crate::*;

/// Encode an option-header nibble (delta or length): values below 13 fit in
/// the nibble, 13..269 spill one extension byte, 269.. spill two.
pub(crate) fn opt_len_or_delta(val: u16) -> (u8, Option<ArrayVec<[u8; 2]>>) {
  match val {
    | n if n >= 269 => {
      let mut bytes = ArrayVec::new();
      bytes.extend((n - 269).to_be_bytes());
      (14, Some(bytes))
    },
    | n if n >= 13 => {
      let mut bytes = ArrayVec::new();
      bytes.push((n as u8) - 13);
      (13, Some(bytes))
    },
    | n => (n as u8, None),
  }
}

impl Message {
  /// Number of bytes this message occupies on the wire
  pub fn wire_size(&self) -> usize {
    let header_size = 4;
    let payload_marker_size = if self.payload.0.is_empty() { 0 } else { 1 };
    let opts_size: usize = self.opts.iter().map(|o| o.wire_size()).sum();

    header_size + self.token.0.len() + opts_size + payload_marker_size + self.payload.0.len()
  }

  /// Append this message's wire bytes to a collection.
  ///
  /// The caller must have already delta-encoded the options in
  /// non-decreasing-number order (see
  /// [`EnumerateOptNumbers`]); serialization writes
  /// them verbatim and is deterministic.
  pub fn extend_bytes(self, bytes: &mut impl Extend<u8>) {
    let byte1: u8 = Byte1 { tkl: self.token.0.len() as u8,
                            ver: self.ver,
                            ty: self.ty }.into();
    let code: u8 = self.code.into();
    let id: [u8; 2] = self.id.into();

    bytes.extend(core::iter::once(byte1));
    bytes.extend(core::iter::once(code));
    bytes.extend(id);
    bytes.extend(self.token.0);

    for opt in self.opts {
      opt.extend_bytes(bytes);
    }

    if !self.payload.0.is_empty() {
      bytes.extend(core::iter::once(0b1111_1111));
      bytes.extend(self.payload.0);
    }
  }
}

impl From<Message> for Vec<u8> {
  fn from(msg: Message) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(msg.wire_size());
    msg.extend_bytes(&mut bytes);
    bytes
  }
}
