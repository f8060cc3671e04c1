//! Low-level representation of CoAP messages.
//!
//! The most notable item in `newt_msg` is [`Message`]: a CoAP message very
//! close to the actual byte layout, with the option sequence stored
//! delta-encoded in wire order.
//!
//! Parsing ([`TryFromBytes`]) and serialization (`Vec::<u8>::from` /
//! [`Message::extend_bytes`]) are pure functions of the message: no state,
//! no I/O, deterministic output. Malformed input is rejected with a
//! [`MessageParseError`] naming the first violated rule; parsing never
//! panics and never reads out of bounds.
//!
//! What parsing does *not* do is judge application-level option semantics
//! (whether an option number is legal for a message code, whether a critical
//! option is supported) — that belongs to whoever dispatches the message.

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(not(test), forbid(missing_debug_implementations, unreachable_pub))]
#![cfg_attr(not(test), deny(unsafe_code, missing_copy_implementations))]
#![deny(missing_docs)]

#[cfg(feature = "alloc")]
extern crate alloc as std_alloc;

pub(crate) mod cursor;

#[doc(hidden)]
pub mod from_bytes;

/// Message structs
pub mod msg;

#[doc(hidden)]
pub mod to_bytes;

#[doc(inline)]
pub use from_bytes::TryFromBytes;
#[doc(inline)]
pub use msg::*;

#[cfg(test)]
pub(crate) fn test_msg() -> (Message, Vec<u8>) {
  let header: [u8; 4] = 0b0100_0001_0100_0101_0000_0000_0000_0001_u32.to_be_bytes();
  let token: [u8; 1] = [254u8];
  let content_format: &[u8] = b"application/json";
  let options: [&[u8]; 2] = [&[0b_1100_1101u8, 0b0000_0011u8], content_format];
  let payload: [&[u8]; 2] = [&[0b1111_1111u8], b"hello, world!"];
  let bytes = [header.as_ref(),
               token.as_ref(),
               options.concat().as_ref(),
               payload.concat().as_ref()].concat();

  let msg = Message { id: Id(1),
                      ty: Type::Con,
                      ver: Version(1),
                      token: Token(tinyvec::array_vec!([u8; 8] => 254)),
                      opts: vec![Opt { delta: OptDelta(12),
                                       value: OptValue(content_format.to_vec()) }],
                      code: Code { class: 2,
                                   detail: 5 },
                      payload: Payload(b"hello, world!".to_vec()) };
  (msg, bytes)
}
