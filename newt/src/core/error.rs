use newt_msg::MessageParseError;

use crate::net::Socket;
use crate::platform::Platform;

/// An error encounterable from within [`Core`](crate::core::Core)
#[derive(Debug)]
pub struct Error<P: Platform> {
  /// The error that occurred
  pub what: What<P>,
  /// What the runtime was doing when it happened
  pub when: When,
}

/// What the runtime was doing when an error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum When {
  /// Receiving & processing inbound datagrams
  Polling,
  /// Transmitting a message
  Sending,
  /// Driving timers (retransmission, registration refresh)
  Ticking,
}

impl When {
  /// Attach the failing operation to an error cause
  pub fn what<P: Platform>(self, what: What<P>) -> Error<P> {
    Error { what, when: self }
  }
}

/// A contextless error cause
#[derive(Debug)]
pub enum What<P: Platform> {
  /// Some socket operation failed
  SockError(<<P as Platform>::Socket as Socket>::Error),

  /// An inbound datagram was not a parseable CoAP message.
  ///
  /// Always recovered by dropping the datagram; surfaced so callers can
  /// count or log it.
  FromBytes(MessageParseError),

  /// The clock failed to provide timing.
  ///
  /// See [`embedded_time::clock::Error`]
  ClockError,
}
