use newt_msg::opt::known::OBSERVE_SEQ_MODULUS;
use newt_msg::Token;
use no_std_net::SocketAddr;

/// The peer currently subscribed to a resource's notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observer {
  /// Token every notification must echo so the subscriber can correlate it
  /// with its original GET
  pub token: Token,
  /// Where notifications are sent
  pub addr: SocketAddr,
}

/// Per-resource observation bookkeeping: a single observer slot and the
/// notification sequence counter.
///
/// A GET carrying a token replaces whatever observer was registered before;
/// this stack deliberately keeps one subscriber per resource.
#[derive(Debug, Default)]
#[allow(missing_copy_implementations)]
pub struct ObserveState {
  observer: Option<Observer>,
  seq: u32,
}

impl ObserveState {
  /// Install (or refresh) the observer, returning the sequence number to
  /// put on the subscription response.
  pub(crate) fn subscribe(&mut self, token: Token, addr: SocketAddr) -> u32 {
    if let Some(prev) = self.observer.replace(Observer { token, addr }) {
      if prev.addr != addr || prev.token != token {
        log::trace!("observer {} replaced by {}", prev.addr, addr);
      }
    }

    self.next_seq()
  }

  /// The current observer, if any
  pub(crate) fn observer(&self) -> Option<&Observer> {
    self.observer.as_ref()
  }

  /// Yield the current sequence number and advance the counter.
  ///
  /// Observe option values are 24 bits wide, so the counter wraps there;
  /// consecutive notifications are strictly increasing modulo that bound.
  pub(crate) fn next_seq(&mut self) -> u32 {
    let seq = self.seq;
    self.seq = (self.seq + 1) % OBSERVE_SEQ_MODULUS;
    seq
  }
}
