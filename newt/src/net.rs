use no_std_net::SocketAddr;
use tinyvec::ArrayVec;

/// Data that came from (or is headed to) a network socket
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Addrd<T>(pub T, pub SocketAddr);

impl<T> Addrd<T> {
  /// Borrow the contents of this Addrd
  pub fn as_ref(&self) -> Addrd<&T> {
    Addrd(self.data(), self.addr())
  }

  /// Discard the address and get the data in this Addrd
  pub fn unwrap(self) -> T {
    self.0
  }

  /// Map the data contained in this Addrd
  pub fn map<R>(self, f: impl FnOnce(T) -> R) -> Addrd<R> {
    Addrd(f(self.0), self.1)
  }

  /// Map the data contained in this Addrd (with a copy of the address)
  pub fn map_with_addr<R>(self, f: impl FnOnce(T, SocketAddr) -> R) -> Addrd<R> {
    Addrd(f(self.0, self.1), self.1)
  }

  /// Borrow the contents of the addressed item
  pub fn data(&self) -> &T {
    &self.0
  }

  /// Copy the address for the data
  pub fn addr(&self) -> SocketAddr {
    self.1
  }
}

/// A packet received over a socket.
///
/// Capacity is hard-coded at 1152 bytes, the maximum CoAP message size
/// recommended for avoiding IP fragmentation.
pub type Dgram = ArrayVec<[u8; 1152]>;

/// A CoAP network socket
///
/// This is the transport collaborator injected into the runtime; the core
/// never blocks on it. Implementations must be datagram-oriented and
/// addressable per send (there is no connect step), and should yield
/// `nb::Error::WouldBlock` from [`Socket::recv`] when nothing is queued.
pub trait Socket {
  /// The error yielded by socket operations
  type Error: core::fmt::Debug;

  /// Send a message to a remote address
  fn send(&self, msg: Addrd<&[u8]>) -> nb::Result<(), Self::Error>;

  /// Pull a buffered datagram from the socket, along with the sender address.
  fn recv(&self, buffer: &mut [u8]) -> nb::Result<Addrd<usize>, Self::Error>;

  /// Poll the socket for one complete datagram, `None` when nothing is ready.
  fn poll(&self) -> Result<Option<Addrd<Dgram>>, Self::Error> {
    let mut buf = [0u8; 1152];

    match self.recv(&mut buf) {
      | Ok(Addrd(n, addr)) => Ok(Some(Addrd(buf.into_iter().take(n).collect(), addr))),
      | Err(nb::Error::WouldBlock) => Ok(None),
      | Err(nb::Error::Other(e)) => Err(e),
    }
  }
}
