use std::io;
use std::net::UdpSocket;

use embedded_time::rate::Fraction;

use crate::net::{Addrd, Socket};

/// Implement [`embedded_time::Clock`] using [`std::time`] primitives
#[derive(Debug, Clone, Copy)]
pub struct Clock(std::time::Instant);

impl Default for Clock {
  fn default() -> Self {
    Self::new()
  }
}

impl Clock {
  /// Create a new clock, anchored at "now"
  pub fn new() -> Self {
    Self(std::time::Instant::now())
  }
}

impl embedded_time::Clock for Clock {
  type T = u64;

  // nanoseconds
  const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000_000);

  fn try_now(&self) -> Result<embedded_time::Instant<Self>, embedded_time::clock::Error> {
    let elapsed = std::time::Instant::now().duration_since(self.0);
    Ok(embedded_time::Instant::new(elapsed.as_nanos() as u64))
  }
}

impl Socket for UdpSocket {
  type Error = io::Error;

  fn send(&self, msg: Addrd<&[u8]>) -> nb::Result<(), Self::Error> {
    self.send_to(msg.data(), std_addr(msg.addr()))
        .map(|_| ())
        .map_err(io_to_nb)
  }

  fn recv(&self, buffer: &mut [u8]) -> nb::Result<Addrd<usize>, Self::Error> {
    self.recv_from(buffer)
        .map(|(n, addr)| Addrd(n, no_std_addr(addr)))
        .map_err(io_to_nb)
  }
}

fn io_to_nb(err: io::Error) -> nb::Error<io::Error> {
  match err.kind() {
    | io::ErrorKind::WouldBlock => nb::Error::WouldBlock,
    | _ => nb::Error::Other(err),
  }
}

fn std_addr(addr: no_std_net::SocketAddr) -> std::net::SocketAddr {
  match addr {
    | no_std_net::SocketAddr::V4(sock) => {
      let [a, b, c, d] = sock.ip().octets();
      let ip = std::net::Ipv4Addr::new(a, b, c, d);
      std::net::SocketAddr::V4(std::net::SocketAddrV4::new(ip, sock.port()))
    },
    | no_std_net::SocketAddr::V6(sock) => {
      let [a, b, c, d, e, f, g, h] = sock.ip().segments();
      let ip = std::net::Ipv6Addr::new(a, b, c, d, e, f, g, h);
      std::net::SocketAddr::V6(std::net::SocketAddrV6::new(ip,
                                                           sock.port(),
                                                           sock.flowinfo(),
                                                           sock.scope_id()))
    },
  }
}

fn no_std_addr(addr: std::net::SocketAddr) -> no_std_net::SocketAddr {
  match addr {
    | std::net::SocketAddr::V4(sock) => {
      let [a, b, c, d] = sock.ip().octets();
      let ip = no_std_net::Ipv4Addr::new(a, b, c, d);
      no_std_net::SocketAddr::V4(no_std_net::SocketAddrV4::new(ip, sock.port()))
    },
    | std::net::SocketAddr::V6(sock) => {
      let [a, b, c, d, e, f, g, h] = sock.ip().segments();
      let ip = no_std_net::Ipv6Addr::new(a, b, c, d, e, f, g, h);
      no_std_net::SocketAddr::V6(no_std_net::SocketAddrV6::new(ip,
                                                               sock.port(),
                                                               sock.flowinfo(),
                                                               sock.scope_id()))
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn addr_round_trip() {
    let addr: no_std_net::SocketAddr = "127.0.0.1:5683".parse().unwrap();
    assert_eq!(no_std_addr(std_addr(addr)), addr);
  }
}
