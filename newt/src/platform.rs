use core::marker::PhantomData;

use embedded_time::Clock;

use crate::net::Socket;
use crate::retry::RetryTimer;

/// The two capabilities the runtime cannot provide for itself: a source of
/// time and a datagram transport.
///
/// Every `newt` structure is generic over one of these, so the same node
/// code runs against `std` networking, an embedded NIC driver, or the test
/// mocks.
pub trait Platform: Sized + 'static {
  /// What should we use to keep track of time?
  type Clock: Clock<T = u64>;

  /// What should we use for networking?
  type Socket: Socket;
}

/// [`Platform`] implementation plugging arbitrary clock and socket types
/// together.
///
/// ```
/// use newt::platform::Alloc;
/// use newt::std::Clock;
///
/// type Mine = Alloc<Clock, std::net::UdpSocket>;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Alloc<Clk, Sock>(PhantomData<(Clk, Sock)>)
  where Clk: Clock<T = u64> + 'static,
        Sock: Socket + 'static;

impl<Clk: Clock<T = u64> + 'static, Sock: Socket + 'static> Platform for Alloc<Clk, Sock> {
  type Clock = Clk;
  type Socket = Sock;
}

/// Uses [`crate::std::Clock`] for timing and `UdpSocket` for networking
#[cfg(feature = "std")]
pub type Std = Alloc<crate::std::Clock, std::net::UdpSocket>;

/// Something to attempt repeatedly, paired with the timer governing when
/// the next attempt is due.
pub struct Retryable<P: Platform, T>(pub T, pub RetryTimer<P::Clock>);

impl<P: Platform, T: core::fmt::Debug> core::fmt::Debug for Retryable<P, T>
  where RetryTimer<P::Clock>: core::fmt::Debug
{
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_tuple("Retryable").field(&self.0).field(&self.1).finish()
  }
}

impl<P: Platform, T> Retryable<P, T> {
  /// Get the thing to be retried
  pub fn unwrap(self) -> T {
    self.0
  }
}
