use core::ops::RangeInclusive;

use embedded_time::duration::Milliseconds;
use embedded_time::{Clock, Instant};
use rand::{Rng, SeedableRng};

use crate::time::Millis;

/// A non-blocking timer that governs fixed-delay or exponential-backoff
/// retrying, living alongside the operation being retried.
///
/// It does not _contain_ the work to be done; callers hold the timer next to
/// the thing to resend and ask it what to do on every tick:
///
/// ```
/// use embedded_time::duration::Milliseconds;
/// use embedded_time::Clock;
/// use newt::retry::{Attempts, RetryTimer, Signal, Strategy};
///
/// let clock = newt::std::Clock::new();
/// let now = || clock.try_now().unwrap();
/// let strategy = Strategy::Delay { min: Milliseconds(1),
///                                  max: Milliseconds(1) };
/// let mut retry = RetryTimer::new(now(), strategy, Attempts(2));
///
/// match retry.poll(now()) {
///   | Ok(Signal::Resend) => { /* transmit the stored bytes again */ },
///   | Ok(Signal::GiveUp) => { /* report delivery failure */ },
///   | Err(nb::Error::WouldBlock) => { /* not due yet */ },
///   | Err(_) => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RetryTimer<C: Clock<T = u64>> {
  start: Instant<C>,
  init: Millis,
  strategy: Strategy,
  attempts: Attempts,
  max_attempts: Attempts,
}

/// A number of attempts
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Attempts(pub u16);

/// What [`RetryTimer::poll`] decided should happen now.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Signal {
  /// A retransmission should be performed
  Resend,
  /// Attempts are exhausted; the work being retried is poisoned and should
  /// be reported as a delivery failure
  GiveUp,
}

impl<C: Clock<T = u64>> RetryTimer<C> {
  /// Create a new retry timer.
  ///
  /// The initial delay is drawn uniformly from the strategy's range, seeded
  /// by the start instant, so a fleet of nodes that all lose the same
  /// message does not retry in lockstep.
  pub fn new(start: Instant<C>, strategy: Strategy, max_attempts: Attempts) -> Self {
    Self { start,
           strategy,
           init: if strategy.has_jitter() {
             let ms = crate::time::millis_since(&start, &Instant::new(0)).unwrap_or(0);
             let mut rand = rand_chacha::ChaCha8Rng::seed_from_u64(ms);
             Milliseconds(rand.gen_range(strategy.range()))
           } else {
             Milliseconds(*strategy.range().start())
           },
           max_attempts,
           attempts: Attempts(1) }
  }

  /// Ask the timer whether the work should be retried right now.
  ///
  /// Returns `nb::Error::WouldBlock` when not enough time has passed for the
  /// next attempt.
  pub fn poll(&mut self, now: Instant<C>) -> nb::Result<Signal, core::convert::Infallible> {
    if self.attempts >= self.max_attempts {
      return Ok(Signal::GiveUp);
    }

    let elapsed: Millis = (now - self.start).try_into()
                                            .unwrap_or(Milliseconds(0));

    if self.is_ready(elapsed, self.attempts.0) {
      self.attempts.0 += 1;
      Ok(Signal::Resend)
    } else {
      Err(nb::Error::WouldBlock)
    }
  }

  /// Check if the strategy says an appropriate time has passed for attempt
  /// number `attempts + 1`
  fn is_ready(&self, Milliseconds(time_passed): Millis, attempts: u16) -> bool {
    if attempts == 0 {
      return true;
    }

    match self.strategy {
      | Strategy::Delay { .. } => time_passed >= self.init.0 * attempts as u64,
      | Strategy::Exponential { .. } => time_passed >= Strategy::total_delay_exp(self.init, attempts),
    }
  }
}

/// Strategy to employ when retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Strategy {
  /// Draw a random initial delay between `init_min` and `init_max`, then
  /// double the delay after each failed attempt.
  Exponential {
    /// Minimum (inclusive) delay before the first retransmission
    init_min: Millis,
    /// Maximum (inclusive) delay before the first retransmission
    init_max: Millis,
  },
  /// Draw a random delay between `min` and `max` and wait that long between
  /// every attempt.
  Delay {
    /// Minimum (inclusive) delay between attempts
    min: Millis,
    /// Maximum (inclusive) delay between attempts
    max: Millis,
  },
}

impl Strategy {
  /// Are min & max delays distinct? If not, random number generation is
  /// skipped entirely.
  pub fn has_jitter(&self) -> bool {
    let rng = self.range();
    rng.start() != rng.end()
  }

  /// Get the min & max delays as an inclusive range of milliseconds
  pub fn range(&self) -> RangeInclusive<u64> {
    match self {
      | &Self::Delay { min: Milliseconds(min),
                       max: Milliseconds(max), } => min..=max,
      | &Self::Exponential { init_min: Milliseconds(min),
                             init_max: Milliseconds(max), } => min..=max,
    }
  }

  /// Get the amount of time this strategy will take if all attempts fail
  pub fn max_time(&self, max_attempts: Attempts) -> Millis {
    Milliseconds(match self {
                   | Self::Exponential { init_max, .. } => {
                     Self::total_delay_exp(*init_max, max_attempts.0)
                   },
                   | Self::Delay { max: Milliseconds(max),
                                   .. } => max * max_attempts.0 as u64,
                 })
  }

  /// Given the initial delay and the attempts performed so far, the total
  /// time that must have elapsed before the next retry.
  const fn total_delay_exp(Milliseconds(init): Millis, attempt: u16) -> u64 {
    // | attempt | total delay |
    // | 1       | init        |
    // | 2       | init * 2    |
    // | 3       | init * 4    |
    // | n       | init * 2^(n-1) |
    init * 2u64.pow((attempt - 1) as u32)
  }
}
