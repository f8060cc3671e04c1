use embedded_time::duration::Milliseconds;
use newt_msg::Type;

use crate::retry::{Attempts, Strategy};

/// Configuration options related to outbound CON messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Con {
  /// Retry strategy for CON messages that have not been ACKed.
  ///
  /// Defaults to the RFC 7252 transmission parameters: an exponential
  /// strategy whose first retransmission lands between ACK_TIMEOUT (2 s)
  /// and ACK_TIMEOUT × ACK_RANDOM_FACTOR (3 s), doubling thereafter.
  ///
  /// ```
  /// use embedded_time::duration::Milliseconds;
  /// use newt::config::Con;
  /// use newt::retry::Strategy;
  ///
  /// assert_eq!(Con::default().retry_strategy,
  ///            Strategy::Exponential { init_min: Milliseconds(2_000),
  ///                                    init_max: Milliseconds(3_000) });
  /// ```
  pub retry_strategy: Strategy,

  /// Number of times we are allowed to resend a CON message before
  /// reporting delivery failure.
  ///
  /// Defaults to 4 attempts (MAX_RETRANSMIT).
  ///
  /// ```
  /// use newt::config::Con;
  /// use newt::retry::Attempts;
  ///
  /// assert_eq!(Con::default().max_attempts, Attempts(4));
  /// ```
  pub max_attempts: Attempts,
}

impl Default for Con {
  fn default() -> Self {
    Con { retry_strategy: Strategy::Exponential { init_min: Milliseconds(2_000),
                                                  init_max: Milliseconds(3_000) },
          max_attempts: Attempts(4) }
  }
}

/// Runtime config
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Config {
  /// See [`Con`]
  pub con: Con,

  /// Seed for the runtime's deterministic RNG (message-id starting point,
  /// tokens).
  ///
  /// The default is 0; a fleet of devices should set this to something
  /// distinct per node (serial number, machine id) so their id/token
  /// sequences do not collide.
  pub seed: u16,

  /// Reliability class used for observation notifications.
  ///
  /// Defaults to Non-confirmable; set to [`Type::Con`] to have every
  /// notification acknowledged and retried.
  pub notify_ty: Type,
}

impl Default for Config {
  fn default() -> Self {
    Config { con: Con::default(),
             seed: 0,
             notify_ty: Type::Non }
  }
}

impl Config {
  /// How long a message id stays in the duplicate-detection history.
  ///
  /// The worst-case retransmission span of a peer plus a generous allowance
  /// for network latency; ids older than this can be reused safely.
  pub(crate) fn exchange_lifetime_millis(&self) -> u64 {
    let max_transmit_span = self.con
                                .retry_strategy
                                .max_time(self.con.max_attempts)
                                .0;
    let max_latency = 100_000;
    let processing_delay = 200;

    max_transmit_span + 2 * max_latency + processing_delay
  }
}
