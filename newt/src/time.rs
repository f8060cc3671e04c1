use embedded_time::duration::Milliseconds;
use embedded_time::{Clock, Instant};

/// Milliseconds as an unsigned 64-bit count
pub type Millis = Milliseconds<u64>;

/// Milliseconds elapsed from `earlier` to `now`, `None` when `earlier` is in
/// the future or the difference does not convert cleanly.
pub(crate) fn millis_since<C: Clock<T = u64>>(now: &Instant<C>,
                                              earlier: &Instant<C>)
                                              -> Option<u64> {
  now.checked_duration_since(earlier)
     .and_then(|dur| Millis::try_from(dur).ok())
     .map(|Milliseconds(ms)| ms)
}
