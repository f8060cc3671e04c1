//! Helpers for working with number-keyed option lists before they are
//! delta-encoded into a message.

#[cfg(feature = "alloc")]
use std_alloc::string::String;
#[cfg(feature = "alloc")]
use std_alloc::vec::Vec;

use newt_msg::{Opt, OptDelta, OptNumber, OptValue};

/// Set a non-repeatable option, replacing the value of an existing entry
/// with the same number.
pub(crate) fn set_option_value<V: IntoIterator<Item = u8>>(opts: &mut Vec<(OptNumber, Opt)>,
                                                           number: OptNumber,
                                                           value: V)
                                                           -> () {
  let exist = opts.iter_mut().find(|(num, _)| *num == number);

  match exist {
    | Some((_, opt)) => opt.value = OptValue(value.into_iter().collect()),
    | None => push_option_value(opts, number, value),
  }
}

/// Append an occurrence of a repeatable option (Uri-Path, Uri-Query,
/// Location-Path).
pub(crate) fn push_option_value<V: IntoIterator<Item = u8>>(opts: &mut Vec<(OptNumber, Opt)>,
                                                            number: OptNumber,
                                                            value: V)
                                                            -> () {
  opts.push((number,
             Opt { delta: Default::default(),
                   value: OptValue(value.into_iter().collect()) }));
}

/// Sort an option list by number (stable, so repeated options keep their
/// insertion order) and rewrite each delta as the increment over the
/// previous option, ready for serialization.
pub(crate) fn normalize_opts(mut opts: Vec<(OptNumber, Opt)>) -> Vec<Opt> {
  opts.sort_by_key(|&(OptNumber(num), _)| num);

  let mut previous = 0u32;
  opts.into_iter()
      .map(|(OptNumber(num), mut opt)| {
        opt.delta = OptDelta((num - previous) as u16);
        previous = num;
        opt
      })
      .collect()
}

/// Join repeated path-segment option values with `/`.
///
/// Segments that are not utf8 are rendered lossily rather than dropped.
pub(crate) fn join_path<'a>(segments: impl Iterator<Item = &'a [u8]>) -> String {
  let mut path = String::new();

  for (ix, segment) in segments.enumerate() {
    if ix > 0 {
      path.push('/');
    }
    path.push_str(&String::from_utf8_lossy(segment));
  }

  path
}
