#[cfg(feature = "alloc")]
use std_alloc::vec::Vec;

use embedded_time::{Clock, Instant};
use newt_msg::{CodeKind, Id, Message, Token, TryFromBytes, Type};
use rand::{Rng, SeedableRng};

mod error;
#[doc(inline)]
pub use error::*;

use crate::config::Config;
use crate::net::{Addrd, Socket};
use crate::platform::{Platform, Retryable};
use crate::retry::{RetryTimer, Signal};
use crate::time::millis_since;

/// A Confirmable message awaiting acknowledgement.
///
/// Owns its serialized bytes: retransmission replays exactly what was first
/// put on the wire, regardless of what the caller does with the original
/// message afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Outstanding {
  /// Message id the peer's Ack/Reset will carry
  pub id: Id,
  /// Token correlating this exchange for the operation that started it
  pub token: Token,
  /// The serialized message, replayed verbatim on each retry
  pub bytes: Vec<u8>,
}

/// A recently seen inbound Confirmable message id, with the reply we sent.
///
/// A retransmission of the same id from the same peer is answered by
/// replaying `reply` instead of dispatching again.
struct Seen<P: Platform> {
  id: Addrd<Id>,
  at: Instant<P::Clock>,
  reply: Option<Vec<u8>>,
}

/// The protocol engine: reliable delivery, duplicate suppression and
/// id/token allocation over an injected socket and clock.
///
/// Two entry points drive it: [`Core::poll`] for each inbound datagram and
/// [`Core::tick`] at a regular cadence for retransmission. Both take
/// `&mut self` — one writer at a time, serialized by the embedding
/// application — and nothing in here blocks on the network.
#[allow(missing_debug_implementations)]
pub struct Core<P: Platform> {
  pub(crate) sock: P::Socket,
  pub(crate) clock: P::Clock,
  pub(crate) config: Config,
  rand: rand_chacha::ChaCha8Rng,
  /// Next message id candidate; ids still pending in `retry_q` are skipped.
  id_cursor: u16,
  /// Confirmable messages we sent and have not seen acknowledged
  retry_q: Vec<Retryable<P, Addrd<Outstanding>>>,
  /// Recently seen inbound CON ids (duplicate detection)
  seen: Vec<Seen<P>>,
}

impl<P: Platform> Core<P> {
  /// Create a new Core
  pub fn new(config: Config, clock: P::Clock, sock: P::Socket) -> Self {
    let mut rand = rand_chacha::ChaCha8Rng::seed_from_u64(config.seed as u64);
    let id_cursor = rand.gen::<u16>();

    Self { sock,
           clock,
           config,
           rand,
           id_cursor,
           retry_q: Default::default(),
           seen: Default::default() }
  }

  pub(crate) fn now(&self, when: When) -> Result<Instant<P::Clock>, Error<P>> {
    self.clock.try_now().map_err(|_| when.what(What::ClockError))
  }

  /// Allocate a fresh message id.
  ///
  /// Ids of messages still awaiting acknowledgement are skipped so an
  /// in-flight exchange is never aliased.
  pub fn next_id(&mut self) -> Id {
    loop {
      let id = Id(self.id_cursor);
      self.id_cursor = self.id_cursor.wrapping_add(1);

      let pending = self.retry_q
                        .iter()
                        .any(|Retryable(out, _)| out.data().id == id);
      if !pending {
        return id;
      }
    }
  }

  /// Allocate a fresh 8-byte token
  pub fn next_token(&mut self) -> Token {
    let mut bytes = [0u8; 8];
    self.rand.fill(&mut bytes);
    Token::from(&bytes[..])
  }

  fn retryable<T>(&self, when: When, t: T) -> Result<Retryable<P, T>, Error<P>> {
    self.now(when).map(|now| {
                    RetryTimer::new(now,
                                    self.config.con.retry_strategy,
                                    self.config.con.max_attempts)
                  })
                  .map(|timer| Retryable(t, timer))
  }

  /// Serialize & transmit a message.
  ///
  /// Confirmable messages are additionally copied into the retransmission
  /// queue, where they stay until [`Core::poll`] sees a matching Ack/Reset,
  /// [`Core::cancel`] removes them, or their attempts run out and
  /// [`Core::tick`] reports them. Everything else is fire-and-forget.
  pub fn send_msg(&mut self, msg: Addrd<Message>) -> Result<(), Error<P>> {
    let when = When::Sending;
    let (id, token, ty, addr) = (msg.data().id, msg.data().token, msg.data().ty, msg.addr());
    let bytes: Vec<u8> = msg.unwrap().into();

    if ty == Type::Con {
      let entry = Addrd(Outstanding { id,
                                      token,
                                      bytes: bytes.clone() },
                        addr);
      let entry = self.retryable(when, entry)?;
      self.retry_q.push(entry);
    }

    Self::send(when, &self.sock, addr, &bytes)
  }

  fn send(when: When,
          sock: &P::Socket,
          addr: no_std_net::SocketAddr,
          bytes: &[u8])
          -> Result<(), Error<P>> {
    nb::block!(sock.send(Addrd(bytes, addr))).map_err(|err| when.what(What::SockError(err)))?;
    log::trace!("sent {}b -> {}", bytes.len(), addr);
    Ok(())
  }

  /// Receive, parse and pre-filter one inbound datagram.
  ///
  /// Returns `WouldBlock` both when the socket has nothing ready and when
  /// the datagram was consumed internally:
  /// - Ack/Reset complete (or reject) a pending exchange and go no further;
  /// - a duplicate Confirmable is answered by replaying the stored reply
  ///   without re-dispatching.
  ///
  /// Anything that comes back `Ok` is new work for the dispatcher.
  pub fn poll(&mut self) -> nb::Result<Addrd<Message>, Error<P>> {
    let when = When::Polling;

    let dgram = self.sock
                    .poll()
                    .map_err(|e| nb::Error::Other(when.what(What::SockError(e))))?;
    let dgram = dgram.ok_or(nb::Error::WouldBlock)?;

    log::trace!("recvd {}b <- {}", dgram.data().len(), dgram.addr());

    let addr = dgram.addr();
    let msg = Message::try_from_bytes(dgram.data()).map_err(|e| {
                                                     nb::Error::Other(when.what(What::FromBytes(e)))
                                                   })?;
    let msg = Addrd(msg, addr);

    match msg.data().ty {
      | Type::Ack | Type::Reset => {
        self.process_ack(&msg);

        // an Ack may be empty (transport signalling only) or carry a
        // piggybacked response that still needs dispatching
        if msg.data().code.kind() == CodeKind::Response {
          Ok(msg)
        } else {
          Err(nb::Error::WouldBlock)
        }
      },
      | Type::Con => {
        let now = self.now(when).map_err(nb::Error::Other)?;

        if let Some(seen) = self.seen
                                .iter()
                                .find(|s| s.id.data() == &msg.data().id && s.id.addr() == addr)
        {
          log::trace!("duplicate CON id {:?} <- {}", msg.data().id, addr);
          if let Some(reply) = seen.reply.as_ref() {
            Self::send(when, &self.sock, addr, reply).map_err(nb::Error::Other)?;
          }
          Err(nb::Error::WouldBlock)
        } else {
          self.seen.push(Seen { id: Addrd(msg.data().id, addr),
                                at: now,
                                reply: None });
          Ok(msg)
        }
      },
      | Type::Non => Ok(msg),
    }
  }

  /// Record the serialized reply to an inbound Confirmable, for replay if
  /// the peer retransmits it.
  pub fn store_reply(&mut self, req_id: Addrd<Id>, bytes: &[u8]) {
    if let Some(seen) = self.seen
                            .iter_mut()
                            .find(|s| s.id.data() == req_id.data() && s.id.addr() == req_id.addr())
    {
      seen.reply = Some(bytes.to_vec());
    }
  }

  /// Remove a pending Confirmable message by its id & origin.
  fn process_ack(&mut self, msg: &Addrd<Message>) {
    let (id, addr) = (msg.data().id, msg.addr());

    let ix = self.retry_q
                 .iter()
                 .enumerate()
                 .find(|(_, Retryable(out, _))| out.data().id == id && out.addr() == addr)
                 .map(|(ix, _)| ix);

    match ix {
      | Some(ix) => {
        self.retry_q.remove(ix);
        log::trace!("{:?} was acked", id);
      },
      | None => log::trace!("{:?} acked but not pending, ignoring", id),
    }
  }

  /// Cancel every pending Confirmable exchange carrying `token`, returning
  /// how many entries were dropped.
  pub fn cancel(&mut self, token: Token) -> usize {
    let before = self.retry_q.len();
    self.retry_q.retain(|Retryable(out, _)| out.data().token != token);
    before - self.retry_q.len()
  }

  /// Drive retransmission: resend every entry whose backoff has elapsed,
  /// and remove & return the entries whose attempts are exhausted so the
  /// operation that sent them can react.
  ///
  /// Also expires duplicate-history entries older than the exchange
  /// lifetime, freeing their ids for reuse by peers.
  pub fn tick(&mut self, now: Instant<P::Clock>) -> Result<Vec<Addrd<Outstanding>>, Error<P>> {
    let when = When::Ticking;
    let mut expired = Vec::new();

    let mut ix = 0;
    while ix < self.retry_q.len() {
      match self.retry_q[ix].1.poll(now) {
        | Ok(Signal::Resend) => {
          let Retryable(out, _) = &self.retry_q[ix];
          log::trace!("resending {:?} -> {}", out.data().id, out.addr());
          Self::send(when, &self.sock, out.addr(), &out.data().bytes)?;
          ix += 1;
        },
        | Ok(Signal::GiveUp) => {
          let entry = self.retry_q.remove(ix);
          log::warn!("{:?} -> {} never acked, giving up",
                     entry.0.data().id,
                     entry.0.addr());
          expired.push(entry.unwrap());
        },
        | Err(nb::Error::WouldBlock) => ix += 1,
        | Err(_) => unreachable!(),
      }
    }

    let lifetime = self.config.exchange_lifetime_millis();
    self.seen.retain(|s| {
               millis_since(&now, &s.at).map(|ms| ms < lifetime)
                                        .unwrap_or(true)
             });

    Ok(expired)
  }

  /// How many Confirmable messages are currently awaiting acknowledgement
  pub fn pending(&self) -> usize {
    self.retry_q.len()
  }
}
