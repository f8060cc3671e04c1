#[cfg(feature = "alloc")]
use std_alloc::vec::Vec;

use newt_msg::opt::known;
use newt_msg::{CodeKind, Id, Message, Payload, Type};
use no_std_net::SocketAddr;

/// Observation bookkeeping
pub mod observe;
/// NSP registration
pub mod register;
/// Resource descriptors
pub mod resource;

#[doc(inline)]
pub use register::EndpointParams;
#[doc(inline)]
pub use resource::{Handler, Resource};

use crate::config::Config;
use crate::core::{Core, Error, What, When};
use crate::net::Addrd;
use crate::platform::Platform;
use crate::req::{Method, Req};
use crate::resp::{code, Resp};
use register::Registration;

/// A CoAP device node: the protocol engine plus a resource directory,
/// NSP registration and per-resource observation state.
///
/// All mutable protocol state lives here and is reached through `&mut self`
/// — there are no process-wide singletons. The embedding application owns
/// the loop:
///
/// - call [`Node::poll`] whenever the transport may have delivered
///   datagrams (or simply on every iteration);
/// - call [`Node::tick`] at a regular cadence (1 s in the reference
///   deployment) to drive retransmission and registration refresh;
/// - call [`Node::notify`] when an observable resource's value changes.
#[allow(missing_debug_implementations)]
pub struct Node<P: Platform> {
  core: Core<P>,
  resources: Vec<Resource>,
  reg: Registration<P::Clock>,
  nsp: Option<SocketAddr>,
}

impl<P: Platform> Node<P> {
  /// Create a new node
  pub fn new(config: Config, clock: P::Clock, sock: P::Socket) -> Self {
    Self { core: Core::new(config, clock, sock),
           resources: Default::default(),
           reg: Default::default(),
           nsp: None }
  }

  /// Set the address of the network service provider this node registers
  /// itself with
  pub fn nsp(&mut self, addr: SocketAddr) -> () {
    self.nsp = Some(addr);
  }

  /// Set the endpoint parameters advertised to the NSP.
  ///
  /// Registration itself happens on the next [`Node::tick`] (and is
  /// re-attempted there after any failure).
  pub fn endpoint(&mut self, params: EndpointParams) -> () {
    self.reg.configure(params);
  }

  /// Add `res` to the resource directory.
  ///
  /// Paths are unique; registering an existing path replaces the previous
  /// descriptor (last write wins).
  pub fn resource(&mut self, res: Resource) -> () {
    match self.resources.iter().position(|r| r.path() == res.path()) {
      | Some(ix) => self.resources[ix] = res,
      | None => self.resources.push(res),
    }
  }

  /// The location path assigned by the NSP, when registered
  pub fn registration_location(&self) -> Option<&str> {
    self.reg.location()
  }

  /// Drain and dispatch every inbound datagram the transport has buffered.
  ///
  /// Malformed datagrams are logged and dropped (never fatal); socket and
  /// clock failures surface as errors.
  pub fn poll(&mut self) -> Result<(), Error<P>> {
    loop {
      match self.core.poll() {
        | Ok(msg) => self.route(msg)?,
        | Err(nb::Error::WouldBlock) => return Ok(()),
        | Err(nb::Error::Other(Error { what: What::FromBytes(err), .. })) => {
          log::warn!("dropping malformed datagram: {:?}", err);
        },
        | Err(nb::Error::Other(err)) => return Err(err),
      }
    }
  }

  /// Drive timers: retransmit & expire pending confirmables, prune the
  /// duplicate history, and (re)register with the NSP when due.
  ///
  /// Call at a regular cadence; the reference deployment ticks every
  /// second.
  pub fn tick(&mut self) -> Result<(), Error<P>> {
    let now = self.core.now(When::Ticking)?;

    for entry in self.core.tick(now)? {
      if self.reg.delivery_failed(entry.data().token) {
        log::warn!("registration never acknowledged; retrying on a later tick");
      }
    }

    if self.reg.due(&now) {
      self.register()?;
    }

    Ok(())
  }

  /// Build & reliably send the registration request: a Confirmable POST to
  /// the NSP's `rd` path carrying endpoint name, type and lifetime as query
  /// arguments and the link-format resource directory as payload.
  pub fn register(&mut self) -> Result<(), Error<P>> {
    let Some(nsp) = self.nsp else {
      log::warn!("no NSP address configured, cannot register");
      return Ok(());
    };
    let Some(endpoint) = self.reg.endpoint.clone() else {
      log::warn!("no endpoint parameters configured, cannot register");
      return Ok(());
    };

    let mut req = Req::post("rd");
    req.push_option(known::URI_QUERY,
                    b"ep=".iter().copied().chain(endpoint.name.bytes()));
    req.push_option(known::URI_QUERY,
                    b"et=".iter().copied().chain(endpoint.kind.bytes()));
    req.push_option(known::URI_QUERY,
                    b"lt=".iter()
                          .copied()
                          .chain(u32_to_decimal(endpoint.lifetime_secs)));
    req.set_option(known::CONTENT_FORMAT,
                   known::ContentFormat::LinkFormat.value_bytes());
    req.set_payload(resource::link_format(&self.resources).bytes());

    req.msg.id = self.core.next_id();
    req.msg.token = self.core.next_token();

    self.reg.begin(req.msg.token);
    log::info!("registering endpoint {} with NSP {}", endpoint.name, nsp);
    self.core.send_msg(Addrd(Message::from(req), nsp))
  }

  /// Best-effort de-registration: DELETE the assigned location (still via
  /// the reliable path) and cancel any registration exchange in flight.
  pub fn deregister(&mut self) -> Result<(), Error<P>> {
    let (location, pending) = self.reg.take();

    if let Some(token) = pending {
      self.core.cancel(token);
    }

    let (Some(location), Some(nsp)) = (location, self.nsp) else {
      return Ok(());
    };

    let mut req = Req::delete(&location);
    req.msg.id = self.core.next_id();
    req.msg.token = self.core.next_token();

    log::info!("de-registering /{}", location);
    self.core.send_msg(Addrd(Message::from(req), nsp))
  }

  /// Push a notification carrying `payload` to the observer of the
  /// resource at `path`, if it is observable and anyone has subscribed.
  ///
  /// The notification echoes the observer's token and carries the next
  /// Observe sequence number; its reliability class is
  /// [`Config::notify_ty`].
  ///
  /// Returns the notification's message id, `None` when there was nothing
  /// to notify.
  pub fn notify(&mut self, path: &str, payload: impl IntoIterator<Item = u8>) -> Result<Option<Id>, Error<P>> {
    let Some(res) = self.resources
                        .iter_mut()
                        .find(|r| r.path() == path && r.observable)
    else {
      return Ok(None);
    };

    let Some(observer) = res.observe.observer().copied() else {
      return Ok(None);
    };

    let seq = res.observe.next_seq();

    let obs_opt = newt_msg::Opt { delta: Default::default(),
                                  value: newt_msg::OptValue(known::uint_to_bytes(seq)) };
    let opts = crate::option::normalize_opts(Vec::from([(known::OBSERVE, obs_opt)]));

    let msg = Message { ty: self.core.config.notify_ty,
                        id: self.core.next_id(),
                        ver: Default::default(),
                        token: observer.token,
                        code: code::CONTENT,
                        opts,
                        payload: Payload(payload.into_iter().collect()) };
    let id = msg.id;

    log::trace!("notifying {} of {} (seq {})", observer.addr, path, seq);
    self.core
        .send_msg(Addrd(msg, observer.addr))
        .map(|()| Some(id))
  }

  fn route(&mut self, msg: Addrd<Message>) -> Result<(), Error<P>> {
    match msg.data().code.kind() {
      | CodeKind::Empty if msg.data().ty == Type::Con => {
        // CoAP ping; answer with Reset to show liveness
        let rst = msg.data().reset();
        self.core.send_msg(Addrd(rst, msg.addr()))
      },
      | CodeKind::Empty => Ok(()),
      | CodeKind::Request => self.dispatch(msg.map(Req::from)),
      | CodeKind::Response => {
        let resp = msg.map(Resp::from);
        let now = self.core.now(When::Polling)?;

        if !self.reg.on_response(resp.data(), now) {
          log::trace!("response from {} matches no pending exchange, dropping",
                      resp.addr());
        }
        Ok(())
      },
    }
  }

  /// Route a request to the resource whose path exactly equals the request
  /// path — no prefix or wildcard matching — and send back whatever it
  /// (or 4.04) produces.
  fn dispatch(&mut self, req: Addrd<Req>) -> Result<(), Error<P>> {
    let path = req.data().path();
    log::trace!("{} /{} <- {}", req.data().method(), path, req.addr());

    let resp = match self.resources.iter().position(|r| r.path() == path) {
      | None => {
        let mut resp = Resp::for_request(req.data());
        resp.set_code(code::NOT_FOUND);
        resp
      },
      | Some(ix) => {
        let res = &mut self.resources[ix];
        let mut resp = res.serve(&req);

        // a GET on an observable resource that carries a token subscribes
        // the sender
        if res.observable
           && req.data().method() == Method::GET
           && !req.data().msg_token().is_empty()
           && resp.code().class == 2
        {
          let seq = res.observe.subscribe(req.data().msg_token(), req.addr());
          resp.set_option(known::OBSERVE, known::uint_to_bytes(seq));
        }

        resp
      },
    };

    self.reply(&req, resp)
  }

  fn reply(&mut self, req: &Addrd<Req>, mut resp: Resp) -> Result<(), Error<P>> {
    // piggybacked acks reuse the request id; separate responses get a
    // fresh one
    if resp.msg_type() != Type::Ack {
      resp.msg.id = self.core.next_id();
    }

    let msg = Message::from(resp);
    let bytes: Vec<u8> = msg.clone().into();

    // kept for replay if the peer retransmits the request
    self.core
        .store_reply(Addrd(req.data().msg_id(), req.addr()), &bytes);
    self.core.send_msg(Addrd(msg, req.addr()))
  }
}

fn u32_to_decimal(mut n: u32) -> impl Iterator<Item = u8> {
  let mut digits = tinyvec::ArrayVec::<[u8; 10]>::default();

  loop {
    digits.insert(0, b'0' + (n % 10) as u8);
    n /= 10;
    if n == 0 {
      break;
    }
  }

  digits.into_iter()
}

#[cfg(test)]
mod tests {
  use embedded_time::duration::Milliseconds;
  use newt_msg::opt::known::{self, uint_from_bytes};
  use newt_msg::{EnumerateOptNumbers, Token, TryFromBytes};

  use super::*;
  use crate::config::Con;
  use crate::platform::Alloc;
  use crate::retry::{Attempts, Strategy};
  use crate::test::{nsp_addr, test_addr, ClockMock, SockMock};

  type P = Alloc<ClockMock, SockMock>;

  fn no_jitter_config(max_attempts: u16) -> Config {
    Config { con: Con { retry_strategy: Strategy::Exponential { init_min: Milliseconds(1000),
                                                                init_max: Milliseconds(1000) },
                        max_attempts: Attempts(max_attempts) },
             ..Default::default() }
  }

  struct Fixture {
    node: Node<P>,
    clock: ClockMock,
    rx: crate::test::Queue,
    tx: crate::test::Queue,
  }

  /// The connected-home power node: relay state shared between `pwr/0/rel`
  /// and `pwr/0/w` through a handler pair.
  fn power_node() -> Fixture {
    use std::cell::Cell;
    use std::rc::Rc;

    let sock = SockMock::new();
    let clock = ClockMock::new();
    let (rx, tx) = (sock.rx.clone(), sock.tx.clone());
    let mut node = Node::<P>::new(no_jitter_config(3), clock.share(), sock);

    let relay = Rc::new(Cell::new(b'1'));

    node.resource(Resource::static_value("dev/mfg", "t", *b"Sensinode"));
    node.resource(Resource::static_value("dev/mdl", "t", *b"NSDL-C power node"));
    node.resource(Resource::static_value("dev/bat", "t", *b"1").observable());

    let state = relay.clone();
    node.resource(Resource::dynamic("pwr/0/rel", "t", move |req: &Addrd<Req>| {
                    let mut resp = Resp::for_request(req.data());
                    match req.data().method() {
                      | Method::GET => {
                        resp.set_payload([state.get()]);
                      },
                      | Method::PUT => {
                        if req.data().payload().len() == 1 {
                          state.set(req.data().payload()[0]);
                        }
                        resp.set_code(code::CHANGED);
                      },
                      | _ => resp.set_code(code::METHOD_NOT_ALLOWED),
                    }
                    resp
                  }));

    let state = relay;
    node.resource(Resource::dynamic("pwr/0/w", "t", move |req: &Addrd<Req>| {
                    let mut resp = Resp::for_request(req.data());
                    let watts: &[u8] = if state.get() == b'1' { b"80" } else { b"0" };
                    resp.set_payload(watts.iter().copied());
                    resp
                  }));

    Fixture { node,
              clock,
              rx,
              tx }
  }

  fn request(method: Method, path: &str, id: u16, token: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut req = Req::new(method, path);
    req.msg.id = Id(id);
    req.msg.token = Token::from(token);
    req.set_payload(payload.iter().copied());
    Message::from(req).into()
  }

  fn sent_messages(tx: &crate::test::Queue) -> Vec<Message> {
    tx.lock()
      .unwrap()
      .iter()
      .map(|d| Message::try_from_bytes(d.data()).unwrap())
      .collect()
  }

  #[test]
  fn get_static_resource() {
    let Fixture { mut node, rx, tx, .. } = power_node();

    rx.lock()
      .unwrap()
      .push(Addrd(request(Method::GET, "dev/mfg", 40, &[1], b""), test_addr()));
    node.poll().unwrap();

    let sent = sent_messages(&tx);
    assert_eq!(sent.len(), 1);

    let resp = &sent[0];
    assert_eq!(resp.code, code::CONTENT);
    assert_eq!(resp.ty, Type::Ack);
    assert_eq!(resp.id, Id(40));
    assert_eq!(resp.token, Token::from(&[1u8][..]));
    assert_eq!(resp.payload.0, b"Sensinode".to_vec());

    let format = resp.get_option(known::CONTENT_FORMAT).unwrap();
    assert_eq!(uint_from_bytes(&format.0),
               Some(known::ContentFormat::Text.number() as u32));
  }

  #[test]
  fn unknown_path_is_not_found() {
    let Fixture { mut node, rx, tx, .. } = power_node();

    rx.lock()
      .unwrap()
      .push(Addrd(request(Method::GET, "no/such", 41, &[1], b""), test_addr()));
    node.poll().unwrap();

    let sent = sent_messages(&tx);
    assert_eq!(sent[0].code, code::NOT_FOUND);
    assert_eq!(sent[0].id, Id(41));
  }

  #[test]
  fn relay_put_flips_watts() {
    let Fixture { mut node, rx, tx, .. } = power_node();

    let flow: [(&str, Method, &[u8]); 4] = [("pwr/0/rel", Method::PUT, b"0"),
                                            ("pwr/0/w", Method::GET, b""),
                                            ("pwr/0/rel", Method::PUT, b"1"),
                                            ("pwr/0/w", Method::GET, b"")];

    for (ix, (path, method, payload)) in flow.into_iter().enumerate() {
      rx.lock()
        .unwrap()
        .push(Addrd(request(method, path, 50 + ix as u16, &[ix as u8 + 1], payload),
                    test_addr()));
      node.poll().unwrap();
    }

    let sent = sent_messages(&tx);
    assert_eq!(sent.len(), 4);
    assert_eq!(sent[0].code, code::CHANGED);
    assert_eq!(sent[1].payload.0, b"0".to_vec());
    assert_eq!(sent[2].code, code::CHANGED);
    assert_eq!(sent[3].payload.0, b"80".to_vec());
  }

  #[test]
  fn duplicate_request_is_dispatched_once() {
    let Fixture { mut node, rx, tx, .. } = power_node();

    let req = request(Method::PUT, "pwr/0/rel", 60, &[9], b"0");
    rx.lock().unwrap().push(Addrd(req.clone(), test_addr()));
    node.poll().unwrap();

    // flip the relay back by hand; a re-dispatch of the duplicate would
    // flip it again
    rx.lock()
      .unwrap()
      .push(Addrd(request(Method::PUT, "pwr/0/rel", 61, &[8], b"1"), test_addr()));
    node.poll().unwrap();

    rx.lock().unwrap().push(Addrd(req, test_addr()));
    node.poll().unwrap();

    let sent = sent_messages(&tx);
    assert_eq!(sent.len(), 3);
    // the duplicate's reply is a byte-for-byte replay of the first
    assert_eq!(sent[0], sent[2]);

    // relay still '1': the duplicate did not re-run the handler
    rx.lock()
      .unwrap()
      .push(Addrd(request(Method::GET, "pwr/0/w", 62, &[7], b""), test_addr()));
    node.poll().unwrap();
    assert_eq!(sent_messages(&tx)[3].payload.0, b"80".to_vec());
  }

  #[test]
  fn observation_sequence_increases() {
    let Fixture { mut node, rx, tx, .. } = power_node();

    rx.lock()
      .unwrap()
      .push(Addrd(request(Method::GET, "dev/bat", 70, &[0xB], b""), test_addr()));
    node.poll().unwrap();

    let sent = sent_messages(&tx);
    let subscription = &sent[0];
    let first = uint_from_bytes(&subscription.get_option(known::OBSERVE).unwrap().0).unwrap();

    let mut seqs = vec![];
    for value in [b"2", b"3", b"4"] {
      node.notify("dev/bat", value.iter().copied()).unwrap().unwrap();
      let last = sent_messages(&tx).pop().unwrap();

      assert_eq!(last.ty, Type::Non);
      assert_eq!(last.token, Token::from(&[0xBu8][..]));

      let (_, obs) = last.opts
                         .iter()
                         .enumerate_option_numbers()
                         .find(|(n, _)| *n == known::OBSERVE)
                         .unwrap();
      seqs.push(uint_from_bytes(&obs.value.0).unwrap());
    }

    assert!(seqs[0] > first);
    assert!(seqs.windows(2).all(|w| w[1] > w[0]));
  }

  #[test]
  fn notify_without_observer_is_a_noop() {
    let Fixture { mut node, tx, .. } = power_node();

    assert_eq!(node.notify("dev/bat", *b"2").unwrap(), None);
    assert_eq!(node.notify("dev/mfg", *b"x").unwrap(), None);
    assert!(tx.lock().unwrap().is_empty());
  }

  #[test]
  fn registration_retries_after_exhaustion_with_fresh_id() {
    let Fixture { mut node, clock, tx, .. } = power_node();

    node.nsp(nsp_addr());
    node.endpoint(EndpointParams { name: "nsdl-power".into(),
                                   kind: "PowerNode".into(),
                                   lifetime_secs: 1200 });

    // first tick sends the registration POST
    node.tick().unwrap();
    let first = sent_messages(&tx);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].ty, Type::Con);
    assert_eq!(first[0].code, Method::POST.code());

    let queries: Vec<String> = first[0].opts
                                       .iter()
                                       .enumerate_option_numbers()
                                       .filter(|(n, _)| *n == known::URI_QUERY)
                                       .map(|(_, o)| String::from_utf8(o.value.0.clone()).unwrap())
                                       .collect();
    assert!(queries.contains(&"ep=nsdl-power".to_string()));
    assert!(queries.contains(&"et=PowerNode".to_string()));
    assert!(queries.contains(&"lt=1200".to_string()));

    let payload = String::from_utf8(first[0].payload.0.clone()).unwrap();
    assert!(payload.contains("</dev/mfg>;rt=\"t\""));
    assert!(payload.contains("</dev/bat>;rt=\"t\";obs"));

    // never acked: retries at 1s & 3s, exhausted on the next tick, and the
    // same tick starts a fresh attempt
    for ms in [1000, 3000, 7000] {
      clock.set(ms);
      node.tick().unwrap();
    }

    let sent = sent_messages(&tx);
    assert_eq!(sent.len(), 4);
    // retries are byte-identical
    assert_eq!(sent[1], sent[0]);
    assert_eq!(sent[2], sent[0]);
    // the new attempt is a new exchange
    assert_ne!(sent[3].id, sent[0].id);
    assert_ne!(sent[3].token, sent[0].token);
    assert_eq!(sent[3].code, Method::POST.code());
    assert_eq!(node.registration_location(), None);
  }

  #[test]
  fn registration_completes_on_created() {
    let Fixture { mut node, rx, tx, .. } = power_node();

    node.nsp(nsp_addr());
    node.endpoint(EndpointParams { name: "nsdl-power".into(),
                                   kind: "PowerNode".into(),
                                   lifetime_secs: 1200 });
    node.tick().unwrap();

    let sent = sent_messages(&tx);
    let post = &sent[0];

    // NSP acks with 2.01 + Location-Path rd/5a3f
    let mut resp = Message { id: post.id,
                             ty: Type::Ack,
                             ver: Default::default(),
                             token: post.token,
                             code: code::CREATED,
                             opts: vec![],
                             payload: Payload(vec![]) };
    resp.opts = crate::option::normalize_opts(vec![(known::LOCATION_PATH,
                                                    newt_msg::Opt { delta: Default::default(),
                                                                    value: newt_msg::OptValue(b"rd".to_vec()) }),
                                                   (known::LOCATION_PATH,
                                                    newt_msg::Opt { delta: Default::default(),
                                                                    value: newt_msg::OptValue(b"5a3f".to_vec()) })]);

    rx.lock()
      .unwrap()
      .push(Addrd(Vec::<u8>::from(resp), nsp_addr()));
    node.poll().unwrap();

    assert_eq!(node.registration_location(), Some("rd/5a3f"));

    // ...and deregistration DELETEs the assigned location
    node.deregister().unwrap();
    let sent = sent_messages(&tx);
    let del = sent.last().unwrap();
    assert_eq!(del.code, Method::DELETE.code());
    let path = crate::option::join_path(del.opts
                                           .iter()
                                           .enumerate_option_numbers()
                                           .filter(|(n, _)| *n == known::URI_PATH)
                                           .map(|(_, o)| o.value.0.as_slice()));
    assert_eq!(path, "rd/5a3f".to_string());
  }

  #[test]
  fn ping_gets_reset() {
    let Fixture { mut node, rx, tx, .. } = power_node();

    let ping = Message { id: Id(99),
                         ty: Type::Con,
                         ver: Default::default(),
                         token: Token::default(),
                         code: newt_msg::Code::new(0, 0),
                         opts: vec![],
                         payload: Payload(vec![]) };
    rx.lock()
      .unwrap()
      .push(Addrd(Vec::<u8>::from(ping), test_addr()));
    node.poll().unwrap();

    let sent = sent_messages(&tx);
    assert_eq!(sent[0].ty, Type::Reset);
    assert_eq!(sent[0].id, Id(99));
  }

  #[test]
  fn garbled_datagram_is_dropped_not_fatal() {
    let Fixture { mut node, rx, tx, .. } = power_node();

    rx.lock()
      .unwrap()
      .push(Addrd(vec![0b1000_0000, 0, 0], test_addr()));
    rx.lock()
      .unwrap()
      .push(Addrd(request(Method::GET, "dev/mfg", 80, &[2], b""), test_addr()));

    // the malformed datagram is skipped and the well-formed one behind it
    // is still served
    node.poll().unwrap();
    let sent = sent_messages(&tx);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].payload.0, b"Sensinode".to_vec());
  }

  #[test]
  fn last_write_wins_resource_registration() {
    let Fixture { mut node, rx, tx, .. } = power_node();

    node.resource(Resource::static_value("dev/mfg", "t", *b"Someone else"));

    rx.lock()
      .unwrap()
      .push(Addrd(request(Method::GET, "dev/mfg", 81, &[3], b""), test_addr()));
    node.poll().unwrap();

    assert_eq!(sent_messages(&tx)[0].payload.0, b"Someone else".to_vec());
  }
}
