//! Emulated connected-home power node.
//!
//! Serves the classic NSDL demo resource set (manufacturer, model, battery,
//! watts, relay, temperature), registers itself with an NSP and pushes a
//! battery-level notification to its observer every ten seconds.
//!
//! ```text
//! cargo run --example power_node [nsp-address]    # default 127.0.0.1:5683
//! ```

use std::cell::Cell;
use std::net::UdpSocket;
use std::rc::Rc;
use std::time::{Duration, Instant};

use newt::net::Addrd;
use newt::node::{EndpointParams, Resource};
use newt::platform::Std;
use newt::req::{Method, Req};
use newt::resp::{code, Resp};
use newt::{Config, Node};

fn main() -> std::io::Result<()> {
  simple_logger::init_with_level(log::Level::Debug).unwrap();

  let nsp: no_std_net::SocketAddr = std::env::args().nth(1)
                                                    .unwrap_or_else(|| "127.0.0.1:5683".into())
                                                    .parse()
                                                    .expect("nsp address");

  let sock = UdpSocket::bind("0.0.0.0:5685")?;
  sock.set_nonblocking(true)?;

  let mut node = Node::<Std>::new(Config::default(), newt::std::Clock::new(), sock);
  node.nsp(nsp);
  node.endpoint(EndpointParams { name: "nsdl-power".into(),
                                 kind: "PowerNode".into(),
                                 lifetime_secs: 1200 });

  node.resource(Resource::static_value("dev/mfg", "t", *b"Sensinode"));
  node.resource(Resource::static_value("dev/mdl", "t", *b"NSDL-C power node"));
  node.resource(Resource::static_value("sen/temp", "t", *b"25.4"));

  // battery level cycles '0'..='4'; observers hear about every step
  let battery = Rc::new(Cell::new(b'1'));

  let state = battery.clone();
  node.resource(Resource::dynamic("dev/bat", "t", move |req: &Addrd<Req>| {
                  let mut resp = Resp::for_request(req.data());
                  match req.data().method() {
                    | Method::GET => resp.set_payload([state.get()]),
                    | _ => resp.set_code(code::METHOD_NOT_ALLOWED),
                  }
                  resp
                }).observable());

  // the relay switches the strip; watts reads 80 or 0 depending on it
  let relay = Rc::new(Cell::new(b'1'));

  let state = relay.clone();
  node.resource(Resource::dynamic("pwr/0/rel", "t", move |req: &Addrd<Req>| {
                  let mut resp = Resp::for_request(req.data());
                  match req.data().method() {
                    | Method::GET => resp.set_payload([state.get()]),
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
                  use newt_msg::opt::known;

                  let mut resp = Resp::for_request(req.data());
                  // never cache a live power reading
                  resp.set_option(known::MAX_AGE, known::uint_to_bytes(0));
                  let watts: &[u8] = if state.get() == b'1' { b"80" } else { b"0" };
                  resp.set_payload(watts.iter().copied());
                  resp
                }));

  let mut last_tick = Instant::now();
  let mut ticks = 0u32;

  loop {
    if let Err(e) = node.poll() {
      log::error!("poll: {:?}", e);
    }

    if last_tick.elapsed() >= Duration::from_secs(1) {
      last_tick = Instant::now();
      ticks += 1;

      if let Err(e) = node.tick() {
        log::error!("tick: {:?}", e);
      }

      if ticks % 10 == 0 {
        let level = battery.get();
        battery.set(if level >= b'4' { b'0' } else { level + 1 });

        match node.notify("dev/bat", [level]) {
          | Ok(Some(id)) => log::info!("observation notification {:?}", id),
          | Ok(None) => (),
          | Err(e) => log::error!("notify: {:?}", e),
        }
      }
    }

    std::thread::sleep(Duration::from_millis(10));
  }
}
