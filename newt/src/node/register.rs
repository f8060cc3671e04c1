#[cfg(feature = "alloc")]
use std_alloc::string::String;

use embedded_time::{Clock, Instant};
use newt_msg::{CodeKind, Token};

use crate::resp::Resp;
use crate::time::millis_since;

/// The parameters a node registers itself with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointParams {
  /// Endpoint name (`ep=` query argument), e.g. `nsdl-power`
  pub name: String,
  /// Endpoint type (`et=` query argument), e.g. `PowerNode`
  pub kind: String,
  /// Registration lifetime in seconds (`lt=` query argument); the node
  /// refreshes its registration before this expires
  pub lifetime_secs: u32,
}

/// Where the node currently stands with its NSP
#[derive(Debug)]
pub(crate) enum Status<C: Clock<T = u64>> {
  /// Not registered, no exchange in flight; a registration attempt is made
  /// on the next tick
  Unregistered,
  /// A registration (or refresh) request is in flight
  Pending {
    token: Token,
    /// Location assigned by an earlier registration, kept so a refresh
    /// response without Location-Path does not lose it
    prior_location: Option<String>,
  },
  /// The NSP accepted the registration
  Registered {
    location: String,
    since: Instant<C>,
  },
}

/// Registration manager: owns the endpoint parameters and the state machine
/// `Unregistered → Pending → Registered → Pending → …`.
///
/// Failure anywhere (error-class response, retransmission exhausted) drops
/// back to `Unregistered`, which is retried on a later tick — never a fatal
/// error for the node.
#[derive(Debug)]
pub struct Registration<C: Clock<T = u64>> {
  pub(crate) endpoint: Option<EndpointParams>,
  pub(crate) status: Status<C>,
}

impl<C: Clock<T = u64>> Default for Registration<C> {
  fn default() -> Self {
    Self { endpoint: None,
           status: Status::Unregistered }
  }
}

impl<C: Clock<T = u64>> Registration<C> {
  /// Set the parameters used for every subsequent registration attempt
  pub fn configure(&mut self, endpoint: EndpointParams) -> () {
    self.endpoint = Some(endpoint);
  }

  /// The location path the NSP assigned, when registered
  pub fn location(&self) -> Option<&str> {
    match &self.status {
      | Status::Registered { location, .. } => Some(location),
      | _ => None,
    }
  }

  /// Whether the registration state machine wants a request sent now.
  ///
  /// True when configured but unregistered (including after any failure),
  /// and when a standing registration has burned through 3/4 of its
  /// lifetime — the safety margin that keeps the NSP from expiring us.
  pub(crate) fn due(&self, now: &Instant<C>) -> bool {
    let Some(endpoint) = self.endpoint.as_ref() else {
      return false;
    };

    match &self.status {
      | Status::Unregistered => true,
      | Status::Pending { .. } => false,
      | Status::Registered { since, .. } => {
        let refresh_after_ms = endpoint.lifetime_secs as u64 * 1000 * 3 / 4;
        millis_since(now, since).map(|ms| ms >= refresh_after_ms)
                                .unwrap_or(false)
      },
    }
  }

  /// Note that a registration request with `token` has been handed to the
  /// retransmission engine.
  pub(crate) fn begin(&mut self, token: Token) -> () {
    let prior_location = match core::mem::replace(&mut self.status, Status::Unregistered) {
      | Status::Registered { location, .. } => Some(location),
      | Status::Pending { prior_location, .. } => prior_location,
      | Status::Unregistered => None,
    };

    self.status = Status::Pending { token,
                                    prior_location };
  }

  /// Offer a response to the state machine.
  ///
  /// Returns whether the response belonged to the in-flight registration
  /// exchange (matched by token) and was consumed.
  pub(crate) fn on_response(&mut self, resp: &Resp, now: Instant<C>) -> bool {
    let Status::Pending { token, prior_location } = &self.status else {
      return false;
    };

    if resp.token() != *token {
      return false;
    }

    debug_assert!(resp.code().kind() == CodeKind::Response);

    if resp.code().class == 2 {
      let location = match resp.location_path() {
        | l if l.is_empty() => prior_location.clone(),
        | l => Some(l),
      };

      match location {
        | Some(location) => {
          log::info!("registered with NSP at /{}", location);
          self.status = Status::Registered { location,
                                             since: now };
        },
        | None => {
          log::warn!("NSP accepted registration without Location-Path");
          self.status = Status::Unregistered;
        },
      }
    } else {
      log::warn!("NSP rejected registration: {}", resp.code());
      self.status = Status::Unregistered;
    }

    true
  }

  /// Note that the exchange carrying `token` exhausted its retransmissions.
  ///
  /// Returns whether that was the in-flight registration request, in which
  /// case the machine is back at `Unregistered` and will retry on the next
  /// tick.
  pub(crate) fn delivery_failed(&mut self, token: Token) -> bool {
    match &self.status {
      | Status::Pending { token: pending, .. } if *pending == token => {
        self.status = Status::Unregistered;
        true
      },
      | _ => false,
    }
  }

  /// Tear the state machine down for de-registration, yielding the location
  /// to DELETE and the token of any in-flight exchange to cancel.
  pub(crate) fn take(&mut self) -> (Option<String>, Option<Token>) {
    match core::mem::replace(&mut self.status, Status::Unregistered) {
      | Status::Registered { location, .. } => (Some(location), None),
      | Status::Pending { token, prior_location } => (prior_location, Some(token)),
      | Status::Unregistered => (None, None),
    }
  }
}

#[cfg(test)]
mod tests {
  use newt_msg::opt::known;
  use newt_msg::Id;

  use super::*;
  use crate::req::Req;
  use crate::resp::code;
  use crate::test::ClockMock;

  fn registration() -> Registration<ClockMock> {
    let mut reg = Registration::default();
    reg.configure(EndpointParams { name: "nsdl-power".into(),
                                   kind: "PowerNode".into(),
                                   lifetime_secs: 1200 });
    reg
  }

  fn created_resp(token: Token, location: &[&str]) -> Resp {
    let mut req = Req::post("rd");
    req.msg.token = token;
    req.msg.id = Id(9);

    let mut resp = Resp::for_request(&req);
    resp.set_code(code::CREATED);
    for segment in location {
      resp.push_option(known::LOCATION_PATH, segment.bytes());
    }
    resp
  }

  #[test]
  fn unconfigured_is_never_due() {
    let reg: Registration<ClockMock> = Registration::default();
    assert!(!reg.due(&ClockMock::instant(0)));
  }

  #[test]
  fn created_response_registers() {
    let mut reg = registration();
    assert!(reg.due(&ClockMock::instant(0)));

    let token = Token::from(&[7u8][..]);
    reg.begin(token);
    assert!(!reg.due(&ClockMock::instant(0)));

    let consumed = reg.on_response(&created_resp(token, &["rd", "5a3f"]), ClockMock::instant(10));
    assert!(consumed);
    assert_eq!(reg.location(), Some("rd/5a3f"));
  }

  #[test]
  fn mismatched_token_is_not_consumed() {
    let mut reg = registration();
    reg.begin(Token::from(&[7u8][..]));

    let other = created_resp(Token::from(&[8u8][..]), &["rd", "1"]);
    assert!(!reg.on_response(&other, ClockMock::instant(0)));
    assert_eq!(reg.location(), None);
  }

  #[test]
  fn error_response_goes_back_to_unregistered() {
    let mut reg = registration();
    let token = Token::from(&[7u8][..]);
    reg.begin(token);

    let mut resp = created_resp(token, &[]);
    resp.set_code(code::FORBIDDEN);
    assert!(reg.on_response(&resp, ClockMock::instant(0)));

    assert_eq!(reg.location(), None);
    assert!(reg.due(&ClockMock::instant(0)));
  }

  #[test]
  fn delivery_failure_goes_back_to_unregistered() {
    let mut reg = registration();
    let token = Token::from(&[7u8][..]);
    reg.begin(token);

    assert!(!reg.delivery_failed(Token::from(&[9u8][..])));
    assert!(reg.delivery_failed(token));
    assert!(reg.due(&ClockMock::instant(0)));
  }

  #[test]
  fn refresh_due_at_three_quarters_of_lifetime() {
    let mut reg = registration();
    let token = Token::from(&[7u8][..]);
    reg.begin(token);
    reg.on_response(&created_resp(token, &["rd", "1"]), ClockMock::instant(0));

    // lifetime 1200s -> refresh after 900s
    assert!(!reg.due(&ClockMock::instant(899_999)));
    assert!(reg.due(&ClockMock::instant(900_000)));
  }

  #[test]
  fn refresh_without_location_keeps_old_one() {
    let mut reg = registration();
    let token = Token::from(&[7u8][..]);
    reg.begin(token);
    reg.on_response(&created_resp(token, &["rd", "1"]), ClockMock::instant(0));

    let refresh_token = Token::from(&[8u8][..]);
    reg.begin(refresh_token);
    reg.on_response(&created_resp(refresh_token, &[]), ClockMock::instant(1_000));

    assert_eq!(reg.location(), Some("rd/1"));
  }
}
