#[cfg(feature = "alloc")]
use std_alloc::string::{FromUtf8Error, String};
#[cfg(feature = "alloc")]
use std_alloc::vec::Vec;

use newt_msg::opt::known;
use newt_msg::{Code, EnumerateOptNumbers, Id, Message, Opt, OptNumber, Payload, Token, Type};

use crate::req::Req;

/// Response codes
pub mod code;

/// A CoAP response: a [`Message`] whose code is a response status, with its
/// options held number-keyed until serialization.
#[derive(Debug, Clone)]
pub struct Resp {
  pub(crate) msg: Message,
  pub(crate) opts: Vec<(OptNumber, Opt)>,
}

impl Resp {
  /// Create a new response for a given request.
  ///
  /// The message id and token follow the standard correlation rules:
  ///
  /// - a Confirmable request gets a piggybacked Acknowledgement reusing the
  ///   request's message id (id correlates the transport exchange);
  /// - a Non-confirmable request gets a Non-confirmable response whose id is
  ///   left zeroed for the runtime to assign freshly;
  /// - either way the request's token is echoed — the token, not the id, is
  ///   what ties the response to the request at the application layer.
  ///
  /// ```
  /// use newt_msg::Type;
  /// use newt::req::Req;
  /// use newt::resp::Resp;
  ///
  /// let req = Req::get("hello");
  /// let resp = Resp::for_request(&req);
  ///
  /// // Req's default type is CON, so the response is an ACK sharing its id
  /// assert_eq!(resp.msg_type(), Type::Ack);
  /// assert_eq!(resp.msg_id(), req.msg_id());
  /// assert_eq!(resp.token(), req.msg_token());
  /// ```
  pub fn for_request(req: &Req) -> Self {
    let msg = Message { ty: match req.msg.ty {
                          | Type::Con => Type::Ack,
                          | _ => Type::Non,
                        },
                        id: match req.msg.ty {
                          | Type::Con => req.msg.id,
                          | _ => Id(0),
                        },
                        opts: Default::default(),
                        code: code::CONTENT,
                        ver: Default::default(),
                        payload: Payload(Default::default()),
                        token: req.msg.token };

    Self { msg,
           opts: Default::default() }
  }

  /// Get the message type
  pub fn msg_type(&self) -> Type {
    self.msg.ty
  }

  /// Get the message id
  pub fn msg_id(&self) -> Id {
    self.msg.id
  }

  /// Get the message token
  pub fn token(&self) -> Token {
    self.msg.token
  }

  /// Get the response code
  pub fn code(&self) -> Code {
    self.msg.code
  }

  /// Change the response code
  ///
  /// ```
  /// use newt::req::Req;
  /// use newt::resp::{code, Resp};
  ///
  /// let req = Req::get("does/not/exist");
  /// let mut resp = Resp::for_request(&req);
  /// resp.set_code(code::NOT_FOUND);
  /// ```
  pub fn set_code(&mut self, code: Code) -> () {
    self.msg.code = code;
  }

  /// Set a non-repeatable option, replacing any existing value for the
  /// number
  pub fn set_option<V: IntoIterator<Item = u8>>(&mut self, number: OptNumber, value: V) -> () {
    crate::option::set_option_value(&mut self.opts, number, value);
  }

  /// Append a repeatable option (Location-Path segments etc.)
  pub fn push_option<V: IntoIterator<Item = u8>>(&mut self, number: OptNumber, value: V) -> () {
    crate::option::push_option_value(&mut self.opts, number, value);
  }

  /// Read a non-repeatable option by number
  pub fn get_option(&self, number: OptNumber) -> Option<&Opt> {
    self.opts
        .iter()
        .find(|(num, _)| *num == number)
        .map(|(_, o)| o)
  }

  /// The location this response points at: every Location-Path option value
  /// joined with `/`
  pub fn location_path(&self) -> String {
    crate::option::join_path(self.opts
                                 .iter()
                                 .filter(|(num, _)| *num == known::LOCATION_PATH)
                                 .map(|(_, o)| o.value.0.as_slice()))
  }

  /// Add a payload to this response
  pub fn set_payload<P: IntoIterator<Item = u8>>(&mut self, payload: P) -> () {
    self.msg.payload = Payload(payload.into_iter().collect());
  }

  /// Get the payload's raw bytes
  pub fn payload(&self) -> &[u8] {
    &self.msg.payload.0
  }

  /// Get the payload and attempt to interpret it as a utf8 string
  pub fn payload_string(&self) -> Result<String, FromUtf8Error> {
    String::from_utf8(self.payload().to_vec())
  }
}

impl From<Resp> for Message {
  fn from(mut rep: Resp) -> Self {
    rep.msg.opts = crate::option::normalize_opts(rep.opts);
    rep.msg
  }
}

impl From<Message> for Resp {
  fn from(mut msg: Message) -> Self {
    let opts = core::mem::take(&mut msg.opts).into_iter()
                                             .enumerate_option_numbers()
                                             .collect();

    Self { msg, opts }
  }
}
