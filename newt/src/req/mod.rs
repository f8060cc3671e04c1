#[cfg(feature = "alloc")]
use std_alloc::string::String;
#[cfg(feature = "alloc")]
use std_alloc::vec::Vec;

use newt_msg::opt::known;
use newt_msg::{Code, EnumerateOptNumbers, Id, Message, Opt, OptNumber, Payload, Token, Type};

#[doc(hidden)]
pub mod method;
#[doc(inline)]
pub use method::Method;

/// A CoAP request: a [`Message`] whose code is a method, with its options
/// held number-keyed until serialization.
///
/// ```
/// use newt::req::{Method, Req};
///
/// let mut req = Req::new(Method::PUT, "pwr/0/rel");
/// req.set_payload(*b"1");
/// assert_eq!(req.path(), "pwr/0/rel".to_string());
/// ```
#[derive(Debug, Clone)]
pub struct Req {
  pub(crate) msg: Message,
  pub(crate) opts: Vec<(OptNumber, Opt)>,
}

impl Req {
  /// Create a new Confirmable request.
  ///
  /// The path may contain `/` separators; each segment becomes its own
  /// Uri-Path option. Message id and token are left zeroed — the runtime
  /// assigns fresh ones before the request leaves the node.
  pub fn new(method: Method, path: impl AsRef<str>) -> Self {
    let msg = Message { ty: Type::Con,
                        ver: Default::default(),
                        code: method.0,
                        id: Id(0),
                        opts: Default::default(),
                        payload: Payload(Default::default()),
                        token: Token::default() };

    let mut me = Self { msg,
                        opts: Default::default() };
    me.set_path(path);
    me
  }

  /// Creates a new GET request
  pub fn get(path: impl AsRef<str>) -> Self {
    Self::new(Method::GET, path)
  }

  /// Creates a new POST request
  pub fn post(path: impl AsRef<str>) -> Self {
    Self::new(Method::POST, path)
  }

  /// Creates a new PUT request
  pub fn put(path: impl AsRef<str>) -> Self {
    Self::new(Method::PUT, path)
  }

  /// Creates a new DELETE request
  pub fn delete(path: impl AsRef<str>) -> Self {
    Self::new(Method::DELETE, path)
  }

  /// Get the request method
  pub fn method(&self) -> Method {
    Method(self.msg.code)
  }

  /// Get the request code
  pub fn code(&self) -> Code {
    self.msg.code
  }

  /// Get the request type (confirmable, non-confirmable)
  pub fn msg_type(&self) -> Type {
    self.msg.ty
  }

  /// Set this request to be non-confirmable.
  ///
  /// Appropriate for traffic that is repeated regularly anyway, such as
  /// sensor readings.
  pub fn non(&mut self) -> () {
    self.msg.ty = Type::Non;
  }

  /// Get a copy of the message id for this request
  pub fn msg_id(&self) -> Id {
    self.msg.id
  }

  /// Get a copy of the message token for this request
  pub fn msg_token(&self) -> Token {
    self.msg.token
  }

  /// Set a non-repeatable option, replacing any existing value for the
  /// number.
  pub fn set_option<V: IntoIterator<Item = u8>>(&mut self, number: OptNumber, value: V) -> () {
    crate::option::set_option_value(&mut self.opts, number, value);
  }

  /// Append a repeatable option (Uri-Path segments, Uri-Query arguments)
  pub fn push_option<V: IntoIterator<Item = u8>>(&mut self, number: OptNumber, value: V) -> () {
    crate::option::push_option_value(&mut self.opts, number, value);
  }

  /// Replace the Uri-Path options with `path`, one option per `/`-separated
  /// segment
  pub fn set_path(&mut self, path: impl AsRef<str>) -> () {
    self.opts.retain(|(num, _)| *num != known::URI_PATH);

    for segment in path.as_ref().split('/').filter(|s| !s.is_empty()) {
      self.push_option(known::URI_PATH, segment.bytes());
    }
  }

  /// The request path: every Uri-Path option value joined with `/`
  pub fn path(&self) -> String {
    crate::option::join_path(self.opts
                                 .iter()
                                 .filter(|(num, _)| *num == known::URI_PATH)
                                 .map(|(_, o)| o.value.0.as_slice()))
  }

  /// Read a non-repeatable option by number
  pub fn get_option(&self, number: OptNumber) -> Option<&Opt> {
    self.opts
        .iter()
        .find(|(num, _)| *num == number)
        .map(|(_, o)| o)
  }

  /// Add a payload to this request
  pub fn set_payload<P: IntoIterator<Item = u8>>(&mut self, payload: P) -> () {
    self.msg.payload = Payload(payload.into_iter().collect());
  }

  /// Get the payload's raw bytes
  pub fn payload(&self) -> &[u8] {
    &self.msg.payload.0
  }

  /// Get the payload and attempt to interpret it as a utf8 string
  pub fn payload_str(&self) -> Result<&str, core::str::Utf8Error> {
    core::str::from_utf8(self.payload())
  }

  /// Iterate over the options attached to this request
  pub fn opts(&self) -> impl Iterator<Item = &(OptNumber, Opt)> {
    self.opts.iter()
  }
}

impl From<Req> for Message {
  fn from(mut req: Req) -> Self {
    req.msg.opts = crate::option::normalize_opts(req.opts);
    req.msg
  }
}

impl From<Message> for Req {
  fn from(mut msg: Message) -> Self {
    let opts = core::mem::take(&mut msg.opts).into_iter()
                                             .enumerate_option_numbers()
                                             .collect();

    Self { msg, opts }
  }
}
