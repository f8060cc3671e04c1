#[cfg(feature = "alloc")]
use std_alloc::boxed::Box;
#[cfg(feature = "alloc")]
use std_alloc::string::String;
#[cfg(feature = "alloc")]
use std_alloc::vec::Vec;

use newt_msg::opt::known;

use super::observe::ObserveState;
use crate::net::Addrd;
use crate::req::{Method, Req};
use crate::resp::{code, Resp};

/// Something that can answer requests aimed at a dynamic resource.
///
/// Blanket-implemented for closures, so a resource can be wired up as
/// simply as:
///
/// ```
/// use newt::net::Addrd;
/// use newt::node::resource::Resource;
/// use newt::req::Req;
/// use newt::resp::{code, Resp};
///
/// Resource::dynamic("sen/temp", "t", |req: &Addrd<Req>| {
///   let mut resp = Resp::for_request(req.data());
///   resp.set_payload(*b"25.4");
///   resp
/// });
/// ```
pub trait Handler {
  /// Answer a request.
  ///
  /// The returned response's id & type are corrected by the dispatcher
  /// before transmission; handlers only decide code, options and payload.
  fn handle(&mut self, req: &Addrd<Req>) -> Resp;
}

impl<F: FnMut(&Addrd<Req>) -> Resp> Handler for F {
  fn handle(&mut self, req: &Addrd<Req>) -> Resp {
    self(req)
  }
}

/// How a resource produces (and consumes) its representation
pub enum Kind {
  /// A stored value served on GET and writable by PUT/POST
  Static(Vec<u8>),
  /// A callback invoked for every method
  Dynamic(Box<dyn Handler>),
}

impl core::fmt::Debug for Kind {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match self {
      | Kind::Static(value) => f.debug_tuple("Static").field(value).finish(),
      | Kind::Dynamic(_) => f.write_str("Dynamic(..)"),
    }
  }
}

/// A single entry in the node's resource directory.
///
/// Created at startup, registered with [`Node::resource`](super::Node), and
/// alive until the node shuts down.
pub struct Resource {
  pub(crate) path: String,
  /// The `rt` link-format attribute advertised on registration
  pub(crate) rt: String,
  pub(crate) observable: bool,
  pub(crate) kind: Kind,
  pub(crate) observe: ObserveState,
}

impl core::fmt::Debug for Resource {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Resource")
     .field("path", &self.path)
     .field("rt", &self.rt)
     .field("observable", &self.observable)
     .field("kind", &self.kind)
     .finish()
  }
}

impl Resource {
  /// A resource serving a stored value
  pub fn static_value(path: impl Into<String>,
                      rt: impl Into<String>,
                      value: impl Into<Vec<u8>>)
                      -> Self {
    Self { path: path.into(),
           rt: rt.into(),
           observable: false,
           kind: Kind::Static(value.into()),
           observe: ObserveState::default() }
  }

  /// A resource answered by a [`Handler`]
  pub fn dynamic(path: impl Into<String>,
                 rt: impl Into<String>,
                 handler: impl Handler + 'static)
                 -> Self {
    Self { path: path.into(),
           rt: rt.into(),
           observable: false,
           kind: Kind::Dynamic(Box::new(handler)),
           observe: ObserveState::default() }
  }

  /// Mark this resource observable: a GET carrying a token subscribes the
  /// sender to notifications.
  pub fn observable(mut self) -> Self {
    self.observable = true;
    self
  }

  /// This resource's path, the exact string requests are matched against
  pub fn path(&self) -> &str {
    &self.path
  }

  /// Produce the response for a request already routed to this resource.
  pub(crate) fn serve(&mut self, req: &Addrd<Req>) -> Resp {
    match &mut self.kind {
      | Kind::Dynamic(handler) => handler.handle(req),
      | Kind::Static(value) => {
        let mut resp = Resp::for_request(req.data());

        match req.data().method() {
          | Method::GET => {
            resp.set_code(code::CONTENT);
            resp.set_option(known::CONTENT_FORMAT,
                            known::ContentFormat::Text.value_bytes());
            resp.set_payload(value.iter().copied());
          },
          | Method::PUT => {
            // single-byte stores accept single-byte writes; anything else
            // leaves the value untouched (not an error)
            let payload = req.data().payload();
            if payload.len() == 1 && value.len() == 1 {
              value[0] = payload[0];
            }
            resp.set_code(code::CHANGED);
          },
          | Method::POST => {
            *value = req.data().payload().to_vec();
            resp.set_code(code::CREATED);
          },
          | _ => resp.set_code(code::METHOD_NOT_ALLOWED),
        }

        resp
      },
    }
  }
}

/// Render the directory as an `application/link-format` document:
/// `</dev/mfg>;rt="t",</dev/bat>;rt="t";obs`
///
/// This is the payload registration requests describe the node with.
pub(crate) fn link_format(resources: &[Resource]) -> String {
  resources.iter()
           .map(|r| {
             let mut link = String::new();
             link.push_str("</");
             link.push_str(&r.path);
             link.push_str(">;rt=\"");
             link.push_str(&r.rt);
             link.push('"');
             if r.observable {
               link.push_str(";obs");
             }
             link
           })
           .collect::<Vec<_>>()
           .join(",")
}

#[cfg(test)]
mod tests {
  use newt_msg::Id;
  use no_std_net::SocketAddr;

  use super::*;
  use crate::test::test_addr;

  fn addrd(req: Req) -> Addrd<Req> {
    let addr: SocketAddr = test_addr();
    Addrd(req, addr)
  }

  #[test]
  fn static_get_serves_value() {
    let mut res = Resource::static_value("dev/mfg", "t", *b"Sensinode");
    let resp = res.serve(&addrd(Req::get("dev/mfg")));

    assert_eq!(resp.code(), code::CONTENT);
    assert_eq!(resp.payload(), b"Sensinode");
    assert!(resp.get_option(known::CONTENT_FORMAT).is_some());
  }

  #[test]
  fn static_put_single_byte_rule() {
    let mut res = Resource::static_value("dev/bat", "t", *b"1");

    let mut put = Req::put("dev/bat");
    put.set_payload(*b"3");
    let resp = res.serve(&addrd(put));
    assert_eq!(resp.code(), code::CHANGED);

    // longer payloads are ignored, still not an error
    let mut put = Req::put("dev/bat");
    put.set_payload(*b"33");
    let resp = res.serve(&addrd(put));
    assert_eq!(resp.code(), code::CHANGED);

    let resp = res.serve(&addrd(Req::get("dev/bat")));
    assert_eq!(resp.payload(), b"3");
  }

  #[test]
  fn static_delete_not_allowed() {
    let mut res = Resource::static_value("dev/mfg", "t", *b"x");
    let resp = res.serve(&addrd(Req::delete("dev/mfg")));
    assert_eq!(resp.code(), code::METHOD_NOT_ALLOWED);
  }

  #[test]
  fn dynamic_handler_decides() {
    let mut res = Resource::dynamic("sen/temp", "t", |req: &Addrd<Req>| {
                    let mut resp = Resp::for_request(req.data());
                    resp.set_payload(*b"25.4");
                    resp
                  });

    let mut req = Req::get("sen/temp");
    req.msg.id = Id(5);
    let resp = res.serve(&addrd(req));
    assert_eq!(resp.payload(), b"25.4");
    assert_eq!(resp.msg_id(), Id(5));
  }

  #[test]
  fn link_format_renders_directory() {
    let resources = [Resource::static_value("dev/mfg", "t", *b"Sensinode"),
                     Resource::dynamic("dev/bat", "t", |req: &Addrd<Req>| {
                       Resp::for_request(req.data())
                     }).observable()];

    assert_eq!(link_format(&resources),
               "</dev/mfg>;rt=\"t\",</dev/bat>;rt=\"t\";obs".to_string());
  }
}
