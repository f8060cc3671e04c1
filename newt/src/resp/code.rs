pub use newt_msg::Code;

macro_rules! code {
  ($(#[$doc:meta])* $name:ident = $c:literal . $d:literal) => {
    $(#[$doc])*
    #[allow(clippy::zero_prefixed_literal)]
    pub const $name: Code = Code::new($c, $d);
  };
}

// 2.xx
code!(/// The request created a new resource; Location-Path options point at it
      CREATED = 2 . 01);
code!(/// The resource was deleted
      DELETED = 2 . 02);
code!(/// The cached representation identified by the request ETag is still valid
      VALID = 2 . 03);
code!(/// The resource was updated
      CHANGED = 2 . 04);
code!(/// The payload is a representation of the requested resource
      CONTENT = 2 . 05);

// 4.xx
code!(/// The request could not be understood
      BAD_REQUEST = 4 . 00);
code!(/// The request lacked valid credentials
      UNAUTHORIZED = 4 . 01);
code!(/// A critical option in the request was not understood
      BAD_OPTION = 4 . 02);
code!(/// The request was understood and refused
      FORBIDDEN = 4 . 03);
code!(/// No resource lives at the requested path
      NOT_FOUND = 4 . 04);
code!(/// The resource does not support the request method
      METHOD_NOT_ALLOWED = 4 . 05);
code!(/// No representation matching the request Accept option exists
      NOT_ACCEPTABLE = 4 . 06);
code!(/// A request precondition (If-Match / If-None-Match) failed
      PRECONDITION_FAILED = 4 . 12);
code!(/// The request payload is larger than the server is willing to process
      REQUEST_ENTITY_TOO_LARGE = 4 . 13);
code!(/// The request payload is in an unsupported Content-Format
      UNSUPPORTED_CONTENT_FORMAT = 4 . 15);

// 5.xx
code!(/// The server hit an internal error handling the request
      INTERNAL_SERVER_ERROR = 5 . 00);
code!(/// The server cannot fulfill this kind of request
      NOT_IMPLEMENTED = 5 . 01);
code!(/// An upstream server answered the proxied request badly
      BAD_GATEWAY = 5 . 02);
code!(/// The server is temporarily unable to serve requests
      SERVICE_UNAVAILABLE = 5 . 03);
code!(/// An upstream server did not answer the proxied request in time
      GATEWAY_TIMEOUT = 5 . 04);
code!(/// The server does not proxy requests
      PROXYING_NOT_SUPPORTED = 5 . 05);
