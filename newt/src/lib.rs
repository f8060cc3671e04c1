//! `newt` is a CoAP runtime for constrained device nodes: it gives a small
//! sensor/actuator endpoint reliable messaging, a resource directory it
//! serves requests from, registration with a network service provider (NSP)
//! so the node becomes discoverable, and push notifications to observers.
//!
//! ## CoAP
//! CoAP copies the semantics of HTTP into an environment conducive to
//! **constrained** devices (weak hardware, small battery, lossy radio
//! links): the same verbs (GET, POST, PUT, DELETE), headers (renamed
//! [Options](https://datatracker.ietf.org/doc/html/rfc7252#section-5.10))
//! and response status codes, but a compact binary encoding over UDP-style
//! datagrams, with reliability implemented in the protocol itself
//! (Confirmable messages, acknowledgements, retransmission with exponential
//! backoff, duplicate detection).
//!
//! ## Shape of this crate
//! - [`core::Core`] — the protocol engine: send/receive, retransmission,
//!   duplicate suppression, id & token allocation.
//! - [`node::Node`] — a device node on top of the engine: resource
//!   directory & dispatch, NSP registration lifecycle, observation.
//! - [`platform::Platform`] — the two injected capabilities (clock &
//!   datagram socket); everything is generic over them, nothing here ever
//!   blocks on the network.
//!
//! The embedding application drives the node with three calls: `poll()`
//! for inbound traffic, `tick()` on a steady cadence, `notify()` on value
//! changes. See `demos/power_node.rs` for a complete emulated power-strip
//! node.

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(not(test),
            deny(missing_debug_implementations,
                 unreachable_pub,
                 unsafe_code,
                 missing_copy_implementations))]
#![deny(missing_docs)]
// prefer explicit `fn foo() -> ()` for effectful functions
#![allow(clippy::unused_unit)]

#[cfg(feature = "alloc")]
extern crate alloc as std_alloc;

/// Runtime configuration
pub mod config;

/// The protocol engine
pub mod core;

/// Sockets & addressing
pub mod net;

/// Device node: resources, registration, observation
pub mod node;

pub(crate) mod option;

/// Clock & socket capabilities
pub mod platform;

/// CoAP requests
pub mod req;

/// CoAP responses
pub mod resp;

/// Non-blocking retry timers
pub mod retry;

/// `std` implementations of the platform capabilities
#[cfg(any(test, feature = "std"))]
pub mod std;

/// Time units & helpers
pub mod time;


#[doc(inline)]
pub use config::Config;
#[doc(inline)]
pub use node::Node;
#[doc(inline)]
pub use platform::Platform;
