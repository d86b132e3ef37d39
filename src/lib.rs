//! Event-driven core of a non-blocking HTTP/1.x server-side protocol handler.
//!
//! This crate sequences one HTTP request/response exchange at a time on a
//! persistent connection. It sits between a low-level non-blocking connection
//! (which delivers I/O readiness events and exposes content decoders and
//! encoders) and user-supplied asynchronous request handlers. The connection,
//! the reactor driving it, and the byte-level framing of HTTP messages are
//! all external: they are consumed through the trait contracts in
//! [`connection`].
//!
//! The entry point is [`service::HttpService`], which implements
//! [`connection::ConnectionEventHandler`]. A reactor attaches one
//! `HttpService` and forwards readiness events to it; per-connection state
//! lives in the connection context, so a single service instance serves any
//! number of connections. Handlers are registered through
//! [`handler::HandlerRegistry`] and respond either synchronously or later
//! from another thread through the one-shot [`service::ResponseTrigger`].

pub mod connection;
pub mod handler;
pub mod protocol;
pub mod service;

pub(crate) use help::ensure;

mod help {

    macro_rules! ensure {
        ($predicate:expr, $error:expr) => {
            if !$predicate {
                return Err($error);
            }
        };
    }
    pub(crate) use ensure;
}
