//! Handler-side contracts and basic implementations.
//!
//! A [`RequestHandler`] supplies a [`RequestConsumer`] to sink the incoming
//! request. Once the request is fully consumed, it receives the
//! consumer's result together with a one-shot
//! [`ResponseTrigger`](crate::service::ResponseTrigger). The trigger may be
//! fired synchronously inside [`RequestHandler::handle`] or later from any
//! thread; either way it installs a [`ResponseProducer`] that streams the
//! response body out through the connection's content encoder.

use std::any::Any;
use std::io;
use std::sync::Arc;

use crate::connection::{ContentDecoder, ContentEncoder, IoControl};
use crate::protocol::{Context, HttpError, Request, Response};
use crate::service::ResponseTrigger;

mod registry;
pub use registry::HandlerRegistry;

mod basic;
pub use basic::{BufferedRequest, BufferingRequestConsumer, DiscardingRequestConsumer};
pub use basic::{EntityResponseProducer, NullRequestHandler, SimpleRequestHandler};
pub use basic::make_handler;

/// A handler-supplied sink for one incoming request.
///
/// Owns whatever resources it accumulates; [`RequestConsumer::close`] is
/// called exactly once when the exchange is reset.
pub trait RequestConsumer: Send {
    /// Delivery of the request head.
    fn request_received(&mut self, request: &Request) -> Result<(), HttpError>;

    /// Incremental delivery of decoded request content. May toggle input
    /// readiness through `ioctl` for its own flow control.
    fn consume_content(&mut self, decoder: &mut dyn ContentDecoder, ioctl: &dyn IoControl) -> Result<(), HttpError>;

    /// The request has been fully received.
    fn request_completed(&mut self, context: &Context);

    /// A failure this consumer recorded while processing the request. When
    /// present, the service answers with a mapped error response instead of
    /// invoking the handler.
    fn failure(&self) -> Option<&HttpError>;

    /// Takes the result object handed to [`RequestHandler::handle`].
    fn take_result(&mut self) -> Option<Box<dyn Any + Send>>;

    fn close(&mut self) -> io::Result<()>;
}

/// A handler-supplied source for one outgoing response.
pub trait ResponseProducer: Send {
    /// Generates the response head. Called once, when the response is
    /// committed.
    fn generate_response(&mut self) -> Result<Response, HttpError>;

    /// Incremental emission of response content. Must call
    /// [`ContentEncoder::complete`] when the body ends.
    fn produce_content(&mut self, encoder: &mut dyn ContentEncoder, ioctl: &dyn IoControl) -> io::Result<()>;

    fn close(&mut self) -> io::Result<()>;
}

/// An asynchronous request handler.
pub trait RequestHandler: Send + Sync {
    /// Invoked at head receipt; returns the consumer that will sink the
    /// request.
    fn process_request(&self, request: &Request, context: &Context) -> Result<Box<dyn RequestConsumer>, HttpError>;

    /// Invoked when the request is fully consumed. `result` is whatever the
    /// consumer produced. The trigger may be fired here or from any other
    /// thread, at most once.
    fn handle(
        &self,
        result: Option<Box<dyn Any + Send>>,
        trigger: ResponseTrigger,
        context: &Arc<Context>,
    ) -> Result<(), HttpError>;
}

/// Maps request URIs to handlers.
pub trait HandlerResolver: Send + Sync {
    fn lookup(&self, uri: &str) -> Option<Arc<dyn RequestHandler>>;
}
