//! Contracts between the I/O reactor and the protocol core.
//!
//! The transport (sockets, TLS, byte-level HTTP framing) lives outside this
//! crate. A reactor implements [`ServerConnection`] (plus the decoder/encoder
//! handles it passes into content events) and drives a
//! [`ConnectionEventHandler`] with readiness callbacks. The reactor may
//! invoke callbacks for different connections in parallel; it is not required
//! to serialize callbacks for the same connection; the event handler does
//! that itself.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;

use crate::protocol::{Context, HttpError, ProtocolError, Request, Response};

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Active,
    Closing,
    Closed,
}

/// Readiness toggles on a non-blocking connection.
///
/// These never perform I/O; they adjust the interest set the reactor polls
/// on. The next matching readiness event arrives through the
/// [`ConnectionEventHandler`].
pub trait IoControl: Send + Sync {
    fn request_input(&self);

    fn suspend_input(&self);

    fn request_output(&self);

    fn suspend_output(&self);
}

/// Incremental access to decoded request content.
///
/// The connection owns the wire framing (identity, chunked); a decoder hands
/// out decoded content bytes and reports when the message body is complete.
pub trait ContentDecoder {
    /// Appends available content to `dst`, returning the number of bytes
    /// transferred. Zero means no content is available right now.
    fn read(&mut self, dst: &mut BytesMut) -> io::Result<usize>;

    /// Whether the message body has been fully decoded.
    fn is_completed(&self) -> bool;
}

/// Incremental sink for outgoing response content.
pub trait ContentEncoder {
    /// Writes content bytes, returning how many were accepted. Zero means
    /// the transport buffer is full; yield and wait for the next
    /// output-readiness event.
    fn write(&mut self, src: &[u8]) -> io::Result<usize>;

    /// Marks the message body as complete.
    fn complete(&mut self) -> io::Result<()>;

    /// Whether the message body has been fully encoded.
    fn is_completed(&self) -> bool;
}

/// A non-blocking server-side HTTP connection.
pub trait ServerConnection: IoControl {
    /// The connection-level attribute bag. Lives as long as the connection;
    /// the event handler attaches its per-connection state here.
    fn context(&self) -> &Context;

    /// The request head most recently parsed off the wire, if any.
    fn http_request(&self) -> Option<Request>;

    /// Submits a response head (and buffered entity, if the connection cares)
    /// for writing.
    fn submit_response(&self, response: Response) -> Result<(), HttpError>;

    fn status(&self) -> ConnectionStatus;

    /// Whether a final response head has already been handed to the wire for
    /// the current exchange.
    fn is_response_submitted(&self) -> bool;

    fn set_socket_timeout(&self, timeout: Duration);

    /// Graceful close: pending output is flushed first.
    fn close(&self) -> io::Result<()>;

    /// Immediate teardown.
    fn shutdown(&self) -> io::Result<()>;
}

/// The callback contract a reactor drives.
///
/// `timeout` and `io_error` may fire at any point of the exchange; all other
/// events follow the request/response cycle. Implementations serialize the
/// events of a single connection internally.
pub trait ConnectionEventHandler: Send + Sync {
    /// A new connection is ready for use.
    fn connected(&self, conn: &Arc<dyn ServerConnection>);

    /// The connection has been closed.
    fn closed(&self, conn: &Arc<dyn ServerConnection>);

    /// A request head has been parsed and can be read off the connection.
    fn request_received(&self, conn: &Arc<dyn ServerConnection>);

    /// Decoded request content is available.
    fn input_ready(&self, conn: &Arc<dyn ServerConnection>, decoder: &mut dyn ContentDecoder);

    /// The connection can accept a response head.
    fn response_ready(&self, conn: &Arc<dyn ServerConnection>);

    /// The connection can accept response content.
    fn output_ready(&self, conn: &Arc<dyn ServerConnection>, encoder: &mut dyn ContentEncoder);

    /// No I/O activity within the socket timeout.
    fn timeout(&self, conn: &Arc<dyn ServerConnection>);

    /// The connection failed to parse or frame an HTTP message.
    fn protocol_error(&self, conn: &Arc<dyn ServerConnection>, error: ProtocolError);

    /// The transport failed.
    fn io_error(&self, conn: &Arc<dyn ServerConnection>, error: io::Error);
}
