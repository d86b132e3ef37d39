//! The event-driven exchange state machine.
//!
//! [`HttpService`] implements the reactor-facing
//! [`ConnectionEventHandler`](crate::connection::ConnectionEventHandler)
//! contract and sequences one request/response exchange at a time per
//! connection. Per-connection state lives in an exchange record attached to
//! the connection context; every callback and every late [`ResponseTrigger`]
//! fire runs under its lock.

use tracing::error;

use crate::protocol::HttpError;

mod exchange;
pub(crate) use exchange::Exchange;

mod trigger;
pub use trigger::ResponseTrigger;
pub use trigger::TriggerError;

mod error_response;
pub(crate) use error_response::error_response_producer;

mod handler;
pub use handler::HttpService;
pub use handler::HttpServiceBuilder;

/// Reporting seam for failures the service recovers from by severing the
/// connection. Never alters control flow.
pub trait ExceptionListener: Send + Sync {
    fn on_exception(&self, error: &HttpError);
}

/// Default listener: reports through `tracing` at error level.
pub struct LoggingExceptionListener;

impl ExceptionListener for LoggingExceptionListener {
    fn on_exception(&self, error: &HttpError) {
        error!(cause = %error, "http exchange failed");
    }
}
