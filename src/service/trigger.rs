//! One-shot response submission capability.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::connection::ServerConnection;
use crate::handler::ResponseProducer;
use crate::protocol::HttpError;
use crate::service::Exchange;

/// Misuse of a [`ResponseTrigger`].
#[derive(Debug, Error)]
pub enum TriggerError {
    /// The trigger has already been fired for this exchange.
    #[error("response already triggered")]
    AlreadyTriggered,
}

impl From<TriggerError> for HttpError {
    fn from(error: TriggerError) -> Self {
        HttpError::handler(error)
    }
}

/// Lets a handler submit its response, synchronously or from another thread.
///
/// Firing installs the producer on the exchange and requests output
/// readiness on the connection, both under the exchange lock, so the
/// reactor never observes the readiness request without the producer. The
/// trigger fires at most once; a second attempt returns
/// [`TriggerError::AlreadyTriggered`] and leaves the exchange untouched.
///
/// A fire that lands after the exchange was reset (timeout, connection
/// teardown) installs a producer on an idle exchange bound to a dead
/// connection; the producer is released on the next reset and no response is
/// written. Handlers need no special handling for that race.
pub struct ResponseTrigger {
    exchange: Arc<Mutex<Exchange>>,
    conn: Arc<dyn ServerConnection>,
    triggered: AtomicBool,
}

impl ResponseTrigger {
    pub(crate) fn new(exchange: Arc<Mutex<Exchange>>, conn: Arc<dyn ServerConnection>) -> Self {
        Self { exchange, conn, triggered: AtomicBool::new(false) }
    }

    /// Submits the response producer for this exchange.
    pub fn submit_response(&self, producer: Box<dyn ResponseProducer>) -> Result<(), TriggerError> {
        if self.triggered.swap(true, Ordering::AcqRel) {
            return Err(TriggerError::AlreadyTriggered);
        }
        let mut exchange = self.exchange.lock().unwrap();
        exchange.set_response_producer(producer);
        self.conn.request_output();
        Ok(())
    }

    /// Whether this trigger has already fired.
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }
}
