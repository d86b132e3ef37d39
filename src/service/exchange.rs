//! Per-connection exchange state.

use std::sync::Arc;

use tracing::debug;

use crate::handler::{RequestConsumer, RequestHandler, ResponseProducer};
use crate::protocol::{Context, Request, Response};
use crate::service::ExceptionListener;

/// The mutable record of the current request/response cycle on one
/// connection.
///
/// Exactly one `Exchange` exists per connection; it is created at the
/// connect event, mutated under its lock by every readiness callback, and
/// reset between cycles and at close. The reset releases the owned consumer
/// and producer exactly once and empties the processing context.
pub(crate) struct Exchange {
    context: Arc<Context>,
    request_handler: Option<Arc<dyn RequestHandler>>,
    request_consumer: Option<Box<dyn RequestConsumer>>,
    response_producer: Option<Box<dyn ResponseProducer>>,
    request: Option<Request>,
    response: Option<Response>,
    handled: bool,
}

impl Exchange {
    pub(crate) fn new() -> Self {
        Self {
            context: Arc::new(Context::new()),
            request_handler: None,
            request_consumer: None,
            response_producer: None,
            request: None,
            response: None,
            handled: false,
        }
    }

    pub(crate) fn context(&self) -> &Arc<Context> {
        &self.context
    }

    pub(crate) fn request_handler(&self) -> Option<&Arc<dyn RequestHandler>> {
        self.request_handler.as_ref()
    }

    pub(crate) fn set_request_handler(&mut self, handler: Arc<dyn RequestHandler>) {
        self.request_handler = Some(handler);
    }

    pub(crate) fn request_consumer_mut(&mut self) -> Option<&mut (dyn RequestConsumer + 'static)> {
        self.request_consumer.as_deref_mut()
    }

    pub(crate) fn set_request_consumer(&mut self, consumer: Box<dyn RequestConsumer>) {
        self.request_consumer = Some(consumer);
    }

    pub(crate) fn response_producer_mut(&mut self) -> Option<&mut (dyn ResponseProducer + 'static)> {
        self.response_producer.as_deref_mut()
    }

    pub(crate) fn set_response_producer(&mut self, producer: Box<dyn ResponseProducer>) {
        self.response_producer = Some(producer);
    }

    pub(crate) fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    pub(crate) fn set_request(&mut self, request: Request) {
        self.request = Some(request);
    }

    pub(crate) fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    pub(crate) fn set_response(&mut self, response: Response) {
        self.response = Some(response);
    }

    pub(crate) fn set_handled(&mut self, handled: bool) {
        self.handled = handled;
    }

    /// Whether the next response-readiness event should commit a head:
    /// a producer is installed and no head has been generated yet.
    pub(crate) fn is_response_ready(&self) -> bool {
        !self.handled && self.response_producer.is_some()
    }

    /// Clears the record for the next cycle, releasing the consumer and the
    /// producer. Consumer close failures are reported through the listener;
    /// producer close failures are dropped.
    pub(crate) fn reset(&mut self, listener: &dyn ExceptionListener) {
        self.request_handler = None;
        if let Some(mut consumer) = self.request_consumer.take() {
            if let Err(err) = consumer.close() {
                listener.on_exception(&err.into());
            }
        }
        if let Some(mut producer) = self.response_producer.take() {
            if let Err(err) = producer.close() {
                debug!(cause = %err, "response producer close failed");
            }
        }
        self.request = None;
        self.response = None;
        self.handled = false;
        self.context.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::connection::{ContentDecoder, ContentEncoder, IoControl};
    use crate::protocol::{HttpError, HTTP_REQUEST};
    use crate::service::LoggingExceptionListener;

    #[derive(Default)]
    struct CloseCountingConsumer {
        closes: Arc<AtomicUsize>,
        close_error: bool,
    }

    impl RequestConsumer for CloseCountingConsumer {
        fn request_received(&mut self, _: &Request) -> Result<(), HttpError> {
            Ok(())
        }

        fn consume_content(&mut self, _: &mut dyn ContentDecoder, _: &dyn IoControl) -> Result<(), HttpError> {
            Ok(())
        }

        fn request_completed(&mut self, _: &Context) {}

        fn failure(&self) -> Option<&HttpError> {
            None
        }

        fn take_result(&mut self) -> Option<Box<dyn std::any::Any + Send>> {
            None
        }

        fn close(&mut self) -> io::Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.close_error {
                Err(io::Error::new(io::ErrorKind::Other, "close failed"))
            } else {
                Ok(())
            }
        }
    }

    #[derive(Default)]
    struct CloseCountingProducer {
        closes: Arc<AtomicUsize>,
    }

    impl crate::handler::ResponseProducer for CloseCountingProducer {
        fn generate_response(&mut self) -> Result<Response, HttpError> {
            Ok(Response::new(http::StatusCode::OK))
        }

        fn produce_content(&mut self, _: &mut dyn ContentEncoder, _: &dyn IoControl) -> io::Result<()> {
            Ok(())
        }

        fn close(&mut self) -> io::Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingListener {
        reported: Mutex<Vec<String>>,
    }

    impl ExceptionListener for RecordingListener {
        fn on_exception(&self, error: &HttpError) {
            self.reported.lock().unwrap().push(error.to_string());
        }
    }

    #[test]
    fn reset_clears_every_field_and_the_context() {
        let consumer_closes = Arc::new(AtomicUsize::new(0));
        let producer_closes = Arc::new(AtomicUsize::new(0));

        let mut exchange = Exchange::new();
        exchange.context().set(HTTP_REQUEST, 1_u8);
        exchange
            .set_request_consumer(Box::new(CloseCountingConsumer { closes: Arc::clone(&consumer_closes), close_error: false }));
        exchange.set_response_producer(Box::new(CloseCountingProducer { closes: Arc::clone(&producer_closes) }));
        exchange.set_request(Request::new(http::Method::GET, http::Uri::from_static("/")));
        exchange.set_response(Response::new(http::StatusCode::OK));
        exchange.set_handled(true);

        exchange.reset(&LoggingExceptionListener);

        assert_eq!(consumer_closes.load(Ordering::SeqCst), 1);
        assert_eq!(producer_closes.load(Ordering::SeqCst), 1);
        assert!(exchange.request_consumer_mut().is_none());
        assert!(exchange.response_producer_mut().is_none());
        assert!(exchange.request().is_none());
        assert!(exchange.response().is_none());
        assert!(!exchange.is_response_ready());
        assert!(exchange.context().is_empty());

        // A second reset releases nothing twice.
        exchange.reset(&LoggingExceptionListener);
        assert_eq!(consumer_closes.load(Ordering::SeqCst), 1);
        assert_eq!(producer_closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn consumer_close_failure_is_reported() {
        let listener = RecordingListener::default();
        let mut exchange = Exchange::new();
        exchange.set_request_consumer(Box::new(CloseCountingConsumer { closes: Arc::default(), close_error: true }));

        exchange.reset(&listener);
        assert_eq!(listener.reported.lock().unwrap().len(), 1);
    }

    #[test]
    fn response_ready_needs_a_producer_and_an_uncommitted_head() {
        let mut exchange = Exchange::new();
        assert!(!exchange.is_response_ready());

        exchange.set_response_producer(Box::new(CloseCountingProducer::default()));
        assert!(exchange.is_response_ready());

        exchange.set_handled(true);
        assert!(!exchange.is_response_ready());
    }
}
