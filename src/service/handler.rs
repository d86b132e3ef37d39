//! The HTTP service: an event-driven state machine over readiness callbacks.
//!
//! One [`HttpService`] instance serves any number of connections; all
//! per-connection state lives in the exchange record attached to the
//! connection context at the connect event. The reactor may deliver
//! callbacks for the same connection from different threads; every callback
//! body locks the exchange, so observed state always follows the logical
//! phase order of a single request/response cycle.
//!
//! Handlers are invoked after the lock is released. A synchronous
//! [`ResponseTrigger`] fire re-acquires it, which keeps the producer
//! installation and the output-readiness request jointly observable without
//! requiring a reentrant lock.

use std::any::Any;
use std::cmp;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use http::{StatusCode, Version};
use tracing::{debug, error};

use crate::connection::{
    ConnectionEventHandler, ConnectionStatus, ContentDecoder, ContentEncoder, ServerConnection,
};
use crate::handler::{HandlerResolver, NullRequestHandler, RequestHandler};
use crate::protocol::{
    ChainProcessor, Context, DefaultReuseStrategy, HttpError, HttpProcessor, Params, ProtocolError, Request, Response,
    ReuseStrategy, HTTP_CONNECTION, HTTP_REQUEST, HTTP_RESPONSE,
};
use crate::service::{
    error_response_producer, Exchange, ExceptionListener, LoggingExceptionListener, ResponseTrigger,
};

/// Attribute name under which the exchange state is attached to the
/// connection context.
const EXCHANGE_ATTR: &str = "http.nio.exchange";

/// The server-side HTTP/1.x protocol handler.
///
/// Sequences one exchange at a time per connection: request head receipt,
/// body consumption, handler invocation, response commit and body emission,
/// then reset and, policy permitting, the next request on the same
/// connection.
pub struct HttpService {
    resolver: Option<Arc<dyn HandlerResolver>>,
    processor: Arc<dyn HttpProcessor>,
    reuse_strategy: Arc<dyn ReuseStrategy>,
    listener: Arc<dyn ExceptionListener>,
    params: Arc<Params>,
}

/// Everything needed to invoke a handler once the exchange lock is released.
struct Dispatch {
    handler: Arc<dyn RequestHandler>,
    result: Option<Box<dyn Any + Send>>,
    trigger: ResponseTrigger,
    context: Arc<Context>,
}

impl HttpService {
    pub fn builder() -> HttpServiceBuilder {
        HttpServiceBuilder::default()
    }

    fn attached_exchange(&self, conn: &Arc<dyn ServerConnection>) -> Option<Arc<Mutex<Exchange>>> {
        let exchange = conn.context().get::<Arc<Mutex<Exchange>>>(EXCHANGE_ATTR);
        if exchange.is_none() {
            error!("readiness event for a connection without exchange state");
            self.shutdown_connection(conn);
        }
        exchange
    }

    fn resolve_handler(&self, request: &Request) -> Arc<dyn RequestHandler> {
        self.resolver
            .as_ref()
            .and_then(|resolver| resolver.lookup(&request.uri().to_string()))
            .unwrap_or_else(|| Arc::new(NullRequestHandler))
    }

    /// Graceful close, falling back to a hard shutdown.
    fn close_connection(&self, conn: &Arc<dyn ServerConnection>) {
        if let Err(err) = conn.close() {
            debug!(cause = %err, "graceful close failed, shutting down");
            if let Err(err) = conn.shutdown() {
                self.listener.on_exception(&err.into());
            }
        }
    }

    fn shutdown_connection(&self, conn: &Arc<dyn ServerConnection>) {
        if let Err(err) = conn.shutdown() {
            self.listener.on_exception(&err.into());
        }
    }

    /// Severs the connection and reports; the terminal outcome of every
    /// non-recoverable callback error.
    fn fail(&self, conn: &Arc<dyn ServerConnection>, error: HttpError) {
        self.shutdown_connection(conn);
        self.listener.on_exception(&error);
    }

    fn dispatch(&self, conn: &Arc<dyn ServerConnection>, dispatch: Dispatch) {
        let Dispatch { handler, result, trigger, context } = dispatch;
        if let Err(err) = handler.handle(result, trigger, &context) {
            self.fail(conn, err);
        }
    }

    fn on_request_received(
        &self,
        conn: &Arc<dyn ServerConnection>,
        exchange: &Arc<Mutex<Exchange>>,
        state: &mut Exchange,
    ) -> Result<Option<Dispatch>, HttpError> {
        let mut request = conn.http_request().ok_or(ProtocolError::MissingRequest)?;
        request.params_mut().set_defaults(Arc::clone(&self.params));

        let context = Arc::clone(state.context());
        context.set(HTTP_REQUEST, request.clone());
        context.set(HTTP_CONNECTION, Arc::clone(conn));

        self.processor.process_request(&mut request, &context)?;

        let handler = self.resolve_handler(&request);
        let consumer = handler.process_request(&request, &context)?;

        state.set_request_handler(handler);
        state.set_request_consumer(consumer);
        state.set_request(request.clone());
        if let Some(consumer) = state.request_consumer_mut() {
            consumer.request_received(&request)?;
        }

        if request.is_entity_enclosing() {
            if request.expects_continue() {
                // Interim ack, downgraded to HTTP/1.1 if the request claims
                // a higher version. Input stays enabled for the body.
                let version = cmp::min(request.version(), Version::HTTP_11);
                let mut ack = Response::new(StatusCode::CONTINUE).with_version(version);
                ack.params_mut().set_defaults(Arc::clone(&self.params));
                conn.submit_response(ack)?;
            }
            Ok(None)
        } else {
            conn.suspend_input();
            self.process_request(conn, exchange, state)
        }
    }

    fn on_input_ready(
        &self,
        conn: &Arc<dyn ServerConnection>,
        exchange: &Arc<Mutex<Exchange>>,
        state: &mut Exchange,
        decoder: &mut dyn ContentDecoder,
    ) -> Result<Option<Dispatch>, HttpError> {
        {
            let consumer = state
                .request_consumer_mut()
                .ok_or_else(|| ProtocolError::invalid_message("request content without a consumer"))?;
            consumer.consume_content(decoder, &**conn)?;
        }
        if decoder.is_completed() {
            conn.suspend_input();
            self.process_request(conn, exchange, state)
        } else {
            Ok(None)
        }
    }

    /// Transition out of the receiving phases: completes the consumer and
    /// either installs a mapped error response or prepares the handler
    /// dispatch the caller runs after unlocking.
    fn process_request(
        &self,
        conn: &Arc<dyn ServerConnection>,
        exchange: &Arc<Mutex<Exchange>>,
        state: &mut Exchange,
    ) -> Result<Option<Dispatch>, HttpError> {
        let context = Arc::clone(state.context());
        let (failed, result) = {
            let consumer = state
                .request_consumer_mut()
                .ok_or_else(|| ProtocolError::invalid_message("request completed without a consumer"))?;
            consumer.request_completed(&context);
            match consumer.failure() {
                Some(failure) => (Some(error_response_producer(failure)), None),
                None => (None, consumer.take_result()),
            }
        };

        if let Some(producer) = failed {
            state.set_response_producer(Box::new(producer));
            conn.request_output();
            return Ok(None);
        }

        let handler = state
            .request_handler()
            .cloned()
            .ok_or_else(|| ProtocolError::invalid_message("request completed without a handler"))?;
        let trigger = ResponseTrigger::new(Arc::clone(exchange), Arc::clone(conn));
        Ok(Some(Dispatch { handler, result, trigger, context }))
    }

    /// Commits the response head: generates it from the installed producer,
    /// runs the response interceptors, applies body suppression, submits the
    /// head, and for head-only responses finishes the cycle on the spot.
    fn commit_response(&self, conn: &Arc<dyn ServerConnection>, state: &mut Exchange) -> Result<(), HttpError> {
        let context = Arc::clone(state.context());
        let mut response = {
            let producer = state
                .response_producer_mut()
                .ok_or_else(|| ProtocolError::invalid_message("commit without a response producer"))?;
            producer.generate_response()?
        };
        response.params_mut().set_defaults(Arc::clone(&self.params));

        self.processor.process_response(&mut response, &context)?;

        state.set_handled(true);

        if !can_response_have_body(state.request(), &response) {
            response.take_entity();
        }
        let has_entity = response.entity().is_some();

        state.set_response(response.clone());
        context.set(HTTP_RESPONSE, response.clone());
        conn.submit_response(response.clone())?;
        debug!(status = response.status().as_u16(), "response head committed");

        if !has_entity {
            state.reset(self.listener.as_ref());
            if self.reuse_strategy.keep_alive(&response, &context) {
                conn.request_input();
            } else {
                conn.close()?;
            }
        }
        Ok(())
    }

    fn on_output_ready(
        &self,
        conn: &Arc<dyn ServerConnection>,
        state: &mut Exchange,
        encoder: &mut dyn ContentEncoder,
    ) -> Result<(), HttpError> {
        let context = Arc::clone(state.context());
        let response = state.response().cloned();
        {
            let producer = state
                .response_producer_mut()
                .ok_or_else(|| ProtocolError::invalid_message("output readiness without a response producer"))?;
            producer.produce_content(encoder, &**conn)?;
        }

        if encoder.is_completed() {
            state.reset(self.listener.as_ref());
            let keep_alive =
                response.map_or(false, |response| self.reuse_strategy.keep_alive(&response, &context));
            if keep_alive {
                conn.request_input();
            } else {
                conn.close()?;
            }
        }
        Ok(())
    }
}

impl ConnectionEventHandler for HttpService {
    fn connected(&self, conn: &Arc<dyn ServerConnection>) {
        debug!("connection ready");
        conn.context().set(EXCHANGE_ATTR, Arc::new(Mutex::new(Exchange::new())));
    }

    fn closed(&self, conn: &Arc<dyn ServerConnection>) {
        debug!("connection closed");
        if let Some(exchange) = conn.context().get::<Arc<Mutex<Exchange>>>(EXCHANGE_ATTR) {
            exchange.lock().unwrap().reset(self.listener.as_ref());
        }
    }

    fn request_received(&self, conn: &Arc<dyn ServerConnection>) {
        let Some(exchange) = self.attached_exchange(conn) else { return };
        let mut state = exchange.lock().unwrap();
        match self.on_request_received(conn, &exchange, &mut state) {
            Ok(dispatch) => {
                drop(state);
                if let Some(dispatch) = dispatch {
                    self.dispatch(conn, dispatch);
                }
            }
            Err(err) => {
                drop(state);
                self.fail(conn, err);
            }
        }
    }

    fn input_ready(&self, conn: &Arc<dyn ServerConnection>, decoder: &mut dyn ContentDecoder) {
        let Some(exchange) = self.attached_exchange(conn) else { return };
        let mut state = exchange.lock().unwrap();
        match self.on_input_ready(conn, &exchange, &mut state, decoder) {
            Ok(dispatch) => {
                drop(state);
                if let Some(dispatch) = dispatch {
                    self.dispatch(conn, dispatch);
                }
            }
            Err(err) => {
                drop(state);
                self.fail(conn, err);
            }
        }
    }

    fn response_ready(&self, conn: &Arc<dyn ServerConnection>) {
        let Some(exchange) = self.attached_exchange(conn) else { return };
        let mut state = exchange.lock().unwrap();
        if !state.is_response_ready() {
            // Spurious or premature readiness; the committed flag and the
            // producer decide, not the event.
            return;
        }
        if let Err(err) = self.commit_response(conn, &mut state) {
            drop(state);
            self.fail(conn, err);
        }
    }

    fn output_ready(&self, conn: &Arc<dyn ServerConnection>, encoder: &mut dyn ContentEncoder) {
        let Some(exchange) = self.attached_exchange(conn) else { return };
        let mut state = exchange.lock().unwrap();
        if let Err(err) = self.on_output_ready(conn, &mut state, encoder) {
            drop(state);
            self.fail(conn, err);
        }
    }

    fn timeout(&self, conn: &Arc<dyn ServerConnection>) {
        let outcome = (|| -> io::Result<()> {
            if conn.status() == ConnectionStatus::Active {
                conn.close()?;
                if conn.status() == ConnectionStatus::Closing {
                    // Grace window for the close handshake to finish.
                    conn.set_socket_timeout(Duration::from_millis(250));
                }
            } else {
                conn.shutdown()?;
            }
            Ok(())
        })();
        if let Err(err) = outcome {
            self.listener.on_exception(&err.into());
        }
    }

    fn protocol_error(&self, conn: &Arc<dyn ServerConnection>, error: ProtocolError) {
        if conn.is_response_submitted() {
            // A head is already on the wire; nothing left to answer with.
            self.close_connection(conn);
            self.listener.on_exception(&error.into());
            return;
        }
        let Some(exchange) = self.attached_exchange(conn) else { return };
        let mut state = exchange.lock().unwrap();
        let error = HttpError::from(error);
        state.set_response_producer(Box::new(error_response_producer(&error)));
        if let Err(err) = self.commit_response(conn, &mut state) {
            drop(state);
            self.fail(conn, err);
        }
    }

    fn io_error(&self, conn: &Arc<dyn ServerConnection>, error: io::Error) {
        self.shutdown_connection(conn);
        self.listener.on_exception(&error.into());
    }
}

/// Whether the response may carry an entity for this request.
///
/// `HEAD` requests and the bodyless statuses suppress the entity. Statuses
/// below 200 land in the suppressing branch as well; the only interim
/// response this service sends (`100 Continue`) is submitted directly and
/// never reaches this check.
fn can_response_have_body(request: Option<&Request>, response: &Response) -> bool {
    if let Some(request) = request {
        if request.method().as_str().eq_ignore_ascii_case("HEAD") {
            return false;
        }
    }
    let status = response.status().as_u16();
    status >= 200 && status != 204 && status != 205 && status != 304
}

/// Assembles an [`HttpService`].
///
/// Every collaborator has a default: the standard server interceptor chain,
/// the default reuse strategy, the logging exception listener, empty
/// parameters and no resolver (every request answered by the null handler).
#[derive(Default)]
pub struct HttpServiceBuilder {
    resolver: Option<Arc<dyn HandlerResolver>>,
    processor: Option<Arc<dyn HttpProcessor>>,
    reuse_strategy: Option<Arc<dyn ReuseStrategy>>,
    listener: Option<Arc<dyn ExceptionListener>>,
    params: Params,
}

impl HttpServiceBuilder {
    pub fn resolver(mut self, resolver: Arc<dyn HandlerResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn processor(mut self, processor: Arc<dyn HttpProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    pub fn reuse_strategy(mut self, strategy: Arc<dyn ReuseStrategy>) -> Self {
        self.reuse_strategy = Some(strategy);
        self
    }

    pub fn exception_listener(mut self, listener: Arc<dyn ExceptionListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Shortcut for the `http.origin-server` parameter consumed by the
    /// `Server` response interceptor.
    pub fn origin_server(mut self, name: impl Into<String>) -> Self {
        self.params.set(crate::protocol::params::ORIGIN_SERVER, name.into());
        self
    }

    pub fn build(self) -> HttpService {
        HttpService {
            resolver: self.resolver,
            processor: self.processor.unwrap_or_else(|| Arc::new(ChainProcessor::server_default())),
            reuse_strategy: self.reuse_strategy.unwrap_or_else(|| Arc::new(DefaultReuseStrategy)),
            listener: self.listener.unwrap_or_else(|| Arc::new(LoggingExceptionListener)),
            params: Arc::new(self.params),
        }
    }
}
