//! Interceptor chains for outgoing and incoming messages.
//!
//! An [`HttpProcessor`] runs over every request before handler resolution and
//! over every response before its head is submitted to the connection. The
//! standard response interceptors cover the headers an origin server is
//! expected to maintain: `Date`, `Server`, content delimiting and connection
//! control on error statuses.

use http::header::{HeaderValue, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, DATE, SERVER, TRANSFER_ENCODING};
use http::StatusCode;
use httpdate::fmt_http_date;
use std::time::SystemTime;

use crate::ensure;
use crate::protocol::params::ORIGIN_SERVER;
use crate::protocol::{Context, HttpError, ProtocolError, Request, Response};

/// An interceptor applied to requests before handler resolution.
pub trait RequestInterceptor: Send + Sync {
    fn process(&self, request: &mut Request, context: &Context) -> Result<(), HttpError>;
}

/// An interceptor applied to responses before head submission.
pub trait ResponseInterceptor: Send + Sync {
    fn process(&self, response: &mut Response, context: &Context) -> Result<(), HttpError>;
}

/// An ordered interceptor chain over requests and responses.
pub trait HttpProcessor: Send + Sync {
    fn process_request(&self, request: &mut Request, context: &Context) -> Result<(), HttpError>;

    fn process_response(&self, response: &mut Response, context: &Context) -> Result<(), HttpError>;
}

/// [`HttpProcessor`] backed by interceptor lists, run in registration order.
#[derive(Default)]
pub struct ChainProcessor {
    request_interceptors: Vec<Box<dyn RequestInterceptor>>,
    response_interceptors: Vec<Box<dyn ResponseInterceptor>>,
}

impl ChainProcessor {
    pub fn builder() -> ChainProcessorBuilder {
        ChainProcessorBuilder::default()
    }

    /// The standard origin-server chain: `Date`, `Server`, content
    /// delimiting, connection control.
    pub fn server_default() -> Self {
        Self::builder()
            .response_interceptor(ResponseDate)
            .response_interceptor(ResponseServer)
            .response_interceptor(ResponseContent)
            .response_interceptor(ResponseConnControl)
            .build()
    }
}

impl HttpProcessor for ChainProcessor {
    fn process_request(&self, request: &mut Request, context: &Context) -> Result<(), HttpError> {
        for interceptor in &self.request_interceptors {
            interceptor.process(request, context)?;
        }
        Ok(())
    }

    fn process_response(&self, response: &mut Response, context: &Context) -> Result<(), HttpError> {
        for interceptor in &self.response_interceptors {
            interceptor.process(response, context)?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct ChainProcessorBuilder {
    request_interceptors: Vec<Box<dyn RequestInterceptor>>,
    response_interceptors: Vec<Box<dyn ResponseInterceptor>>,
}

impl ChainProcessorBuilder {
    pub fn request_interceptor(mut self, interceptor: impl RequestInterceptor + 'static) -> Self {
        self.request_interceptors.push(Box::new(interceptor));
        self
    }

    pub fn response_interceptor(mut self, interceptor: impl ResponseInterceptor + 'static) -> Self {
        self.response_interceptors.push(Box::new(interceptor));
        self
    }

    pub fn build(self) -> ChainProcessor {
        ChainProcessor {
            request_interceptors: self.request_interceptors,
            response_interceptors: self.response_interceptors,
        }
    }
}

/// Sets the `Date` header on final responses that lack one.
pub struct ResponseDate;

impl ResponseInterceptor for ResponseDate {
    fn process(&self, response: &mut Response, _context: &Context) -> Result<(), HttpError> {
        if response.status().as_u16() >= 200 && !response.headers().contains_key(DATE) {
            let date = fmt_http_date(SystemTime::now());
            let value = HeaderValue::from_str(&date).map_err(|_| ProtocolError::invalid_message("invalid date header value"))?;
            response.headers_mut().insert(DATE, value);
        }
        Ok(())
    }
}

/// Sets the `Server` header from the `http.origin-server` parameter, unless
/// the handler already set one.
pub struct ResponseServer;

impl ResponseInterceptor for ResponseServer {
    fn process(&self, response: &mut Response, _context: &Context) -> Result<(), HttpError> {
        if response.headers().contains_key(SERVER) {
            return Ok(());
        }
        if let Some(origin) = response.params().str_param(ORIGIN_SERVER) {
            let value = HeaderValue::from_str(origin)
                .map_err(|_| ProtocolError::invalid_message("invalid origin server parameter"))?;
            response.headers_mut().insert(SERVER, value);
        }
        Ok(())
    }
}

/// Delimits the response content: sets `Content-Length` from the entity, or
/// an explicit zero for entity-less responses on statuses that allow a body.
///
/// Responses that already carry delimiter headers are rejected; the head has
/// not been submitted yet, so this still surfaces as a 500 to the client.
pub struct ResponseContent;

impl ResponseInterceptor for ResponseContent {
    fn process(&self, response: &mut Response, _context: &Context) -> Result<(), HttpError> {
        ensure!(
            !response.headers().contains_key(TRANSFER_ENCODING),
            ProtocolError::invalid_message("Transfer-Encoding header already present").into()
        );
        ensure!(
            !response.headers().contains_key(CONTENT_LENGTH),
            ProtocolError::invalid_message("Content-Length header already present").into()
        );

        let status = response.status();
        match response.entity() {
            Some(entity) => {
                ensure!(
                    !status.is_informational(),
                    ProtocolError::invalid_message("informational response may not enclose an entity").into()
                );
                let length = HeaderValue::from(entity.len() as u64);
                let content_type = entity.content_type().cloned();
                response.headers_mut().insert(CONTENT_LENGTH, length);
                if let Some(content_type) = content_type {
                    if !response.headers().contains_key(CONTENT_TYPE) {
                        response.headers_mut().insert(CONTENT_TYPE, content_type);
                    }
                }
            }
            None => {
                let status = status.as_u16();
                if status != 204 && status != 304 && status != 205 {
                    response.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
                }
            }
        }
        Ok(())
    }
}

/// Forces `Connection: close` on error statuses that poison the connection
/// state, unless the connection disposition was already negotiated.
pub struct ResponseConnControl;

impl ResponseConnControl {
    // 400, 406, 408, 411, 413, 414, 503: after these the connection state
    // cannot be trusted for another exchange.
    fn must_close(status: StatusCode) -> bool {
        matches!(status.as_u16(), 400 | 406 | 408 | 411 | 413 | 414 | 503)
    }
}

impl ResponseInterceptor for ResponseConnControl {
    fn process(&self, response: &mut Response, _context: &Context) -> Result<(), HttpError> {
        if !response.headers().contains_key(CONNECTION) && Self::must_close(response.status()) {
            response.headers_mut().insert(CONNECTION, HeaderValue::from_static("close"));
        }
        Ok(())
    }
}
