//! HTTP request record.
//!
//! This module provides the request-head representation the service works
//! with. It composes the standard `http` primitives (method, URI, version,
//! header map) with the layered [`Params`] bag, and adds the two predicates
//! the exchange state machine branches on: whether the request encloses an
//! entity, and whether it expects a `100 Continue` acknowledgement.

use http::header::{CONTENT_LENGTH, EXPECT, TRANSFER_ENCODING};
use http::{HeaderMap, Method, Uri, Version};

use crate::protocol::Params;

/// An HTTP request head as delivered by the connection.
///
/// The body is not part of this record; request content arrives incrementally
/// through a content decoder and is consumed by the handler-supplied request
/// consumer.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    params: Params,
}

impl Request {
    /// Creates a request head with the given method and URI at HTTP/1.1.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self { method, uri, version: Version::HTTP_11, headers: HeaderMap::new(), params: Params::new() }
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }

    /// Whether this request encloses an entity body.
    ///
    /// True when a `Transfer-Encoding` is present, or when `Content-Length`
    /// parses to a value greater than zero. A request with
    /// `Content-Length: 0` takes the no-entity fast path; consuming an empty
    /// body and skipping it are observationally identical.
    pub fn is_entity_enclosing(&self) -> bool {
        if self.headers.contains_key(TRANSFER_ENCODING) {
            return true;
        }
        self.headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .is_some_and(|length| length > 0)
    }

    /// Whether this request declares `Expect: 100-continue` (case-insensitive).
    pub fn expects_continue(&self) -> bool {
        self.headers
            .get(EXPECT)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("100-continue"))
    }
}
