//! HTTP response record and buffered entities.

use bytes::Bytes;
use http::header::HeaderValue;
use http::{HeaderMap, StatusCode, Version};

use crate::protocol::Params;

/// A buffered response entity: content bytes plus an optional content type.
///
/// An `Entity` on a [`Response`] marks that the response has a body and
/// carries the buffered content simple producers stream out. Cloning is
/// cheap; the content is reference-counted.
#[derive(Debug, Clone)]
pub struct Entity {
    content: Bytes,
    content_type: Option<HeaderValue>,
}

impl Entity {
    pub fn new(content: impl Into<Bytes>) -> Self {
        Self { content: content.into(), content_type: None }
    }

    /// Creates a plain-text entity.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Bytes::from(content.into()),
            content_type: Some(HeaderValue::from_static("text/plain; charset=us-ascii")),
        }
    }

    pub fn with_content_type(mut self, content_type: HeaderValue) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn content_type(&self) -> Option<&HeaderValue> {
        self.content_type.as_ref()
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// An HTTP response head, optionally carrying a buffered [`Entity`].
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    params: Params,
    entity: Option<Entity>,
}

impl Response {
    /// Creates a response with the given status at HTTP/1.1.
    pub fn new(status: StatusCode) -> Self {
        Self { status, version: Version::HTTP_11, headers: HeaderMap::new(), params: Params::new(), entity: None }
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entity = Some(entity);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
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

    pub fn entity(&self) -> Option<&Entity> {
        self.entity.as_ref()
    }

    pub fn set_entity(&mut self, entity: Entity) {
        self.entity = Some(entity);
    }

    /// Strips and returns the entity, leaving a head-only response.
    pub fn take_entity(&mut self) -> Option<Entity> {
        self.entity.take()
    }
}
