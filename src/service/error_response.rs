//! Mapping of exceptional conditions to synthetic error responses.

use http::header::HeaderValue;
use http::{StatusCode, Version};

use crate::handler::EntityResponseProducer;
use crate::protocol::{Entity, HttpError, ProtocolError, Response};

/// Builds the producer for a user-visible error response.
///
/// Method-not-supported maps to 501, unsupported version to 505, any other
/// protocol violation to 400, everything else to 500. The response is
/// HTTP/1.0 with `Connection: close` and a plain-text body carrying the
/// error message.
pub(crate) fn error_response_producer(error: &HttpError) -> EntityResponseProducer {
    let (status, message) = match error {
        HttpError::Protocol { source } => {
            let status = match source {
                ProtocolError::MethodNotSupported { .. } => StatusCode::NOT_IMPLEMENTED,
                ProtocolError::UnsupportedVersion { .. } => StatusCode::HTTP_VERSION_NOT_SUPPORTED,
                _ => StatusCode::BAD_REQUEST,
            };
            (status, source.to_string())
        }
        HttpError::Io { source } => (StatusCode::INTERNAL_SERVER_ERROR, source.to_string()),
        HttpError::Handler { reason } => (StatusCode::INTERNAL_SERVER_ERROR, reason.clone()),
    };

    let mut response = Response::new(status).with_version(Version::HTTP_10).with_entity(Entity::text(message));
    response.headers_mut().insert(http::header::CONNECTION, HeaderValue::from_static("close"));
    EntityResponseProducer::new(response)
}
