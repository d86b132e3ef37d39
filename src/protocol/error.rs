//! Error types for the protocol core.
//!
//! [`HttpError`] is the top-level error type at the API boundary. It wraps
//! [`ProtocolError`] (conditions with a defined HTTP answer: 501, 505, 400),
//! transport failures (`std::io::Error`) and handler failures. The service
//! turns protocol-level and consumer-recorded errors into synthetic error
//! responses; everything else severs the connection.

use std::io;

use http::Version;
use thiserror::Error;

/// The top-level error type for the protocol core.
#[derive(Debug, Error)]
pub enum HttpError {
    /// A violation of the HTTP protocol, answerable with an error response.
    #[error("protocol error: {source}")]
    Protocol {
        #[from]
        source: ProtocolError,
    },

    /// An I/O failure on the underlying connection.
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// A failure inside a request handler, consumer or producer.
    #[error("handler error: {reason}")]
    Handler { reason: String },
}

impl HttpError {
    /// Creates a new handler-side error.
    pub fn handler<S: ToString>(reason: S) -> Self {
        Self::Handler { reason: reason.to_string() }
    }
}

/// Violations of the HTTP protocol detected while receiving or processing
/// a request.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The request method is recognized but not supported.
    #[error("method not supported: {method}")]
    MethodNotSupported { method: String },

    /// The request declares an HTTP version this server cannot serve.
    #[error("http version not supported: {version:?}")]
    UnsupportedVersion { version: Version },

    /// Any other malformed or unprocessable message.
    #[error("invalid message: {reason}")]
    InvalidMessage { reason: String },

    /// The connection reported a request event without a request head.
    #[error("no request available on connection")]
    MissingRequest,
}

impl ProtocolError {
    /// Creates a new MethodNotSupported error.
    pub fn method_not_supported<S: ToString>(method: S) -> Self {
        Self::MethodNotSupported { method: method.to_string() }
    }

    /// Creates a new UnsupportedVersion error.
    pub fn unsupported_version(version: Version) -> Self {
        Self::UnsupportedVersion { version }
    }

    /// Creates a new InvalidMessage error.
    pub fn invalid_message<S: ToString>(reason: S) -> Self {
        Self::InvalidMessage { reason: reason.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_the_underlying_message() {
        let err = HttpError::from(ProtocolError::method_not_supported("BREW"));
        assert_eq!(err.to_string(), "protocol error: method not supported: BREW");

        let err = HttpError::from(ProtocolError::unsupported_version(Version::HTTP_3));
        assert!(err.to_string().contains("version not supported"));

        let err = HttpError::handler("downcast failed");
        assert_eq!(err.to_string(), "handler error: downcast failed");
    }
}
