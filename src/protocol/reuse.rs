//! Connection-reuse policy.

use http::header::CONNECTION;
use http::Version;

use crate::protocol::{Context, Response};

/// Decides whether the connection can be kept alive after a response.
pub trait ReuseStrategy: Send + Sync {
    fn keep_alive(&self, response: &Response, context: &Context) -> bool;
}

/// The default HTTP/1.x policy.
///
/// A `close` token on the response `Connection` header wins; an explicit
/// `keep-alive` token enables reuse at any version; otherwise reuse follows
/// the version (persistent by default from HTTP/1.1 on).
pub struct DefaultReuseStrategy;

impl ReuseStrategy for DefaultReuseStrategy {
    fn keep_alive(&self, response: &Response, _context: &Context) -> bool {
        let tokens: Vec<&str> = response
            .headers()
            .get_all(CONNECTION)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .collect();

        if tokens.iter().any(|token| token.eq_ignore_ascii_case("close")) {
            return false;
        }
        if tokens.iter().any(|token| token.eq_ignore_ascii_case("keep-alive")) {
            return true;
        }
        response.version() >= Version::HTTP_11
    }
}

/// A policy for servers that never reuse connections.
pub struct AlwaysClose;

impl ReuseStrategy for AlwaysClose {
    fn keep_alive(&self, _response: &Response, _context: &Context) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use http::header::HeaderValue;
    use http::StatusCode;

    use super::*;

    fn response(version: Version) -> Response {
        Response::new(StatusCode::OK).with_version(version)
    }

    #[test]
    fn close_token_wins() {
        let mut resp = response(Version::HTTP_11);
        resp.headers_mut().insert(CONNECTION, HeaderValue::from_static("Close"));
        assert!(!DefaultReuseStrategy.keep_alive(&resp, &Context::new()));
    }

    #[test]
    fn explicit_keep_alive_enables_reuse_on_http_10() {
        let mut resp = response(Version::HTTP_10);
        resp.headers_mut().insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        assert!(DefaultReuseStrategy.keep_alive(&resp, &Context::new()));
    }

    #[test]
    fn version_decides_when_unnegotiated() {
        assert!(DefaultReuseStrategy.keep_alive(&response(Version::HTTP_11), &Context::new()));
        assert!(!DefaultReuseStrategy.keep_alive(&response(Version::HTTP_10), &Context::new()));
    }

    #[test]
    fn close_beats_keep_alive_in_a_token_list() {
        let mut resp = response(Version::HTTP_11);
        resp.headers_mut().insert(CONNECTION, HeaderValue::from_static("keep-alive, close"));
        assert!(!DefaultReuseStrategy.keep_alive(&resp, &Context::new()));
    }

    #[test]
    fn always_close_never_reuses() {
        assert!(!AlwaysClose.keep_alive(&response(Version::HTTP_11), &Context::new()));
    }
}
