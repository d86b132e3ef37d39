//! Basic consumer, producer and handler building blocks.
//!
//! These cover the common buffered case: the whole request is aggregated in
//! memory before the handler runs, and the whole response entity is buffered
//! before it streams out. Streaming handlers implement the traits in
//! [`crate::handler`] directly.

use std::any::Any;
use std::io;
use std::sync::Arc;

use bytes::{Buf, Bytes, BytesMut};
use http::header::HeaderValue;
use http::{StatusCode, Version};

use crate::connection::{ContentDecoder, ContentEncoder, IoControl};
use crate::handler::{RequestConsumer, RequestHandler, ResponseProducer};
use crate::protocol::{Context, Entity, HttpError, Request, Response};
use crate::service::ResponseTrigger;

/// The result of a [`BufferingRequestConsumer`]: the request head plus the
/// fully aggregated body.
#[derive(Debug)]
pub struct BufferedRequest {
    pub request: Request,
    pub body: Bytes,
}

/// Aggregates the complete request body in memory.
#[derive(Default)]
pub struct BufferingRequestConsumer {
    request: Option<Request>,
    buf: BytesMut,
    failure: Option<HttpError>,
    result: Option<Box<dyn Any + Send>>,
}

impl BufferingRequestConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure; the service answers with a mapped error response
    /// instead of invoking the handler.
    pub fn fail(&mut self, failure: HttpError) {
        self.failure = Some(failure);
    }
}

impl RequestConsumer for BufferingRequestConsumer {
    fn request_received(&mut self, request: &Request) -> Result<(), HttpError> {
        self.request = Some(request.clone());
        Ok(())
    }

    fn consume_content(&mut self, decoder: &mut dyn ContentDecoder, _ioctl: &dyn IoControl) -> Result<(), HttpError> {
        loop {
            let transferred = decoder.read(&mut self.buf)?;
            if transferred == 0 || decoder.is_completed() {
                return Ok(());
            }
        }
    }

    fn request_completed(&mut self, _context: &Context) {
        if let Some(request) = self.request.take() {
            let body = self.buf.split().freeze();
            self.result = Some(Box::new(BufferedRequest { request, body }));
        }
    }

    fn failure(&self) -> Option<&HttpError> {
        self.failure.as_ref()
    }

    fn take_result(&mut self) -> Option<Box<dyn Any + Send>> {
        self.result.take()
    }

    fn close(&mut self) -> io::Result<()> {
        self.buf.clear();
        self.result = None;
        Ok(())
    }
}

/// Sinks and drops request content.
#[derive(Default)]
pub struct DiscardingRequestConsumer {
    scratch: BytesMut,
}

impl DiscardingRequestConsumer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RequestConsumer for DiscardingRequestConsumer {
    fn request_received(&mut self, _request: &Request) -> Result<(), HttpError> {
        Ok(())
    }

    fn consume_content(&mut self, decoder: &mut dyn ContentDecoder, _ioctl: &dyn IoControl) -> Result<(), HttpError> {
        loop {
            self.scratch.clear();
            let transferred = decoder.read(&mut self.scratch)?;
            if transferred == 0 || decoder.is_completed() {
                return Ok(());
            }
        }
    }

    fn request_completed(&mut self, _context: &Context) {}

    fn failure(&self) -> Option<&HttpError> {
        None
    }

    fn take_result(&mut self) -> Option<Box<dyn Any + Send>> {
        None
    }

    fn close(&mut self) -> io::Result<()> {
        self.scratch.clear();
        Ok(())
    }
}

/// Streams a buffered [`Response`] entity through the content encoder.
pub struct EntityResponseProducer {
    response: Response,
    remaining: Bytes,
}

impl EntityResponseProducer {
    pub fn new(response: Response) -> Self {
        let remaining = response.entity().map(|entity| entity.content().clone()).unwrap_or_default();
        Self { response, remaining }
    }
}

impl ResponseProducer for EntityResponseProducer {
    fn generate_response(&mut self) -> Result<Response, HttpError> {
        Ok(self.response.clone())
    }

    fn produce_content(&mut self, encoder: &mut dyn ContentEncoder, _ioctl: &dyn IoControl) -> io::Result<()> {
        while !self.remaining.is_empty() {
            let written = encoder.write(&self.remaining)?;
            if written == 0 {
                // Transport buffer full; resume on the next output event.
                return Ok(());
            }
            self.remaining.advance(written);
        }
        encoder.complete()
    }

    fn close(&mut self) -> io::Result<()> {
        self.remaining = Bytes::new();
        Ok(())
    }
}

/// Adapts a synchronous closure into a [`RequestHandler`].
///
/// The request is buffered in full, the closure computes a [`Response`], and
/// the trigger is fired before `handle` returns.
pub struct SimpleRequestHandler<F> {
    f: F,
}

impl<F> RequestHandler for SimpleRequestHandler<F>
where
    F: Fn(BufferedRequest, &Context) -> Result<Response, HttpError> + Send + Sync,
{
    fn process_request(&self, _request: &Request, _context: &Context) -> Result<Box<dyn RequestConsumer>, HttpError> {
        Ok(Box::new(BufferingRequestConsumer::new()))
    }

    fn handle(
        &self,
        result: Option<Box<dyn Any + Send>>,
        trigger: ResponseTrigger,
        context: &Arc<Context>,
    ) -> Result<(), HttpError> {
        let buffered = result
            .and_then(|result| result.downcast::<BufferedRequest>().ok())
            .ok_or_else(|| HttpError::handler("expected a buffered request result"))?;
        let response = (self.f)(*buffered, context.as_ref())?;
        trigger.submit_response(Box::new(EntityResponseProducer::new(response)))?;
        Ok(())
    }
}

/// Wraps a closure in a [`SimpleRequestHandler`].
pub fn make_handler<F>(f: F) -> SimpleRequestHandler<F>
where
    F: Fn(BufferedRequest, &Context) -> Result<Response, HttpError> + Send + Sync,
{
    SimpleRequestHandler { f }
}

/// The handler of last resort: discards the request and answers
/// `501 Not Implemented` on a closing connection.
pub struct NullRequestHandler;

impl RequestHandler for NullRequestHandler {
    fn process_request(&self, _request: &Request, _context: &Context) -> Result<Box<dyn RequestConsumer>, HttpError> {
        Ok(Box::new(DiscardingRequestConsumer::new()))
    }

    fn handle(
        &self,
        _result: Option<Box<dyn Any + Send>>,
        trigger: ResponseTrigger,
        _context: &Arc<Context>,
    ) -> Result<(), HttpError> {
        let mut response = Response::new(StatusCode::NOT_IMPLEMENTED)
            .with_version(Version::HTTP_11)
            .with_entity(Entity::text("Service not implemented"));
        response.headers_mut().insert(http::header::CONNECTION, HeaderValue::from_static("close"));
        trigger.submit_response(Box::new(EntityResponseProducer::new(response)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use http::Method;
    use http::Uri;

    use super::*;

    struct ChunkDecoder {
        chunks: VecDeque<Bytes>,
    }

    impl ChunkDecoder {
        fn new(chunks: &[&[u8]]) -> Self {
            Self { chunks: chunks.iter().map(|c| Bytes::copy_from_slice(c)).collect() }
        }
    }

    impl ContentDecoder for ChunkDecoder {
        fn read(&mut self, dst: &mut BytesMut) -> io::Result<usize> {
            match self.chunks.pop_front() {
                Some(chunk) => {
                    dst.extend_from_slice(&chunk);
                    Ok(chunk.len())
                }
                None => Ok(0),
            }
        }

        fn is_completed(&self) -> bool {
            self.chunks.is_empty()
        }
    }

    struct SinkEncoder {
        written: BytesMut,
        completed: bool,
        max_per_write: usize,
    }

    impl SinkEncoder {
        fn new(max_per_write: usize) -> Self {
            Self { written: BytesMut::new(), completed: false, max_per_write }
        }
    }

    impl ContentEncoder for SinkEncoder {
        fn write(&mut self, src: &[u8]) -> io::Result<usize> {
            let accepted = src.len().min(self.max_per_write);
            self.written.extend_from_slice(&src[..accepted]);
            Ok(accepted)
        }

        fn complete(&mut self) -> io::Result<()> {
            self.completed = true;
            Ok(())
        }

        fn is_completed(&self) -> bool {
            self.completed
        }
    }

    struct NoopIoControl;

    impl IoControl for NoopIoControl {
        fn request_input(&self) {}
        fn suspend_input(&self) {}
        fn request_output(&self) {}
        fn suspend_output(&self) {}
    }

    #[test]
    fn buffering_consumer_aggregates_chunks() {
        let request = Request::new(Method::POST, Uri::from_static("/upload"));
        let mut consumer = BufferingRequestConsumer::new();
        consumer.request_received(&request).unwrap();

        let mut decoder = ChunkDecoder::new(&[b"hel", b"lo ", b"world"]);
        consumer.consume_content(&mut decoder, &NoopIoControl).unwrap();
        assert!(decoder.is_completed());

        consumer.request_completed(&Context::new());
        let result = consumer.take_result().unwrap();
        let buffered = result.downcast::<BufferedRequest>().unwrap();
        assert_eq!(buffered.body.as_ref(), b"hello world");
        assert_eq!(buffered.request.uri().path(), "/upload");
    }

    #[test]
    fn buffering_consumer_reports_recorded_failure() {
        let mut consumer = BufferingRequestConsumer::new();
        assert!(consumer.failure().is_none());

        consumer.fail(HttpError::handler("payload too noisy"));
        assert!(consumer.failure().is_some());
    }

    #[test]
    fn entity_producer_streams_across_partial_writes() {
        let response = Response::new(StatusCode::OK).with_entity(Entity::new("abcdefgh"));
        let mut producer = EntityResponseProducer::new(response);
        let mut encoder = SinkEncoder::new(3);

        // Each call makes progress until the encoder accepts no more;
        // the mock always accepts, so one call drains everything.
        producer.produce_content(&mut encoder, &NoopIoControl).unwrap();

        assert!(encoder.is_completed());
        assert_eq!(encoder.written.as_ref(), b"abcdefgh");
    }

    #[test]
    fn entity_producer_completes_immediately_without_entity() {
        let mut producer = EntityResponseProducer::new(Response::new(StatusCode::NO_CONTENT));
        let mut encoder = SinkEncoder::new(usize::MAX);

        producer.produce_content(&mut encoder, &NoopIoControl).unwrap();
        assert!(encoder.is_completed());
        assert!(encoder.written.is_empty());
    }

    #[test]
    fn discarding_consumer_produces_no_result() {
        let mut consumer = DiscardingRequestConsumer::new();
        let mut decoder = ChunkDecoder::new(&[b"ignored"]);
        consumer.consume_content(&mut decoder, &NoopIoControl).unwrap();
        consumer.request_completed(&Context::new());
        assert!(consumer.take_result().is_none());
    }
}
