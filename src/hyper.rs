//! Hyper integration helpers.

use std::{future::Future, pin::Pin, sync::Arc};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use http_body_util::{BodyExt, StreamBody};
use hyper::{body::Body as _, header, service::Service, Request, Response};

use crate::{
    body::{Body, BodyStream, Length},
    parser, MultipartError, Multipart, ParseError, Transcoder,
};

/// Boxed error type used by [`MultipartService`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
/// Hyper body stream mapped into `multiframe` chunk errors.
pub type HyperBodyBoxStream =
    Pin<Box<dyn Stream<Item = Result<Bytes, MultipartError>> + Send + 'static>>;
/// Response body produced by [`into_response_body`].
pub type MultipartResponseBody = StreamBody<futures::stream::Map<BodyStream<Bytes>, ToFrame>>;

/// Chunk-to-frame mapping used by [`MultipartResponseBody`].
pub type ToFrame =
    fn(Result<Bytes, MultipartError>) -> Result<hyper::body::Frame<Bytes>, MultipartError>;

/// Service wrapper that decodes multipart requests and hands the part stream to a handler.
#[derive(Clone)]
pub struct MultipartService<H> {
    transcoder: Arc<Transcoder>,
    handler: H,
}

impl<H> std::fmt::Debug for MultipartService<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultipartService")
            .field("transcoder", &self.transcoder)
            .field("handler", &"<fn>")
            .finish()
    }
}

impl<H> MultipartService<H> {
    /// Creates a new Hyper service wrapper around a configured transcoder.
    pub fn new(transcoder: Arc<Transcoder>, handler: H) -> Self {
        Self {
            transcoder,
            handler,
        }
    }
}

impl<H, ReqBody, ResBody, Fut, E> Service<Request<ReqBody>> for MultipartService<H>
where
    ReqBody: hyper::body::Body<Data = Bytes> + Send + 'static,
    ReqBody::Error: std::error::Error + Send + Sync + 'static,
    H: Fn(Multipart<HyperBodyBoxStream>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Response<ResBody>, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    type Response = Response<ResBody>;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, request: Request<ReqBody>) -> Self::Future {
        let transcoder = Arc::clone(&self.transcoder);
        let handler = self.handler.clone();

        Box::pin(async move {
            let content_type = content_type_from_request(&request).map_err(into_box_error)?;
            let boundary =
                parser::extract_multipart_boundary(content_type).map_err(into_box_error)?;
            let body_stream = map_body_stream(request.into_body());

            let multipart = transcoder
                .decode(&boundary, body_stream)
                .map_err(into_box_error)?;

            handler(multipart).await.map_err(into_box_error)
        })
    }
}

/// Extracts the raw `Content-Type` header from a Hyper request.
pub fn content_type_from_request<B>(request: &Request<B>) -> Result<&str, MultipartError> {
    let value = request
        .headers()
        .get(header::CONTENT_TYPE)
        .ok_or_else(|| ParseError::new("missing Content-Type header"))?;
    value
        .to_str()
        .map_err(|_| ParseError::new("Content-Type header must be ASCII").into())
}

/// Maps a Hyper body into the stream shape expected by `multiframe`.
pub fn map_body_stream<B>(body: B) -> HyperBodyBoxStream
where
    B: hyper::body::Body<Data = Bytes> + Send + 'static,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let stream = body.into_data_stream().map(hyper_item_to_chunk::<B::Error>);
    Box::pin(stream)
}

/// Wraps a Hyper body as a single-pass [`Body`], using its size hint when exact.
pub fn body_from_hyper<B>(body: B) -> Body<Bytes>
where
    B: hyper::body::Body<Data = Bytes> + Send + 'static,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let length = body
        .size_hint()
        .exact()
        .map_or(Length::Unknown, Length::Known);
    Body::from_stream(map_body_stream(body), length)
}

/// Turns an encoded byte body into a Hyper response body.
pub fn into_response_body(body: &Body<Bytes>) -> Result<MultipartResponseBody, MultipartError> {
    let to_frame: ToFrame = |chunk| chunk.map(hyper::body::Frame::data);
    Ok(StreamBody::new(body.iter()?.map(to_frame)))
}

fn hyper_item_to_chunk<E>(item: Result<Bytes, E>) -> Result<Bytes, MultipartError>
where
    E: std::error::Error + Send + Sync + 'static,
{
    item.map_err(|err| MultipartError::upstream(format!("hyper body stream error: {err}")))
}

fn into_box_error<E>(err: E) -> BoxError
where
    E: std::error::Error + Send + Sync + 'static,
{
    Box::new(err)
}
