use std::{
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use futures::Stream;

use crate::{
    error::{ConfigError, MultipartError},
    frame::Frame,
    limits::Limits,
    parser::state::{FrameParser, ParseAction},
};

/// Incremental byte-to-frame parser over a chunked byte stream.
#[derive(Debug)]
pub struct FrameStream<S> {
    stream: S,
    parser: FrameParser,
    upstream_done: bool,
}

impl<S> FrameStream<S> {
    /// Creates a streaming parser for a known multipart boundary.
    pub fn new(boundary: &str, stream: S) -> Result<Self, ConfigError> {
        Self::with_limits(boundary, stream, &Limits::default())
    }

    /// Creates a streaming parser enforcing `limits`.
    pub fn with_limits(boundary: &str, stream: S, limits: &Limits) -> Result<Self, ConfigError> {
        Ok(Self {
            stream,
            parser: FrameParser::with_limits(boundary, limits)?,
            upstream_done: false,
        })
    }
}

impl<S> Stream for FrameStream<S>
where
    S: Stream<Item = Result<Bytes, MultipartError>> + Unpin,
{
    type Item = Result<Frame, MultipartError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match self.parser.next_action() {
                Ok(ParseAction::Emit(frame)) => return Poll::Ready(Some(Ok(frame))),
                Ok(ParseAction::Done) => return Poll::Ready(None),
                Ok(ParseAction::NeedMore) => {}
                Err(err) => return Poll::Ready(Some(Err(err.into()))),
            }

            if self.upstream_done {
                return match self.parser.finish() {
                    Ok(()) => Poll::Ready(None),
                    Err(err) => Poll::Ready(Some(Err(err.into()))),
                };
            }

            match Pin::new(&mut self.stream).poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    if !chunk.is_empty() {
                        self.parser.push_chunk(&chunk);
                    }
                }
                Poll::Ready(Some(Err(err))) => {
                    self.parser.abort();
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => {
                    self.upstream_done = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
