use std::{
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use futures::{ready, Stream, StreamExt};
use pin_project::pin_project;

use crate::{
    body::BodyStream,
    error::MultipartError,
    frame::Frame,
    part::Part,
};

#[derive(Debug)]
enum FramesState {
    Initial,
    WaitingForPart,
    StreamingBody(BodyStream<Bytes>),
    Finished,
}

/// Flattens a part stream into frames: one header frame per part, then its body chunks.
#[pin_project]
#[derive(Debug)]
pub struct PartFrames<S> {
    #[pin]
    parts: S,
    state: FramesState,
}

impl<S> PartFrames<S> {
    /// Wraps a part stream.
    pub fn new(parts: S) -> Self {
        Self {
            parts,
            state: FramesState::Initial,
        }
    }
}

impl<S> Stream for PartFrames<S>
where
    S: Stream<Item = Result<Part, MultipartError>>,
{
    type Item = Result<Frame, MultipartError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            match this.state {
                FramesState::Finished => return Poll::Ready(None),
                FramesState::Initial | FramesState::WaitingForPart => {
                    *this.state = FramesState::WaitingForPart;
                    let part = match ready!(this.parts.as_mut().poll_next(cx)) {
                        Some(Ok(part)) => part,
                        Some(Err(err)) => {
                            *this.state = FramesState::Finished;
                            return Poll::Ready(Some(Err(err)));
                        }
                        None => {
                            *this.state = FramesState::Finished;
                            return Poll::Ready(None);
                        }
                    };

                    let (fields, body) = part.into_parts();
                    match body.iter() {
                        Ok(body) => {
                            *this.state = FramesState::StreamingBody(body);
                            return Poll::Ready(Some(Ok(Frame::HeaderFields(fields))));
                        }
                        Err(err) => {
                            *this.state = FramesState::Finished;
                            return Poll::Ready(Some(Err(err)));
                        }
                    }
                }
                FramesState::StreamingBody(body) => match ready!(body.poll_next_unpin(cx)) {
                    Some(Ok(chunk)) if chunk.is_empty() => {}
                    Some(Ok(chunk)) => return Poll::Ready(Some(Ok(Frame::BodyChunk(chunk)))),
                    Some(Err(err)) => {
                        *this.state = FramesState::Finished;
                        return Poll::Ready(Some(Err(err)));
                    }
                    None => *this.state = FramesState::WaitingForPart,
                },
            }
        }
    }
}
