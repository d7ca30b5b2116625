use std::{
    pin::Pin,
    task::{Context, Poll},
};

use bytes::{BufMut, Bytes, BytesMut};
use futures::{ready, Stream};
use pin_project::pin_project;

use crate::{
    error::{ConfigError, MultipartError, SerializationError},
    frame::{Frame, HeaderFields},
    parser::boundary::validate_boundary_input,
};

const CRLF: &[u8] = b"\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EncoderState {
    Initial,
    InPart,
    Finished,
}

/// Renders frames as multipart wire bytes.
///
/// Header frames are prefixed with the delimiter line they open; body
/// chunks are passed through without copying. [`FrameEncoder::finish`]
/// renders the closing delimiter.
#[derive(Debug, Clone)]
pub struct FrameEncoder {
    state: EncoderState,
    dash_boundary: Vec<u8>,
}

impl FrameEncoder {
    /// Creates an encoder for `boundary`.
    pub fn new(boundary: &str) -> Result<Self, ConfigError> {
        validate_boundary_input(boundary)?;
        Ok(Self {
            state: EncoderState::Initial,
            dash_boundary: format!("--{boundary}").into_bytes(),
        })
    }

    /// Returns `true` once the closing boundary was rendered or encoding failed.
    pub fn is_finished(&self) -> bool {
        self.state == EncoderState::Finished
    }

    /// Renders one frame.
    pub fn encode(&mut self, frame: Frame) -> Result<Bytes, SerializationError> {
        match (self.state, frame) {
            (EncoderState::Finished, _) => Err(SerializationError::FrameAfterEnd),
            (EncoderState::Initial, Frame::BodyChunk(_)) => {
                self.state = EncoderState::Finished;
                Err(SerializationError::BodyChunkBeforeHeaders)
            }
            (EncoderState::InPart, Frame::BodyChunk(chunk)) => Ok(chunk),
            (state, Frame::HeaderFields(fields)) => {
                let mut out = BytesMut::with_capacity(
                    self.dash_boundary.len() + fields.encoded_len() + 3 * CRLF.len(),
                );
                if state == EncoderState::InPart {
                    out.put_slice(CRLF);
                }
                out.put_slice(&self.dash_boundary);
                out.put_slice(CRLF);
                write_header_fields(&mut out, &fields);
                self.state = EncoderState::InPart;
                Ok(out.freeze())
            }
        }
    }

    /// Renders the closing delimiter; `None` when already finished.
    pub fn finish(&mut self) -> Option<Bytes> {
        let mut out = BytesMut::with_capacity(self.dash_boundary.len() + 8);
        match self.state {
            EncoderState::Finished => return None,
            EncoderState::InPart => out.put_slice(CRLF),
            // No part was written: the closing delimiter doubles as the opening one.
            EncoderState::Initial => {}
        }
        out.put_slice(&self.dash_boundary);
        out.put_slice(b"--");
        out.put_slice(CRLF);
        out.put_slice(CRLF);
        self.state = EncoderState::Finished;
        Some(out.freeze())
    }

    /// Stops encoding without a closing delimiter.
    pub fn abort(&mut self) {
        self.state = EncoderState::Finished;
    }
}

fn write_header_fields(out: &mut BytesMut, fields: &HeaderFields) {
    for (name, value) in fields.iter() {
        out.put_slice(name.as_str().as_bytes());
        out.put_slice(b": ");
        out.put_slice(value.as_bytes());
        out.put_slice(CRLF);
    }
    out.put_slice(CRLF);
}

/// Byte stream produced from a frame stream.
#[pin_project]
#[derive(Debug)]
pub struct MultipartBytes<S> {
    #[pin]
    frames: S,
    encoder: FrameEncoder,
}

impl<S> MultipartBytes<S> {
    /// Wraps a frame stream, rendering it with `boundary`.
    pub fn new(boundary: &str, frames: S) -> Result<Self, ConfigError> {
        Ok(Self {
            frames,
            encoder: FrameEncoder::new(boundary)?,
        })
    }
}

impl<S> Stream for MultipartBytes<S>
where
    S: Stream<Item = Result<Frame, MultipartError>>,
{
    type Item = Result<Bytes, MultipartError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            if this.encoder.is_finished() {
                return Poll::Ready(None);
            }

            match ready!(this.frames.as_mut().poll_next(cx)) {
                Some(Ok(frame)) => match this.encoder.encode(frame) {
                    Ok(bytes) if bytes.is_empty() => {}
                    Ok(bytes) => return Poll::Ready(Some(Ok(bytes))),
                    Err(err) => {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(error = %err, "serializer: rejecting frame");
                        return Poll::Ready(Some(Err(err.into())));
                    }
                },
                Some(Err(err)) => {
                    this.encoder.abort();
                    return Poll::Ready(Some(Err(err)));
                }
                None => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!("serializer: writing closing boundary");
                    return Poll::Ready(this.encoder.finish().map(Ok));
                }
            }
        }
    }
}
