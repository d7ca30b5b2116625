use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{ready, Stream, StreamExt};

use crate::{
    assembler::state::{Assembler, BodyAction, PartAction},
    error::MultipartError,
    frame::{Frame, HeaderFields},
};

/// Sole owner of the upstream frame source.
///
/// The part stream and the active part's body stream both reach the source
/// through one of the two `poll_*` entry points while holding the
/// coordinator's lock.
#[derive(Debug)]
pub(crate) struct Coordinator<F> {
    frames: F,
    machine: Assembler,
    /// Failure seen by a body, owed to the next part request.
    failure: Option<MultipartError>,
}

impl<F> Coordinator<F>
where
    F: Stream<Item = Result<Frame, MultipartError>> + Unpin,
{
    pub(crate) fn new(frames: F) -> Self {
        Self {
            frames,
            machine: Assembler::new(),
            failure: None,
        }
    }

    /// Polls for the next part's header block, tagged with its part number.
    pub(crate) fn poll_next_part(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<(u64, HeaderFields), MultipartError>>> {
        let mut action = self.machine.next_part();
        loop {
            match action {
                PartAction::FetchFrame => match ready!(self.poll_frame(cx)) {
                    Ok(frame) => action = self.machine.part_received(frame),
                    Err(err) => {
                        self.machine.part_source_failed();
                        return Poll::Ready(Some(Err(err)));
                    }
                },
                PartAction::EmitPart(fields) => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(part = self.machine.current_part(), "assembler: emitting part");
                    return Poll::Ready(Some(Ok((self.machine.current_part(), fields))));
                }
                PartAction::ReturnNone => return Poll::Ready(None),
                PartAction::ReportFailure => return Poll::Ready(self.failure.take().map(Err)),
                PartAction::Fail(fault) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(?fault, "assembler: part stream failed");
                    return Poll::Ready(Some(Err(fault.into())));
                }
            }
        }
    }

    /// Polls for the next body chunk of part number `part`.
    pub(crate) fn poll_next_chunk(
        &mut self,
        part: u64,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Bytes, MultipartError>>> {
        let mut action = self.machine.next_body_chunk(part);
        loop {
            match action {
                BodyAction::FetchFrame => match ready!(self.poll_frame(cx)) {
                    Ok(frame) => action = self.machine.body_received(frame),
                    Err(err) => {
                        self.machine.body_source_failed();
                        return Poll::Ready(Some(Err(self.record_failure(err))));
                    }
                },
                BodyAction::EmitChunk(chunk) => return Poll::Ready(Some(Ok(chunk))),
                BodyAction::ReturnNone => return Poll::Ready(None),
                BodyAction::Fail(fault) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(?fault, "assembler: body stream failed");
                    return Poll::Ready(Some(Err(self.record_failure(fault.into()))));
                }
            }
        }
    }

    fn poll_frame(&mut self, cx: &mut Context<'_>) -> Poll<Result<Option<Frame>, MultipartError>> {
        Poll::Ready(ready!(self.frames.poll_next_unpin(cx)).transpose())
    }

    /// Keeps a copy of a body-side failure for the part consumer.
    fn record_failure(&mut self, err: MultipartError) -> MultipartError {
        self.failure = Some(err.replay());
        err
    }
}
