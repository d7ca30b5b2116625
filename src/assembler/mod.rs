//! Frame-to-part assembly.
//!
//! A [`PartStream`] and the body of the part it most recently yielded share
//! one forward-only frame source. Both go through a mutex-guarded coordinator,
//! so body bytes are only ever pulled by the body that owns them, and a new
//! part is only handed out once the previous body reported end-of-stream.

mod coordinator;
mod state;

use std::{
    fmt,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    task::{Context, Poll},
};

use bytes::Bytes;
use futures::{ready, Stream};

use crate::{
    body::{Body, Length},
    error::MultipartError,
    frame::Frame,
    part::Part,
};

use coordinator::Coordinator;

type SharedCoordinator<F> = Arc<Mutex<Coordinator<F>>>;

/// Stream of parts assembled from a frame source.
///
/// Each yielded [`Part`] has a single-pass body that must be read to its end
/// before polling this stream again; otherwise the stream fails with
/// [`UsageError::NextPartBeforeBodyConsumed`](crate::UsageError::NextPartBeforeBodyConsumed).
pub struct PartStream<F> {
    coordinator: SharedCoordinator<F>,
}

impl<F> PartStream<F>
where
    F: Stream<Item = Result<Frame, MultipartError>> + Unpin,
{
    /// Wraps a frame source.
    pub fn new(frames: F) -> Self {
        Self {
            coordinator: Arc::new(Mutex::new(Coordinator::new(frames))),
        }
    }
}

impl<F> fmt::Debug for PartStream<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartStream").finish_non_exhaustive()
    }
}

impl<F> Stream for PartStream<F>
where
    F: Stream<Item = Result<Frame, MultipartError>> + Unpin + Send + 'static,
{
    type Item = Result<Part, MultipartError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let next = {
            let mut coordinator = lock(&self.coordinator);
            ready!(coordinator.poll_next_part(cx))
        };

        let Some(next) = next else {
            return Poll::Ready(None);
        };

        Poll::Ready(Some(next.map(|(part, fields)| {
            let length = fields
                .content_length()
                .map_or(Length::Unknown, Length::Known);
            let body = PartBodyStream {
                coordinator: Arc::clone(&self.coordinator),
                part,
                done: false,
            };
            Part::new(fields, Body::from_stream(body, length))
        })))
    }
}

/// Body stream of one assembled part.
struct PartBodyStream<F> {
    coordinator: SharedCoordinator<F>,
    part: u64,
    done: bool,
}

impl<F> Stream for PartBodyStream<F>
where
    F: Stream<Item = Result<Frame, MultipartError>> + Unpin,
{
    type Item = Result<Bytes, MultipartError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }

        let next = {
            let mut coordinator = lock(&self.coordinator);
            ready!(coordinator.poll_next_chunk(self.part, cx))
        };

        if !matches!(next, Some(Ok(_))) {
            self.done = true;
        }
        Poll::Ready(next)
    }
}

fn lock<F>(coordinator: &SharedCoordinator<F>) -> MutexGuard<'_, Coordinator<F>> {
    coordinator.lock().unwrap_or_else(PoisonError::into_inner)
}
