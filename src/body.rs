use std::{
    fmt,
    pin::Pin,
    sync::{Arc, Mutex, PoisonError},
    task::{Context, Poll},
};

use bytes::{Bytes, BytesMut};
use futures::{stream, Stream, StreamExt};

use crate::error::{MultipartError, ParseError, UsageError};

/// Boxed stream type carried by [`Body`] sources.
pub type BoxStream<T> = Pin<Box<dyn Stream<Item = Result<T, MultipartError>> + Send + 'static>>;

type StreamFactory<T> = dyn Fn() -> BoxStream<T> + Send + Sync;

/// Declared total size of a body's content, in bytes.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Length {
    /// Exact size is known up front.
    Known(u64),
    /// Size is only discovered by consuming the body.
    Unknown,
}

impl Length {
    /// Returns the byte count when known.
    pub fn known(self) -> Option<u64> {
        match self {
            Self::Known(length) => Some(length),
            Self::Unknown => None,
        }
    }
}

/// Whether a body's source can be replayed.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IterationBehavior {
    /// The source is consumed by the first iterator, e.g. a live socket.
    Single,
    /// Every iterator replays the source from the start.
    Multiple,
}

enum Source<T> {
    Empty,
    Collection(Arc<[T]>),
    OneShot(Mutex<Option<BoxStream<T>>>),
    Factory(Arc<StreamFactory<T>>),
}

struct Inner<T> {
    source: Source<T>,
    length: Length,
    iteration_behavior: IterationBehavior,
    iterator_created: Mutex<bool>,
}

/// Shared handle over a stream of `T`, used for raw bytes and for parts alike.
///
/// Length and iteration behavior are fixed at construction. A
/// [`IterationBehavior::Single`] body hands out at most one [`BodyStream`]
/// over its whole lifetime, clones included; asking again fails with
/// [`UsageError::IteratorAlreadyCreated`].
///
/// Equality is identity: two handles are equal only when one is a clone of
/// the other.
pub struct Body<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Body<T> {
    fn with_source(
        source: Source<T>,
        length: Length,
        iteration_behavior: IterationBehavior,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                length,
                iteration_behavior,
                iterator_created: Mutex::new(false),
            }),
        }
    }

    /// Creates a body with no content.
    pub fn empty() -> Self {
        Self::with_source(Source::Empty, Length::Known(0), IterationBehavior::Multiple)
    }

    /// Wraps a one-shot stream. The result is always [`IterationBehavior::Single`].
    pub fn from_stream<S>(stream: S, length: Length) -> Self
    where
        S: Stream<Item = Result<T, MultipartError>> + Send + 'static,
    {
        let stream: BoxStream<T> = Box::pin(stream);
        Self::with_source(
            Source::OneShot(Mutex::new(Some(stream))),
            length,
            IterationBehavior::Single,
        )
    }

    /// Wraps a stream factory that is invoked once per iterator.
    pub fn from_factory<F>(
        factory: F,
        length: Length,
        iteration_behavior: IterationBehavior,
    ) -> Self
    where
        F: Fn() -> BoxStream<T> + Send + Sync + 'static,
    {
        Self::with_source(
            Source::Factory(Arc::new(factory)),
            length,
            iteration_behavior,
        )
    }

    /// Declared content length.
    pub fn length(&self) -> Length {
        self.inner.length
    }

    /// Declared iteration behavior.
    pub fn iteration_behavior(&self) -> IterationBehavior {
        self.inner.iteration_behavior
    }

    fn mark_iterator_created(&self) -> Result<(), UsageError> {
        if self.inner.iteration_behavior == IterationBehavior::Multiple {
            return Ok(());
        }

        let mut created = self
            .inner
            .iterator_created
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *created {
            #[cfg(feature = "tracing")]
            tracing::debug!("body: rejected second iterator on single-pass body");
            return Err(UsageError::IteratorAlreadyCreated);
        }
        *created = true;
        Ok(())
    }
}

impl<T> Body<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a replayable body over an in-memory collection.
    pub fn from_collection(items: impl IntoIterator<Item = T>, length: Length) -> Self {
        let items: Arc<[T]> = items.into_iter().collect::<Vec<_>>().into();
        Self::with_source(
            Source::Collection(items),
            length,
            IterationBehavior::Multiple,
        )
    }

    /// Returns a fresh stream over the content.
    pub fn iter(&self) -> Result<BodyStream<T>, MultipartError> {
        self.mark_iterator_created()?;

        let inner: BoxStream<T> = match &self.inner.source {
            Source::Empty => Box::pin(stream::empty()),
            Source::Collection(items) => {
                let items = Arc::clone(items);
                Box::pin(stream::iter(
                    (0..items.len()).map(move |index| Ok(items[index].clone())),
                ))
            }
            Source::OneShot(slot) => slot
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
                .ok_or(UsageError::IteratorAlreadyCreated)?,
            Source::Factory(factory) => factory(),
        };

        Ok(BodyStream { inner })
    }
}

impl Body<Bytes> {
    /// Creates a replayable body over one buffer.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let length = Length::Known(bytes.len() as u64);
        if bytes.is_empty() {
            return Self::with_source(Source::Empty, length, IterationBehavior::Multiple);
        }
        Self::from_collection([bytes], length)
    }

    /// Creates a replayable body over pre-split chunks.
    pub fn from_chunks(chunks: impl IntoIterator<Item = Bytes>) -> Self {
        let chunks: Vec<Bytes> = chunks.into_iter().collect();
        let length = chunks.iter().map(|chunk| chunk.len() as u64).sum();
        Self::from_collection(chunks, Length::Known(length))
    }

    /// Wraps an async reader, such as a socket or file, as a single-pass body.
    #[cfg(feature = "tokio-rt")]
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: tokio::io::AsyncRead + Send + 'static,
    {
        let stream = tokio_util::io::ReaderStream::new(reader)
            .map(|chunk| chunk.map_err(MultipartError::from));
        Self::from_stream(stream, Length::Unknown)
    }

    /// Reads the whole body, failing once more than `limit` bytes are seen.
    ///
    /// The declared [`Length`] is not consulted; for decoded parts it comes
    /// from a client-supplied `Content-Length`. Only bytes actually read count.
    pub async fn collect(&self, limit: usize) -> Result<Bytes, MultipartError> {
        let mut stream = self.iter()?;
        let mut buffer = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if buffer.len() + chunk.len() > limit {
                return Err(MultipartError::BodyTooLarge { limit });
            }
            buffer.extend_from_slice(&chunk);
        }

        Ok(buffer.freeze())
    }

    /// Reads the whole body and decodes it as UTF-8 text.
    pub async fn collect_text(&self, limit: usize) -> Result<String, MultipartError> {
        let bytes = self.collect(limit).await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| ParseError::new("body is not valid UTF-8").into())
    }
}

impl<T> Clone for Body<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for Body<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Eq for Body<T> {}

impl<T> fmt::Debug for Body<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match &self.inner.source {
            Source::Empty => "empty",
            Source::Collection(_) => "collection",
            Source::OneShot(_) => "stream",
            Source::Factory(_) => "factory",
        };
        f.debug_struct("Body")
            .field("source", &source)
            .field("length", &self.inner.length)
            .field("iteration_behavior", &self.inner.iteration_behavior)
            .finish()
    }
}

impl Default for Body<Bytes> {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Bytes> for Body<Bytes> {
    fn from(bytes: Bytes) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<Vec<u8>> for Body<Bytes> {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<String> for Body<Bytes> {
    fn from(text: String) -> Self {
        Self::from_bytes(text)
    }
}

impl From<&'static str> for Body<Bytes> {
    fn from(text: &'static str) -> Self {
        Self::from_bytes(Bytes::from_static(text.as_bytes()))
    }
}

impl From<&'static [u8]> for Body<Bytes> {
    fn from(bytes: &'static [u8]) -> Self {
        Self::from_bytes(Bytes::from_static(bytes))
    }
}

/// Stream handed out by [`Body::iter`].
pub struct BodyStream<T> {
    inner: BoxStream<T>,
}

impl<T> fmt::Debug for BodyStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyStream").finish_non_exhaustive()
    }
}

impl<T> Stream for BodyStream<T> {
    type Item = Result<T, MultipartError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}
