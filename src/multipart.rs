use std::{
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use futures::{ready, Stream, StreamExt};

use crate::{
    assembler::PartStream,
    config::MultipartConfig,
    error::{ConfigError, MultipartError},
    parser::stream::FrameStream,
    part::Part,
    schema::PartSchema,
    validator::ValidatedParts,
};

/// Decoded multipart message: bytes in, validated parts out.
///
/// Read each part's body to the end before asking for the next part.
#[derive(Debug)]
pub struct Multipart<S> {
    inner: ValidatedParts<PartStream<FrameStream<S>>>,
    config: MultipartConfig,
    seen: usize,
    finished: bool,
}

impl<S> Multipart<S>
where
    S: Stream<Item = Result<Bytes, MultipartError>> + Unpin,
{
    /// Creates a multipart stream from an already extracted boundary and a chunk source.
    pub fn new(boundary: &str, stream: S) -> Result<Self, ConfigError> {
        Self::with_config(boundary, stream, MultipartConfig::default())
    }

    /// Creates a multipart stream with explicit limits and schema.
    pub fn with_config(
        boundary: &str,
        stream: S,
        config: MultipartConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let frames = FrameStream::with_limits(boundary, stream, &config.limits)?;
        let schema = config
            .schema
            .clone()
            .unwrap_or_else(|| PartSchema::new().allow_unknown_parts(true));

        Ok(Self {
            inner: ValidatedParts::new(PartStream::new(frames), schema),
            config,
            seen: 0,
            finished: false,
        })
    }
}

impl<S> Multipart<S> {
    /// Returns the configuration this stream enforces.
    pub fn config(&self) -> &MultipartConfig {
        &self.config
    }
}

impl<S> Multipart<S>
where
    S: Stream<Item = Result<Bytes, MultipartError>> + Unpin + Send + 'static,
{
    /// Returns the next part, or `None` after the closing boundary.
    pub async fn next_part(&mut self) -> Result<Option<Part>, MultipartError> {
        self.next().await.transpose()
    }
}

impl<S> Stream for Multipart<S>
where
    S: Stream<Item = Result<Bytes, MultipartError>> + Unpin + Send + 'static,
{
    type Item = Result<Part, MultipartError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }

        let item = ready!(Pin::new(&mut self.inner).poll_next(cx));
        match item {
            Some(Ok(part)) => {
                self.seen += 1;
                if !self.config.limits.allows_part_count(self.seen) {
                    self.finished = true;
                    let max_parts = self.config.limits.max_parts.unwrap_or_default();
                    return Poll::Ready(Some(Err(MultipartError::PartsLimitExceeded { max_parts })));
                }
                Poll::Ready(Some(Ok(part)))
            }
            Some(Err(err)) => {
                self.finished = true;
                Poll::Ready(Some(Err(err)))
            }
            None => {
                self.finished = true;
                Poll::Ready(None)
            }
        }
    }
}
