use std::{
    collections::BTreeSet,
    pin::Pin,
    task::{Context, Poll},
};

use futures::{ready, Stream};
use pin_project::pin_project;

use crate::{
    error::{MultipartError, ValidationError},
    part::Part,
    schema::PartSchema,
};

/// Cardinality bookkeeping for one validated stream.
///
/// Feed it part names in arrival order with [`ValidatorState::accept`], then
/// call [`ValidatorState::finish`] once the stream ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorState {
    schema: PartSchema,
    remaining_exactly_once: BTreeSet<String>,
    remaining_at_least_once: BTreeSet<String>,
    remaining_at_most_once: BTreeSet<String>,
}

impl ValidatorState {
    /// Starts with every rule unsatisfied.
    pub fn new(schema: PartSchema) -> Self {
        Self {
            remaining_exactly_once: schema.exactly_once.clone(),
            remaining_at_least_once: schema.at_least_once.clone(),
            remaining_at_most_once: schema.at_most_once.clone(),
            schema,
        }
    }

    /// Records one part and decides whether it may pass.
    pub fn accept(&mut self, name: Option<&str>) -> Result<(), ValidationError> {
        let Some(name) = name else {
            return if self.schema.allows_unknown_parts {
                Ok(())
            } else {
                Err(ValidationError::UnnamedPart)
            };
        };

        if self.remaining_exactly_once.remove(name)
            || self.remaining_at_least_once.remove(name)
            || self.remaining_at_most_once.remove(name)
        {
            return Ok(());
        }

        if self.schema.exactly_once.contains(name) || self.schema.at_most_once.contains(name) {
            return Err(ValidationError::DuplicateSingleValuePart {
                name: name.to_owned(),
            });
        }

        if self.schema.at_least_once.contains(name)
            || self.schema.zero_or_more.contains(name)
            || self.schema.allows_unknown_parts
        {
            return Ok(());
        }

        Err(ValidationError::UnknownPart {
            name: name.to_owned(),
        })
    }

    /// Checks that every required part was seen.
    pub fn finish(&self) -> Result<(), ValidationError> {
        let missing: BTreeSet<&String> = self
            .remaining_exactly_once
            .iter()
            .chain(&self.remaining_at_least_once)
            .collect();

        if missing.is_empty() {
            return Ok(());
        }

        Err(ValidationError::MissingRequiredParts {
            names: missing.into_iter().cloned().collect(),
        })
    }
}

/// Part stream filter enforcing a [`PartSchema`].
///
/// Parts pass through untouched; the first violation is yielded as an error
/// and ends the stream.
#[pin_project]
#[derive(Debug)]
pub struct ValidatedParts<S> {
    #[pin]
    inner: S,
    state: ValidatorState,
    finished: bool,
}

impl<S> ValidatedParts<S> {
    /// Wraps `inner` with validation against `schema`.
    pub fn new(inner: S, schema: PartSchema) -> Self {
        Self {
            inner,
            state: ValidatorState::new(schema),
            finished: false,
        }
    }
}

impl<S> Stream for ValidatedParts<S>
where
    S: Stream<Item = Result<Part, MultipartError>>,
{
    type Item = Result<Part, MultipartError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if *this.finished {
            return Poll::Ready(None);
        }

        let outcome = match ready!(this.inner.poll_next(cx)) {
            Some(Ok(part)) => match this.state.accept(part.name().as_deref()) {
                Ok(()) => return Poll::Ready(Some(Ok(part))),
                Err(err) => Some(err),
            },
            Some(Err(err)) => {
                *this.finished = true;
                return Poll::Ready(Some(Err(err)));
            }
            None => this.state.finish().err(),
        };

        *this.finished = true;
        match outcome {
            Some(err) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(error = %err, "validator: rejecting part stream");
                Poll::Ready(Some(Err(err.into())))
            }
            None => Poll::Ready(None),
        }
    }
}
