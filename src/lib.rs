#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Bounded-memory streaming transcoder between MIME multipart bytes and parts.
//!
//! Decoding runs bytes → [`Frame`]s → [`Part`]s → schema-validated parts;
//! encoding runs the same path backwards. Every stage is a pull-based
//! [`futures::Stream`] that does no work ahead of demand.

/// Frame-to-part assembly over a shared frame source.
pub mod assembler;
/// Stream container shared by both directions.
pub mod body;
/// Fluent builder API.
pub mod builder;
/// Transcoder configuration.
pub mod config;
/// Error types exposed by this crate.
pub mod error;
/// Frame and header block model.
pub mod frame;
/// Decode limits.
pub mod limits;
/// High-level decoded part stream.
pub mod multipart;
/// Multipart part model.
pub mod part;
/// Low-level parser components.
pub mod parser;
/// Part cardinality schema.
pub mod schema;
/// Encode pipeline.
pub mod serializer;
/// Cardinality enforcement over part streams.
pub mod validator;

/// Adapters between hyper bodies and [`Body`].
#[cfg(feature = "hyper")]
pub mod hyper;

use bytes::Bytes;
use futures::{stream, Stream};

pub use assembler::PartStream;
pub use body::{Body, BodyStream, BoxStream, IterationBehavior, Length};
pub use builder::MultipartBuilder;
pub use config::MultipartConfig;
pub use error::{
    ConfigError, MultipartError, ParseError, ProtocolError, SerializationError, UsageError,
    ValidationError,
};
pub use frame::{Frame, HeaderFields};
pub use limits::Limits;
pub use multipart::Multipart;
pub use parser::{
    extract_multipart_boundary, multipart_content_type, BoundaryGenerator, ConstantBoundary,
    ContentDisposition, FrameParser, FrameStream, RandomBoundary,
};
pub use part::Part;
pub use schema::{Cardinality, PartSchema};
pub use serializer::{serialize_parts, FrameEncoder, MultipartBytes, PartFrames};
pub use validator::{ValidatedParts, ValidatorState};

/// Main `multiframe` entry point.
///
/// Holds a validated [`MultipartConfig`] and builds decode and encode
/// pipelines from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcoder {
    config: MultipartConfig,
}

impl Transcoder {
    /// Creates a transcoder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transcoder with explicit validated configuration.
    pub fn with_config(config: MultipartConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Creates a fluent builder with default configuration.
    pub fn builder() -> MultipartBuilder {
        MultipartBuilder::default()
    }

    /// Returns an immutable reference to the active configuration.
    pub fn config(&self) -> &MultipartConfig {
        &self.config
    }

    /// Decodes a byte stream delimited by `boundary`.
    pub fn decode<S>(&self, boundary: &str, stream: S) -> Result<Multipart<S>, ConfigError>
    where
        S: Stream<Item = Result<Bytes, MultipartError>> + Unpin,
    {
        Multipart::with_config(boundary, stream, self.config.clone())
    }

    /// Decodes a byte stream, reading the boundary from a `multipart/*` `Content-Type` value.
    pub fn decode_from_content_type<S>(
        &self,
        content_type: &str,
        stream: S,
    ) -> Result<Multipart<S>, MultipartError>
    where
        S: Stream<Item = Result<Bytes, MultipartError>> + Unpin,
    {
        let boundary = extract_multipart_boundary(content_type)?;
        Ok(self.decode(&boundary, stream)?)
    }

    /// Decodes a byte body into a part body with the same iteration behavior.
    ///
    /// A replayable byte body yields a replayable part body: every iterator
    /// re-parses the bytes from the start.
    pub fn decode_body(
        &self,
        boundary: &str,
        body: Body<Bytes>,
    ) -> Result<Body<Part>, ConfigError> {
        parser::boundary::validate_boundary_input(boundary)?;
        let boundary = boundary.to_owned();
        let config = self.config.clone();
        let iteration_behavior = body.iteration_behavior();

        let factory = move || -> BoxStream<Part> {
            let decoded = body
                .iter()
                .and_then(|bytes| Ok(Multipart::with_config(&boundary, bytes, config.clone())?));
            match decoded {
                Ok(parts) => Box::pin(parts),
                Err(err) => Box::pin(stream::iter([Err::<Part, _>(err)])),
            }
        };

        Ok(Body::from_factory(factory, Length::Unknown, iteration_behavior))
    }

    /// Encodes a part body into a byte body with the same iteration behavior.
    pub fn encode(&self, boundary: &str, parts: Body<Part>) -> Result<Body<Bytes>, ConfigError> {
        parser::boundary::validate_boundary_input(boundary)?;
        let boundary = boundary.to_owned();
        let iteration_behavior = parts.iteration_behavior();

        let factory = move || -> BoxStream<Bytes> {
            let encoded = parts
                .iter()
                .and_then(|parts| Ok(serialize_parts(&boundary, parts)?));
            match encoded {
                Ok(bytes) => Box::pin(bytes),
                Err(err) => Box::pin(stream::iter([Err::<Bytes, _>(err)])),
            }
        };

        Ok(Body::from_factory(factory, Length::Unknown, iteration_behavior))
    }

    /// Encodes with a boundary from `generator`, returning the matching `Content-Type`.
    pub fn encode_form_data(
        &self,
        generator: &dyn BoundaryGenerator,
        parts: Body<Part>,
    ) -> Result<(String, Body<Bytes>), ConfigError> {
        let boundary = generator.make_boundary();
        let body = self.encode(&boundary, parts)?;
        Ok((multipart_content_type("form-data", &boundary), body))
    }

    /// Encodes a part stream directly, without a container.
    pub fn encode_stream<S>(
        &self,
        boundary: &str,
        parts: S,
    ) -> Result<MultipartBytes<PartFrames<S>>, ConfigError>
    where
        S: Stream<Item = Result<Part, MultipartError>>,
    {
        serialize_parts(boundary, parts)
    }
}
