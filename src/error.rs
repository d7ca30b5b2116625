use thiserror::Error;

/// Configuration-time validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The multipart boundary was empty.
    #[error("multipart boundary cannot be empty")]
    EmptyBoundary,
    /// The multipart boundary contains bytes that cannot appear on a delimiter line.
    #[error("multipart boundary cannot contain CR or LF")]
    BoundaryContainsNewline,
    /// The multipart boundary is not plain ASCII.
    #[error("multipart boundary must be ASCII")]
    NonAsciiBoundary,
    /// A configured numeric limit must be strictly greater than zero.
    #[error("limit `{limit}` must be greater than 0")]
    InvalidLimitValue {
        /// Name of the limit.
        limit: &'static str,
    },
    /// A schema part name was empty.
    #[error("schema part name cannot be empty")]
    EmptyPartName,
    /// A schema part name appears in more than one cardinality set.
    #[error("part `{name}` appears in more than one cardinality set")]
    OverlappingPartName {
        /// Name listed under several cardinality rules.
        name: String,
    },
}

/// Wire-format failures raised while parsing multipart bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The stream did not start with `--boundary`.
    #[error("multipart body does not start with the expected boundary")]
    InvalidInitialBoundary,
    /// A boundary line was followed by something other than CRLF or `--`.
    #[error("expected CRLF after multipart boundary")]
    MissingCrlfAfterBoundary,
    /// A header line had no `:` separator.
    #[error("malformed part header line `{line}`")]
    MalformedHeaderLine {
        /// Offending line, lossily decoded.
        line: String,
    },
    /// A header name contained invalid characters.
    #[error("invalid part header name `{name}`")]
    InvalidHeaderName {
        /// Offending name, lossily decoded.
        name: String,
    },
    /// A header value contained invalid characters.
    #[error("invalid value for part header `{name}`")]
    InvalidHeaderValue {
        /// Header whose value was rejected.
        name: String,
    },
    /// A part header block grew past the configured limit.
    #[error("part header block exceeded {limit} bytes")]
    HeaderBlockTooLarge {
        /// Configured header block limit in bytes.
        limit: usize,
    },
    /// The byte source ended before the terminal boundary.
    #[error("multipart stream ended unexpectedly")]
    IncompleteMessage,
    /// Generic parser failure with message context.
    #[error("{message}")]
    Message {
        /// Parser failure message.
        message: String,
    },
}

impl ParseError {
    /// Creates a parser error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

/// Caller mistakes: the API was driven in an order it does not allow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum UsageError {
    /// A single-pass body was asked for a second iterator.
    #[error("body can only be iterated once")]
    IteratorAlreadyCreated,
    /// The next part was requested before the current part's body was drained.
    #[error("next part requested before the previous part's body was consumed")]
    NextPartBeforeBodyConsumed,
}

/// Out-of-order frames reaching the part assembler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// A body chunk arrived while a header block was expected.
    #[error("received a body chunk while waiting for part headers")]
    BodyChunkBeforeHeaders,
    /// A frame arrived while a header block was still waiting to be handed out.
    #[error("received a frame while part headers were still buffered")]
    FrameWhileHeadersBuffered,
    /// A frame was delivered to a consumer that had not asked for one.
    #[error("received a frame out of turn")]
    UnexpectedFrame,
}

/// Cardinality violations detected against a [`PartSchema`](crate::PartSchema).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// Required parts never showed up before the stream ended.
    #[error("missing required parts: {}", names.join(", "))]
    MissingRequiredParts {
        /// Names of the missing parts, sorted.
        names: Vec<String>,
    },
    /// A part allowed at most once appeared again.
    #[error("part `{name}` may appear at most once")]
    DuplicateSingleValuePart {
        /// Repeated part name.
        name: String,
    },
    /// A part name not listed in the schema.
    #[error("unexpected part `{name}`")]
    UnknownPart {
        /// Unrecognized part name.
        name: String,
    },
    /// A part without a `Content-Disposition` name while unknown parts are rejected.
    #[error("unnamed part is not allowed")]
    UnnamedPart,
}

/// Failures turning frames back into multipart bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SerializationError {
    /// A body chunk was produced before any header block.
    #[error("body chunk emitted before any part headers")]
    BodyChunkBeforeHeaders,
    /// A frame arrived after the closing boundary was written.
    #[error("frame emitted after the closing boundary")]
    FrameAfterEnd,
}

/// Runtime error type used by `multiframe`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MultipartError {
    /// Configuration error surfaced at runtime.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Multipart wire-format failure.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// API misuse by the caller.
    #[error(transparent)]
    Usage(#[from] UsageError),
    /// Frame ordering violation inside the decode pipeline.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// Part cardinality violation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Encode pipeline failure.
    #[error(transparent)]
    Serialization(#[from] SerializationError),
    /// A body exceeded the byte limit given to a collecting helper.
    #[error("body exceeded limit of {limit} bytes")]
    BodyTooLarge {
        /// Maximum number of bytes the caller accepted.
        limit: usize,
    },
    /// The number of parts exceeded the configured limit.
    #[error("multipart message exceeded max parts limit of {max_parts}")]
    PartsLimitExceeded {
        /// Maximum allowed number of parts.
        max_parts: usize,
    },
    /// The underlying reader failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The byte source reported a failure of its own.
    #[error("byte source error: {message}")]
    Upstream {
        /// Upstream failure message.
        message: String,
    },
}

impl MultipartError {
    /// Creates an upstream source error from a message.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    /// Returns `false` for errors caused by a bug in the calling code.
    ///
    /// Wire-format, validation and resource errors describe bad input and can
    /// be mapped to a client-facing rejection. Usage and protocol errors mean
    /// the pipeline itself was driven incorrectly.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Usage(_) | Self::Protocol(_))
    }

    /// Rebuilds an equivalent error so a failure can be reported to more than
    /// one consumer. I/O errors keep their kind and message.
    pub(crate) fn replay(&self) -> Self {
        match self {
            Self::Config(err) => Self::Config(err.clone()),
            Self::Parse(err) => Self::Parse(err.clone()),
            Self::Usage(err) => Self::Usage(err.clone()),
            Self::Protocol(err) => Self::Protocol(err.clone()),
            Self::Validation(err) => Self::Validation(err.clone()),
            Self::Serialization(err) => Self::Serialization(err.clone()),
            Self::BodyTooLarge { limit } => Self::BodyTooLarge { limit: *limit },
            Self::PartsLimitExceeded { max_parts } => Self::PartsLimitExceeded {
                max_parts: *max_parts,
            },
            Self::Io(err) => Self::Io(std::io::Error::new(err.kind(), err.to_string())),
            Self::Upstream { message } => Self::Upstream {
                message: message.clone(),
            },
        }
    }
}
