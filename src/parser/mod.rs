/// Boundary extraction, formatting and generation.
pub mod boundary;
/// `Content-Disposition` and part `Content-Type` helpers.
pub mod headers;
/// Pure byte-to-frame state machine.
pub mod state;
/// Streaming adapter driving the state machine from a byte source.
pub mod stream;

pub use boundary::{
    extract_multipart_boundary, multipart_content_type, BoundaryGenerator, ConstantBoundary,
    RandomBoundary,
};
pub use headers::{parse_content_disposition, parse_part_content_type, ContentDisposition};
pub use state::{FrameParser, ParseAction, ParserState};
pub use stream::FrameStream;
