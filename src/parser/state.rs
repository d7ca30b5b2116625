use bytes::{Buf, BytesMut};
use http::{HeaderName, HeaderValue};

use crate::{
    error::{ConfigError, ParseError},
    frame::{Frame, HeaderFields},
    limits::Limits,
    parser::boundary::validate_boundary_input,
};

const CRLF: &[u8] = b"\r\n";
const DOUBLE_HYPHEN: &[u8] = b"--";

/// Where the parser is within the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParserState {
    /// Waiting for the leading `--boundary`.
    ParsingInitialBoundary,
    /// Just past a boundary; `--` ends the message, CRLF starts a part.
    ReadyForPart,
    /// Collecting header lines for the current part.
    ParsingHeaders(HeaderFields),
    /// Passing body bytes through until the next delimiter.
    StreamingBody,
    /// Terminal boundary seen, or a failure occurred.
    Finished,
}

/// Outcome of one [`FrameParser::next_action`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAction {
    /// A complete frame is ready.
    Emit(Frame),
    /// Buffered bytes cannot decide the next step; push another chunk.
    NeedMore,
    /// The message is complete.
    Done,
}

/// Incremental byte-to-frame multipart parser.
///
/// The parser owns a small buffer holding only bytes that could not yet be
/// classified: at most one partial header line, or a body tail that may be
/// the start of a delimiter split across chunks. Body bytes are emitted as
/// soon as they are known not to belong to a delimiter.
#[derive(Debug)]
pub struct FrameParser {
    state: ParserState,
    buffer: BytesMut,
    dash_boundary: Vec<u8>,
    delimiter: Vec<u8>,
    max_header_bytes: Option<usize>,
    header_bytes: usize,
}

impl FrameParser {
    /// Creates a parser for `boundary` with default limits.
    pub fn new(boundary: &str) -> Result<Self, ConfigError> {
        Self::with_limits(boundary, &Limits::default())
    }

    /// Creates a parser for `boundary` enforcing `limits`.
    pub fn with_limits(boundary: &str, limits: &Limits) -> Result<Self, ConfigError> {
        validate_boundary_input(boundary)?;
        limits.validate()?;

        Ok(Self {
            state: ParserState::ParsingInitialBoundary,
            buffer: BytesMut::new(),
            dash_boundary: format!("--{boundary}").into_bytes(),
            delimiter: format!("\r\n--{boundary}").into_bytes(),
            max_header_bytes: limits.max_header_bytes,
            header_bytes: 0,
        })
    }

    /// Current state.
    pub fn state(&self) -> &ParserState {
        &self.state
    }

    /// Number of bytes held back waiting for more input.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Appends input. Bytes arriving after the message finished are discarded.
    pub fn push_chunk(&mut self, chunk: &[u8]) {
        if self.state != ParserState::Finished {
            self.buffer.extend_from_slice(chunk);
        }
    }

    /// Advances as far as buffered input allows.
    pub fn next_action(&mut self) -> Result<ParseAction, ParseError> {
        loop {
            let step = match std::mem::replace(&mut self.state, ParserState::Finished) {
                ParserState::ParsingInitialBoundary => self.parse_initial_boundary(),
                ParserState::ReadyForPart => self.parse_part_start(),
                ParserState::ParsingHeaders(fields) => self.parse_header_line(fields),
                ParserState::StreamingBody => self.parse_body(),
                ParserState::Finished => Ok(Some(ParseAction::Done)),
            };

            match step {
                Ok(Some(action)) => return Ok(action),
                Ok(None) => continue,
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(error = %err, "parser: aborting on malformed input");
                    self.abort();
                    return Err(err);
                }
            }
        }
    }

    /// Signals that no more input will arrive.
    ///
    /// Only meaningful after [`FrameParser::next_action`] returned
    /// [`ParseAction::NeedMore`]; anything short of the terminal boundary is
    /// an incomplete message.
    pub fn finish(&mut self) -> Result<(), ParseError> {
        if self.state == ParserState::Finished {
            return Ok(());
        }

        self.abort();
        Err(ParseError::IncompleteMessage)
    }

    /// Drops buffered input and moves to [`ParserState::Finished`].
    pub fn abort(&mut self) {
        self.state = ParserState::Finished;
        self.buffer.clear();
    }

    fn parse_initial_boundary(&mut self) -> Result<Option<ParseAction>, ParseError> {
        match prefix_match(&self.buffer, &self.dash_boundary) {
            PrefixMatch::Full => {
                self.buffer.advance(self.dash_boundary.len());
                self.state = ParserState::ReadyForPart;
                Ok(None)
            }
            PrefixMatch::Partial => {
                self.state = ParserState::ParsingInitialBoundary;
                Ok(Some(ParseAction::NeedMore))
            }
            PrefixMatch::Mismatch => Err(ParseError::InvalidInitialBoundary),
        }
    }

    fn parse_part_start(&mut self) -> Result<Option<ParseAction>, ParseError> {
        match prefix_match(&self.buffer, DOUBLE_HYPHEN) {
            PrefixMatch::Full => {
                // Anything after the terminal boundary is epilogue.
                self.buffer.clear();
                return Ok(Some(ParseAction::Done));
            }
            PrefixMatch::Partial => {
                self.state = ParserState::ReadyForPart;
                return Ok(Some(ParseAction::NeedMore));
            }
            PrefixMatch::Mismatch => {}
        }

        match prefix_match(&self.buffer, CRLF) {
            PrefixMatch::Full => {
                self.buffer.advance(CRLF.len());
                self.header_bytes = 0;
                self.state = ParserState::ParsingHeaders(HeaderFields::new());
                Ok(None)
            }
            PrefixMatch::Partial => {
                self.state = ParserState::ReadyForPart;
                Ok(Some(ParseAction::NeedMore))
            }
            PrefixMatch::Mismatch => Err(ParseError::MissingCrlfAfterBoundary),
        }
    }

    fn parse_header_line(
        &mut self,
        mut fields: HeaderFields,
    ) -> Result<Option<ParseAction>, ParseError> {
        let Some(end) = find_subslice(&self.buffer, CRLF) else {
            self.check_header_budget(self.buffer.len())?;
            self.state = ParserState::ParsingHeaders(fields);
            return Ok(Some(ParseAction::NeedMore));
        };

        self.check_header_budget(end + CRLF.len())?;
        self.header_bytes += end + CRLF.len();

        let line = self.buffer.split_to(end + CRLF.len());
        let line = &line[..end];

        if line.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::trace!(fields = fields.len(), "parser: header block complete");
            self.state = ParserState::StreamingBody;
            return Ok(Some(ParseAction::Emit(Frame::HeaderFields(fields))));
        }

        let (name, value) = parse_header_field(line)?;
        fields.append(name, value);
        self.state = ParserState::ParsingHeaders(fields);
        Ok(None)
    }

    fn parse_body(&mut self) -> Result<Option<ParseAction>, ParseError> {
        if let Some(index) = find_subslice(&self.buffer, &self.delimiter) {
            let chunk = self.buffer.split_to(index).freeze();
            self.buffer.advance(self.delimiter.len());
            self.state = ParserState::ReadyForPart;

            return Ok((!chunk.is_empty()).then(|| ParseAction::Emit(Frame::BodyChunk(chunk))));
        }

        self.state = ParserState::StreamingBody;
        let held_back = partial_suffix_len(&self.buffer, &self.delimiter);
        let ready = self.buffer.len() - held_back;
        if ready == 0 {
            return Ok(Some(ParseAction::NeedMore));
        }

        let chunk = self.buffer.split_to(ready).freeze();
        Ok(Some(ParseAction::Emit(Frame::BodyChunk(chunk))))
    }

    fn check_header_budget(&self, pending: usize) -> Result<(), ParseError> {
        match self.max_header_bytes {
            Some(limit) if self.header_bytes + pending > limit => {
                Err(ParseError::HeaderBlockTooLarge { limit })
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrefixMatch {
    Full,
    Partial,
    Mismatch,
}

fn prefix_match(buffer: &[u8], expected: &[u8]) -> PrefixMatch {
    let available = buffer.len().min(expected.len());
    if buffer[..available] != expected[..available] {
        PrefixMatch::Mismatch
    } else if available == expected.len() {
        PrefixMatch::Full
    } else {
        PrefixMatch::Partial
    }
}

fn parse_header_field(line: &[u8]) -> Result<(HeaderName, HeaderValue), ParseError> {
    let Some(colon) = line.iter().position(|&byte| byte == b':') else {
        return Err(ParseError::MalformedHeaderLine {
            line: String::from_utf8_lossy(line).into_owned(),
        });
    };

    let raw_name = trim_whitespace(&line[..colon]);
    let name = HeaderName::from_bytes(raw_name).map_err(|_| ParseError::InvalidHeaderName {
        name: String::from_utf8_lossy(raw_name).into_owned(),
    })?;
    let value = HeaderValue::from_bytes(trim_whitespace(&line[colon + 1..])).map_err(|_| {
        ParseError::InvalidHeaderValue {
            name: name.as_str().to_owned(),
        }
    })?;

    Ok((name, value))
}

fn trim_whitespace(mut bytes: &[u8]) -> &[u8] {
    while let [b' ' | b'\t', rest @ ..] = bytes {
        bytes = rest;
    }
    while let [rest @ .., b' ' | b'\t'] = bytes {
        bytes = rest;
    }
    bytes
}

pub(crate) fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }

    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Length of the longest tail of `buffer` that is a proper prefix of `needle`.
fn partial_suffix_len(buffer: &[u8], needle: &[u8]) -> usize {
    let longest = buffer.len().min(needle.len().saturating_sub(1));
    (1..=longest)
        .rev()
        .find(|&len| buffer[buffer.len() - len..] == needle[..len])
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn drain(parser: &mut FrameParser) -> Result<(Vec<Frame>, ParseAction), ParseError> {
        let mut frames = Vec::new();
        loop {
            match parser.next_action()? {
                ParseAction::Emit(frame) => frames.push(frame),
                action => return Ok((frames, action)),
            }
        }
    }

    #[test]
    fn emits_header_then_body_then_done() {
        let mut parser = FrameParser::new("B").expect("boundary");
        parser.push_chunk(b"--B\r\nContent-Type: text/plain\r\n\r\nhello\r\n--B--\r\n");

        let (frames, action) = drain(&mut parser).expect("valid message");
        assert_eq!(action, ParseAction::Done);
        assert_eq!(frames.len(), 2);
        let Frame::HeaderFields(fields) = &frames[0] else {
            panic!("expected header frame, got {:?}", frames[0]);
        };
        assert_eq!(
            fields.get("content-type").map(HeaderValue::as_bytes),
            Some(&b"text/plain"[..])
        );
        assert_eq!(frames[1], Frame::BodyChunk(Bytes::from_static(b"hello")));
    }

    #[test]
    fn holds_back_possible_delimiter_prefix() {
        let mut parser = FrameParser::new("BOUND").expect("boundary");
        parser.push_chunk(b"--BOUND\r\n\r\nabc\r\n--BO");

        let (frames, action) = drain(&mut parser).expect("partial message");
        assert_eq!(action, ParseAction::NeedMore);
        assert_eq!(frames.last(), Some(&Frame::BodyChunk(Bytes::from_static(b"abc"))));
        assert_eq!(parser.buffered_len(), "\r\n--BO".len());
        assert_eq!(parser.state(), &ParserState::StreamingBody);

        parser.push_chunk(b"UND--");
        let (frames, action) = drain(&mut parser).expect("rest of message");
        assert!(frames.is_empty());
        assert_eq!(action, ParseAction::Done);
    }

    #[test]
    fn releases_held_back_bytes_that_turn_out_to_be_body() {
        let mut parser = FrameParser::new("BOUND").expect("boundary");
        parser.push_chunk(b"--BOUND\r\n\r\nabc\r\n--BO");
        drain(&mut parser).expect("first chunk");

        parser.push_chunk(b"X\r\n--BOUND--");
        let (frames, action) = drain(&mut parser).expect("second chunk");
        assert_eq!(action, ParseAction::Done);
        assert_eq!(
            frames,
            vec![Frame::BodyChunk(Bytes::from_static(b"\r\n--BOX"))]
        );
    }

    #[test]
    fn rejects_wrong_initial_boundary_and_finishes() {
        let mut parser = FrameParser::new("B").expect("boundary");
        parser.push_chunk(b"--X\r\n");

        assert_eq!(parser.next_action(), Err(ParseError::InvalidInitialBoundary));
        assert_eq!(parser.state(), &ParserState::Finished);
        assert_eq!(parser.next_action(), Ok(ParseAction::Done));
    }

    #[test]
    fn rejects_header_line_without_separator() {
        let mut parser = FrameParser::new("B").expect("boundary");
        parser.push_chunk(b"--B\r\nnot a header\r\n\r\n");

        assert!(matches!(
            drain(&mut parser),
            Err(ParseError::MalformedHeaderLine { line }) if line == "not a header"
        ));
    }

    #[test]
    fn enforces_header_budget_without_a_line_terminator() {
        let limits = Limits {
            max_header_bytes: Some(8),
            ..Limits::default()
        };
        let mut parser = FrameParser::with_limits("B", &limits).expect("boundary");
        parser.push_chunk(b"--B\r\nX-Long-Header-Name");

        assert_eq!(
            drain(&mut parser),
            Err(ParseError::HeaderBlockTooLarge { limit: 8 })
        );
    }

    #[test]
    fn finish_before_terminal_boundary_is_incomplete() {
        let mut parser = FrameParser::new("B").expect("boundary");
        parser.push_chunk(b"--B\r\n\r\nbody");
        drain(&mut parser).expect("partial");

        assert_eq!(parser.finish(), Err(ParseError::IncompleteMessage));
        assert_eq!(parser.state(), &ParserState::Finished);
    }

    #[test]
    fn trims_optional_whitespace_around_values() {
        let mut parser = FrameParser::new("B").expect("boundary");
        parser.push_chunk(b"--B\r\nX-Test: \t spaced \t\r\n\r\n\r\n--B--");

        let (frames, _) = drain(&mut parser).expect("valid message");
        let Frame::HeaderFields(fields) = &frames[0] else {
            panic!("expected header frame");
        };
        assert_eq!(
            fields.get("x-test").map(HeaderValue::as_bytes),
            Some(&b"spaced"[..])
        );
        assert_eq!(frames.len(), 1, "empty body yields no chunk frames");
    }

    #[test]
    fn partial_suffix_len_finds_longest_overlap() {
        assert_eq!(partial_suffix_len(b"abc\r\n--", b"\r\n--B"), 4);
        assert_eq!(partial_suffix_len(b"abc", b"\r\n--B"), 0);
        assert_eq!(partial_suffix_len(b"\r", b"\r\n--B"), 1);
    }
}
