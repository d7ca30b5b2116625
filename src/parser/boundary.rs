use uuid::Uuid;

use crate::error::{ConfigError, ParseError};

const MAX_BOUNDARY_LEN: usize = 70;
const RANDOM_SUFFIX_DIGITS: u32 = 20;

/// Extracts and validates the `boundary` parameter from a `multipart/*` `Content-Type` value.
pub fn extract_multipart_boundary(content_type: &str) -> Result<String, ParseError> {
    let mime = content_type
        .parse::<mime::Mime>()
        .map_err(|_| ParseError::new("invalid Content-Type header"))?;

    if mime.type_() != mime::MULTIPART {
        return Err(ParseError::new("Content-Type must be multipart/*"));
    }

    let boundary = mime
        .get_param(mime::BOUNDARY)
        .map(|value| value.as_str())
        .ok_or_else(|| ParseError::new("missing multipart boundary parameter"))?;

    let boundary = decode_boundary_percent_encoding(boundary)?;
    validate_boundary(&boundary)?;
    Ok(boundary)
}

/// Formats a `multipart/<subtype>` `Content-Type` value carrying `boundary`.
pub fn multipart_content_type(subtype: &str, boundary: &str) -> String {
    if boundary.chars().all(is_token_char) {
        format!("multipart/{subtype}; boundary={boundary}")
    } else {
        format!("multipart/{subtype}; boundary=\"{boundary}\"")
    }
}

/// Source of boundary strings for outgoing messages.
pub trait BoundaryGenerator: Send + Sync {
    /// Returns a boundary for one message.
    fn make_boundary(&self) -> String;
}

/// Always returns the same boundary. Useful for reproducible output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantBoundary {
    boundary: String,
}

impl ConstantBoundary {
    /// Creates a generator that always yields `boundary`.
    pub fn new(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
        }
    }
}

impl Default for ConstantBoundary {
    fn default() -> Self {
        Self::new("__multiframe_boundary__")
    }
}

impl BoundaryGenerator for ConstantBoundary {
    fn make_boundary(&self) -> String {
        self.boundary.clone()
    }
}

/// Appends a random decimal suffix to a fixed prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomBoundary {
    prefix: String,
}

impl RandomBoundary {
    /// Creates a generator with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for RandomBoundary {
    fn default() -> Self {
        Self::new("__multiframe_boundary__")
    }
}

impl BoundaryGenerator for RandomBoundary {
    fn make_boundary(&self) -> String {
        let suffix = Uuid::new_v4().as_u128() % 10u128.pow(RANDOM_SUFFIX_DIGITS);
        format!(
            "{}{:0width$}",
            self.prefix,
            suffix,
            width = RANDOM_SUFFIX_DIGITS as usize
        )
    }
}

/// Checks a caller-supplied boundary before it is used for matching or emitting.
pub(crate) fn validate_boundary_input(boundary: &str) -> Result<(), ConfigError> {
    if boundary.is_empty() {
        return Err(ConfigError::EmptyBoundary);
    }

    if !boundary.is_ascii() {
        return Err(ConfigError::NonAsciiBoundary);
    }

    if boundary.contains('\r') || boundary.contains('\n') {
        return Err(ConfigError::BoundaryContainsNewline);
    }

    Ok(())
}

fn validate_boundary(boundary: &str) -> Result<(), ParseError> {
    if boundary.is_empty() {
        return Err(ParseError::new("multipart boundary cannot be empty"));
    }

    if boundary.len() > MAX_BOUNDARY_LEN {
        return Err(ParseError::new("multipart boundary cannot exceed 70 characters"));
    }

    if boundary.ends_with(' ') {
        return Err(ParseError::new(
            "multipart boundary cannot end with whitespace",
        ));
    }

    if !boundary.chars().all(is_boundary_char) {
        return Err(ParseError::new(
            "multipart boundary contains invalid characters",
        ));
    }

    Ok(())
}

fn decode_boundary_percent_encoding(boundary: &str) -> Result<String, ParseError> {
    if !boundary.as_bytes().contains(&b'%') {
        return Ok(boundary.to_owned());
    }

    let mut bytes = Vec::with_capacity(boundary.len());
    let raw = boundary.as_bytes();
    let mut index = 0usize;

    while index < raw.len() {
        if raw[index] == b'%' {
            if index + 2 >= raw.len() {
                return Err(ParseError::new("invalid percent-encoding in multipart boundary"));
            }

            let hi = hex_value(raw[index + 1])?;
            let lo = hex_value(raw[index + 2])?;
            bytes.push((hi << 4) | lo);
            index += 3;
            continue;
        }

        bytes.push(raw[index]);
        index += 1;
    }

    String::from_utf8(bytes)
        .map_err(|_| ParseError::new("multipart boundary percent-encoding is not valid UTF-8"))
}

fn hex_value(byte: u8) -> Result<u8, ParseError> {
    match byte {
        b'0'..=b'9' => Ok(byte - b'0'),
        b'a'..=b'f' => Ok(byte - b'a' + 10),
        b'A'..=b'F' => Ok(byte - b'A' + 10),
        _ => Err(ParseError::new("invalid percent-encoding in multipart boundary")),
    }
}

fn is_boundary_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '\'' | '(' | ')' | '+' | '_' | ',' | '-' | '.' | '/' | ':' | '=' | '?' | ' '
        )
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '\'' | '+' | '_' | '-' | '.')
}
