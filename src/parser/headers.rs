use http::{header, HeaderValue};

use crate::{error::ParseError, frame::HeaderFields};

/// Disposition type used for HTML form submissions.
pub const FORM_DATA: &str = "form-data";

/// Parsed `Content-Disposition` metadata for a multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    /// Disposition type, typically `form-data`.
    pub disposition: String,
    /// Parsed part name (`name` parameter).
    pub name: Option<String>,
    /// Parsed file name (`filename`/`filename*` parameter).
    pub filename: Option<String>,
}

impl ContentDisposition {
    /// Creates a `form-data` disposition for the given part name.
    pub fn form_data(name: impl Into<String>) -> Self {
        Self {
            disposition: FORM_DATA.to_owned(),
            name: Some(name.into()),
            filename: None,
        }
    }

    /// Sets the `filename` parameter.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Reads the disposition from a part's header block.
    ///
    /// Returns `Ok(None)` when the block has no `Content-Disposition` field.
    pub fn from_header_fields(fields: &HeaderFields) -> Result<Option<Self>, ParseError> {
        let Some(raw) = fields.get(header::CONTENT_DISPOSITION) else {
            return Ok(None);
        };
        let raw = std::str::from_utf8(raw.as_bytes())
            .map_err(|_| ParseError::new("Content-Disposition header must be UTF-8"))?;
        parse_content_disposition(raw).map(Some)
    }

    /// Renders the disposition as a header value.
    pub fn to_header_value(&self) -> Result<HeaderValue, ParseError> {
        let mut rendered = self.disposition.clone();

        if let Some(name) = &self.name {
            rendered.push_str("; name=\"");
            push_escaped(&mut rendered, name);
            rendered.push('"');
        }

        if let Some(filename) = &self.filename {
            rendered.push_str("; filename=\"");
            push_escaped(&mut rendered, filename);
            rendered.push('"');
            if !filename.is_ascii() {
                rendered.push_str("; filename*=UTF-8''");
                push_percent_encoded(&mut rendered, filename);
            }
        }

        HeaderValue::from_bytes(rendered.as_bytes()).map_err(|_| ParseError::InvalidHeaderValue {
            name: header::CONTENT_DISPOSITION.as_str().to_owned(),
        })
    }
}

/// Parses a multipart part `Content-Disposition` value.
pub fn parse_content_disposition(value: &str) -> Result<ContentDisposition, ParseError> {
    let mut segments = split_semicolon_aware(value).into_iter();
    let disposition = segments
        .next()
        .map(|segment| segment.trim().to_ascii_lowercase())
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| ParseError::new("invalid Content-Disposition header"))?;

    let mut name: Option<String> = None;
    let mut filename: Option<String> = None;
    let mut filename_star: Option<String> = None;

    for segment in segments {
        let trimmed = segment.trim();
        if trimmed.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = trimmed.split_once('=') else {
            return Err(ParseError::new(
                "invalid Content-Disposition parameter format",
            ));
        };

        let key = raw_key.trim().to_ascii_lowercase();
        let decoded = parse_parameter_value(raw_value.trim())?;

        match key.as_str() {
            "name" => name = Some(decoded),
            "filename" => filename = Some(decoded),
            "filename*" => filename_star = Some(parse_rfc5987_value(&decoded)?),
            _ => {}
        }
    }

    Ok(ContentDisposition {
        disposition,
        name: name.filter(|name| !name.is_empty()),
        filename: filename_star.or(filename),
    })
}

/// Parses a part-level `Content-Type`, if the block carries one.
pub fn parse_part_content_type(fields: &HeaderFields) -> Result<Option<mime::Mime>, ParseError> {
    let Some(raw) = fields.get(header::CONTENT_TYPE) else {
        return Ok(None);
    };
    raw.to_str()
        .map_err(|_| ParseError::new("Content-Type header must be ASCII"))?
        .trim()
        .parse::<mime::Mime>()
        .map(Some)
        .map_err(|_| ParseError::new("invalid part Content-Type header"))
}

fn push_escaped(out: &mut String, value: &str) {
    for ch in value.chars() {
        if matches!(ch, '"' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
}

fn push_percent_encoded(out: &mut String, value: &str) {
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
}

fn parse_parameter_value(raw: &str) -> Result<String, ParseError> {
    if let Some(stripped) = raw.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        return unescape_quoted_string(stripped);
    }

    if raw.contains('"') {
        return Err(ParseError::new("invalid quoted parameter value"));
    }

    Ok(raw.trim().to_owned())
}

fn unescape_quoted_string(value: &str) -> Result<String, ParseError> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            let escaped = chars
                .next()
                .ok_or_else(|| ParseError::new("dangling escape in quoted parameter"))?;
            out.push(escaped);
            continue;
        }
        out.push(ch);
    }

    Ok(out)
}

fn parse_rfc5987_value(value: &str) -> Result<String, ParseError> {
    let Some((charset, rest)) = value.split_once('\'') else {
        return Err(ParseError::new("invalid filename* parameter encoding"));
    };
    let Some((_, encoded)) = rest.split_once('\'') else {
        return Err(ParseError::new("invalid filename* parameter encoding"));
    };

    if !charset.eq_ignore_ascii_case("utf-8") {
        return Err(ParseError::new("only UTF-8 filename* charset is supported"));
    }

    let mut bytes = Vec::with_capacity(encoded.len());
    let raw = encoded.as_bytes();
    let mut index = 0;

    while index < raw.len() {
        if raw[index] == b'%' {
            if index + 2 >= raw.len() {
                return Err(ParseError::new("invalid percent-encoding in filename*"));
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

    String::from_utf8(bytes).map_err(|_| ParseError::new("filename* is not valid UTF-8"))
}

fn hex_value(byte: u8) -> Result<u8, ParseError> {
    match byte {
        b'0'..=b'9' => Ok(byte - b'0'),
        b'a'..=b'f' => Ok(byte - b'a' + 10),
        b'A'..=b'F' => Ok(byte - b'A' + 10),
        _ => Err(ParseError::new("invalid percent-encoding in filename*")),
    }
}

fn split_semicolon_aware(value: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for ch in value.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }

        match ch {
            '\\' if in_quotes => {
                current.push(ch);
                escaped = true;
            }
            '"' => {
                current.push(ch);
                in_quotes = !in_quotes;
            }
            ';' if !in_quotes => {
                segments.push(current);
                current = String::new();
            }
            _ => current.push(ch),
        }
    }

    segments.push(current);
    segments
}
