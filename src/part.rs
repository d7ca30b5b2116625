use bytes::Bytes;
use http::{header, HeaderName, HeaderValue};

use crate::{
    body::{Body, Length},
    error::ParseError,
    frame::HeaderFields,
    parser::headers::{parse_part_content_type, ContentDisposition},
};

/// One section of a multipart message: a header block and a body.
///
/// Decoded parts carry a single-pass body driven by the shared frame source;
/// it must be drained before the next part is requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    header_fields: HeaderFields,
    body: Body<Bytes>,
}

impl Part {
    /// Creates a part from raw header fields and a body.
    pub fn new(header_fields: HeaderFields, body: impl Into<Body<Bytes>>) -> Self {
        Self {
            header_fields,
            body: body.into(),
        }
    }

    /// Creates a `form-data` part named `name`.
    ///
    /// A `Content-Length` field is added when the body length is known.
    pub fn form_data(
        name: impl Into<String>,
        body: impl Into<Body<Bytes>>,
    ) -> Result<Self, ParseError> {
        let body = body.into();
        let mut header_fields = HeaderFields::new();
        header_fields.append(
            header::CONTENT_DISPOSITION,
            ContentDisposition::form_data(name).to_header_value()?,
        );
        if let Length::Known(length) = body.length() {
            header_fields.append(header::CONTENT_LENGTH, HeaderValue::from(length));
        }
        Ok(Self::new(header_fields, body))
    }

    /// Sets the `filename` parameter of the `Content-Disposition` field.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Result<Self, ParseError> {
        let disposition = ContentDisposition::from_header_fields(&self.header_fields)?
            .unwrap_or_else(|| ContentDisposition {
                disposition: "attachment".to_owned(),
                name: None,
                filename: None,
            })
            .with_filename(filename);
        self.header_fields
            .insert(header::CONTENT_DISPOSITION, disposition.to_header_value()?);
        Ok(self)
    }

    /// Appends a header field.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.header_fields.append(name, value);
        self
    }

    /// Returns the part's header block.
    pub fn header_fields(&self) -> &HeaderFields {
        &self.header_fields
    }

    /// Returns the part's header block for modification.
    pub fn header_fields_mut(&mut self) -> &mut HeaderFields {
        &mut self.header_fields
    }

    /// Returns the part's body handle.
    pub fn body(&self) -> &Body<Bytes> {
        &self.body
    }

    /// Splits the part into its header block and body.
    pub fn into_parts(self) -> (HeaderFields, Body<Bytes>) {
        (self.header_fields, self.body)
    }

    /// Returns the `name` parameter of `Content-Disposition`.
    ///
    /// A missing or unparsable disposition yields `None`.
    pub fn name(&self) -> Option<String> {
        self.disposition().and_then(|disposition| disposition.name)
    }

    /// Returns the `filename` (or `filename*`) parameter of `Content-Disposition`.
    pub fn filename(&self) -> Option<String> {
        self.disposition().and_then(|disposition| disposition.filename)
    }

    /// Returns the parsed part-level content type.
    pub fn content_type(&self) -> Option<mime::Mime> {
        parse_part_content_type(&self.header_fields).ok().flatten()
    }

    /// Returns the body length declared by `Content-Length`.
    pub fn content_length(&self) -> Option<u64> {
        self.header_fields.content_length()
    }

    fn disposition(&self) -> Option<ContentDisposition> {
        ContentDisposition::from_header_fields(&self.header_fields)
            .ok()
            .flatten()
    }
}
