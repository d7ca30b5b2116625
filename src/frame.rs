//! Frames: the unit flowing between the byte layer and the part layer.

use bytes::Bytes;
use http::{header, HeaderName, HeaderValue};

/// One step of a multipart message: a part's header block or a piece of its body.
///
/// A well-formed frame sequence opens every part with exactly one
/// [`Frame::HeaderFields`], followed by zero or more [`Frame::BodyChunk`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Header block opening a new part.
    HeaderFields(HeaderFields),
    /// A chunk of the current part's body.
    BodyChunk(Bytes),
}

impl Frame {
    /// Returns `true` for header frames.
    pub fn is_header_fields(&self) -> bool {
        matches!(self, Self::HeaderFields(_))
    }
}

/// Ordered header multimap for a single part.
///
/// Unlike [`http::HeaderMap`], fields keep their exact insertion order across
/// names, so a block renders back in the order it was parsed or built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFields {
    fields: Vec<(HeaderName, HeaderValue)>,
}

impl HeaderFields {
    /// Creates an empty header block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field, keeping any existing values for the same name.
    pub fn append(&mut self, name: HeaderName, value: HeaderValue) {
        self.fields.push((name, value));
    }

    /// Replaces every value for `name` with `value`, in place of the first occurrence.
    pub fn insert(&mut self, name: HeaderName, value: HeaderValue) {
        match self.fields.iter().position(|(existing, _)| *existing == name) {
            Some(index) => {
                self.fields[index].1 = value;
                let mut position = 0usize;
                self.fields.retain(|(existing, _)| {
                    let keep = position <= index || *existing != name;
                    position += 1;
                    keep
                });
            }
            None => self.fields.push((name, value)),
        }
    }

    /// Builder-style [`HeaderFields::append`].
    pub fn with(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.append(name, value);
        self
    }

    /// Returns the first value for `name`.
    pub fn get(&self, name: impl AsRef<str>) -> Option<&HeaderValue> {
        let name = name.as_ref();
        self.fields
            .iter()
            .find(|(existing, _)| existing.as_str().eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Returns every value for `name` in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a HeaderValue> + 'a {
        self.fields
            .iter()
            .filter(move |(existing, _)| existing.as_str().eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Removes every value for `name`, returning how many were dropped.
    pub fn remove(&mut self, name: impl AsRef<str>) -> usize {
        let name = name.as_ref();
        let before = self.fields.len();
        self.fields
            .retain(|(existing, _)| !existing.as_str().eq_ignore_ascii_case(name));
        before - self.fields.len()
    }

    /// Returns `true` when a value exists for `name`.
    pub fn contains(&self, name: impl AsRef<str>) -> bool {
        self.get(name).is_some()
    }

    /// Iterates fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.fields.iter().map(|(name, value)| (name, value))
    }

    /// Number of fields, counting repeated names separately.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` for an empty header block.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Body length declared by a `Content-Length` field, if present and numeric.
    pub fn content_length(&self) -> Option<u64> {
        self.get(header::CONTENT_LENGTH)?
            .to_str()
            .ok()?
            .trim()
            .parse()
            .ok()
    }

    /// Number of bytes the block occupies on the wire, excluding the blank line.
    pub(crate) fn encoded_len(&self) -> usize {
        self.fields
            .iter()
            .map(|(name, value)| name.as_str().len() + 2 + value.len() + 2)
            .sum()
    }
}

impl Extend<(HeaderName, HeaderValue)> for HeaderFields {
    fn extend<I: IntoIterator<Item = (HeaderName, HeaderValue)>>(&mut self, iter: I) {
        self.fields.extend(iter);
    }
}

impl FromIterator<(HeaderName, HeaderValue)> for HeaderFields {
    fn from_iter<I: IntoIterator<Item = (HeaderName, HeaderValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for HeaderFields {
    type Item = (HeaderName, HeaderValue);
    type IntoIter = std::vec::IntoIter<(HeaderName, HeaderValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}
