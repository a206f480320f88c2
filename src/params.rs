//! Parameter and body encoding.
//!
//! This module turns user-supplied key/value data into canonical wire forms:
//! `application/x-www-form-urlencoded` strings for query strings and form
//! bodies, and `multipart/form-data` payloads when file parts are present.
//!
//! Ordering is load-bearing throughout: pairs are emitted in the exact order
//! they were supplied, and list values expand to one pair per element without
//! reordering.

use rand::distr::Alphanumeric;
use rand::Rng;

use crate::errors::{Error, Result};

/// A single field value: either one string or an ordered list of strings.
///
/// A list expands into one `key=value` pair per element during encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Single(String),
    List(Vec<String>),
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Single(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Single(v)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(v: Vec<String>) -> Self {
        FieldValue::List(v)
    }
}

/// Ordered key/value fields, as supplied by the caller.
pub type Fields = Vec<(String, FieldValue)>;

/// A request body before preparation.
#[derive(Debug, Clone, Default)]
pub enum Body {
    /// No body.
    #[default]
    None,
    /// Ordered form fields, urlencoded at prepare time (or folded into a
    /// multipart payload when file parts are present).
    Fields(Fields),
    /// A pre-formed payload. Passed through byte-for-byte; callers must not
    /// expect any further encoding.
    Raw(Vec<u8>),
}

impl Body {
    pub fn is_none(&self) -> bool {
        matches!(self, Body::None)
    }
}

/// One file part of a multipart body.
#[derive(Debug, Clone)]
pub struct FilePart {
    /// Form field name.
    pub name: String,
    /// Original filename reported in the part header, if any.
    pub filename: Option<String>,
    /// Part content type. Defaults to `application/octet-stream` when absent.
    pub content_type: Option<String>,
    /// Raw file contents.
    pub content: Vec<u8>,
}

/// Flattens `fields` into `(key, value)` pairs, preserving input order.
///
/// List values contribute one pair per element, keeping their relative order.
pub fn flatten_fields(fields: &Fields) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in fields {
        match value {
            FieldValue::Single(v) => pairs.push((key.clone(), v.clone())),
            FieldValue::List(vs) => {
                for v in vs {
                    pairs.push((key.clone(), v.clone()));
                }
            }
        }
    }
    pairs
}

/// Encodes `fields` into `(normalized_pairs, urlencoded_string)`.
///
/// The urlencoded string percent-encodes each pair, joins key and value with
/// `=` and pairs with `&`. Pair order equals input order.
pub fn encode_params(fields: &Fields) -> (Vec<(String, String)>, String) {
    let pairs = flatten_fields(fields);
    let mut ser = form_urlencoded::Serializer::new(String::new());
    for (k, v) in &pairs {
        ser.append_pair(k, v);
    }
    (pairs, ser.finish())
}

/// Length of the random multipart boundary token.
const BOUNDARY_LEN: usize = 24;

fn random_boundary() -> String {
    let token: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(BOUNDARY_LEN)
        .map(char::from)
        .collect();
    format!("courier-{token}")
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Encodes form fields plus file parts into a `multipart/form-data` body.
///
/// Returns `(boundary, body_bytes)`. Non-file `fields` are folded in as text
/// parts rather than urlencoded. The boundary is a random token validated
/// against every part name, filename, content type, and content; a collision
/// is an [`Error::Encoding`] rather than a silently corrupt payload.
pub fn encode_multipart(fields: &Fields, files: &[FilePart]) -> Result<(String, Vec<u8>)> {
    let boundary = random_boundary();
    let text_pairs = flatten_fields(fields);

    for (k, v) in &text_pairs {
        if k.contains(&boundary) || v.contains(&boundary) {
            return Err(Error::Encoding(format!(
                "multipart boundary {boundary} collides with form field"
            )));
        }
    }
    for part in files {
        if part.name.contains(&boundary)
            || part.filename.as_deref().is_some_and(|f| f.contains(&boundary))
            || part.content_type.as_deref().is_some_and(|c| c.contains(&boundary))
            || contains_bytes(&part.content, boundary.as_bytes())
        {
            return Err(Error::Encoding(format!(
                "multipart boundary {boundary} collides with file part {}",
                part.name
            )));
        }
    }

    let mut body = Vec::new();
    for (k, v) in &text_pairs {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{k}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(v.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    for part in files {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        match &part.filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    part.name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name).as_bytes(),
            ),
        }
        let content_type = part
            .content_type
            .as_deref()
            .unwrap_or("application/octet-stream");
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(&part.content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    Ok((boundary, body))
}
