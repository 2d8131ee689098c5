//! `multipart/form-data` splitter.
//!
//! Splits a fully buffered multipart body into [`BodyPart`]s, each holding the part's
//! headers and a zero-copy slice of its content.
//!
//! # Framing
//!
//! ```text
//! preamble
//! --boundary\r\n
//! Content-Disposition: form-data; name="title"\r\n
//! \r\n
//! Hello\r\n
//! --boundary\r\n
//! Content-Disposition: form-data; name="avatar"; filename="a.png"\r\n
//! Content-Type: image/png\r\n
//! \r\n
//! <bytes>\r\n
//! --boundary--\r\n
//! ```
//!
//! The body is cut at every occurrence of the delimiter (`--` + boundary). The fragment
//! before the first delimiter is a preamble and dropped; a fragment starting with `--`
//! closes the body. Inside a fragment, leading line breaks are skipped, headers end at the
//! first blank line and the rest is content. The CRLF right before the next delimiter is
//! part of that delimiter, so it is not kept in the content.
//!
//! The boundary is normally read from the `boundary` parameter of the `Content-Type`
//! header. For producers that omit it, [`MultipartSplitter::sniff`] takes the first line of
//! the body as the delimiter instead.

use std::collections::HashMap;
use std::ops::Range;

use bytes::Bytes;
use tracing::trace;

use crate::error::ParseError;
use crate::utils::ensure;

const CRLF: &[u8] = b"\r\n";
const HEADER_END: &[u8] = b"\r\n\r\n";
const CLOSE_MARKER: &[u8] = b"--";
const CONTENT_DISPOSITION: &str = "Content-Disposition";
const CONTENT_TYPE: &str = "Content-Type";

/// The value of one part header, tokenized on `"; "`.
///
/// Tokens without `=` are collected in [`values`](PartHeader::values) in order; tokens of
/// the form `key=value` land in [`params`](PartHeader::params) with surrounding double
/// quotes removed from the value. For `form-data; name="x"; filename="y"` that gives
/// `values == ["form-data"]` and `params == {name: x, filename: y}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartHeader {
    values: Vec<String>,
    params: HashMap<String, String>,
}

impl PartHeader {
    fn parse(raw: &str) -> Self {
        let mut header = PartHeader::default();
        header.extend(raw);
        header
    }

    fn extend(&mut self, raw: &str) {
        for token in raw.trim_matches(' ').split("; ") {
            match token.split_once('=') {
                Some((key, value)) if !key.is_empty() => {
                    self.params.insert(key.to_string(), value.trim_matches('"').to_string());
                }
                _ if token.is_empty() => {}
                _ => self.values.push(token.to_string()),
            }
        }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// The first unnamed token, e.g. the media type of a `Content-Type` header.
    pub fn first_value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// One boundary delimited section of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyPart {
    headers: Vec<(String, PartHeader)>,
    content: Bytes,
}

impl BodyPart {
    /// Headers in the order they were received, names kept as sent.
    pub fn headers(&self) -> &[(String, PartHeader)] {
        &self.headers
    }

    /// Looks a header up by name, ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&PartHeader> {
        self.headers.iter().find(|(header_name, _)| header_name.eq_ignore_ascii_case(name)).map(|(_, header)| header)
    }

    /// The `name` parameter of `Content-Disposition`.
    pub fn name(&self) -> Option<&str> {
        self.header(CONTENT_DISPOSITION).and_then(|header| header.param("name"))
    }

    /// The `filename` parameter of `Content-Disposition`; present only on file parts.
    pub fn filename(&self) -> Option<&str> {
        self.header(CONTENT_DISPOSITION).and_then(|header| header.param("filename"))
    }

    /// The first value of the part's `Content-Type` header.
    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE).and_then(PartHeader::first_value)
    }

    #[inline]
    pub fn is_file(&self) -> bool {
        self.filename().is_some()
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn into_content(self) -> Bytes {
        self.content
    }
}

/// Splits multipart bodies on a fixed delimiter.
#[derive(Debug, Clone)]
pub struct MultipartSplitter {
    delimiter: Vec<u8>,
}

impl MultipartSplitter {
    /// Creates a splitter for `boundary` as found in the `Content-Type` parameter, without
    /// the leading `--`.
    pub fn new(boundary: &str) -> Self {
        let mut delimiter = Vec::with_capacity(boundary.len() + CLOSE_MARKER.len());
        delimiter.extend_from_slice(CLOSE_MARKER);
        delimiter.extend_from_slice(boundary.as_bytes());
        Self { delimiter }
    }

    /// Takes the delimiter from the first line of `body`.
    ///
    /// This is the compatibility mode for producers that don't announce the boundary in
    /// the header; the body must start with the delimiter line.
    pub fn sniff(body: &[u8]) -> Result<Self, ParseError> {
        let line_end = find(body, CRLF, 0)
            .ok_or_else(|| ParseError::malformed_multipart("can not find the boundary line in body"))?;

        let delimiter = body[..line_end].to_vec();
        ensure!(!delimiter.is_empty(), ParseError::malformed_multipart("boundary line is empty"));

        Ok(Self { delimiter })
    }

    /// Uses the `boundary` parameter of `content_type` when there is one, otherwise sniffs
    /// it from `body`.
    pub fn for_content_type(content_type: Option<&str>, body: &[u8]) -> Result<Self, ParseError> {
        match content_type.and_then(boundary_of) {
            Some(boundary) => Ok(Self::new(&boundary)),
            None => {
                trace!("no boundary parameter in content type, sniffing it from body");
                Self::sniff(body)
            }
        }
    }

    /// The delimiter parts are separated by, including the leading `--`.
    pub fn delimiter(&self) -> &[u8] {
        &self.delimiter
    }

    /// Splits `body` into its parts, in the order they appear.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::MalformedMultipart`] when a part has no blank line between
    /// headers and content, when a header line has no `:`, or when a header block is not
    /// UTF-8. A broken part fails the whole body, because the rest of the stream can't be
    /// trusted to resynchronize.
    pub fn split(&self, body: &Bytes) -> Result<Vec<BodyPart>, ParseError> {
        let fragments = self.fragments(body);
        let mut parts = Vec::with_capacity(fragments.len());

        for (index, range) in fragments.into_iter().enumerate() {
            let fragment = &body[range.clone()];
            if fragment.starts_with(CLOSE_MARKER) {
                trace!(parts = parts.len(), "reached close delimiter");
                break;
            }
            if fragment.iter().all(|b| *b == b'\r' || *b == b'\n') {
                continue;
            }

            parts.push(parse_part(body, range, index)?);
        }

        Ok(parts)
    }

    /// Byte ranges between consecutive delimiters, preamble excluded.
    fn fragments(&self, body: &[u8]) -> Vec<Range<usize>> {
        let mut fragments = Vec::new();
        let Some(mut start) = find(body, &self.delimiter, 0).map(|pos| pos + self.delimiter.len()) else {
            return fragments;
        };

        while let Some(pos) = find(body, &self.delimiter, start) {
            fragments.push(start..pos);
            start = pos + self.delimiter.len();
        }
        fragments.push(start..body.len());

        fragments
    }
}

fn parse_part(body: &Bytes, range: Range<usize>, index: usize) -> Result<BodyPart, ParseError> {
    let leading = body[range.clone()].iter().take_while(|b| **b == b'\r' || **b == b'\n').count();
    let start = range.start + leading;
    let fragment = &body[start..range.end];

    let header_len = find(fragment, HEADER_END, 0)
        .ok_or_else(|| ParseError::malformed_multipart(format!("part {index} has no header/body separator")))?;

    let raw_headers = std::str::from_utf8(&fragment[..header_len])
        .map_err(|e| ParseError::malformed_multipart(format!("part {index} headers are not utf8: {e}")))?;
    let headers = parse_headers(raw_headers, index)?;

    let content_start = start + header_len + HEADER_END.len();
    let mut content_end = range.end;
    if body[content_start..content_end].ends_with(CRLF) {
        content_end -= CRLF.len();
    }

    Ok(BodyPart { headers, content: body.slice(content_start..content_end) })
}

fn parse_headers(raw_headers: &str, index: usize) -> Result<Vec<(String, PartHeader)>, ParseError> {
    let mut headers: Vec<(String, PartHeader)> = Vec::new();

    for line in raw_headers.split("\r\n") {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| ParseError::malformed_multipart(format!("part {index} header line '{line}' has no ':'")))?;
        let name = name.trim();

        // repeated names accumulate into one entry
        match headers.iter_mut().find(|(header_name, _)| header_name == name) {
            Some((_, header)) => header.extend(value),
            None => headers.push((name.to_string(), PartHeader::parse(value))),
        }
    }

    Ok(headers)
}

fn boundary_of(content_type: &str) -> Option<String> {
    let mime = content_type.parse::<mime::Mime>().ok()?;
    let boundary = mime.get_param(mime::BOUNDARY)?.as_str();
    (!boundary.is_empty()).then(|| boundary.to_string())
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..].windows(needle.len()).position(|window| window == needle).map(|pos| pos + from)
}
