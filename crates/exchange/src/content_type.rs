//! Content-Type classification.
//!
//! Decides which body decoder applies to a request. Matching is substring based on the
//! lowercased header value so parameters such as `; charset=utf-8` or `; boundary=...`
//! never get in the way.

use http::HeaderMap;
use tracing::trace;

/// The decoding strategy selected for a request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Json,
    Multipart,
    UrlEncoded,
    Unknown,
}

impl ContentKind {
    /// Classifies a raw `Content-Type` value. A missing header is [`ContentKind::Unknown`].
    pub fn classify(content_type: Option<&str>) -> Self {
        let Some(content_type) = content_type else {
            return ContentKind::Unknown;
        };

        let content_type = content_type.to_ascii_lowercase();

        let kind = if content_type.contains(mime::APPLICATION_JSON.essence_str()) {
            ContentKind::Json
        } else if content_type.contains(mime::MULTIPART_FORM_DATA.essence_str()) {
            ContentKind::Multipart
        } else if content_type.contains(mime::APPLICATION_WWW_FORM_URLENCODED.essence_str()) {
            ContentKind::UrlEncoded
        } else {
            ContentKind::Unknown
        };

        trace!(content_type = %content_type, ?kind, "classified content type");
        kind
    }

    /// Classifies the `Content-Type` header of `headers`.
    ///
    /// Values that are not visible ASCII can't name any of the known types and are
    /// treated as unknown.
    pub fn of(headers: &HeaderMap) -> Self {
        Self::classify(content_type(headers))
    }

    #[inline]
    pub fn is_multipart(self) -> bool {
        self == ContentKind::Multipart
    }
}

/// Returns the `Content-Type` header as a string, if present and readable.
pub(crate) fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers.get(http::header::CONTENT_TYPE).and_then(|value| value.to_str().ok())
}
