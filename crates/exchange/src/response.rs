//! Outgoing server response.
//!
//! [`ServerResponse`] is a value object: every `with_*` method consumes the response and
//! returns the updated one. Turning it into bytes on a connection is left to the host, which
//! gets an `http::Response` from [`ServerResponse::into_http`].

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Response, StatusCode};

use crate::error::ResponseError;
use crate::utils::ensure;

#[derive(Debug, Clone)]
pub struct ServerResponse {
    status: StatusCode,
    reason_phrase: Option<String>,
    headers: HeaderMap,
    body: Bytes,
}

impl Default for ServerResponse {
    fn default() -> Self {
        Self { status: StatusCode::OK, reason_phrase: None, headers: HeaderMap::new(), body: Bytes::new() }
    }
}

impl ServerResponse {
    /// An empty `200 OK` response.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The custom reason phrase if one was set, else the canonical phrase of the status,
    /// else an empty string.
    pub fn reason_phrase(&self) -> &str {
        self.reason_phrase.as_deref().or_else(|| self.status.canonical_reason()).unwrap_or_default()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Sets the status code and, when `reason_phrase` is not empty, a custom reason phrase.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseError::InvalidStatus`] for codes outside `100..=599` and
    /// [`ResponseError::InvalidReasonPhrase`] for phrases containing line breaks.
    pub fn with_status(mut self, code: u16, reason_phrase: &str) -> Result<Self, ResponseError> {
        ensure!((100..=599).contains(&code), ResponseError::invalid_status(code));
        let Ok(status) = StatusCode::from_u16(code) else {
            return Err(ResponseError::invalid_status(code));
        };
        ensure!(
            !reason_phrase.contains(['\r', '\n']),
            ResponseError::invalid_reason_phrase("reason phrase must not contain line breaks")
        );

        self.status = status;
        self.reason_phrase = (!reason_phrase.is_empty()).then(|| reason_phrase.to_string());
        Ok(self)
    }

    /// Appends a header value, keeping values already set under `name`.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, ResponseError> {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| ResponseError::invalid_header(e.to_string()))?;
        let value = HeaderValue::from_str(value).map_err(|e| ResponseError::invalid_header(e.to_string()))?;
        self.headers.append(name, value);
        Ok(self)
    }

    #[must_use]
    pub fn with_body<B: Into<Bytes>>(mut self, body: B) -> Self {
        self.body = body.into();
        self
    }

    /// Converts into an `http::Response`. A custom reason phrase has no place there and is
    /// dropped.
    pub fn into_http(self) -> Response<Bytes> {
        let mut response = Response::new(self.body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
