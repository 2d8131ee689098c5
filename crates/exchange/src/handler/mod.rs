//! Per-method body decoding.
//!
//! Each mutating HTTP method has a [`MethodHandler`] that knows which parts of a body it
//! decodes:
//!
//! | handler            | fields                      | files            |
//! |--------------------|-----------------------------|------------------|
//! | [`PostHandler`]    | pre-parsed source, or body  | pre-parsed, or multipart |
//! | [`PatchHandler`]   | json / multipart / form     | multipart only   |
//! | [`PutHandler`]     | json / multipart / form     | multipart only   |
//! | [`DeleteHandler`]  | json / multipart / form     | never            |
//!
//! Handlers are kept in an ordered [`MethodHandlers`] registry. Dispatch scans it and stops
//! at the first handler that claims the request method; when none does, the request has an
//! empty body.

use bytes::Bytes;
use http::{HeaderMap, Method};
use tracing::trace;

use crate::config::ExchangeConfig;
use crate::content_type::{self, ContentKind};
use crate::decode::{self, MultipartSplitter, ParsedBody, UploadedFiles};
use crate::error::ParseError;
use crate::pre_parsed::PreParsedSource;

mod delete;
mod patch;
mod post;
mod put;

pub use delete::DeleteHandler;
pub use patch::PatchHandler;
pub use post::PostHandler;
pub use put::PutHandler;

/// The decoded body of one request.
#[derive(Debug, Default)]
pub struct RequestBody {
    parsed_body: ParsedBody,
    uploaded_files: UploadedFiles,
}

impl RequestBody {
    pub fn new(parsed_body: ParsedBody, uploaded_files: UploadedFiles) -> Self {
        Self { parsed_body, uploaded_files }
    }

    pub fn fields(parsed_body: ParsedBody) -> Self {
        Self { parsed_body, uploaded_files: UploadedFiles::new() }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn parsed_body(&self) -> &ParsedBody {
        &self.parsed_body
    }

    pub fn uploaded_files(&self) -> &UploadedFiles {
        &self.uploaded_files
    }

    pub fn into_parts(self) -> (ParsedBody, UploadedFiles) {
        (self.parsed_body, self.uploaded_files)
    }
}

/// The view of an incoming request that handlers decode from.
pub struct RawRequest<'a> {
    method: &'a Method,
    headers: &'a HeaderMap,
    body: &'a Bytes,
    config: &'a ExchangeConfig,
    pre_parsed: Option<Box<dyn PreParsedSource>>,
}

impl<'a> RawRequest<'a> {
    pub fn new(method: &'a Method, headers: &'a HeaderMap, body: &'a Bytes, config: &'a ExchangeConfig) -> Self {
        Self { method, headers, body, config, pre_parsed: None }
    }

    pub fn with_pre_parsed(mut self, pre_parsed: Option<Box<dyn PreParsedSource>>) -> Self {
        self.pre_parsed = pre_parsed;
        self
    }

    pub fn method(&self) -> &Method {
        self.method
    }

    pub fn headers(&self) -> &HeaderMap {
        self.headers
    }

    pub fn body(&self) -> &Bytes {
        self.body
    }

    pub fn config(&self) -> &ExchangeConfig {
        self.config
    }

    /// The raw `Content-Type` value, if readable.
    pub fn content_type(&self) -> Option<&str> {
        content_type::content_type(self.headers)
    }

    pub fn content_kind(&self) -> ContentKind {
        ContentKind::of(self.headers)
    }

    /// Takes the pre-parsed source out of the request; later calls return `None`.
    pub fn take_pre_parsed(&mut self) -> Option<Box<dyn PreParsedSource>> {
        self.pre_parsed.take()
    }
}

impl std::fmt::Debug for RawRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawRequest")
            .field("method", self.method)
            .field("headers", self.headers)
            .field("body_len", &self.body.len())
            .field("pre_parsed", &self.pre_parsed.is_some())
            .finish_non_exhaustive()
    }
}

pub trait MethodHandler: Send + Sync {
    /// Whether this handler is responsible for `method`.
    fn matches(&self, method: &Method) -> bool;

    /// Decodes the body of a request this handler matched.
    fn decode(&self, request: &mut RawRequest<'_>) -> Result<RequestBody, ParseError>;

    /// Decodes `request` if its method matches, `Ok(None)` otherwise.
    fn update(&self, request: &mut RawRequest<'_>) -> Result<Option<RequestBody>, ParseError> {
        if !self.matches(request.method()) {
            return Ok(None);
        }
        self.decode(request).map(Some)
    }
}

/// Ordered registry of [`MethodHandler`]s.
pub struct MethodHandlers {
    handlers: Vec<Box<dyn MethodHandler>>,
}

impl MethodHandlers {
    pub fn builder() -> MethodHandlersBuilder {
        MethodHandlersBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Runs the first handler matching the request method.
    ///
    /// Handlers after the match are not consulted. Without a match nothing is decoded and
    /// an empty [`RequestBody`] is returned.
    pub fn dispatch(&self, request: &mut RawRequest<'_>) -> Result<RequestBody, ParseError> {
        for handler in &self.handlers {
            if let Some(body) = handler.update(request)? {
                trace!(method = %request.method(), "request body decoded");
                return Ok(body);
            }
        }

        trace!(method = %request.method(), "no method handler matched, body not decoded");
        Ok(RequestBody::empty())
    }
}

/// Registers `POST`, `PATCH`, `PUT` and `DELETE`.
impl Default for MethodHandlers {
    fn default() -> Self {
        Self::builder().handler(PostHandler).handler(PatchHandler).handler(PutHandler).handler(DeleteHandler).build()
    }
}

impl std::fmt::Debug for MethodHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodHandlers").field("len", &self.handlers.len()).finish()
    }
}

#[derive(Default)]
pub struct MethodHandlersBuilder {
    handlers: Vec<Box<dyn MethodHandler>>,
}

impl MethodHandlersBuilder {
    fn new() -> Self {
        Self::default()
    }

    pub fn handler<H: MethodHandler + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    pub fn build(self) -> MethodHandlers {
        MethodHandlers { handlers: self.handlers }
    }
}

impl std::fmt::Debug for MethodHandlersBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodHandlersBuilder").field("len", &self.handlers.len()).finish()
    }
}

/// Decodes fields, and files too when `with_files` is set, according to the content type.
///
/// Files only ever come from multipart bodies; json and urlencoded bodies yield none.
fn decode_body(request: &RawRequest<'_>, with_files: bool) -> Result<RequestBody, ParseError> {
    let body = request.body();

    match request.content_kind() {
        ContentKind::Json => decode::json::decode(body).map(RequestBody::fields),
        ContentKind::UrlEncoded => decode::urlencoded::decode(body).map(RequestBody::fields),
        ContentKind::Multipart if body.is_empty() => Ok(RequestBody::empty()),
        ContentKind::Multipart => {
            let parts = MultipartSplitter::for_content_type(request.content_type(), body)?.split(body)?;
            let parsed_body = decode::extract::pull_parsed_body(&parts);
            let uploaded_files = if with_files {
                decode::extract::pull_uploaded_files(&parts, &request.config().upload_dir())?
            } else {
                UploadedFiles::new()
            };
            Ok(RequestBody::new(parsed_body, uploaded_files))
        }
        ContentKind::Unknown => Ok(RequestBody::empty()),
    }
}
