//! Incoming server request with a decoded body.
//!
//! A [`ServerRequest`] is built once per request by [`ServerRequestBuilder`]: it reads the
//! query string and cookies, lets the registered [`MethodHandlers`] decode the body, and
//! keeps the resulting fields and uploaded files for the rest of the request's life.
//!
//! ```
//! use bytes::Bytes;
//! use http::Request;
//! use http_exchange::ServerRequest;
//!
//! let request = Request::delete("/users?force=1")
//!     .header("Content-Type", "application/json")
//!     .body(Bytes::from_static(br#"{"id":"42"}"#))
//!     .unwrap();
//!
//! let request = ServerRequest::builder().build(request).unwrap();
//! assert_eq!(request.input("id", ""), "42");
//! assert_eq!(request.input("force", ""), "1");
//! ```

use std::collections::HashMap;

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri, Version};
use http_body::Body as HttpBody;
use http_body_util::{BodyExt, Limited};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::config::ExchangeConfig;
use crate::decode::{ParsedBody, UploadedFiles, urlencoded};
use crate::error::ParseError;
use crate::handler::{MethodHandlers, RawRequest};
use crate::pre_parsed::PreParsedSource;
use crate::upload::UploadedFile;

/// Query parameter that overrides the request method, for clients limited to `GET`/`POST`.
pub const METHOD_OVERRIDE_PARAM: &str = "_method";

const AJAX_HEADER: &str = "x-requested-with";

#[derive(Debug)]
pub struct ServerRequest {
    head: Parts,
    method: Method,
    body: Bytes,
    query_params: HashMap<String, String>,
    cookies: HashMap<String, String>,
    parsed_body: ParsedBody,
    uploaded_files: UploadedFiles,
}

impl ServerRequest {
    pub fn builder() -> ServerRequestBuilder {
        ServerRequestBuilder::new()
    }

    /// The effective method: the [`METHOD_OVERRIDE_PARAM`] query parameter when it names a
    /// valid method, the request line's method otherwise.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The method from the request line, ignoring any override.
    pub fn real_method(&self) -> &Method {
        &self.head.method
    }

    pub fn uri(&self) -> &Uri {
        &self.head.uri
    }

    pub fn version(&self) -> Version {
        self.head.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// All values of header `name` joined with `", "`, or an empty string when absent.
    ///
    /// Values that aren't visible ASCII are skipped.
    pub fn header_line(&self, name: &str) -> String {
        self.head.headers.get_all(name).iter().filter_map(|value| value.to_str().ok()).collect::<Vec<_>>().join(", ")
    }

    /// The raw, fully buffered body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    /// Deserializes the query string into `T`.
    pub fn query_as<T: DeserializeOwned>(&self) -> Result<T, ParseError> {
        serde_urlencoded::from_str(self.head.uri.query().unwrap_or_default())
            .map_err(|e| ParseError::invalid_input(format!("invalid query string: {e}")))
    }

    pub fn cookies(&self) -> &HashMap<String, String> {
        &self.cookies
    }

    pub fn parsed_body(&self) -> &ParsedBody {
        &self.parsed_body
    }

    pub fn uploaded_files(&self) -> &UploadedFiles {
        &self.uploaded_files
    }

    pub fn uploaded_file(&self, name: &str) -> Option<&UploadedFile> {
        self.uploaded_files.get(name)
    }

    /// Removes the uploaded file `name` from the request and hands it to the caller.
    pub fn take_uploaded_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.uploaded_files.remove(name)
    }

    /// Looks `name` up in the query parameters, then in the parsed body, falling back to
    /// `default`.
    pub fn input<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.query_params.get(name).or_else(|| self.parsed_body.get(name)).map_or(default, String::as_str)
    }

    /// Whether the request was sent with `X-Requested-With: XMLHttpRequest`.
    pub fn is_ajax(&self) -> bool {
        self.head
            .headers
            .get(AJAX_HEADER)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.eq_ignore_ascii_case("XMLHttpRequest"))
    }

    /// Returns the request with its parsed body replaced.
    #[must_use]
    pub fn with_parsed_body(mut self, parsed_body: ParsedBody) -> Self {
        self.parsed_body = parsed_body;
        self
    }

    /// Returns the request with its query parameters replaced.
    #[must_use]
    pub fn with_query_params(mut self, query_params: HashMap<String, String>) -> Self {
        self.query_params = query_params;
        self
    }

    /// Returns the request with its uploaded files replaced.
    #[must_use]
    pub fn with_uploaded_files(mut self, uploaded_files: UploadedFiles) -> Self {
        self.uploaded_files = uploaded_files;
        self
    }
}

/// Builds a [`ServerRequest`] from an `http::Request`.
pub struct ServerRequestBuilder {
    config: ExchangeConfig,
    handlers: MethodHandlers,
    pre_parsed: Option<Box<dyn PreParsedSource>>,
}

impl ServerRequestBuilder {
    fn new() -> Self {
        Self { config: ExchangeConfig::default(), handlers: MethodHandlers::default(), pre_parsed: None }
    }

    pub fn config(mut self, config: ExchangeConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the default `POST`/`PATCH`/`PUT`/`DELETE` handlers.
    pub fn handlers(mut self, handlers: MethodHandlers) -> Self {
        self.handlers = handlers;
        self
    }

    /// Supplies a body the hosting layer already parsed, see [`PreParsedSource`].
    pub fn pre_parsed<P: PreParsedSource + 'static>(mut self, pre_parsed: P) -> Self {
        self.pre_parsed = Some(Box::new(pre_parsed));
        self
    }

    /// Builds the request from a fully buffered body.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidInput`] or [`ParseError::MalformedMultipart`] when the
    /// body can't be decoded, and [`ParseError::Io`] when an uploaded file can't be written.
    pub fn build(self, request: Request<Bytes>) -> Result<ServerRequest, ParseError> {
        let (head, body) = request.into_parts();

        let query_params = head.uri.query().map(urlencoded::decode_str).unwrap_or_default();
        let cookies = parse_cookies(&head.headers);
        let method = effective_method(&head.method, &query_params);

        let (parsed_body, uploaded_files) = {
            let mut raw =
                RawRequest::new(&method, &head.headers, &body, &self.config).with_pre_parsed(self.pre_parsed);
            self.handlers.dispatch(&mut raw)?.into_parts()
        };

        debug!(
            method = %method,
            uri = %head.uri,
            fields = parsed_body.len(),
            files = uploaded_files.len(),
            "built server request"
        );

        Ok(ServerRequest { head, method, body, query_params, cookies, parsed_body, uploaded_files })
    }

    /// Collects a streaming body, bounded by [`ExchangeConfig::max_body_size`], then
    /// builds the request.
    ///
    /// # Errors
    ///
    /// Besides the errors of [`build`](Self::build), returns [`ParseError::InvalidBody`]
    /// when the body can't be read or exceeds the size limit.
    pub async fn collect<B>(self, request: Request<B>) -> Result<ServerRequest, ParseError>
    where
        B: HttpBody<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (head, body) = request.into_parts();
        let limit = self.config.max_body_size().unwrap_or(usize::MAX);

        let bytes = Limited::new(body, limit)
            .collect()
            .await
            .map_err(|e| ParseError::invalid_body(format!("failed to read body: {e}")))?
            .to_bytes();
        trace!(size = bytes.len(), "collected request body");

        self.build(Request::from_parts(head, bytes))
    }
}

impl std::fmt::Debug for ServerRequestBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerRequestBuilder")
            .field("config", &self.config)
            .field("handlers", &self.handlers)
            .field("pre_parsed", &self.pre_parsed.is_some())
            .finish()
    }
}

fn effective_method(real: &Method, query_params: &HashMap<String, String>) -> Method {
    let Some(name) = query_params.get(METHOD_OVERRIDE_PARAM).filter(|name| !name.is_empty()) else {
        return real.clone();
    };

    match Method::from_bytes(name.to_ascii_uppercase().as_bytes()) {
        Ok(method) => {
            trace!(real = %real, method = %method, "method overridden by query parameter");
            method
        }
        Err(_) => {
            trace!(value = %name, "ignore invalid method override");
            real.clone()
        }
    }
}

/// Parses all `Cookie` headers into `name -> value`; pairs without `=` are dropped.
fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .get_all(http::header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|line| line.split(';'))
        .filter_map(|pair| pair.split_once('='))
        .map(|(name, value)| (name.trim().to_string(), value.trim().trim_matches('"').to_string()))
        .filter(|(name, _)| !name.is_empty())
        .collect()
}
