//! HTTP request and response value objects with content-type aware body decoding
//!
//! This crate turns an already received `http::Request` into a [`ServerRequest`] whose
//! body has been decoded into form fields and uploaded files, and offers a small
//! [`ServerResponse`] value object for the way back.
//!
//! # Decoding pipeline
//!
//! ```text
//! headers + body bytes
//!   -> ContentKind::classify            (json / multipart / urlencoded / unknown)
//!   -> MethodHandlers::dispatch          (first handler matching the method)
//!   -> decode::{json, urlencoded}        fields only
//!   -> decode::multipart + extract       fields, files written to the upload dir
//!   -> ServerRequest { parsed_body, uploaded_files }
//! ```
//!
//! - Unknown content types and unhandled methods (e.g. `GET`) decode to an empty body.
//! - `DELETE` decodes fields only, `PATCH`/`PUT` fields and multipart files.
//! - `POST` trusts a [`PreParsedSource`] injected by the host when there is one.
//! - Malformed multipart bodies and non UTF-8 text bodies fail request construction.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use http::Request;
//! use http_exchange::{ExchangeConfig, ServerRequest};
//!
//! let body = concat!(
//!     "--X\r\n",
//!     "Content-Disposition: form-data; name=\"title\"\r\n",
//!     "\r\n",
//!     "Hello\r\n",
//!     "--X\r\n",
//!     "Content-Disposition: form-data; name=\"avatar\"; filename=\"a.png\"\r\n",
//!     "Content-Type: image/png\r\n",
//!     "\r\n",
//!     "PNG\r\n",
//!     "--X--\r\n",
//! );
//!
//! let request = Request::patch("/profile")
//!     .header("Content-Type", "multipart/form-data; boundary=X")
//!     .body(Bytes::from_static(body.as_bytes()))
//!     .unwrap();
//!
//! let request = ServerRequest::builder()
//!     .config(ExchangeConfig::from_env())
//!     .build(request)
//!     .unwrap();
//!
//! assert_eq!(request.input("title", ""), "Hello");
//! let avatar = request.uploaded_file("avatar").unwrap();
//! assert_eq!(avatar.client_filename(), Some("a.png"));
//! assert_eq!(avatar.size(), 3);
//! ```

mod utils;

pub mod config;
pub mod content_type;
pub mod decode;
pub mod error;
pub mod handler;
pub mod pre_parsed;
pub mod request;
pub mod response;
pub mod upload;

pub use config::ExchangeConfig;
pub use content_type::ContentKind;
pub use decode::{BodyPart, MultipartSplitter, ParsedBody, UploadedFiles};
pub use error::{HttpError, ParseError, ResponseError, UploadError};
pub use handler::{MethodHandler, MethodHandlers, RawRequest, RequestBody};
pub use pre_parsed::{PreParsed, PreParsedSource};
pub use request::{ServerRequest, ServerRequestBuilder};
pub use response::ServerResponse;
pub use upload::{UploadStatus, UploadStream, UploadedFile};
