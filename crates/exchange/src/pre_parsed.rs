//! Bodies decoded before a request reaches this crate.
//!
//! Some hosting environments parse `POST` form bodies themselves before handing the request
//! over. Such a host injects the result as a [`PreParsedSource`] through
//! [`ServerRequestBuilder::pre_parsed`](crate::ServerRequestBuilder::pre_parsed), and the
//! `POST` handler trusts it instead of decoding the body again.

use crate::decode::{ParsedBody, UploadedFiles};

/// Hands over fields and files parsed by the hosting layer.
///
/// Both methods are called at most once per request; implementations may move their data
/// out on the first call.
#[cfg_attr(test, mockall::automock)]
pub trait PreParsedSource: Send {
    fn fields(&mut self) -> ParsedBody;

    fn files(&mut self) -> UploadedFiles;
}

/// A [`PreParsedSource`] holding already decoded values.
#[derive(Debug, Default)]
pub struct PreParsed {
    fields: ParsedBody,
    files: UploadedFiles,
}

impl PreParsed {
    pub fn new(fields: ParsedBody, files: UploadedFiles) -> Self {
        Self { fields, files }
    }
}

impl PreParsedSource for PreParsed {
    fn fields(&mut self) -> ParsedBody {
        std::mem::take(&mut self.fields)
    }

    fn files(&mut self) -> UploadedFiles {
        std::mem::take(&mut self.files)
    }
}
