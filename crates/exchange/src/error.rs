use std::io;
use thiserror::Error;

use crate::upload::UploadStatus;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("upload error: {source}")]
    UploadError {
        #[from]
        source: UploadError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: ResponseError,
    },
}

/// Failures raised while turning a raw request into a [`ServerRequest`](crate::ServerRequest).
///
/// `InvalidInput` and `MalformedMultipart` are client errors: the body itself is corrupt
/// and the caller should answer with a 4xx status.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("malformed multipart body: {reason}")]
    MalformedMultipart { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn invalid_input<S: ToString>(str: S) -> Self {
        Self::InvalidInput { reason: str.to_string() }
    }

    pub fn malformed_multipart<S: ToString>(str: S) -> Self {
        Self::MalformedMultipart { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }
}

/// Failures raised by [`UploadedFile`](crate::UploadedFile) when accessing or moving its content.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("upload failed with status {status}")]
    Failed { status: UploadStatus },

    #[error("uploaded file has already been moved")]
    AlreadyMoved,

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl UploadError {
    pub fn failed(status: UploadStatus) -> Self {
        Self::Failed { status }
    }

    pub fn invalid_input<S: ToString>(str: S) -> Self {
        Self::InvalidInput { reason: str.to_string() }
    }
}

#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("invalid status code: {code}")]
    InvalidStatus { code: u16 },

    #[error("invalid reason phrase: {reason}")]
    InvalidReasonPhrase { reason: String },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },
}

impl ResponseError {
    pub fn invalid_status(code: u16) -> Self {
        Self::InvalidStatus { code }
    }

    pub fn invalid_reason_phrase<S: ToString>(str: S) -> Self {
        Self::InvalidReasonPhrase { reason: str.to_string() }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }
}
