use http::Method;

use crate::error::ParseError;
use crate::handler::{MethodHandler, RawRequest, RequestBody, decode_body};

/// Decodes `PATCH` bodies: fields for every known content type, plus uploaded files when
/// the body is multipart.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatchHandler;

impl MethodHandler for PatchHandler {
    fn matches(&self, method: &Method) -> bool {
        method == Method::PATCH
    }

    fn decode(&self, request: &mut RawRequest<'_>) -> Result<RequestBody, ParseError> {
        decode_body(request, true)
    }
}
