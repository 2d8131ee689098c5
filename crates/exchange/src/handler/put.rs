use http::Method;

use crate::error::ParseError;
use crate::handler::{MethodHandler, RawRequest, RequestBody, decode_body};

/// Decodes `PUT` bodies the same way [`PatchHandler`](crate::handler::PatchHandler) does.
#[derive(Debug, Clone, Copy, Default)]
pub struct PutHandler;

impl MethodHandler for PutHandler {
    fn matches(&self, method: &Method) -> bool {
        method == Method::PUT
    }

    fn decode(&self, request: &mut RawRequest<'_>) -> Result<RequestBody, ParseError> {
        decode_body(request, true)
    }
}
