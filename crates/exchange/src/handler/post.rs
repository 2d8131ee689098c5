use http::Method;
use tracing::trace;

use crate::content_type::ContentKind;
use crate::decode;
use crate::error::ParseError;
use crate::handler::{MethodHandler, RawRequest, RequestBody, decode_body};

/// Decodes `POST` bodies.
///
/// JSON bodies are always decoded here. For other content types a host that already
/// parsed the form body injects a [`PreParsedSource`](crate::PreParsedSource), whose
/// fields and files are trusted as they are. Without one, the body is decoded like a
/// `PATCH` body.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostHandler;

impl MethodHandler for PostHandler {
    fn matches(&self, method: &Method) -> bool {
        method == Method::POST
    }

    fn decode(&self, request: &mut RawRequest<'_>) -> Result<RequestBody, ParseError> {
        if request.content_kind() == ContentKind::Json {
            return decode::json::decode(request.body()).map(RequestBody::fields);
        }

        match request.take_pre_parsed() {
            Some(mut pre_parsed) => {
                trace!("using pre-parsed post body");
                Ok(RequestBody::new(pre_parsed.fields(), pre_parsed.files()))
            }
            None => decode_body(request, true),
        }
    }
}
