use tracing::trace;

use crate::decode::ParsedBody;
use crate::error::ParseError;

/// Decodes an `application/x-www-form-urlencoded` body into a [`ParsedBody`].
///
/// The body is split on `&`; segments without `=` are dropped rather than failing the
/// whole body. Keys and values are percent-decoded with `+` as space, and a repeated
/// key keeps its last value.
pub fn decode(body: &[u8]) -> Result<ParsedBody, ParseError> {
    let text =
        std::str::from_utf8(body).map_err(|e| ParseError::invalid_input(format!("urlencoded body is not utf8: {e}")))?;

    Ok(decode_str(text))
}

/// Same as [`decode`] for input that is already text, such as a URI query.
pub fn decode_str(text: &str) -> ParsedBody {
    let mut params = ParsedBody::new();

    for segment in text.split('&') {
        if !segment.contains('=') {
            if !segment.is_empty() {
                trace!(segment = %segment, "skip urlencoded segment without '='");
            }
            continue;
        }

        // a single segment holds exactly one pair
        let pairs = match serde_urlencoded::from_str::<Vec<(String, String)>>(segment) {
            Ok(pairs) => pairs,
            Err(e) => {
                trace!(cause = %e, segment = %segment, "skip undecodable urlencoded segment");
                continue;
            }
        };

        params.extend(pairs);
    }

    params
}
