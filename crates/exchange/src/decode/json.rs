use serde_json::Value;
use tracing::warn;

use crate::decode::ParsedBody;
use crate::error::ParseError;

/// Decodes a JSON object into a [`ParsedBody`].
///
/// String members are taken verbatim, every other value is kept as its compact JSON
/// text. A body that is not valid JSON, or whose top level is not an object, decodes to
/// an empty map. The only hard failure is a body that isn't UTF-8 at all.
pub fn decode(body: &[u8]) -> Result<ParsedBody, ParseError> {
    let text = std::str::from_utf8(body).map_err(|e| ParseError::invalid_input(format!("json body is not utf8: {e}")))?;

    if text.trim().is_empty() {
        return Ok(ParsedBody::new());
    }

    let object = match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) => object,
        Ok(other) => {
            warn!(kind = json_kind(&other), "json body is not an object, ignore it");
            return Ok(ParsedBody::new());
        }
        Err(e) => {
            warn!(cause = %e, "malformed json body, ignore it");
            return Ok(ParsedBody::new());
        }
    };

    Ok(object
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(s) => (key, s),
            other => (key, other.to_string()),
        })
        .collect())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
