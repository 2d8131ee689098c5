use http::Method;

use crate::error::ParseError;
use crate::handler::{MethodHandler, RawRequest, RequestBody, decode_body};

/// Decodes `DELETE` bodies. Fields only: files sent with a delete are ignored and never
/// written to disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteHandler;

impl MethodHandler for DeleteHandler {
    fn matches(&self, method: &Method) -> bool {
        method == Method::DELETE
    }

    fn decode(&self, request: &mut RawRequest<'_>) -> Result<RequestBody, ParseError> {
        decode_body(request, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExchangeConfig;
    use bytes::Bytes;
    use http::{HeaderMap, HeaderValue};

    fn decode(content_type: &'static str, body: &'static [u8], config: &ExchangeConfig) -> RequestBody {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        let body = Bytes::from_static(body);
        let mut request = RawRequest::new(&Method::DELETE, &headers, &body, config);
        DeleteHandler.update(&mut request).unwrap().unwrap()
    }

    #[test]
    fn test_json() {
        let decoded = decode("application/json", br#"{"id":"42"}"#, &ExchangeConfig::default());
        assert_eq!(decoded.parsed_body().get("id"), Some(&"42".to_string()));
        assert!(decoded.uploaded_files().is_empty());
    }

    #[test]
    fn test_urlencoded() {
        let decoded = decode("application/x-www-form-urlencoded", b"id=42&force=1", &ExchangeConfig::default());
        assert_eq!(decoded.parsed_body().len(), 2);
        assert_eq!(decoded.parsed_body().get("force"), Some(&"1".to_string()));
    }

    #[test]
    fn test_multipart_files_are_ignored() {
        let dir = std::env::temp_dir().join(format!("http-exchange-delete-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let config = ExchangeConfig::builder().upload_tmp_dir(&dir).build();

        let body = concat!(
            "--Z\r\n",
            "Content-Disposition: form-data; name=\"id\"\r\n",
            "\r\n",
            "42\r\n",
            "--Z\r\n",
            "Content-Disposition: form-data; name=\"proof\"; filename=\"proof.txt\"\r\n",
            "\r\n",
            "evidence\r\n",
            "--Z--\r\n",
        );
        let decoded = decode("multipart/form-data; boundary=Z", body.as_bytes(), &config);

        assert_eq!(decoded.parsed_body().len(), 1);
        assert_eq!(decoded.parsed_body().get("id"), Some(&"42".to_string()));
        assert!(decoded.uploaded_files().is_empty());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn test_matches_only_delete() {
        assert!(DeleteHandler.matches(&Method::DELETE));
        assert!(!DeleteHandler.matches(&Method::POST));
        assert!(!DeleteHandler.matches(&Method::GET));
    }
}
