use std::fs;
use std::io::Read;
use std::path::PathBuf;

use bytes::Bytes;
use http::Request;
use http_body_util::Full;
use http_exchange::{ExchangeConfig, HttpError, ParseError, ServerRequest, ServerResponse, UploadError};
use indoc::indoc;

const AVATAR: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("http-exchange-it-{}-{name}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn profile_form() -> Bytes {
    let mut body = Vec::new();
    body.extend_from_slice(b"--X\r\n");
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"title\"\r\n");
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(b"Hello\r\n");
    body.extend_from_slice(b"--X\r\n");
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"avatar\"; filename=\"a.png\"\r\n");
    body.extend_from_slice(b"Content-Type: image/png\r\n");
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(AVATAR);
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(b"--X--\r\n");
    Bytes::from(body)
}

#[test]
fn delete_with_json_body() {
    let request = Request::delete("/users/42")
        .header("Content-Type", "application/json")
        .body(Bytes::from_static(br#"{"id":"42"}"#))
        .unwrap();

    let request = ServerRequest::builder().build(request).unwrap();

    assert_eq!(request.parsed_body().len(), 1);
    assert_eq!(request.parsed_body().get("id"), Some(&"42".to_string()));
    assert!(request.uploaded_files().is_empty());
}

#[test]
fn patch_with_multipart_body() {
    let dir = scratch_dir("patch");
    let config = ExchangeConfig::builder().upload_tmp_dir(&dir).build();

    let request = Request::patch("/profile")
        .header("Content-Type", "multipart/form-data; boundary=X")
        .body(profile_form())
        .unwrap();

    let request = ServerRequest::builder().config(config).build(request).unwrap();

    assert_eq!(request.parsed_body().len(), 1);
    assert_eq!(request.parsed_body().get("title"), Some(&"Hello".to_string()));

    assert_eq!(request.uploaded_files().len(), 1);
    let avatar = request.uploaded_file("avatar").unwrap();
    assert_eq!(avatar.client_filename(), Some("a.png"));
    assert_eq!(avatar.client_media_type(), Some("image/png"));
    assert_eq!(avatar.size(), AVATAR.len() as u64);
    assert_eq!(avatar.error_code(), 0);

    let mut content = Vec::new();
    avatar.stream().unwrap().read_to_end(&mut content).unwrap();
    assert_eq!(content, AVATAR);
}

#[test]
fn get_is_not_decoded() {
    let request = Request::get("/profile?title=query")
        .header("Content-Type", "application/json")
        .body(Bytes::from_static(br#"{"id":"42"}"#))
        .unwrap();

    let request = ServerRequest::builder().build(request).unwrap();

    assert!(request.parsed_body().is_empty());
    assert!(request.uploaded_files().is_empty());
    assert_eq!(request.input("title", ""), "query");
}

#[test]
fn urlencoded_drops_malformed_segment() {
    let request = Request::patch("/")
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(Bytes::from_static(b"a=1&b=2&malformed"))
        .unwrap();

    let request = ServerRequest::builder().build(request).unwrap();

    assert_eq!(request.parsed_body().len(), 2);
    assert_eq!(request.parsed_body().get("a"), Some(&"1".to_string()));
    assert_eq!(request.parsed_body().get("b"), Some(&"2".to_string()));
}

#[test]
fn unknown_content_type_is_empty() {
    let request = Request::put("/")
        .header("Content-Type", "text/plain")
        .body(Bytes::from_static(b"a=1"))
        .unwrap();

    let request = ServerRequest::builder().build(request).unwrap();
    assert!(request.parsed_body().is_empty());
}

#[test]
fn malformed_multipart_fails_construction() {
    let body = indoc! {"
        --X
        Content-Disposition: form-data; name=\"title\"
        Hello
        --X--
    "}
    .replace('\n', "\r\n");

    let request = Request::patch("/")
        .header("Content-Type", "multipart/form-data; boundary=X")
        .body(Bytes::from(body))
        .unwrap();

    let result = ServerRequest::builder().build(request);
    assert!(matches!(result, Err(ParseError::MalformedMultipart { .. })));
}

#[test]
fn boundary_sniffed_when_header_has_none() {
    let request = Request::patch("/")
        .header("Content-Type", "multipart/form-data")
        .body(profile_form())
        .unwrap();

    let request = ServerRequest::builder()
        .config(ExchangeConfig::builder().upload_tmp_dir(scratch_dir("sniff")).build())
        .build(request)
        .unwrap();

    assert_eq!(request.parsed_body().get("title"), Some(&"Hello".to_string()));
    assert_eq!(request.uploaded_file("avatar").unwrap().size(), AVATAR.len() as u64);
}

#[test]
fn uploaded_file_moves_once() {
    let dir = scratch_dir("move");
    let config = ExchangeConfig::builder().upload_tmp_dir(&dir).build();

    let request = Request::patch("/profile")
        .header("Content-Type", "multipart/form-data; boundary=X")
        .body(profile_form())
        .unwrap();

    let mut request = ServerRequest::builder().config(config).build(request).unwrap();
    let avatar = request.take_uploaded_file("avatar").unwrap();
    let temp_path = avatar.path().unwrap();

    let first = dir.join("avatar-first.png");
    let second = dir.join("avatar-second.png");

    avatar.move_to(&first).unwrap();
    assert!(matches!(avatar.move_to(&second), Err(UploadError::AlreadyMoved)));
    assert!(matches!(avatar.stream(), Err(UploadError::AlreadyMoved)));

    assert_eq!(fs::read(&first).unwrap(), AVATAR);
    assert!(!second.exists());
    assert!(!temp_path.exists());

    // the moved file belongs to the application now
    drop(avatar);
    assert!(first.exists());
}

#[tokio::test]
async fn collect_streaming_multipart_body() {
    let dir = scratch_dir("stream");
    let config = ExchangeConfig::builder().upload_tmp_dir(&dir).max_body_size(64 * 1024).build();

    let request = Request::put("/profile")
        .header("Content-Type", "multipart/form-data; boundary=X")
        .body(Full::new(profile_form()))
        .unwrap();

    let request = ServerRequest::builder().config(config).collect(request).await.unwrap();

    assert_eq!(request.input("title", ""), "Hello");
    assert_eq!(request.uploaded_file("avatar").unwrap().client_filename(), Some("a.png"));
}

fn store_avatar(request: Request<Bytes>, destination: &std::path::Path) -> Result<ServerResponse, HttpError> {
    let request = ServerRequest::builder()
        .config(ExchangeConfig::builder().upload_tmp_dir(scratch_dir("http-error")).build())
        .build(request)?;
    let avatar = request.uploaded_file("avatar").ok_or_else(|| UploadError::invalid_input("missing avatar"))?;
    avatar.move_to(destination)?;
    Ok(ServerResponse::new().with_status(201, "")?)
}

#[test]
fn errors_convert_into_http_error() {
    let destination = scratch_dir("http-error").join("avatar.png");
    let _ = fs::remove_file(&destination);

    let ok = Request::patch("/")
        .header("Content-Type", "multipart/form-data; boundary=X")
        .body(profile_form())
        .unwrap();
    assert_eq!(store_avatar(ok, &destination).unwrap().status().as_u16(), 201);
    assert_eq!(fs::read(&destination).unwrap(), AVATAR);

    let malformed = Request::patch("/")
        .header("Content-Type", "multipart/form-data; boundary=X")
        .body(Bytes::from_static(b"--X\r\nno separator\r\n--X--\r\n"))
        .unwrap();
    assert!(matches!(
        store_avatar(malformed, &destination),
        Err(HttpError::RequestError { source: ParseError::MalformedMultipart { .. } })
    ));

    let missing = Request::patch("/").header("Content-Type", "text/plain").body(Bytes::new()).unwrap();
    assert!(matches!(
        store_avatar(missing, &destination),
        Err(HttpError::UploadError { source: UploadError::InvalidInput { .. } })
    ));
}
