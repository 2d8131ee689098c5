use bytes::Bytes;
use http::Request;
use http_body_util::Full;
use http_exchange::{ExchangeConfig, HttpError, ServerRequest, ServerResponse};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

const FORM: &str = concat!(
    "--demo-boundary\r\n",
    "Content-Disposition: form-data; name=\"title\"\r\n",
    "\r\n",
    "Hello from a PATCH form\r\n",
    "--demo-boundary\r\n",
    "Content-Disposition: form-data; name=\"notes\"; filename=\"notes.txt\"\r\n",
    "Content-Type: text/plain\r\n",
    "\r\n",
    "first line\r\nsecond line\r\n",
    "--demo-boundary--\r\n",
);

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::TRACE).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let request = Request::patch("/notes/1?_method=patch")
        .header("Content-Type", "multipart/form-data; boundary=demo-boundary")
        .body(Full::new(Bytes::from_static(FORM.as_bytes())))
        .expect("demo request should be valid");

    match handle(request).await {
        Ok(response) => info!(status = %response.status(), reason = response.reason_phrase(), "response ready"),
        Err(e) => error!(cause = %e, "failed to handle request"),
    }
}

async fn handle(request: Request<Full<Bytes>>) -> Result<ServerResponse, HttpError> {
    let request = ServerRequest::builder().config(ExchangeConfig::from_env()).collect(request).await?;
    info!(title = request.input("title", ""), "decoded fields");

    let Some(notes) = request.uploaded_file("notes") else {
        return Ok(ServerResponse::new().with_status(400, "missing notes file")?);
    };

    let destination = std::env::temp_dir().join("http-exchange-demo-notes.txt");
    notes.move_to(&destination)?;
    info!(destination = %destination.display(), size = notes.size(), "stored upload");

    Ok(ServerResponse::new().with_status(201, "")?)
}
