//! Partition of split multipart parts into form fields and uploaded files.
//!
//! A part is a file exactly when its `Content-Disposition` carries a `filename`
//! parameter. [`pull_parsed_body`] takes every other part, [`pull_uploaded_files`] takes
//! the files, so each part ends up in exactly one of the two results.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::decode::{BodyPart, ParsedBody, UploadedFiles};
use crate::error::ParseError;
use crate::upload::UploadedFile;

const TEMP_FILE_PREFIX: &str = "upload";
const MAX_TEMP_FILE_ATTEMPTS: usize = 32;

static TEMP_FILE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Collects the non-file parts as `name -> content`.
///
/// Content that is not valid UTF-8 is decoded lossily; parts without a `name` are skipped.
pub fn pull_parsed_body(parts: &[BodyPart]) -> ParsedBody {
    let mut parsed_body = ParsedBody::new();

    for part in parts.iter().filter(|part| !part.is_file()) {
        let Some(name) = part.name() else {
            warn!("skip multipart field without name");
            continue;
        };
        parsed_body.insert(name.to_string(), String::from_utf8_lossy(part.content()).into_owned());
    }

    parsed_body
}

/// Writes every file part to a fresh file under `upload_dir` and describes it as an
/// [`UploadedFile`].
///
/// Each descriptor owns its temporary file until it is moved; dropping it earlier removes
/// the file.
pub fn pull_uploaded_files(parts: &[BodyPart], upload_dir: &Path) -> Result<UploadedFiles, ParseError> {
    let mut files = UploadedFiles::new();

    for part in parts.iter().filter(|part| part.is_file()) {
        let Some(name) = part.name() else {
            warn!(filename = ?part.filename(), "skip multipart file without name");
            continue;
        };

        let content = part.content();
        let path = write_temp_file(upload_dir, content)?;
        debug!(name = %name, path = %path.display(), size = content.len(), "materialized uploaded file");

        let file = UploadedFile::temporary(path, content.len() as u64)
            .with_client_filename(part.filename())
            .with_client_media_type(part.content_type());

        files.insert(name.to_string(), file);
    }

    Ok(files)
}

fn write_temp_file(dir: &Path, content: &[u8]) -> io::Result<PathBuf> {
    let (path, mut file) = create_temp_file(dir)?;
    if let Err(e) = file.write_all(content) {
        // don't leave a truncated file behind
        let _ = std::fs::remove_file(&path);
        return Err(e);
    }
    Ok(path)
}

fn create_temp_file(dir: &Path) -> io::Result<(PathBuf, std::fs::File)> {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();

    for _ in 0..MAX_TEMP_FILE_ATTEMPTS {
        let counter = TEMP_FILE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let candidate = dir.join(format!("{TEMP_FILE_PREFIX}-{}-{nanos}-{counter}.tmp", std::process::id()));

        match OpenOptions::new().create_new(true).write(true).open(&candidate) {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::new(io::ErrorKind::AlreadyExists, "failed to allocate a unique temporary upload file"))
}
