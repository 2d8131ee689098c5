//! Uploaded file entity.
//!
//! An [`UploadedFile`] describes one file received with a request: what the client said
//! about it (name, media type), how large it is, whether the transport reported an error,
//! and where its bytes live until the application moves them.
//!
//! # Lifecycle
//!
//! ```text
//! Created --stream()--> Created
//! Created --move_to()--> Moved (terminal)
//! ```
//!
//! Once moved, both [`UploadedFile::stream`] and [`UploadedFile::move_to`] fail with
//! [`UploadError::AlreadyMoved`]. The moved flag is checked and set under a mutex, so two
//! threads racing on the same descriptor can never both move it.
//!
//! Files written by the multipart extractor are temporary: if such a descriptor is dropped
//! before being moved, its backing file is removed.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::UploadError;
use crate::utils::ensure;

/// Upload status codes as reported by the transport that received the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum UploadStatus {
    /// The file was received completely.
    Ok = 0,
    /// The file exceeds the server wide size limit.
    IniSize = 1,
    /// The file exceeds the size limit announced by the form.
    FormSize = 2,
    /// Only part of the file was received.
    Partial = 3,
    /// No file was sent.
    NoFile = 4,
    /// No temporary directory was available.
    NoTmpDir = 6,
    /// The file could not be written to disk.
    CantWrite = 7,
    /// An extension stopped the upload.
    Extension = 8,
}

impl UploadStatus {
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    #[inline]
    pub fn is_ok(self) -> bool {
        self == UploadStatus::Ok
    }
}

impl TryFrom<u8> for UploadStatus {
    type Error = UploadError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(UploadStatus::Ok),
            1 => Ok(UploadStatus::IniSize),
            2 => Ok(UploadStatus::FormSize),
            3 => Ok(UploadStatus::Partial),
            4 => Ok(UploadStatus::NoFile),
            6 => Ok(UploadStatus::NoTmpDir),
            7 => Ok(UploadStatus::CantWrite),
            8 => Ok(UploadStatus::Extension),
            code => Err(UploadError::invalid_input(format!("unknown upload status code {code}"))),
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.code(), self)
    }
}

/// Where the bytes of an uploaded file live.
#[derive(Debug)]
enum Backing {
    File { path: PathBuf, temporary: bool },
    Memory(Bytes),
}

#[derive(Debug)]
enum State {
    Pending(Backing),
    Moved,
}

/// A file received with a request.
#[derive(Debug)]
pub struct UploadedFile {
    size: u64,
    status: UploadStatus,
    client_filename: Option<String>,
    client_media_type: Option<String>,
    state: Mutex<State>,
}

impl UploadedFile {
    /// A file whose content is stored at `path`, e.g. handed over by a hosting layer that
    /// already received the upload.
    pub fn from_path<P: Into<PathBuf>>(path: P, size: u64, status: UploadStatus) -> Self {
        Self::with_backing(Backing::File { path: path.into(), temporary: false }, size, status)
    }

    /// A file whose content is held in memory. Its size is the length of `content`.
    pub fn from_bytes<B: Into<Bytes>>(content: B, status: UploadStatus) -> Self {
        let content = content.into();
        let size = content.len() as u64;
        Self::with_backing(Backing::Memory(content), size, status)
    }

    /// A successfully received file materialized at `path`, owned by this descriptor.
    pub(crate) fn temporary(path: PathBuf, size: u64) -> Self {
        Self::with_backing(Backing::File { path, temporary: true }, size, UploadStatus::Ok)
    }

    fn with_backing(backing: Backing, size: u64, status: UploadStatus) -> Self {
        Self {
            size,
            status,
            client_filename: None,
            client_media_type: None,
            state: Mutex::new(State::Pending(backing)),
        }
    }

    pub fn with_client_filename<S: Into<String>>(mut self, filename: Option<S>) -> Self {
        self.client_filename = filename.map(Into::into);
        self
    }

    pub fn with_client_media_type<S: Into<String>>(mut self, media_type: Option<S>) -> Self {
        self.client_media_type = media_type.map(Into::into);
        self
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    /// The numeric upload status, `0` when the upload succeeded.
    pub fn error_code(&self) -> u8 {
        self.status.code()
    }

    pub fn client_filename(&self) -> Option<&str> {
        self.client_filename.as_deref()
    }

    pub fn client_media_type(&self) -> Option<&str> {
        self.client_media_type.as_deref()
    }

    pub fn is_moved(&self) -> bool {
        matches!(*self.lock(), State::Moved)
    }

    /// The path the content is currently stored at, if it is file backed and not moved yet.
    pub fn path(&self) -> Option<PathBuf> {
        match &*self.lock() {
            State::Pending(Backing::File { path, .. }) => Some(path.clone()),
            _ => None,
        }
    }

    /// Opens a reader over the file content.
    ///
    /// File backed uploads are opened on every call; in-memory uploads hand out a cursor
    /// over a shared buffer.
    ///
    /// # Errors
    ///
    /// - [`UploadError::Failed`] if the transport reported a non-zero status
    /// - [`UploadError::AlreadyMoved`] after a successful [`move_to`](Self::move_to)
    /// - [`UploadError::Io`] if the backing file can't be opened
    pub fn stream(&self) -> Result<UploadStream, UploadError> {
        ensure!(self.status.is_ok(), UploadError::failed(self.status));

        match &*self.lock() {
            State::Moved => Err(UploadError::AlreadyMoved),
            State::Pending(Backing::File { path, .. }) => Ok(UploadStream::File(File::open(path)?)),
            State::Pending(Backing::Memory(content)) => Ok(UploadStream::Memory(Cursor::new(content.clone()))),
        }
    }

    /// Moves the content to `destination`.
    ///
    /// File backed uploads are renamed, falling back to copy and remove when the target
    /// is on another device; in-memory uploads are written out. Only the first successful
    /// call moves anything: later calls fail with [`UploadError::AlreadyMoved`]. A failed
    /// move leaves the descriptor untouched so it can be retried.
    ///
    /// # Errors
    ///
    /// - [`UploadError::Failed`] if the transport reported a non-zero status
    /// - [`UploadError::InvalidInput`] if `destination` is empty
    /// - [`UploadError::AlreadyMoved`] if the file was moved before
    /// - [`UploadError::Io`] if the transfer fails
    pub fn move_to<P: AsRef<Path>>(&self, destination: P) -> Result<(), UploadError> {
        let destination = destination.as_ref();

        ensure!(self.status.is_ok(), UploadError::failed(self.status));
        ensure!(
            !destination.as_os_str().is_empty(),
            UploadError::invalid_input("move destination must be a non-empty path")
        );

        let mut state = self.lock();
        let backing = match &*state {
            State::Moved => return Err(UploadError::AlreadyMoved),
            State::Pending(backing) => backing,
        };

        match backing {
            Backing::File { path, .. } => transfer(path, destination)?,
            Backing::Memory(content) => fs::write(destination, content)?,
        }

        debug!(destination = %destination.display(), size = self.size, "moved uploaded file");
        *state = State::Moved;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // the state is a plain enum, a panic elsewhere can't leave it half written
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for UploadedFile {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let State::Pending(Backing::File { path, temporary: true }) = state {
            if let Err(e) = fs::remove_file(&*path) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(cause = %e, path = %path.display(), "failed to remove temporary upload");
                }
            }
        }
    }
}

fn transfer(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => copy_then_remove(from, to, |p| fs::remove_file(p)),
        Err(e) => Err(e),
    }
}

/// Copies `from` to `to` and removes the source. When the source can't be removed the
/// copy is deleted again, so a failed transfer never leaves the content in two places.
fn copy_then_remove<F>(from: &Path, to: &Path, remove_source: F) -> io::Result<()>
where
    F: FnOnce(&Path) -> io::Result<()>,
{
    fs::copy(from, to)?;
    if let Err(e) = remove_source(from) {
        if let Err(cleanup) = fs::remove_file(to) {
            warn!(cause = %cleanup, path = %to.display(), "failed to remove partial upload copy");
        }
        return Err(e);
    }
    Ok(())
}

/// Reader over the content of an [`UploadedFile`].
#[derive(Debug)]
pub enum UploadStream {
    File(File),
    Memory(Cursor<Bytes>),
}

impl Read for UploadStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            UploadStream::File(file) => file.read(buf),
            UploadStream::Memory(cursor) => cursor.read(buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "http-exchange-upload-{}-{}",
            std::process::id(),
            DIR_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn read_all(file: &UploadedFile) -> Vec<u8> {
        let mut content = Vec::new();
        file.stream().unwrap().read_to_end(&mut content).unwrap();
        content
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(UploadStatus::try_from(0).unwrap(), UploadStatus::Ok);
        assert_eq!(UploadStatus::try_from(1).unwrap(), UploadStatus::IniSize);
        assert_eq!(UploadStatus::try_from(8).unwrap(), UploadStatus::Extension);
        assert_eq!(UploadStatus::Partial.code(), 3);

        assert!(matches!(UploadStatus::try_from(5), Err(UploadError::InvalidInput { .. })));
        assert!(matches!(UploadStatus::try_from(9), Err(UploadError::InvalidInput { .. })));
    }

    #[test]
    fn test_accessors() {
        let file = UploadedFile::from_bytes(&b"hello"[..], UploadStatus::Ok)
            .with_client_filename(Some("hello.txt"))
            .with_client_media_type(Some("text/plain"));

        assert_eq!(file.size(), 5);
        assert_eq!(file.error_code(), 0);
        assert_eq!(file.client_filename(), Some("hello.txt"));
        assert_eq!(file.client_media_type(), Some("text/plain"));
        assert!(!file.is_moved());
        assert_eq!(file.path(), None);
    }

    #[test]
    fn test_stream_from_memory_can_be_read_twice() {
        let file = UploadedFile::from_bytes(&b"hello"[..], UploadStatus::Ok);
        assert_eq!(read_all(&file), b"hello");
        assert_eq!(read_all(&file), b"hello");
    }

    #[test]
    fn test_stream_from_path() {
        let dir = scratch_dir();
        let path = dir.join("source.bin");
        fs::write(&path, b"on disk").unwrap();

        let file = UploadedFile::from_path(&path, 7, UploadStatus::Ok);
        assert_eq!(file.path(), Some(path.clone()));
        assert_eq!(read_all(&file), b"on disk");
    }

    #[test]
    fn test_move_path_backed_file() {
        let dir = scratch_dir();
        let source = dir.join("source.bin");
        let target = dir.join("target.bin");
        fs::write(&source, b"payload").unwrap();

        let file = UploadedFile::from_path(&source, 7, UploadStatus::Ok);
        file.move_to(&target).unwrap();

        assert!(file.is_moved());
        assert!(!source.exists());
        assert_eq!(fs::read(&target).unwrap(), b"payload");
        assert_eq!(file.path(), None);
    }

    #[test]
    fn test_move_memory_backed_file() {
        let dir = scratch_dir();
        let target = dir.join("memory.bin");

        let file = UploadedFile::from_bytes(Bytes::from_static(b"memory"), UploadStatus::Ok);
        file.move_to(&target).unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"memory");
    }

    #[test]
    fn test_second_move_fails() {
        let dir = scratch_dir();
        let first = dir.join("first.bin");
        let second = dir.join("second.bin");

        let file = UploadedFile::from_bytes(&b"once"[..], UploadStatus::Ok);
        file.move_to(&first).unwrap();

        assert!(matches!(file.move_to(&second), Err(UploadError::AlreadyMoved)));
        assert!(matches!(file.stream(), Err(UploadError::AlreadyMoved)));
        assert!(first.exists());
        assert!(!second.exists());
    }

    #[test]
    fn test_failed_upload_refuses_access() {
        let dir = scratch_dir();
        let file = UploadedFile::from_bytes(&b"partial"[..], UploadStatus::IniSize);

        assert!(matches!(file.stream(), Err(UploadError::Failed { status: UploadStatus::IniSize })));
        assert!(matches!(file.move_to(dir.join("x")), Err(UploadError::Failed { .. })));
        assert!(matches!(file.stream(), Err(UploadError::Failed { .. })));
        assert!(!file.is_moved());
    }

    #[test]
    fn test_empty_destination() {
        let file = UploadedFile::from_bytes(&b"x"[..], UploadStatus::Ok);
        assert!(matches!(file.move_to(""), Err(UploadError::InvalidInput { .. })));
        assert!(!file.is_moved());
    }

    #[test]
    fn test_failed_move_can_be_retried() {
        let dir = scratch_dir();
        let file = UploadedFile::from_bytes(&b"retry"[..], UploadStatus::Ok);

        let missing_parent = dir.join("missing").join("file.bin");
        assert!(matches!(file.move_to(&missing_parent), Err(UploadError::Io { .. })));
        assert!(!file.is_moved());

        file.move_to(dir.join("file.bin")).unwrap();
        assert!(file.is_moved());
    }

    #[test]
    fn test_concurrent_moves_only_one_wins() {
        let dir = scratch_dir();
        let file = Arc::new(UploadedFile::from_bytes(&b"race"[..], UploadStatus::Ok));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let file = Arc::clone(&file);
                let target = dir.join(format!("race-{i}.bin"));
                thread::spawn(move || file.move_to(target).is_ok())
            })
            .collect();

        let moved = handles.into_iter().map(|handle| handle.join().unwrap()).filter(|ok| *ok).count();
        assert_eq!(moved, 1);

        let written = fs::read_dir(&dir).unwrap().count();
        assert_eq!(written, 1);
    }

    #[test]
    fn test_temporary_file_removed_on_drop() {
        let dir = scratch_dir();
        let path = dir.join("tmp.bin");
        fs::write(&path, b"tmp").unwrap();

        drop(UploadedFile::temporary(path.clone(), 3));
        assert!(!path.exists());
    }

    #[test]
    fn test_external_file_kept_on_drop() {
        let dir = scratch_dir();
        let path = dir.join("external.bin");
        fs::write(&path, b"keep").unwrap();

        drop(UploadedFile::from_path(&path, 4, UploadStatus::Ok));
        assert!(path.exists());
    }

    #[test]
    fn test_copy_keeps_single_location_when_source_cannot_be_removed() {
        let dir = scratch_dir();
        let source = dir.join("source.bin");
        let target = dir.join("target.bin");
        fs::write(&source, b"data").unwrap();

        let result = copy_then_remove(&source, &target, |_| Err(io::Error::from(io::ErrorKind::PermissionDenied)));
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::PermissionDenied);
        assert!(source.exists());
        assert!(!target.exists());

        copy_then_remove(&source, &target, |p| fs::remove_file(p)).unwrap();
        assert!(!source.exists());
        assert_eq!(fs::read(&target).unwrap(), b"data");
    }
}
