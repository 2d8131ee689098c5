//! Process level settings for body decoding.
//!
//! The only side effects of decoding are writing uploaded file parts to a temporary
//! directory and buffering a streaming body, so the configuration covers exactly those:
//! where temp files go and how large a body may grow while being collected.

use std::env;
use std::path::{Path, PathBuf};

use tracing::warn;

/// Environment variable naming the directory uploaded files are written to.
pub const UPLOAD_TMP_DIR_ENV: &str = "UPLOAD_TMP_DIR";

/// Environment variable holding the maximum accepted body size in bytes.
pub const MAX_BODY_SIZE_ENV: &str = "MAX_BODY_SIZE";

#[derive(Debug, Clone, Default)]
pub struct ExchangeConfig {
    upload_tmp_dir: Option<PathBuf>,
    max_body_size: Option<usize>,
}

impl ExchangeConfig {
    pub fn builder() -> ExchangeConfigBuilder {
        ExchangeConfigBuilder::new()
    }

    /// Reads [`UPLOAD_TMP_DIR_ENV`] and [`MAX_BODY_SIZE_ENV`].
    ///
    /// Unset or empty variables leave the corresponding setting at its default; an
    /// unparsable size is ignored with a warning.
    pub fn from_env() -> Self {
        let upload_tmp_dir = env::var_os(UPLOAD_TMP_DIR_ENV).filter(|dir| !dir.is_empty()).map(PathBuf::from);

        let max_body_size = env::var(MAX_BODY_SIZE_ENV).ok().and_then(|size| match size.trim().parse::<usize>() {
            Ok(size) => Some(size),
            Err(e) => {
                warn!(cause = %e, value = %size, "ignore invalid {}", MAX_BODY_SIZE_ENV);
                None
            }
        });

        Self { upload_tmp_dir, max_body_size }
    }

    /// The configured upload directory, if any.
    pub fn upload_tmp_dir(&self) -> Option<&Path> {
        self.upload_tmp_dir.as_deref()
    }

    /// Directory uploaded parts are materialized into, falling back to the platform temp dir.
    pub fn upload_dir(&self) -> PathBuf {
        self.upload_tmp_dir.clone().unwrap_or_else(env::temp_dir)
    }

    pub fn max_body_size(&self) -> Option<usize> {
        self.max_body_size
    }
}

#[derive(Debug, Default)]
pub struct ExchangeConfigBuilder {
    upload_tmp_dir: Option<PathBuf>,
    max_body_size: Option<usize>,
}

impl ExchangeConfigBuilder {
    fn new() -> Self {
        Self::default()
    }

    pub fn upload_tmp_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.upload_tmp_dir = Some(dir.into());
        self
    }

    pub fn max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = Some(max_body_size);
        self
    }

    pub fn build(self) -> ExchangeConfig {
        ExchangeConfig { upload_tmp_dir: self.upload_tmp_dir, max_body_size: self.max_body_size }
    }
}
