//! Body decoders.
//!
//! Each decoder is a pure function over an already buffered body:
//!
//! - [`json`]: `application/json` objects flattened into a [`ParsedBody`]
//! - [`urlencoded`]: `application/x-www-form-urlencoded` pairs
//! - [`multipart`]: the `multipart/form-data` splitter producing [`BodyPart`]s
//! - [`extract`]: partitions split parts into form fields and uploaded files
//!
//! The only side effect in this module is [`extract::pull_uploaded_files`], which
//! materializes file parts on disk.

use std::collections::HashMap;

use crate::upload::UploadedFile;

pub mod extract;
pub mod json;
pub mod multipart;
pub mod urlencoded;

pub use multipart::BodyPart;
pub use multipart::MultipartSplitter;
pub use multipart::PartHeader;

/// Decoded non-file fields, keyed by field name. Last write wins on duplicates.
pub type ParsedBody = HashMap<String, String>;

/// Uploaded files, keyed by the form field name they were sent under.
pub type UploadedFiles = HashMap<String, UploadedFile>;
