//! Utility macros shared by the decoders.

/// Returns early with the given error when the predicate does not hold.
///
/// Works like `assert!`, but yields an `Err` instead of panicking, which keeps
/// validation checks in the decoders on a single line.
///
/// ```ignore
/// ensure!(!path.as_os_str().is_empty(), UploadError::invalid_input("empty path"));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
