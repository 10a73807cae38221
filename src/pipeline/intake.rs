//! Upload acceptance checks, run before any pipeline work.

use crate::error::{AppError, Result};

/// Default client-side upload limit
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Accept only `image/*` MIME types no larger than `limit` bytes.
///
/// # Errors
///
/// [`AppError::UnsupportedFileType`] for non-image types and
/// [`AppError::FileTooLarge`] when `size` exceeds `limit`.
pub fn validate_upload(mime_type: &str, size: usize, limit: usize) -> Result<()> {
    if !mime_type.trim().to_ascii_lowercase().starts_with("image/") {
        return Err(AppError::UnsupportedFileType(mime_type.to_string()));
    }

    if size > limit {
        return Err(AppError::FileTooLarge { size, limit });
    }

    Ok(())
}
