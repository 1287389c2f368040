//! Content validation for uploads. Both checks are cheap and run before any
//! durable write, so a rejection here leaves zero bytes in either store.

use crate::error::{AppError, Result};

/// Maximum accepted payload size.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// MIME types accepted for upload and download.
const ALLOWED_TYPES: [&str; 3] = ["image/jpeg", "image/png", "application/pdf"];

/// Resolve a MIME type from the filename extension and check it against the
/// allow-list. Unresolvable extensions are rejected the same as disallowed
/// ones.
pub fn check_type(filename: &str) -> Result<&'static str> {
    let guessed = mime_guess::from_path(filename).first();

    let essence = guessed.as_ref().map(|m| m.essence_str());
    match essence.and_then(|e| ALLOWED_TYPES.iter().copied().find(|a| *a == e)) {
        Some(allowed) => Ok(allowed),
        None => Err(AppError::BadRequest(
            "Invalid file type. Only JPEG, PNG, and PDF files are allowed".to_string(),
        )),
    }
}

/// Enforce the upload size cap.
pub fn check_size(bytes: u64) -> Result<()> {
    if bytes > MAX_UPLOAD_BYTES {
        return Err(AppError::BadRequest(
            "File too large. The maximum upload size is 10 MiB".to_string(),
        ));
    }
    Ok(())
}

/// Reject names that are empty or carry path separators.
pub fn check_filename(filename: &str) -> Result<()> {
    if filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains("..")
    {
        return Err(AppError::BadRequest("Invalid file name".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_allowed_extensions() {
        assert_eq!(check_type("photo.jpg").unwrap(), "image/jpeg");
        assert_eq!(check_type("photo.jpeg").unwrap(), "image/jpeg");
        assert_eq!(check_type("diagram.png").unwrap(), "image/png");
        assert_eq!(check_type("report.pdf").unwrap(), "application/pdf");
    }

    #[test]
    fn rejects_disallowed_and_unknown_extensions() {
        assert!(check_type("script.exe").is_err());
        assert!(check_type("notes.txt").is_err());
        assert!(check_type("archive.tar.gz").is_err());
        assert!(check_type("noextension").is_err());
    }

    #[test]
    fn size_cap_is_inclusive() {
        assert!(check_size(0).is_ok());
        assert!(check_size(MAX_UPLOAD_BYTES).is_ok());
        assert!(check_size(MAX_UPLOAD_BYTES + 1).is_err());
    }

    #[test]
    fn filename_shape() {
        assert!(check_filename("report.pdf").is_ok());
        assert!(check_filename("").is_err());
        assert!(check_filename("a/b.pdf").is_err());
        assert!(check_filename("a\\b.pdf").is_err());
        assert!(check_filename("../escape.pdf").is_err());
    }
}
