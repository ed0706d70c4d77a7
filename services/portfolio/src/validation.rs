//! Input validation for uploads and admin provisioning

use regex::Regex;
use std::sync::OnceLock;

/// Upload size ceiling: files strictly larger than this are rejected
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Maximum number of files in one batch upload
pub const MAX_BATCH_FILES: usize = 10;

const ALLOWED_EXTENSIONS: [&str; 5] = ["jpeg", "jpg", "png", "gif", "webp"];

const ALLOWED_MIME_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

/// Validate a candidate upload before anything is sent to the media host
///
/// Both the file extension and the declared MIME type must be on the
/// allow-list, and the payload must not exceed [`MAX_UPLOAD_BYTES`]. A file
/// of exactly the ceiling is accepted.
pub fn validate_image_file(
    file_name: &str,
    content_type: &str,
    size_bytes: usize,
) -> Result<(), String> {
    if size_bytes == 0 {
        return Err("Uploaded file is empty".to_string());
    }

    if size_bytes > MAX_UPLOAD_BYTES {
        return Err(format!(
            "File exceeds the {} MiB upload limit",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        ));
    }

    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err("Only image files are allowed (jpeg, jpg, png, gif, webp)".to_string());
    }

    if !ALLOWED_MIME_TYPES.contains(&content_type.to_ascii_lowercase().as_str()) {
        return Err("Only image files are allowed (jpeg, jpg, png, gif, webp)".to_string());
    }

    Ok(())
}

/// Validate the source location for a URL-based upload
pub fn validate_image_url(url: &str) -> Result<(), String> {
    let url = url.trim();

    if url.is_empty() {
        return Err("Image URL is required".to_string());
    }

    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err("Image URL must use http or https".to_string());
    }

    Ok(())
}

/// Validate a username for provisioning
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.len() < 3 {
        return Err("Username must be at least 3 characters long".to_string());
    }

    if username.len() > 32 {
        return Err("Username must be at most 32 characters long".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err("Username can only contain letters, numbers, and underscores".to_string());
    }

    Ok(())
}

/// Validate a password for provisioning
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.len() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_at_exact_ceiling_is_accepted() {
        assert!(validate_image_file("shoot.jpg", "image/jpeg", MAX_UPLOAD_BYTES).is_ok());
    }

    #[test]
    fn file_one_byte_over_ceiling_is_rejected() {
        let err =
            validate_image_file("shoot.jpg", "image/jpeg", MAX_UPLOAD_BYTES + 1).unwrap_err();
        assert!(err.contains("10 MiB"));
    }

    #[test]
    fn empty_file_is_rejected() {
        assert!(validate_image_file("shoot.jpg", "image/jpeg", 0).is_err());
    }

    #[test]
    fn extension_and_mime_must_both_match() {
        assert!(validate_image_file("notes.txt", "image/png", 100).is_err());
        assert!(validate_image_file("photo.png", "application/pdf", 100).is_err());
        assert!(validate_image_file("photo", "image/png", 100).is_err());
        assert!(validate_image_file("photo.png", "image/png", 100).is_ok());
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(validate_image_file("PHOTO.JPG", "image/jpeg", 100).is_ok());
        assert!(validate_image_file("photo.WebP", "IMAGE/WEBP", 100).is_ok());
    }

    #[test]
    fn every_allowed_format_passes() {
        for (ext, mime) in [
            ("jpeg", "image/jpeg"),
            ("jpg", "image/jpeg"),
            ("png", "image/png"),
            ("gif", "image/gif"),
            ("webp", "image/webp"),
        ] {
            assert!(validate_image_file(&format!("a.{}", ext), mime, 1).is_ok());
        }
    }

    #[test]
    fn url_scheme_is_enforced() {
        assert!(validate_image_url("https://example.com/a.jpg").is_ok());
        assert!(validate_image_url("http://example.com/a.jpg").is_ok());
        assert!(validate_image_url("ftp://example.com/a.jpg").is_err());
        assert!(validate_image_url("").is_err());
    }

    #[test]
    fn username_rules() {
        assert!(validate_username("niharika_admin").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("").is_err());
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("correct horse").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password("").is_err());
    }
}
