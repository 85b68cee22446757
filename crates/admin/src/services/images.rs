//! Image uploads to the storage bucket.
//!
//! Forms post a single `image` file field. The declared content type is
//! ignored; the type is taken from the file's leading bytes.

use axum::extract::Multipart;
use bearing_shop_supabase::unique_object_path;

use crate::error::AppError;
use crate::state::AppState;

/// Multipart field carrying the file.
pub const IMAGE_FIELD: &str = "image";

/// A validated image read from a form.
#[derive(Debug)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Detect JPEG, PNG, WebP and GIF by magic number.
#[must_use]
pub fn sniff_image_type(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some("image/png"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        _ => None,
    }
}

/// Check size and type of an uploaded file.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for empty, oversized or non-image files.
pub fn validate_image(
    file_name: &str,
    bytes: Vec<u8>,
    max_bytes: usize,
) -> Result<ImageUpload, AppError> {
    if bytes.is_empty() {
        return Err(AppError::BadRequest("Choose an image to upload".to_string()));
    }
    if bytes.len() > max_bytes {
        return Err(AppError::BadRequest(format!(
            "Image is larger than {} KB",
            max_bytes / 1024
        )));
    }
    let content_type = sniff_image_type(&bytes).ok_or_else(|| {
        AppError::BadRequest("Only JPEG, PNG, WebP and GIF images are accepted".to_string())
    })?;

    Ok(ImageUpload {
        file_name: file_name.to_string(),
        content_type,
        bytes,
    })
}

/// Read the `image` field from a multipart form.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if the field is missing or invalid.
pub async fn read_image_upload(
    multipart: &mut Multipart,
    max_bytes: usize,
) -> Result<ImageUpload, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field.bytes().await?;
        return validate_image(&file_name, bytes.to_vec(), max_bytes);
    }
    Err(AppError::BadRequest("Choose an image to upload".to_string()))
}

/// Upload under `prefix` and return the public URL.
///
/// # Errors
///
/// Returns `AppError::Storage` if the bucket rejects the upload.
pub async fn store_image(
    state: &AppState,
    prefix: &str,
    upload: ImageUpload,
) -> Result<String, AppError> {
    let path = unique_object_path(prefix, &upload.file_name);
    let url = state
        .storage()
        .upload(&path, upload.bytes, upload.content_type)
        .await?;
    Ok(url)
}

/// Remove images from the bucket after their rows are gone.
///
/// URLs outside the bucket are skipped. Failures are logged only, since the
/// database change has already happened.
pub async fn discard_images(state: &AppState, urls: &[String]) {
    let storage = state.storage();
    let paths: Vec<String> = urls
        .iter()
        .filter_map(|url| storage.object_path_from_url(url))
        .collect();
    if paths.is_empty() {
        return;
    }
    if let Err(e) = storage.remove(&paths).await {
        tracing::warn!(error = %e, count = paths.len(), "Failed to remove images from storage");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    #[test]
    fn test_sniff_image_type() {
        assert_eq!(sniff_image_type(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(sniff_image_type(PNG), Some("image/png"));
        assert_eq!(sniff_image_type(b"GIF89a"), Some("image/gif"));
        assert_eq!(sniff_image_type(b"RIFF\x10\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff_image_type(b"<svg xmlns="), None);
        assert_eq!(sniff_image_type(b""), None);
    }

    #[test]
    fn test_validate_image_uses_sniffed_type() {
        let upload = validate_image("bearing.png", PNG.to_vec(), 1024).unwrap();
        assert_eq!(upload.content_type, "image/png");
        assert_eq!(upload.file_name, "bearing.png");
    }

    #[test]
    fn test_validate_image_rejects_bad_input() {
        assert!(matches!(
            validate_image("a.png", Vec::new(), 1024),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            validate_image("a.png", PNG.to_vec(), 4),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            validate_image("a.pdf", b"%PDF-1.7".to_vec(), 1024),
            Err(AppError::BadRequest(_))
        ));
    }
}
