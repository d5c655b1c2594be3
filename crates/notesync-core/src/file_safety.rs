//! Image file checks applied before a note with an image is created.
//!
//! Only PNG and JPEG images are accepted. The type is taken from the file's
//! magic bytes when they are recognizable, so a renamed executable does not
//! pass as `photo.png`.

use crate::defaults::{ACCEPTED_IMAGE_TYPES, MAX_FILE_NAME_LEN};

/// Outcome of [`validate_image`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCheck {
    pub allowed: bool,
    pub block_reason: Option<String>,
    /// MIME type to upload with.
    pub content_type: String,
}

impl ImageCheck {
    fn allowed(content_type: impl Into<String>) -> Self {
        Self {
            allowed: true,
            block_reason: None,
            content_type: content_type.into(),
        }
    }

    fn blocked(reason: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            allowed: false,
            block_reason: Some(reason.into()),
            content_type: content_type.into(),
        }
    }
}

/// Check an image before upload.
///
/// `claimed` is the content type reported by the form, if any.
pub fn validate_image(
    file_name: &str,
    data: &[u8],
    claimed: Option<&str>,
    max_size_bytes: usize,
) -> ImageCheck {
    let content_type = detect_content_type(file_name, data, claimed.unwrap_or(""));

    if data.is_empty() {
        return ImageCheck::blocked(format!("Image {} is empty", file_name), content_type);
    }

    if data.len() > max_size_bytes {
        return ImageCheck::blocked(
            format!("Image exceeds maximum size of {} bytes", max_size_bytes),
            content_type,
        );
    }

    if !ACCEPTED_IMAGE_TYPES.contains(&content_type.as_str()) {
        return ImageCheck::blocked(
            format!(
                "Image type {} is not accepted (expected one of: {})",
                content_type,
                ACCEPTED_IMAGE_TYPES.join(", ")
            ),
            content_type,
        );
    }

    ImageCheck::allowed(content_type)
}

/// Detect actual content type from file magic bytes.
///
/// Falls back to the extension, then to the claimed type. A claimed image
/// type with unrecognizable bytes is downgraded to `application/octet-stream`.
pub fn detect_content_type(file_name: &str, data: &[u8], claimed: &str) -> String {
    if let Some(kind) = infer::get(data) {
        return kind.mime_type().to_string();
    }

    if claimed.starts_with("image/") {
        return "application/octet-stream".to_string();
    }

    if let Some(mime) = file_name
        .rsplit_once('.')
        .and_then(|(_, ext)| mime_from_extension(ext))
    {
        // No magic bytes matched; an image extension alone is not trusted.
        if mime.starts_with("image/") {
            return "application/octet-stream".to_string();
        }
        return mime.to_string();
    }

    if claimed.is_empty() {
        "application/octet-stream".to_string()
    } else {
        claimed.to_string()
    }
}

fn mime_from_extension(ext: &str) -> Option<&'static str> {
    match ext.to_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "txt" => Some("text/plain"),
        "md" => Some("text/markdown"),
        _ => None,
    }
}

/// Reduce a submitted file name to a single safe path segment.
///
/// Browsers may send a full client path (`C:\fakepath\list.png`); only the
/// final component is kept.
pub fn sanitize_filename(file_name: &str) -> String {
    let name = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '#' | '%' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let sanitized = sanitized.trim();
    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        return "unnamed_image".to_string();
    }

    if sanitized.len() > MAX_FILE_NAME_LEN {
        let mut cut = MAX_FILE_NAME_LEN;
        if let Some(dot_pos) = sanitized.rfind('.') {
            let ext = &sanitized[dot_pos..];
            if ext.len() < MAX_FILE_NAME_LEN {
                cut = MAX_FILE_NAME_LEN - ext.len();
                while !sanitized.is_char_boundary(cut) {
                    cut -= 1;
                }
                return format!("{}{}", &sanitized[..cut], ext);
            }
        }
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        return sanitized[..cut].to_string();
    }

    sanitized.to_string()
}
