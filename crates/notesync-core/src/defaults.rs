//! Centralized default constants for notesync.
//!
//! **This module is the single source of truth** for shared default values.
//! Gateway and synchronizer crates reference these constants instead of
//! defining their own magic numbers.

// =============================================================================
// STORAGE PATHS
// =============================================================================

/// Fixed namespace segment every stored image path starts with.
pub const MEDIA_NAMESPACE: &str = "media";

/// Delimiter between storage path segments.
pub const PATH_DELIMITER: char = '/';

// =============================================================================
// IMAGES
// =============================================================================

/// Image MIME types accepted for upload (the note form's accept list).
pub const ACCEPTED_IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg"];

/// Maximum accepted image size in bytes.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Maximum file name length accepted as a path segment.
pub const MAX_FILE_NAME_LEN: usize = 255;

// =============================================================================
// REMOTE CALLS
// =============================================================================

/// Timeout applied to every individual gateway call (seconds).
pub const CALL_TIMEOUT_SECS: u64 = 30;

/// Maximum URL resolutions in flight during one refresh.
pub const MAX_CONCURRENT_RESOLUTIONS: usize = 8;

/// Requested validity window for resolved image URLs (seconds).
pub const URL_EXPIRY_SECS: u64 = 900;

/// HTTP client timeout for gateway requests (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// EVENTS
// =============================================================================

/// Broadcast channel capacity of the note event bus.
pub const EVENT_BUS_CAPACITY: usize = 256;
