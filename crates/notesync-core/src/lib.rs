//! # notesync-core
//!
//! Core types, traits, and abstractions for notesync.
//!
//! This crate provides the note and image-reference data structures, the
//! gateway traits the synchronizer depends on, and the deterministic storage
//! path derivation shared by upload and URL resolution.

pub mod defaults;
pub mod error;
pub mod events;
pub mod file_safety;
pub mod logging;
pub mod models;
pub mod path;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use events::{EventBus, NoteEvent};
pub use file_safety::{detect_content_type, sanitize_filename, validate_image, ImageCheck};
pub use models::*;
pub use path::{derive_path, parse_path, StoragePath};
pub use traits::*;
