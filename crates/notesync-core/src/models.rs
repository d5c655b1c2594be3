//! Note, record, and image-reference types.
//!
//! The record service stores a flat [`NoteRecord`]; everything above the
//! gateways works with [`Note`], whose image is an explicit [`ImageRef`]
//! variant rather than a string whose meaning depends on the phase.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::path::{derive_path, parse_path, StoragePath};

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Opaque note identifier assigned by the record service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    /// Wrap a non-empty identifier.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::Validation("note id cannot be empty".to_string()));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable identity string of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserIdentity(String);

impl UserIdentity {
    /// Wrap a non-empty identity.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::Validation("user identity cannot be empty".to_string()));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// IMAGE REFERENCES
// =============================================================================

/// Where a note's image currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageRef {
    /// The note has no image.
    #[default]
    None,
    /// Record created, bytes not yet uploaded.
    PendingUpload { file_name: String },
    /// Bytes stored at `path`.
    Stored { path: StoragePath },
    /// Stored, with a temporary URL resolved for display. Never persisted.
    Resolved { path: StoragePath, url: ResolvedUrl },
}

impl ImageRef {
    pub fn is_none(&self) -> bool {
        matches!(self, ImageRef::None)
    }

    /// The storage path, once the image has one.
    pub fn path(&self) -> Option<&StoragePath> {
        match self {
            ImageRef::Stored { path } | ImageRef::Resolved { path, .. } => Some(path),
            ImageRef::None | ImageRef::PendingUpload { .. } => None,
        }
    }

    /// The display URL, if resolved.
    pub fn url(&self) -> Option<&str> {
        match self {
            ImageRef::Resolved { url, .. } => Some(url.url.as_str()),
            _ => None,
        }
    }
}

/// A temporary access URL for a stored image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedUrl {
    pub url: String,
    /// When the storage service stops honouring the URL, if it says.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl ResolvedUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

// =============================================================================
// RECORDS (wire form)
// =============================================================================

/// Fields sent to the record service to create a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNoteRecord {
    pub name: String,
    pub description: String,
    /// File name of the image about to be uploaded, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A note as stored by the record service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: NoteId,
    pub name: String,
    pub description: String,
    /// Persisted image reference: the uploaded file name, or a full storage path.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, rename = "createdAt", alias = "created_at")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "updatedAt", alias = "updated_at")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl NoteRecord {
    /// Persisted image value, treating an empty string as absent.
    pub fn image_value(&self) -> Option<&str> {
        self.image.as_deref().filter(|v| !v.trim().is_empty())
    }

    /// Storage path of this record's image as seen by `user`.
    ///
    /// A bare file name is expanded through [`derive_path`]. A full path is
    /// accepted only if it lies under `user`'s own prefix for this note.
    pub fn storage_path(&self, user: &UserIdentity) -> Result<Option<StoragePath>> {
        let Some(value) = self.image_value() else {
            return Ok(None);
        };

        if !value.contains(crate::defaults::PATH_DELIMITER) {
            return derive_path(user, &self.id, value).map(Some);
        }

        let path = parse_path(value)?;
        if path.user() != user.as_str() || path.note_id() != self.id.as_str() {
            return Err(Error::Validation(format!(
                "stored path {} does not belong to note {} of the current user",
                value, self.id
            )));
        }
        Ok(Some(path))
    }

    /// Convert into a [`Note`] whose image is `Stored` (or `None`).
    pub fn into_note(self, user: &UserIdentity) -> Result<Note> {
        let image = match self.storage_path(user)? {
            Some(path) => ImageRef::Stored { path },
            None => ImageRef::None,
        };
        Ok(self.with_image(image))
    }

    /// Convert into a [`Note`] carrying `image`.
    pub fn with_image(self, image: ImageRef) -> Note {
        Note {
            id: Some(self.id),
            name: self.name,
            description: self.description,
            image,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

// =============================================================================
// NOTES
// =============================================================================

/// A note as seen by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    /// Absent until the record service has assigned one.
    pub id: Option<NoteId>,
    pub name: String,
    pub description: String,
    pub image: ImageRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Note {
    /// A note that has not been saved yet.
    pub fn unsaved(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: description.into(),
            image: ImageRef::None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Lifecycle state derived from the id and image.
    pub fn state(&self) -> NoteState {
        match (&self.id, &self.image) {
            (None, _) => NoteState::Unsaved,
            (Some(_), ImageRef::None) => NoteState::Saved,
            (Some(_), ImageRef::PendingUpload { .. }) => NoteState::SavedImagePending,
            (Some(_), ImageRef::Stored { .. } | ImageRef::Resolved { .. }) => {
                NoteState::SavedImagePersisted
            }
        }
    }
}

/// Client-visible lifecycle of a note.
///
/// `Unsaved -> Saved | SavedImagePending -> SavedImagePersisted`; a saved note
/// never returns to `Unsaved`, and only saved notes can be deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteState {
    Unsaved,
    Saved,
    SavedImagePending,
    SavedImagePersisted,
}

impl NoteState {
    pub fn is_deletable(self) -> bool {
        !matches!(self, NoteState::Unsaved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserIdentity {
        UserIdentity::new("us-east-1:alice").unwrap()
    }

    fn record(image: Option<&str>) -> NoteRecord {
        NoteRecord {
            id: NoteId::new("n1").unwrap(),
            name: "Groceries".to_string(),
            description: "Milk, eggs".to_string(),
            image: image.map(str::to_string),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_empty_ids_rejected() {
        assert!(NoteId::new("").is_err());
        assert!(NoteId::new("   ").is_err());
        assert!(UserIdentity::new("").is_err());
    }

    #[test]
    fn test_record_without_image_maps_to_none() {
        let note = record(None).into_note(&user()).unwrap();
        assert_eq!(note.image, ImageRef::None);
        assert_eq!(note.state(), NoteState::Saved);
    }

    #[test]
    fn test_record_with_empty_image_string_maps_to_none() {
        let note = record(Some("")).into_note(&user()).unwrap();
        assert!(note.image.is_none());
    }

    #[test]
    fn test_record_file_name_expands_to_user_path() {
        let note = record(Some("list.png")).into_note(&user()).unwrap();
        let path = note.image.path().unwrap();
        assert_eq!(path.as_str(), "media/us-east-1:alice/n1/list.png");
        assert_eq!(note.state(), NoteState::SavedImagePersisted);
    }

    #[test]
    fn test_record_full_path_accepted_for_owner() {
        let note = record(Some("media/us-east-1:alice/n1/list.png"))
            .into_note(&user())
            .unwrap();
        assert_eq!(
            note.image.path().unwrap().as_str(),
            "media/us-east-1:alice/n1/list.png"
        );
    }

    #[test]
    fn test_record_foreign_path_rejected() {
        let result = record(Some("media/mallory/n1/list.png")).storage_path(&user());
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_record_deserializes_camel_case_timestamps() {
        let json = r#"{
            "id": "n1",
            "name": "a",
            "description": "b",
            "image": null,
            "createdAt": "2026-01-02T03:04:05Z"
        }"#;
        let rec: NoteRecord = serde_json::from_str(json).unwrap();
        assert!(rec.created_at.is_some());
        assert!(rec.updated_at.is_none());
    }

    #[test]
    fn test_new_record_omits_absent_image() {
        let rec = NewNoteRecord {
            name: "a".into(),
            description: "b".into(),
            image: None,
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert!(json.get("image").is_none());
    }

    #[test]
    fn test_unsaved_note_is_not_deletable() {
        let note = Note::unsaved("a", "b");
        assert_eq!(note.state(), NoteState::Unsaved);
        assert!(!note.state().is_deletable());
    }

    #[test]
    fn test_pending_upload_state() {
        let mut note = Note::unsaved("a", "b");
        note.id = Some(NoteId::new("n1").unwrap());
        note.image = ImageRef::PendingUpload {
            file_name: "list.png".into(),
        };
        assert_eq!(note.state(), NoteState::SavedImagePending);
        assert!(note.image.path().is_none());
        assert!(note.image.url().is_none());
    }

    #[test]
    fn test_resolved_image_exposes_url_and_path() {
        let path = derive_path(&user(), &NoteId::new("n1").unwrap(), "x.png").unwrap();
        let image = ImageRef::Resolved {
            path: path.clone(),
            url: ResolvedUrl::new("https://cdn.example/x.png?sig=1"),
        };
        assert_eq!(image.url(), Some("https://cdn.example/x.png?sig=1"));
        assert_eq!(image.path(), Some(&path));
    }
}
