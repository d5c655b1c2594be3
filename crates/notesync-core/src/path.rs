//! Storage path derivation.
//!
//! Every stored image lives at `media/{user}/{note_id}/{file_name}`. The same
//! inputs always give the same path, which is how URL resolution at display
//! time finds the object written at upload time. The user segment is what
//! scopes objects to their owner.

use std::fmt;

use serde::Serialize;

use crate::defaults::{MEDIA_NAMESPACE, PATH_DELIMITER};
use crate::error::{Error, Result};
use crate::models::{NoteId, UserIdentity};

/// A derived storage path, split into its segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct StoragePath {
    full: String,
    user: String,
    note_id: String,
    file_name: String,
}

impl StoragePath {
    pub fn as_str(&self) -> &str {
        &self.full
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn note_id(&self) -> &str {
        &self.note_id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

impl From<StoragePath> for String {
    fn from(path: StoragePath) -> Self {
        path.full
    }
}

impl AsRef<str> for StoragePath {
    fn as_ref(&self) -> &str {
        &self.full
    }
}

fn check_segment(kind: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{} cannot be empty", kind)));
    }
    if value.contains(PATH_DELIMITER) {
        return Err(Error::Validation(format!(
            "{} cannot contain '{}': {}",
            kind, PATH_DELIMITER, value
        )));
    }
    if value == "." || value == ".." {
        return Err(Error::Validation(format!("{} cannot be '{}'", kind, value)));
    }
    Ok(())
}

/// Derive the storage path for an image attached to `note_id` by `user`.
pub fn derive_path(user: &UserIdentity, note_id: &NoteId, file_name: &str) -> Result<StoragePath> {
    check_segment("user identity", user.as_str())?;
    check_segment("note id", note_id.as_str())?;
    check_segment("file name", file_name)?;

    let full = [MEDIA_NAMESPACE, user.as_str(), note_id.as_str(), file_name]
        .join(&PATH_DELIMITER.to_string());

    Ok(StoragePath {
        full,
        user: user.as_str().to_string(),
        note_id: note_id.as_str().to_string(),
        file_name: file_name.to_string(),
    })
}

/// Parse a path previously produced by [`derive_path`].
pub fn parse_path(path: &str) -> Result<StoragePath> {
    let segments: Vec<&str> = path.split(PATH_DELIMITER).collect();
    let [namespace, user, note_id, file_name] = segments.as_slice() else {
        return Err(Error::Validation(format!(
            "storage path must have 4 segments: {}",
            path
        )));
    };
    if *namespace != MEDIA_NAMESPACE {
        return Err(Error::Validation(format!(
            "storage path must start with '{}': {}",
            MEDIA_NAMESPACE, path
        )));
    }

    derive_path(
        &UserIdentity::new(*user)?,
        &NoteId::new(*note_id)?,
        file_name,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserIdentity {
        UserIdentity::new(id).unwrap()
    }

    fn note(id: &str) -> NoteId {
        NoteId::new(id).unwrap()
    }

    #[test]
    fn test_derive_path_segment_order() {
        let path = derive_path(&user("u-1"), &note("n-9"), "list.png").unwrap();
        assert_eq!(path.as_str(), "media/u-1/n-9/list.png");
        assert_eq!(path.user(), "u-1");
        assert_eq!(path.note_id(), "n-9");
        assert_eq!(path.file_name(), "list.png");
    }

    #[test]
    fn test_derive_path_is_deterministic() {
        let a = derive_path(&user("u"), &note("n"), "f.jpg").unwrap();
        let b = derive_path(&user("u"), &note("n"), "f.jpg").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_derive_path_distinct_users_never_collide() {
        let a = derive_path(&user("alice"), &note("n"), "f.jpg").unwrap();
        let b = derive_path(&user("bob"), &note("n"), "f.jpg").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_derive_path_rejects_empty_file_name() {
        let err = derive_path(&user("u"), &note("n"), "").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_derive_path_rejects_delimiter_in_segments() {
        assert!(derive_path(&user("u/other"), &note("n"), "f.png").is_err());
        assert!(derive_path(&user("u"), &note("n/x"), "f.png").is_err());
        assert!(derive_path(&user("u"), &note("n"), "../f.png").is_err());
    }

    #[test]
    fn test_derive_path_rejects_dot_segments() {
        assert!(derive_path(&user("u"), &note(".."), "f.png").is_err());
        assert!(derive_path(&user("u"), &note("n"), ".").is_err());
    }

    #[test]
    fn test_parse_path_inverts_derive() {
        let derived = derive_path(&user("u"), &note("n"), "photo.jpeg").unwrap();
        let parsed = parse_path(derived.as_str()).unwrap();
        assert_eq!(parsed, derived);
    }

    #[test]
    fn test_parse_path_rejects_wrong_namespace() {
        assert!(parse_path("public/u/n/f.png").is_err());
    }

    #[test]
    fn test_parse_path_rejects_wrong_segment_count() {
        assert!(parse_path("media/u/f.png").is_err());
        assert!(parse_path("media/u/n/extra/f.png").is_err());
    }

    #[test]
    fn test_storage_path_serializes_as_string() {
        let path = derive_path(&user("u"), &note("n"), "f.png").unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"media/u/n/f.png\"");
    }
}
